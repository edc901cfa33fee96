//! The in-memory entry tree: an arena of tagged values.
//!
//! Wire values are recursive, so nodes live in a flat arena and refer to
//! each other by [`NodeId`]. The id of a node is stable for the life of the
//! tree, which is what lets [`FileInfo`] point at the two scalars it needs to
//! rewrite without holding references into the tree: all mutation funnels
//! through [`Tree::set_integer`], and re-encoding the tree sees the update
//! because there is only one copy of the value.

use crate::format::constants::ROM_PREFIX;

/// Index of a node in a [`Tree`]. Only valid for the tree that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// One decoded value.
///
/// The 33 wire kinds collapse to these structural alternatives; the byte
/// width a scalar was stored with is not kept, because widths are recomputed
/// minimally on encode.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
	/// Wire kinds 1–3: no payload, purpose unknown. The tag is preserved so
	/// the value round-trips.
	Reserved(u8),

	/// Wire kinds 4–12: a signed integer, sign-extended from its stored
	/// width.
	Integer(i64),

	/// Wire kinds 13–20: an array of unsigned integers.
	IntArray(Vec<u64>),

	/// Wire kinds 21–24: an index into the string table.
	StringRef(u32),

	/// Wire kinds 25–28: an index into the chunk table.
	ChunkRef(u32),

	/// Wire kind 29: a float with no payload, reads as 0.0.
	FloatZero,

	/// Wire kind 30: a four-byte float.
	Float(f32),

	/// Wire kind 31: an eight-byte double.
	Double(f64),

	/// Wire kind 32: an ordered list of child values.
	List(Vec<NodeId>),

	/// Wire kind 33: a map of named child values.
	Object(Vec<Entry>),
}

/// One entry of an object: a name-table index, the name it resolved to at
/// decode time, and the child node.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
	/// Index into the archive's name table.
	pub name_index: u32,

	/// The resolved name, cached at decode time.
	pub name: Vec<u8>,

	/// The child value.
	pub node: NodeId,
}

/// A subfile record: where one subfile lives in the companion blob.
///
/// The offset and length are not copies: they are the ids of the two
/// integer nodes inside the reserved `file_info` object, so writing through
/// [`Tree::set_integer`] updates what the next encode serialises.
#[derive(Clone, Debug)]
pub struct FileInfo {
	/// Index into the archive's name table.
	pub name_index: u32,

	/// The resolved subfile name.
	pub name: Vec<u8>,

	/// Node holding the subfile's byte offset into the companion blob.
	pub offset: NodeId,

	/// Node holding the subfile's byte length.
	pub length: NodeId,
}

impl FileInfo {
	/// Whether this subfile is the one eligible for substitution.
	pub fn is_rom(&self) -> bool {
		self.name.starts_with(ROM_PREFIX.as_bytes())
	}
}

/// Arena of values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tree {
	nodes: Vec<Value>,
}

impl Tree {
	/// An empty tree.
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a node, returning its id.
	pub fn push(&mut self, value: Value) -> NodeId {
		let id = NodeId(self.nodes.len() as u32);
		self.nodes.push(value);
		id
	}

	/// Borrow a node.
	///
	/// # Panics
	///
	/// If `id` came from a different tree.
	pub fn get(&self, id: NodeId) -> &Value {
		&self.nodes[id.0 as usize]
	}

	/// Read an integer node.
	///
	/// # Panics
	///
	/// If the node is not [`Value::Integer`], which cannot happen for ids
	/// obtained from a validated [`FileInfo`].
	pub fn integer(&self, id: NodeId) -> i64 {
		match self.get(id) {
			Value::Integer(value) => *value,
			other => panic!("node {id:?} is not an integer: {other:?}"),
		}
	}

	/// Overwrite an integer node in place.
	///
	/// # Panics
	///
	/// As [`Tree::integer`].
	pub fn set_integer(&mut self, id: NodeId, value: i64) {
		match &mut self.nodes[id.0 as usize] {
			Value::Integer(slot) => *slot = value,
			other => panic!("node {id:?} is not an integer: {other:?}"),
		}
	}

	/// Number of nodes in the arena.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Whether the arena holds no nodes.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn set_integer_writes_through() {
		let mut tree = Tree::new();
		let offset = tree.push(Value::Integer(0));
		let length = tree.push(Value::Integer(100));
		let pair = tree.push(Value::List(vec![offset, length]));
		assert_eq!(tree.len(), 3);

		tree.set_integer(length, 2208);
		assert_eq!(tree.integer(length), 2208);

		// the list still sees the same node
		match tree.get(pair) {
			Value::List(children) => assert_eq!(tree.integer(children[1]), 2208),
			_ => unreachable!(),
		}
	}

	#[test]
	fn rom_prefix_detection() {
		let info = FileInfo {
			name_index: 0,
			name: b"system/roms/game.bin".to_vec(),
			offset: NodeId(0),
			length: NodeId(0),
		};
		assert!(info.is_rom());

		let other = FileInfo {
			name: b"system/sound/bgm.bin".to_vec(),
			..info
		};
		assert!(!other.is_rom());
	}
}
