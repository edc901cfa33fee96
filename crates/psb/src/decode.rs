//! The tagged-value tree decoder.
//!
//! Values start with one tag byte. Tags 1–31 are scalars whose payload width
//! is folded into the tag; 32 and 33 are containers that embed integer
//! arrays of child offsets (and, for 33, name indices) followed by the child
//! payloads. Children are addressed relative to the start of the payload
//! region, so each is decoded at its own absolute position rather than by
//! running the cursor forward.
//!
//! Decoding the entry tree also recognises the reserved `file_info` object
//! and extracts the subfile index from it; see [`TreeDecoder`].

use tracing::{debug, instrument, trace};

use crate::error::{Error, Result};
use crate::format::constants::{FILE_INFO_NAME, MAX_DEPTH};
use crate::tree::{Entry, FileInfo, NodeId, Tree, Value};

/// Read one byte.
fn byte(buf: &[u8], at: usize) -> Result<u8> {
	buf.get(at)
		.copied()
		.ok_or(Error::Truncated { needed: 1, at })
}

/// Read a little-endian unsigned integer of 0–8 bytes.
fn uint(buf: &[u8], at: usize, width: usize) -> Result<u64> {
	let bytes = buf
		.get(at..at + width)
		.ok_or(Error::Truncated { needed: width, at })?;
	let mut raw = [0u8; 8];
	raw[..width].copy_from_slice(bytes);
	Ok(u64::from_le_bytes(raw))
}

/// Read a little-endian signed integer of 0–8 bytes, sign-extending from the
/// stored width.
fn sint(buf: &[u8], at: usize, width: usize) -> Result<i64> {
	if width == 0 {
		return Ok(0);
	}
	let raw = uint(buf, at, width)?;
	let shift = 64 - 8 * width as u32;
	Ok(((raw << shift) as i64) >> shift)
}

/// Decode a wire integer array at an absolute position.
///
/// Layout: a count-width tag (13–20), the count, an element-width tag
/// (13–20), then the elements. Returns the values and the bytes consumed.
pub fn int_array(buf: &[u8], at: usize) -> Result<(Vec<u64>, usize)> {
	let tag = byte(buf, at)?;
	if !(13..=20).contains(&tag) {
		return Err(Error::UnknownTag { tag, at });
	}
	let count_width = usize::from(tag - 12);
	let count = uint(buf, at + 1, count_width)?;

	let elem_tag_at = at + 1 + count_width;
	let elem_tag = byte(buf, elem_tag_at)?;
	if !(13..=20).contains(&elem_tag) {
		return Err(Error::UnknownTag { tag: elem_tag, at: elem_tag_at });
	}
	let elem_width = usize::from(elem_tag - 12);

	let data_at = elem_tag_at + 1;
	let data_len = count
		.checked_mul(elem_width as u64)
		.filter(|&len| {
			(data_at as u64)
				.checked_add(len)
				.is_some_and(|end| end <= buf.len() as u64)
		})
		.ok_or(Error::Truncated { needed: count as usize, at: data_at })? as usize;

	let mut values = Vec::with_capacity(data_len / elem_width);
	for i in 0..count as usize {
		values.push(uint(buf, data_at + i * elem_width, elem_width)?);
	}

	Ok((values, 1 + count_width + 1 + data_len))
}

/// A fully decoded entry tree.
#[derive(Debug)]
pub struct DecodedTree {
	/// The node arena.
	pub tree: Tree,

	/// The root node (always a kind-33 object in a valid archive).
	pub root: NodeId,

	/// Subfile records extracted from the reserved `file_info` object, in
	/// tree order. Empty when the archive has no such object.
	pub file_info: Vec<FileInfo>,
}

/// Recursive-descent decoder for the entry tree.
pub struct TreeDecoder<'a> {
	buf: &'a [u8],
	names: &'a [Vec<u8>],
	tree: Tree,
	file_info: Option<Vec<FileInfo>>,
}

impl<'a> TreeDecoder<'a> {
	/// New decoder over a decoded buffer and the archive's name table.
	pub fn new(buf: &'a [u8], names: &'a [Vec<u8>]) -> Self {
		Self {
			buf,
			names,
			tree: Tree::new(),
			file_info: None,
		}
	}

	/// Decode the value starting at `at` as the tree root.
	#[instrument(level = "debug", skip(self))]
	pub fn decode(mut self, at: usize) -> Result<DecodedTree> {
		let (root, consumed) = self.value(at, 0)?;
		debug!(consumed, nodes = self.tree.len(), "decoded entry tree");
		Ok(DecodedTree {
			tree: self.tree,
			root,
			file_info: self.file_info.unwrap_or_default(),
		})
	}

	/// Decode one value, returning its node and the bytes of its envelope.
	fn value(&mut self, at: usize, depth: usize) -> Result<(NodeId, usize)> {
		if depth > MAX_DEPTH {
			return Err(Error::DepthLimit { limit: MAX_DEPTH });
		}

		let tag = byte(self.buf, at)?;
		trace!(at, tag, depth, "decode value");
		let (value, consumed) = match tag {
			1..=3 => (Value::Reserved(tag), 1),
			4..=12 => {
				let width = usize::from(tag - 4);
				(Value::Integer(sint(self.buf, at + 1, width)?), 1 + width)
			}
			13..=20 => {
				let (values, consumed) = int_array(self.buf, at)?;
				(Value::IntArray(values), consumed)
			}
			21..=24 => {
				let width = usize::from(tag - 20);
				let index = uint(self.buf, at + 1, width)? as u32;
				(Value::StringRef(index), 1 + width)
			}
			25..=28 => {
				let width = usize::from(tag - 24);
				let index = uint(self.buf, at + 1, width)? as u32;
				(Value::ChunkRef(index), 1 + width)
			}
			29 => (Value::FloatZero, 1),
			30 => {
				let mut bytes = [0u8; 4];
				bytes.copy_from_slice(
					self.buf
						.get(at + 1..at + 5)
						.ok_or(Error::Truncated { needed: 4, at: at + 1 })?,
				);
				(Value::Float(f32::from_le_bytes(bytes)), 5)
			}
			31 => {
				let mut bytes = [0u8; 8];
				bytes.copy_from_slice(
					self.buf
						.get(at + 1..at + 9)
						.ok_or(Error::Truncated { needed: 8, at: at + 1 })?,
				);
				(Value::Double(f64::from_le_bytes(bytes)), 9)
			}
			32 => return self.list(at, depth),
			33 => return self.object(at, depth),
			_ => return Err(Error::UnknownTag { tag, at }),
		};

		Ok((self.tree.push(value), consumed))
	}

	/// Decode a kind-32 list: an offset array, then children at
	/// `region_base + offset`.
	fn list(&mut self, at: usize, depth: usize) -> Result<(NodeId, usize)> {
		let (offsets, offsets_len) = int_array(self.buf, at + 1)?;
		let base = at + 1 + offsets_len;

		let mut children = Vec::with_capacity(offsets.len());
		let mut extent = 0usize;
		for offset in offsets {
			let child_at = base
				.checked_add(offset as usize)
				.ok_or(Error::Truncated { needed: offset as usize, at: base })?;
			let (child, consumed) = self.value(child_at, depth + 1)?;
			children.push(child);
			extent = extent.max(offset as usize + consumed);
		}

		let id = self.tree.push(Value::List(children));
		Ok((id, 1 + offsets_len + extent))
	}

	/// Decode a kind-33 object: a name-index array, an offset array of equal
	/// length, then children at `region_base + offset`.
	fn object(&mut self, at: usize, depth: usize) -> Result<(NodeId, usize)> {
		let (name_indices, names_len) = int_array(self.buf, at + 1)?;
		let (offsets, offsets_len) = int_array(self.buf, at + 1 + names_len)?;
		if name_indices.len() != offsets.len() {
			return Err(Error::LengthMismatch {
				names: name_indices.len(),
				offsets: offsets.len(),
			});
		}
		let base = at + 1 + names_len + offsets_len;

		let mut entries = Vec::with_capacity(offsets.len());
		let mut extent = 0usize;
		for (&name_index, &offset) in name_indices.iter().zip(&offsets) {
			let name = self.resolve_name(name_index)?;
			trace!(at, name = %String::from_utf8_lossy(&name), "object entry");

			let child_at = base
				.checked_add(offset as usize)
				.ok_or(Error::Truncated { needed: offset as usize, at: base })?;
			let (child, consumed) = self.value(child_at, depth + 1)?;
			extent = extent.max(offset as usize + consumed);

			if name == FILE_INFO_NAME.as_bytes() {
				self.extract_file_info(child)?;
			}

			entries.push(Entry {
				name_index: name_index as u32,
				name,
				node: child,
			});
		}

		let id = self.tree.push(Value::Object(entries));
		Ok((id, 1 + names_len + offsets_len + extent))
	}

	fn resolve_name(&self, index: u64) -> Result<Vec<u8>> {
		let err = Error::NameIndex {
			index: index as usize,
			count: self.names.len(),
		};
		if index > u32::MAX as u64 {
			return Err(err);
		}
		self.names.get(index as usize).cloned().ok_or(err)
	}

	/// Validate the reserved object's shape and record the subfile index.
	///
	/// The object named `file_info` must itself be an object, and each of
	/// its children a two-element list of integer scalars: the subfile's
	/// (offset, length) pair. The recorded [`FileInfo`]s point at those
	/// integer nodes so later mutation flows through the tree.
	fn extract_file_info(&mut self, object: NodeId) -> Result<()> {
		if self.file_info.is_some() {
			return Err(Error::DuplicateFileInfo);
		}

		let Value::Object(entries) = self.tree.get(object) else {
			return Err(Error::FileInfoShape { reason: "reserved object is not a named map" });
		};

		let mut infos = Vec::with_capacity(entries.len());
		for entry in entries {
			let Value::List(pair) = self.tree.get(entry.node) else {
				return Err(Error::FileInfoShape { reason: "subfile record is not a list" });
			};
			let [offset, length] = pair.as_slice() else {
				return Err(Error::FileInfoShape {
					reason: "subfile record does not have exactly two elements",
				});
			};
			for node in [offset, length] {
				if !matches!(self.tree.get(*node), Value::Integer(_)) {
					return Err(Error::FileInfoShape {
						reason: "subfile record element is not an integer",
					});
				}
			}
			infos.push(FileInfo {
				name_index: entry.name_index,
				name: entry.name.clone(),
				offset: *offset,
				length: *length,
			});
		}

		debug!(subfiles = infos.len(), "extracted file_info index");
		self.file_info = Some(infos);
		Ok(())
	}
}
