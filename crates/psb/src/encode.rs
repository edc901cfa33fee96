//! The tagged-value tree encoder.
//!
//! The inverse of [`decode`](crate::decode): every value re-serialises with
//! minimal payload widths. Containers encode their children first into a
//! side buffer, recording each child's offset relative to the start of the
//! payload region (the first child is always at relative offset 0), then
//! emit the tag, the index arrays, and the payload.
//!
//! The decoded model is a closed enum, so the original format's "unknown
//! kind" abort has nothing to attach to here: every representable tree
//! encodes.

use tracing::trace;

use crate::tree::{NodeId, Tree, Value};
use crate::varint::{signed_width, unsigned_width};

/// Encode a wire integer array: count-width tag, count, element-width tag,
/// elements. Counts and elements spend at least one byte each, so the empty
/// array is `0d 00 0d`.
pub fn int_array(values: &[u64]) -> Vec<u8> {
	let count_width = unsigned_width(values.len() as u64).max(1) as usize;
	let elem_width = values
		.iter()
		.map(|&value| unsigned_width(value))
		.max()
		.unwrap_or(0)
		.max(1) as usize;

	let mut out = Vec::with_capacity(2 + count_width + values.len() * elem_width);
	out.push(12 + count_width as u8);
	out.extend_from_slice(&(values.len() as u64).to_le_bytes()[..count_width]);
	out.push(12 + elem_width as u8);
	for value in values {
		out.extend_from_slice(&value.to_le_bytes()[..elem_width]);
	}
	out
}

/// Encode the value rooted at `id`.
pub fn value(tree: &Tree, id: NodeId) -> Vec<u8> {
	match tree.get(id) {
		Value::Reserved(tag) => vec![*tag],
		Value::Integer(value) => {
			// zero encodes as a zero-width payload: "absent" rather than a
			// one-byte zero
			let width = signed_width(*value) as usize;
			let mut out = Vec::with_capacity(1 + width);
			out.push(4 + width as u8);
			out.extend_from_slice(&value.to_le_bytes()[..width]);
			out
		}
		Value::IntArray(values) => int_array(values),
		Value::StringRef(index) => ref_value(20, *index),
		Value::ChunkRef(index) => ref_value(24, *index),
		Value::FloatZero => vec![29],
		Value::Float(value) => {
			let mut out = Vec::with_capacity(5);
			out.push(30);
			out.extend_from_slice(&value.to_le_bytes());
			out
		}
		Value::Double(value) => {
			let mut out = Vec::with_capacity(9);
			out.push(31);
			out.extend_from_slice(&value.to_le_bytes());
			out
		}
		Value::List(children) => {
			let (offsets, payload) = children_payload(tree, children);
			trace!(children = children.len(), payload = payload.len(), "encode list");

			let mut out = vec![32];
			out.extend_from_slice(&int_array(&offsets));
			out.extend_from_slice(&payload);
			out
		}
		Value::Object(entries) => {
			let children: Vec<NodeId> = entries.iter().map(|entry| entry.node).collect();
			let (offsets, payload) = children_payload(tree, &children);
			let names: Vec<u64> = entries
				.iter()
				.map(|entry| u64::from(entry.name_index))
				.collect();
			trace!(entries = entries.len(), payload = payload.len(), "encode object");

			let mut out = vec![33];
			out.extend_from_slice(&int_array(&names));
			out.extend_from_slice(&int_array(&offsets));
			out.extend_from_slice(&payload);
			out
		}
	}
}

/// Encode all children into one payload buffer, returning their relative
/// offsets alongside.
fn children_payload(tree: &Tree, children: &[NodeId]) -> (Vec<u64>, Vec<u8>) {
	let mut offsets = Vec::with_capacity(children.len());
	let mut payload = Vec::new();
	for &child in children {
		offsets.push(payload.len() as u64);
		payload.extend_from_slice(&value(tree, child));
	}
	(offsets, payload)
}

fn ref_value(tag_base: u8, index: u32) -> Vec<u8> {
	let width = unsigned_width(u64::from(index)).max(1) as usize;
	let mut out = Vec::with_capacity(1 + width);
	out.push(tag_base + width as u8);
	out.extend_from_slice(&index.to_le_bytes()[..width]);
	out
}
