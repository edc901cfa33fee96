use deku::prelude::*;

use crate::error::Result as PsbResult;

/// The decoded buffer's fixed header.
///
/// Forty bytes at offset 0: a four-byte signature, two tag fields, and seven
/// absolute offsets into the decoded buffer. The signature is carried through
/// verbatim; only the outer container magic is validated.
#[derive(Clone, Debug, Eq, PartialEq, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct Header {
	/// Signature bytes. Round-tripped, never interpreted.
	#[deku(count = "4")]
	pub signature: Vec<u8>,

	/// Format-type tag.
	pub format_type: u32,

	/// Reserved field of unknown purpose.
	pub unknown: u32,

	/// Offset of the name-table region.
	pub offset_names: u32,

	/// Offset of the string-offset array.
	pub offset_strings: u32,

	/// Offset of the string data (NUL-terminated, addressed by the offset
	/// array).
	pub offset_strings_data: u32,

	/// Offset of the chunk-offset array.
	pub offset_chunk_offsets: u32,

	/// Offset of the chunk-length array.
	pub offset_chunk_lengths: u32,

	/// Offset of the chunk data.
	pub offset_chunk_data: u32,

	/// Offset of the entry tree.
	pub offset_entries: u32,
}

impl Header {
	/// Parse the header from the start of a decoded buffer.
	pub fn parse(buf: &[u8]) -> PsbResult<Self> {
		let (_, header) = Self::from_bytes((buf, 0))?;
		Ok(header)
	}

	/// Serialise the header to its forty-byte wire form.
	pub fn to_wire(&self) -> PsbResult<Vec<u8>> {
		Ok(self.to_bytes()?)
	}

	/// Shift the string and chunk offsets by a signed delta.
	///
	/// Used when the re-encoded entry tree changes size: everything laid out
	/// after the entries region moves together. The names and entries offsets
	/// are untouched.
	pub fn shift_string_regions(&mut self, delta: i64) {
		for offset in [
			&mut self.offset_strings,
			&mut self.offset_strings_data,
			&mut self.offset_chunk_offsets,
			&mut self.offset_chunk_lengths,
			&mut self.offset_chunk_data,
		] {
			*offset = offset.wrapping_add_signed(delta as i32);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> Header {
		Header {
			signature: b"PSB\0".to_vec(),
			format_type: 2,
			unknown: 0,
			offset_names: 40,
			offset_strings: 300,
			offset_strings_data: 310,
			offset_chunk_offsets: 400,
			offset_chunk_lengths: 403,
			offset_chunk_data: 406,
			offset_entries: 100,
		}
	}

	#[test]
	fn wire_round_trip() {
		let header = sample();
		let wire = header.to_wire().expect("serialise");
		assert_eq!(wire.len(), crate::format::HEADER_LENGTH);
		let back = Header::parse(&wire).expect("parse");
		assert_eq!(back, header);
	}

	#[test]
	fn shift_moves_only_string_and_chunk_regions() {
		let mut header = sample();
		header.shift_string_regions(-1);
		assert_eq!(header.offset_names, 40);
		assert_eq!(header.offset_entries, 100);
		assert_eq!(header.offset_strings, 299);
		assert_eq!(header.offset_strings_data, 309);
		assert_eq!(header.offset_chunk_offsets, 399);
		assert_eq!(header.offset_chunk_lengths, 402);
		assert_eq!(header.offset_chunk_data, 405);
	}
}
