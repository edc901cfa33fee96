//! The in-memory archive and its load/store pipeline.
//!
//! A parsed container is a [`Psb`]: the fixed header, the name and string
//! tables, the chunk table, the entry tree, and the subfile index extracted
//! from the reserved `file_info` object. The name and string regions are
//! also kept as their original raw bytes: this tool never rewrites their
//! contents, so re-assembly splices them back verbatim and only the entry
//! tree is re-encoded.

use tracing::{debug, instrument, warn};

use crate::container;
use crate::decode::{self, TreeDecoder};
use crate::encode;
use crate::error::{Error, Result};
use crate::format::{Header, ALIGNMENT, HEADER_LENGTH};
use crate::names;
use crate::tree::{FileInfo, NodeId, Tree};

/// A parsed archive.
#[derive(Debug)]
pub struct Psb {
	/// The fixed header. Offsets are kept current by [`Psb::assemble`].
	pub header: Header,

	/// The name table, in table order.
	pub names: Vec<Vec<u8>>,

	/// The string table, in offset-array order.
	pub strings: Vec<Vec<u8>>,

	/// Chunk-table offsets, round-tripped.
	pub chunk_offsets: Vec<u64>,

	/// Chunk-table lengths, round-tripped.
	pub chunk_lengths: Vec<u64>,

	/// The raw chunk-data region, round-tripped.
	pub chunk_data: Vec<u8>,

	/// The entry-tree arena.
	pub tree: Tree,

	/// The root of the entry tree.
	pub root: NodeId,

	/// Subfile records, in tree order. Parallel to [`Psb::subfiles`] once a
	/// blob is attached.
	pub file_info: Vec<FileInfo>,

	/// Subfile payloads from the companion blob. Empty until
	/// [`Psb::attach_blob`].
	pub subfiles: Vec<Vec<u8>>,

	/// Raw bytes of the whole name region, for verbatim re-emission.
	raw_names: Vec<u8>,

	/// Raw bytes of the string region (offset array through the last
	/// string's terminator), for verbatim re-emission.
	raw_strings: Vec<u8>,
}

fn region(buf: &[u8], start: usize, end: usize) -> Result<&[u8]> {
	buf.get(start..end).ok_or(Error::Truncated {
		needed: end.saturating_sub(start),
		at: start,
	})
}

/// Read a NUL-terminated byte string.
fn cstr(buf: &[u8], at: usize) -> Result<Vec<u8>> {
	let tail = buf
		.get(at..)
		.ok_or(Error::Truncated { needed: 1, at })?;
	let end = tail
		.iter()
		.position(|&b| b == 0)
		.ok_or(Error::Truncated { needed: 1, at: buf.len() })?;
	Ok(tail[..end].to_vec())
}

impl Psb {
	/// Load an archive from container file bytes.
	///
	/// `logical_name` is the container's filename: it keys the cipher and
	/// decides whether the cipher and compression layers apply at all.
	pub fn load(container: &[u8], logical_name: &str) -> Result<Self> {
		let decoded = container::unwrap(container, logical_name)?;
		Self::parse(&decoded)
	}

	/// Parse an already-decoded buffer.
	#[instrument(level = "debug", skip(decoded))]
	pub fn parse(decoded: &[u8]) -> Result<Self> {
		let header = Header::parse(decoded)?;
		debug!(?header, "parsed header");

		// name region: three integer arrays, then the chain chase
		let names_at = header.offset_names as usize;
		let (offsets, a) = decode::int_array(decoded, names_at)?;
		let (jumps, b) = decode::int_array(decoded, names_at + a)?;
		let (starts, c) = decode::int_array(decoded, names_at + a + b)?;
		let names = names::decode(&offsets, &jumps, &starts)?;
		let raw_names = region(decoded, names_at, names_at + a + b + c)?.to_vec();
		debug!(count = names.len(), bytes = raw_names.len(), "decoded name table");

		// string region: an offset array, then NUL-terminated data
		let strings_at = header.offset_strings as usize;
		let (string_offsets, strings_len) = decode::int_array(decoded, strings_at)?;
		let data_at = header.offset_strings_data as usize;
		let mut strings = Vec::with_capacity(string_offsets.len());
		for &offset in &string_offsets {
			strings.push(cstr(decoded, data_at + offset as usize)?);
		}
		// the raw span runs through the terminator of the string at the
		// last offset entry
		let strings_end = match string_offsets.last() {
			Some(&last) => data_at + last as usize + strings[strings.len() - 1].len() + 1,
			None => strings_at + strings_len,
		};
		let raw_strings = region(decoded, strings_at, strings_end)?.to_vec();
		debug!(count = strings.len(), bytes = raw_strings.len(), "decoded string table");

		// chunk tables: not consumed by anything, but round-tripped
		let (chunk_offsets, _) = decode::int_array(decoded, header.offset_chunk_offsets as usize)?;
		let (chunk_lengths, _) = decode::int_array(decoded, header.offset_chunk_lengths as usize)?;
		if chunk_offsets.len() != chunk_lengths.len() {
			return Err(Error::ChunkTableMismatch {
				offsets: chunk_offsets.len(),
				lengths: chunk_lengths.len(),
			});
		}
		let chunk_data = region(decoded, header.offset_chunk_data as usize, decoded.len())?.to_vec();

		// the entry tree, with file_info extraction on the way
		let entries = TreeDecoder::new(decoded, &names).decode(header.offset_entries as usize)?;
		debug!(subfiles = entries.file_info.len(), "parsed archive");

		Ok(Self {
			header,
			names,
			strings,
			chunk_offsets,
			chunk_lengths,
			chunk_data,
			tree: entries.tree,
			root: entries.root,
			file_info: entries.file_info,
			subfiles: Vec::new(),
			raw_names,
			raw_strings,
		})
	}

	/// Slice a companion blob into the archive's subfiles.
	pub fn attach_blob(&mut self, blob: &[u8]) -> Result<()> {
		let mut subfiles = Vec::with_capacity(self.file_info.len());
		for index in 0..self.file_info.len() {
			let start = self.subfile_offset(index);
			let end = start + self.subfile_length(index);
			let data = blob
				.get(start as usize..end as usize)
				.ok_or(Error::BlobTooShort {
					index,
					start,
					end,
					len: blob.len() as u64,
				})?;
			subfiles.push(data.to_vec());
		}
		debug!(subfiles = subfiles.len(), blob = blob.len(), "attached companion blob");
		self.subfiles = subfiles;
		Ok(())
	}

	/// A subfile's current offset into the companion blob.
	///
	/// # Panics
	///
	/// If `index` is out of range.
	pub fn subfile_offset(&self, index: usize) -> u64 {
		self.tree.integer(self.file_info[index].offset) as u64
	}

	/// A subfile's current byte length.
	///
	/// # Panics
	///
	/// If `index` is out of range.
	pub fn subfile_length(&self, index: usize) -> u64 {
		self.tree.integer(self.file_info[index].length) as u64
	}

	/// Set a subfile's offset, writing through to the entry tree.
	pub fn set_subfile_offset(&mut self, index: usize, offset: u64) {
		self.tree.set_integer(self.file_info[index].offset, offset as i64);
	}

	/// Set a subfile's length, writing through to the entry tree.
	pub fn set_subfile_length(&mut self, index: usize, length: u64) {
		self.tree.set_integer(self.file_info[index].length, length as i64);
	}

	/// Re-assemble the decoded buffer.
	///
	/// The name and string regions are spliced back verbatim; the entry tree
	/// is freshly encoded. If the new tree changed size, everything after it
	/// moves: a one-byte drift is repaired (with a warning) by shifting the
	/// string and chunk offsets, anything larger is an error; the format is
	/// not understood well enough to relocate further than that.
	#[instrument(level = "debug", skip(self))]
	pub fn assemble(&mut self) -> Result<Vec<u8>> {
		let entries = encode::value(&self.tree, self.root);

		let new_strings_at = (HEADER_LENGTH + self.raw_names.len() + entries.len()) as i64;
		let delta = new_strings_at - i64::from(self.header.offset_strings);
		match delta {
			0 => {}
			-1 | 1 => {
				warn!(delta, "re-encoded entry tree moved the string region; shifting offsets");
				self.header.shift_string_regions(delta);
			}
			_ => return Err(Error::OffsetDrift { delta }),
		}

		let mut out = self.header.to_wire()?;
		out.extend_from_slice(&self.raw_names);
		out.extend_from_slice(&entries);
		out.extend_from_slice(&self.raw_strings);
		out.extend_from_slice(&encode::int_array(&self.chunk_offsets));
		out.extend_from_slice(&encode::int_array(&self.chunk_lengths));
		out.extend_from_slice(&self.chunk_data);

		debug!(size = out.len(), "assembled decoded buffer");
		Ok(out)
	}

	/// Assemble and wrap into container file bytes for `logical_name`.
	pub fn store(&mut self, logical_name: &str) -> Result<Vec<u8>> {
		let decoded = self.assemble()?;
		container::wrap(&decoded, logical_name)
	}

	/// Emit the companion blob: every subfile at its offset, zero-padded to
	/// the alignment unit.
	pub fn blob(&self) -> Vec<u8> {
		let mut out = Vec::new();
		for (index, data) in self.subfiles.iter().enumerate() {
			let offset = self.subfile_offset(index) as usize;
			if out.len() < offset {
				out.resize(offset, 0);
			}
			out.extend_from_slice(data);
			let end = out.len() as u64;
			if end % ALIGNMENT != 0 {
				out.resize((end + ALIGNMENT - end % ALIGNMENT) as usize, 0);
			}
		}
		out
	}
}
