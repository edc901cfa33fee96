//! Error types for every stage of the pipeline.
//!
//! Any error here means the run is over: the format gives us no way to
//! resynchronise after a bad tag or a mismatched table, so each stage either
//! fully succeeds or hands back the first fault it found. The caller decides
//! whether that aborts the process.

use miette::Diagnostic;
use thiserror::Error;

/// Convenience return type.
pub type Result<T> = std::result::Result<T, Error>;

/// Combined error type for all codec stages.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
	/// The container prelude doesn't start with the `mdf\0` magic.
	#[error("container magic mismatch: expected 6d 64 66 00, got {found:02x?}")]
	BadMagic {
		/// The four bytes actually found.
		found: [u8; 4],
	},

	/// The buffer ended before a read completed.
	#[error("truncated input: needed {needed} byte(s) at offset {at}")]
	Truncated {
		/// Bytes the read wanted.
		needed: usize,
		/// Absolute offset of the read.
		at: usize,
	},

	/// A tag byte outside the known range (1..=33).
	#[error("unknown value tag {tag} at offset {at}")]
	UnknownTag {
		/// The offending tag byte.
		tag: u8,
		/// Absolute offset of the tag.
		at: usize,
	},

	/// The entry tree nests deeper than the decoder allows.
	#[error("value tree exceeds maximum nesting depth of {limit}")]
	DepthLimit {
		/// The configured cap.
		limit: usize,
	},

	/// A named object's name and offset arrays disagree in length.
	#[error("named object has {names} name(s) but {offsets} offset(s)")]
	LengthMismatch {
		/// Length of the name-index array.
		names: usize,
		/// Length of the child-offset array.
		offsets: usize,
	},

	/// A name index points outside the name table.
	#[error("name index {index} out of range for a table of {count}")]
	NameIndex {
		/// The offending index.
		index: usize,
		/// Number of names in the table.
		count: usize,
	},

	/// The name-table chain produced an impossible character.
	#[error("name table corrupt while reconstructing name {index}")]
	NameChain {
		/// Index of the name being reconstructed.
		index: usize,
	},

	/// The reserved `file_info` object is not shaped as expected.
	#[error("malformed file_info object: {reason}")]
	FileInfoShape {
		/// What was wrong with it.
		reason: &'static str,
	},

	/// More than one `file_info` object in the entry tree.
	#[error("duplicate file_info object in entry tree")]
	DuplicateFileInfo,

	/// The chunk offset and length arrays disagree in length.
	#[error("chunk table has {offsets} offset(s) but {lengths} length(s)")]
	ChunkTableMismatch {
		/// Length of the chunk-offset array.
		offsets: usize,
		/// Length of the chunk-length array.
		lengths: usize,
	},

	/// Re-encoding moved the string region further than the format's repair
	/// strategy is known to handle.
	#[error("re-encoded entry tree shifted the string region by {delta} bytes")]
	#[diagnostic(help("a shift of at most one byte can be repaired; anything larger means the archive layout is not understood"))]
	OffsetDrift {
		/// Signed difference between new and recorded string offsets.
		delta: i64,
	},

	/// The fixed header failed to parse or serialise.
	#[error("header codec: {0}")]
	Header(#[from] deku::DekuError),

	/// zlib compression or decompression failed.
	#[error("compression service failed: {0}")]
	Compression(#[from] std::io::Error),

	/// The companion blob is shorter than the file-info index requires.
	#[error("companion blob too short: subfile {index} wants bytes {start}..{end}, blob has {len}")]
	BlobTooShort {
		/// Subfile index.
		index: usize,
		/// First byte wanted.
		start: u64,
		/// One past the last byte wanted.
		end: u64,
		/// Actual blob length.
		len: u64,
	},

	/// A subfile index out of range for the archive.
	#[error("subfile index {index} out of range for an archive of {count}")]
	SubfileIndex {
		/// The offending index.
		index: usize,
		/// Number of subfiles present.
		count: usize,
	},

	/// No subfile carries the replaceable-ROM name prefix.
	#[error("no subfile name starts with `system/roms/`; nothing to replace")]
	NoRomSubfile,
}
