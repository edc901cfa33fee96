/// Magic bytes of the container prelude.
pub const CONTAINER_MAGIC: [u8; 4] = *b"mdf\0";

/// Length of the container prelude: magic plus the little-endian uncompressed
/// size of the payload that follows.
pub const PRELUDE_LENGTH: usize = 8;

/// Length of the decoded buffer's fixed header.
pub const HEADER_LENGTH: usize = 40;

/// Placement granularity for subfiles in the companion blob. Every subfile
/// starts on a multiple of this; shorter subfiles are zero-padded up to it.
pub const ALIGNMENT: u64 = 2048;

/// Length of the derived keystream. The cipher cycles over this.
pub const KEY_LENGTH: usize = 80;

/// Seed literal prepended to the lowercased file basename before hashing.
/// Lifted from the engine binary that reads these containers.
pub const HASH_SEED: &[u8; 13] = b"MX8wgGEJ2+M47";

/// Logical filename whose keystream is a fixed historical constant rather
/// than a derived one.
pub const SENTINEL_NAME: &str = "alldata.psb.m";

/// The fixed keystream for [`SENTINEL_NAME`].
pub const SENTINEL_KEY: [u8; KEY_LENGTH] = [
	0x3e, 0xa2, 0xcb, 0x35, 0xb4, 0x83, 0x46, 0xe9, 0x9a, 0xaf, 0xd1, 0xcc, 0xb4, 0x5e, 0x51, 0xd5,
	0xe4, 0xa2, 0x64, 0x96, 0xb8, 0x23, 0x63, 0x1b, 0xfc, 0x49, 0xb6, 0x34, 0x93, 0xef, 0x93, 0x1b,
	0x2b, 0x8f, 0x74, 0xf1, 0x1e, 0x10, 0x24, 0x80, 0x11, 0x8f, 0xda, 0xaf, 0xaf, 0xe6, 0x69, 0xc0,
	0x8b, 0x18, 0xd5, 0xbd, 0x89, 0x8a, 0x0b, 0xf0, 0xa8, 0x5b, 0x8a, 0x8e, 0x58, 0x21, 0x8b, 0x17,
	0x60, 0x9c, 0xd2, 0xe3, 0xc7, 0x5a, 0x22, 0xdd, 0xde, 0x7b, 0x23, 0xf2, 0x74, 0x3e, 0x47, 0x59,
];

/// Name of the reserved entry-tree object whose children enumerate the
/// companion blob's (offset, length) pairs.
pub const FILE_INFO_NAME: &str = "file_info";

/// Name prefix marking the one subfile eligible for substitution.
pub const ROM_PREFIX: &str = "system/roms/";

/// Maximum nesting depth the tree decoder accepts. Real archives nest a
/// handful of levels; anything near this is hostile input.
pub const MAX_DEPTH: usize = 64;
