//! The XOR keystream cipher protecting containers and subfiles.
//!
//! Key material is a function of the file's logical name alone: the
//! lowercased basename is appended to a fixed seed literal, MD5-digested, and
//! the digest's four little-endian words seed an MT19937 generator whose
//! first twenty outputs form an 80-byte keystream. The cipher is a cyclic
//! XOR of that keystream, so applying it twice with the same name is the
//! identity.
//!
//! One logical name gets special treatment: the historical `alldata.psb.m`
//! keystream is a fixed constant rather than a derived one.

use tracing::trace;

use crate::format::{HASH_SEED, KEY_LENGTH, SENTINEL_KEY, SENTINEL_NAME};

mod mt19937;

use mt19937::Mt19937;

/// Derive the 80-byte keystream for a logical file name.
///
/// Pure: the same name always yields the same keystream. Any name is
/// accepted; a name without a path separator is its own basename.
pub fn derive_key(name: &str) -> [u8; KEY_LENGTH] {
	if name.ends_with(SENTINEL_NAME) {
		trace!(%name, "sentinel name, using fixed keystream");
		return SENTINEL_KEY;
	}

	let basename = name
		.rsplit(['/', '\\'])
		.next()
		.unwrap_or(name)
		.to_lowercase();

	let mut seed = Vec::with_capacity(HASH_SEED.len() + basename.len());
	seed.extend_from_slice(HASH_SEED);
	seed.extend_from_slice(basename.as_bytes());
	let digest = md5::compute(&seed);

	let words = [
		u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]),
		u32::from_le_bytes([digest[4], digest[5], digest[6], digest[7]]),
		u32::from_le_bytes([digest[8], digest[9], digest[10], digest[11]]),
		u32::from_le_bytes([digest[12], digest[13], digest[14], digest[15]]),
	];

	let mut mt = Mt19937::from_key(&words);
	let mut key = [0u8; KEY_LENGTH];
	for chunk in key.chunks_exact_mut(4) {
		chunk.copy_from_slice(&mt.next_u32().to_le_bytes());
	}

	trace!(%name, %basename, "derived keystream");
	key
}

/// XOR a buffer in place with the keystream for `name`, cycling over the 80
/// key bytes. Symmetric: the same call enciphers and deciphers.
pub fn apply(buf: &mut [u8], name: &str) {
	let key = derive_key(name);
	for (i, byte) in buf.iter_mut().enumerate() {
		*byte ^= key[i % KEY_LENGTH];
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn derivation_is_deterministic() {
		let a = derive_key("system/roms/game.bin");
		let b = derive_key("system/roms/game.bin");
		assert_eq!(a, b);
	}

	#[test]
	fn basename_and_case_are_what_matter() {
		// only the lowercased last path component feeds the hash
		let plain = derive_key("game.bin");
		assert_eq!(derive_key("some/where/GAME.BIN"), plain);
		assert_eq!(derive_key(r"other\place\Game.Bin"), plain);
		assert_ne!(derive_key("other.bin"), plain);
	}

	#[test]
	fn sentinel_name_uses_fixed_key() {
		assert_eq!(derive_key("alldata.psb.m"), SENTINEL_KEY);
		assert_eq!(derive_key("patch/alldata.psb.m"), SENTINEL_KEY);
	}

	#[test]
	fn apply_is_self_inverse() {
		let original: Vec<u8> = (0..=255).cycle().take(1000).collect();
		let mut buf = original.clone();
		apply(&mut buf, "somefile.psb.m");
		assert_ne!(buf, original);
		apply(&mut buf, "somefile.psb.m");
		assert_eq!(buf, original);
	}

	#[test]
	fn empty_name_and_empty_buffer_are_fine() {
		let key = derive_key("");
		assert_eq!(key.len(), KEY_LENGTH);
		let mut empty: [u8; 0] = [];
		apply(&mut empty, "");
	}
}
