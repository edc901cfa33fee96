//! The outer container layer: prelude, cipher, compression.
//!
//! On disk a container is an 8-byte prelude (`mdf\0` magic plus the
//! little-endian uncompressed size) followed by the payload. For the
//! encrypted form (`.psb.m`, and every sealed subfile) the payload is
//! keystream-ciphered zlib; for the plain form (`.psb`) it is the decoded
//! buffer as-is. The logical name decides which form applies and keys the
//! cipher.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::format::{CONTAINER_MAGIC, PRELUDE_LENGTH};
use crate::keystream;

/// Whether a logical name denotes the plain (neither ciphered nor
/// compressed) container form.
pub fn is_plain(name: &str) -> bool {
	name.ends_with(".psb")
}

/// Compress a buffer with the container's zlib settings.
pub fn compress(buf: &[u8]) -> Result<Vec<u8>> {
	let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
	encoder.write_all(buf)?;
	Ok(encoder.finish()?)
}

/// Decompress a buffer, insisting on the size the prelude recorded.
pub fn decompress(buf: &[u8], expected_size: usize) -> Result<Vec<u8>> {
	let mut out = Vec::with_capacity(expected_size);
	ZlibDecoder::new(buf).read_to_end(&mut out)?;
	if out.len() != expected_size {
		return Err(Error::Compression(std::io::Error::other(format!(
			"expected {expected_size} decompressed bytes, got {}",
			out.len()
		))));
	}
	Ok(out)
}

/// Strip the container layers off a file, yielding the decoded buffer.
#[instrument(level = "debug", skip(container))]
pub fn unwrap(container: &[u8], logical_name: &str) -> Result<Vec<u8>> {
	let prelude = container
		.get(..PRELUDE_LENGTH)
		.ok_or(Error::Truncated { needed: PRELUDE_LENGTH, at: 0 })?;
	if prelude[..4] != CONTAINER_MAGIC {
		let mut found = [0u8; 4];
		found.copy_from_slice(&prelude[..4]);
		return Err(Error::BadMagic { found });
	}

	let expected_size =
		u32::from_le_bytes([prelude[4], prelude[5], prelude[6], prelude[7]]) as usize;
	let body = &container[PRELUDE_LENGTH..];

	if is_plain(logical_name) {
		debug!(size = body.len(), "plain container, no cipher or compression");
		return Ok(body.to_vec());
	}

	let mut body = body.to_vec();
	keystream::apply(&mut body, logical_name);
	let decoded = decompress(&body, expected_size)?;
	debug!(compressed = body.len(), decoded = decoded.len(), "unwrapped container");
	Ok(decoded)
}

/// Compress a buffer, prefix the prelude, and cipher everything past it,
/// keyed by `key_name`. This is the encrypted container form, and also how
/// individual subfiles are sealed inside the companion blob.
#[instrument(level = "debug", skip(decoded))]
pub fn seal(decoded: &[u8], key_name: &str) -> Result<Vec<u8>> {
	let compressed = compress(decoded)?;
	debug!(decoded = decoded.len(), compressed = compressed.len(), "sealed buffer");

	let mut out = Vec::with_capacity(PRELUDE_LENGTH + compressed.len());
	out.extend_from_slice(&CONTAINER_MAGIC);
	out.extend_from_slice(&(decoded.len() as u32).to_le_bytes());
	out.extend_from_slice(&compressed);
	keystream::apply(&mut out[PRELUDE_LENGTH..], key_name);
	Ok(out)
}

/// Wrap a decoded buffer back into a container file for `logical_name`.
pub fn wrap(decoded: &[u8], logical_name: &str) -> Result<Vec<u8>> {
	if is_plain(logical_name) {
		let mut out = Vec::with_capacity(PRELUDE_LENGTH + decoded.len());
		out.extend_from_slice(&CONTAINER_MAGIC);
		out.extend_from_slice(&(decoded.len() as u32).to_le_bytes());
		out.extend_from_slice(decoded);
		return Ok(out);
	}
	seal(decoded, logical_name)
}
