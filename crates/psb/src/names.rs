//! Reconstruction of the archive's name table.
//!
//! Names are not stored flat: the region holds three integer arrays that
//! encode a character trie. Each name is recovered by chasing a chain
//! backward from its start node: at node `a`, the emitted character is
//! `a - offsets[jumps[a]]` and the walk continues at `jumps[a]` until it
//! reaches node 0. Characters come out last-to-first and are reversed at the
//! end.
//!
//! Names are byte strings; nothing here cares about their encoding.

use tracing::trace;

use crate::error::{Error, Result};

/// Reconstruct all names from the three table arrays.
///
/// `starts` holds one chain-start node per name, in table order. A chain
/// that walks out of bounds, emits an impossible character, or runs longer
/// than the table itself (a cycle) is a fatal format error.
pub fn decode(offsets: &[u64], jumps: &[u64], starts: &[u64]) -> Result<Vec<Vec<u8>>> {
	let mut names = Vec::with_capacity(starts.len());

	for (index, &start) in starts.iter().enumerate() {
		let mut chars = Vec::new();
		let mut a = start;

		while a != 0 {
			if chars.len() > jumps.len() {
				// longer than the node table: the chain must be cyclic
				return Err(Error::NameChain { index });
			}

			let b = *jumps
				.get(a as usize)
				.ok_or(Error::NameChain { index })?;
			let c = *offsets
				.get(b as usize)
				.ok_or(Error::NameChain { index })?;
			let d = a
				.checked_sub(c)
				.ok_or(Error::NameChain { index })?;
			if d > u64::from(u8::MAX) {
				return Err(Error::NameChain { index });
			}

			chars.push(d as u8);
			a = b;
		}

		chars.reverse();
		trace!(index, name = %String::from_utf8_lossy(&chars), "reconstructed name");
		names.push(chars);
	}

	Ok(names)
}
