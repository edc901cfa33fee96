//! Subfile substitution and offset re-flow.
//!
//! Replacing a subfile changes its sealed length, which can invalidate every
//! offset after it. The re-flow pass walks the file-info index forward and
//! re-places each successor at the lowest aligned position that fits:
//! offsets never overlap the previous subfile and never waste a full
//! alignment unit of padding.

use tracing::{debug, info, instrument};

use crate::archive::Psb;
use crate::container;
use crate::error::{Error, Result};
use crate::format::ALIGNMENT;
use crate::tree::{FileInfo, Tree};

/// Find the one subfile eligible for substitution.
///
/// Exactly the first file-info entry whose name carries the reserved ROM
/// prefix; an archive without one has nothing to inject into.
pub fn rom_index(psb: &Psb) -> Result<usize> {
	psb.file_info
		.iter()
		.position(FileInfo::is_rom)
		.ok_or(Error::NoRomSubfile)
}

/// Replace a subfile's payload.
///
/// The raw payload is sealed the same way the container itself is: zlib,
/// the 8-byte prelude, then the keystream keyed by the subfile's own
/// resolved name. The new length is written through to the entry tree
/// before successor offsets are re-flowed.
#[instrument(level = "debug", skip(psb, payload))]
pub fn replace_subfile(psb: &mut Psb, index: usize, payload: &[u8]) -> Result<()> {
	if index >= psb.subfiles.len() {
		return Err(Error::SubfileIndex {
			index,
			count: psb.subfiles.len(),
		});
	}

	let name = String::from_utf8_lossy(&psb.file_info[index].name).into_owned();
	info!(index, %name, payload = payload.len(), "replacing subfile");

	let sealed = container::seal(payload, &name)?;
	debug!(sealed = sealed.len(), was = psb.subfile_length(index), "sealed replacement");

	psb.set_subfile_length(index, sealed.len() as u64);
	psb.subfiles[index] = sealed;
	reflow_offsets(&mut psb.tree, &psb.file_info, index);
	Ok(())
}

/// Re-flow subfile offsets from `from` onward.
///
/// For each successor, if its offset dips below the previous subfile's end
/// or sits a full alignment unit (or more) past it, it moves to the
/// previous end rounded up to the next alignment boundary (exactly the
/// previous end when that is already aligned).
pub fn reflow_offsets(tree: &mut Tree, infos: &[FileInfo], from: usize) {
	if infos.is_empty() {
		return;
	}
	for i in from..infos.len() - 1 {
		let end = tree.integer(infos[i].offset) as u64 + tree.integer(infos[i].length) as u64;
		let next = tree.integer(infos[i + 1].offset) as u64;
		if next < end || next >= end + ALIGNMENT {
			let placed = end.next_multiple_of(ALIGNMENT);
			debug!(index = i + 1, from = next, to = placed, "re-flowed subfile offset");
			tree.set_integer(infos[i + 1].offset, placed as i64);
		}
	}
}
