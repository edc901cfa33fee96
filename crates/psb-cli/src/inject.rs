use std::{
	fs,
	path::{Path, PathBuf},
};

use miette::{IntoDiagnostic, Result};
use psb::{archive::Psb, container, repack};
use tracing::info;

use crate::args::Args;

/// The whole pipeline: load, substitute, re-pack, emit.
pub(crate) fn inject(args: Args) -> Result<()> {
	if !args.output.to_string_lossy().ends_with(".psb.m") {
		// historical behaviour: not an error, just a refusal
		println!("please use an output path ending in \".psb.m\".");
		return Ok(());
	}

	info!(path = ?args.container, "read container");
	let container_bytes = fs::read(&args.container).into_diagnostic()?;
	let input_name = args.container.to_string_lossy();

	let decoded = container::unwrap(&container_bytes, &input_name)?;
	dump(&args, "original-decoded.psb", &decoded)?;
	let mut psb = Psb::parse(&decoded)?;

	let blob_path = companion_path(&args.container);
	info!(path = ?blob_path, "read companion blob");
	let blob = fs::read(&blob_path).into_diagnostic()?;
	psb.attach_blob(&blob)?;

	info!(path = ?args.rom, "read replacement payload");
	let rom = fs::read(&args.rom).into_diagnostic()?;

	let index = repack::rom_index(&psb)?;
	repack::replace_subfile(&mut psb, index, &rom)?;

	let assembled = psb.assemble()?;
	dump(&args, "injected-decoded.psb", &assembled)?;

	let output_name = args.output.to_string_lossy();
	let container_out = container::wrap(&assembled, &output_name)?;
	info!(path = ?args.output, size = container_out.len(), "write container");
	fs::write(&args.output, container_out).into_diagnostic()?;

	let blob_out_path = companion_path(&args.output);
	let blob_out = psb.blob();
	info!(path = ?blob_out_path, size = blob_out.len(), "write companion blob");
	fs::write(&blob_out_path, blob_out).into_diagnostic()?;

	println!("Injection finished.");
	Ok(())
}

/// The `.bin` path belonging to a container path.
fn companion_path(container: &Path) -> PathBuf {
	let name = container.to_string_lossy();
	let stem = name
		.strip_suffix(".psb.m")
		.or_else(|| name.strip_suffix(".psb"))
		.unwrap_or(&name);
	PathBuf::from(format!("{stem}.bin"))
}

fn dump(args: &Args, name: &str, bytes: &[u8]) -> Result<()> {
	if let Some(dir) = &args.dump_decoded {
		let path = dir.join(name);
		info!(path = ?path, size = bytes.len(), "dump intermediate buffer");
		fs::write(&path, bytes).into_diagnostic()?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn companion_paths() {
		assert_eq!(
			companion_path(Path::new("x/alldata.psb.m")),
			PathBuf::from("x/alldata.bin")
		);
		assert_eq!(
			companion_path(Path::new("alldata.psb")),
			PathBuf::from("alldata.bin")
		);
	}
}
