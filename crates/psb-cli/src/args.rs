use std::path::PathBuf;

use clap::{Parser, ValueHint};

/// Replace the ROM subfile inside a PSB container.
///
/// Reads a container and its companion `.bin` blob, swaps the one subfile
/// whose name carries the `system/roms/` prefix for the given payload, and
/// writes a re-packed container and blob pair.
#[derive(Debug, Clone, Parser)]
#[command(name = "psbtool", bin_name = "psbtool", author, version)]
#[cfg_attr(debug_assertions, command(before_help = "⚠ DEBUG BUILD ⚠"))]
pub struct Args {
	/// Container to inject into; its companion `.bin` must sit next to it.
	#[arg(
		value_hint = ValueHint::FilePath,
		value_name = "CONTAINER",
	)]
	pub container: PathBuf,

	/// Replacement ROM payload.
	#[arg(
		value_hint = ValueHint::FilePath,
		value_name = "ROM",
	)]
	pub rom: PathBuf,

	/// Output container path; must end in `.psb.m`. The companion blob is
	/// written next to it.
	#[arg(
		value_hint = ValueHint::AnyPath,
		value_name = "OUTPUT",
	)]
	pub output: PathBuf,

	/// Also write the decoded (pre-compression) buffers into this directory,
	/// for inspection.
	#[arg(
		long,
		value_hint = ValueHint::DirPath,
		value_name = "DIR",
	)]
	pub dump_decoded: Option<PathBuf>,

	/// Verbosity. Repeat for more: warnings, info, debug, trace.
	#[arg(long, short, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Write logs to this file instead of the terminal.
	#[arg(
		long,
		value_hint = ValueHint::FilePath,
		value_name = "PATH",
	)]
	pub log_file: Option<PathBuf>,
}
