use std::{
	env::var,
	fs::File,
	io::{Error, Result},
	sync::Mutex,
};

use tracing::info;

use crate::args::Args;

pub fn from_env() -> Result<bool> {
	if var("RUST_LOG").is_ok() {
		tracing_subscriber::fmt::try_init().map_err(Error::other)?;
		Ok(true)
	} else {
		Ok(false)
	}
}

pub fn from_args(args: &Args) -> Result<()> {
	let verbosity = args.verbose;
	if verbosity > 0 {
		let log_file = args.log_file.as_ref().map(File::create).transpose()?;

		let mut builder = tracing_subscriber::fmt().with_env_filter(match verbosity {
			0 => unreachable!("checked by if earlier"),
			1 => "warn",
			2 => "info",
			3 => "debug",
			_ => "trace",
		});

		if verbosity > 2 {
			use tracing_subscriber::fmt::format::FmtSpan;
			builder = builder.with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);
		}

		match if let Some(writer) = log_file {
			builder.json().with_writer(Mutex::new(writer)).try_init()
		} else if verbosity > 3 {
			builder.pretty().try_init()
		} else {
			builder.try_init()
		} {
			Ok(_) => info!("logging initialised"),
			Err(e) => eprintln!("Failed to initialise logging, continuing with none\n{e}"),
		}
	}

	Ok(())
}
