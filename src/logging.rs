//! Logging setup
//!
//! Control the log level with `-v` flags, the `logLevel` config key or the
//! `RUST_LOG` environment variable, which wins over both:
//!
//! ```bash
//! RUST_LOG=debug podsync rsync ./app mypod:/data
//! RUST_LOG=podsync::strategy=trace podsync rsync ./app mypod:/data
//! ```

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Filter directive for a `-v` count, falling back to `default_level`
pub fn level_directive(default_level: &str, verbosity: u8) -> String {
	match verbosity {
		0 => default_level.to_string(),
		1 => "info".to_string(),
		2 => "debug".to_string(),
		_ => "trace".to_string(),
	}
}

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
	/// Errors to stderr, everything else to stdout
	Split,

	/// Everything to stderr; stdout carries protocol data
	Stderr,
}

/// Initialize the tracing subscriber with environment filter support.
pub fn init_tracing(default_level: &str, verbosity: u8, target: LogTarget) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(level_directive(default_level, verbosity)));
	let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

	match target {
		LogTarget::Split => builder
			.with_writer(std::io::stderr.with_max_level(Level::ERROR).or_else(std::io::stdout))
			.init(),
		LogTarget::Stderr => builder.with_writer(std::io::stderr).init(),
	}
}


// vim: ts=4
