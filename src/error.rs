//! Error types for podsync operations

use std::error::Error;
use std::fmt;
use std::io;

use crate::validation::ValidationError;

/// Boxed error used as the cause of an execution failure
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Main error type returned by the sync engine
#[derive(Debug)]
pub enum SyncError {
	/// Malformed `TARGET:/path` argument
	Parse(PathSpecError),

	/// Request rejected before any transfer started
	Validation(ValidationError),

	/// A strategy (or the whole chain) failed
	Copy(CopyError),

	/// Configuration could not be loaded
	Config(ConfigError),

	/// I/O error
	Io(io::Error),
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::Parse(e) => write!(f, "{}", e),
			SyncError::Validation(e) => write!(f, "{}", e),
			SyncError::Copy(e) => write!(f, "{}", e),
			SyncError::Config(e) => write!(f, "{}", e),
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
		}
	}
}

impl Error for SyncError {}

impl From<PathSpecError> for SyncError {
	fn from(e: PathSpecError) -> Self {
		SyncError::Parse(e)
	}
}

impl From<ValidationError> for SyncError {
	fn from(e: ValidationError) -> Self {
		SyncError::Validation(e)
	}
}

impl From<CopyError> for SyncError {
	fn from(e: CopyError) -> Self {
		SyncError::Copy(e)
	}
}

impl From<ConfigError> for SyncError {
	fn from(e: ConfigError) -> Self {
		SyncError::Config(e)
	}
}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

/// Path argument parse errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSpecError {
	/// Nothing to parse
	Empty,

	/// `target:` with nothing after the colon
	MissingPath { target: String },

	/// Prefix before the colon is not a valid target name
	InvalidTarget { target: String, reason: String },
}

impl fmt::Display for PathSpecError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PathSpecError::Empty => write!(f, "Path argument is empty"),
			PathSpecError::MissingPath { target } => {
				write!(f, "Missing path after '{}:'", target)
			}
			PathSpecError::InvalidTarget { target, reason } => {
				write!(f, "Invalid target name '{}': {}", target, reason)
			}
		}
	}
}

impl Error for PathSpecError {}

/// Errors from running a local or remote process
#[derive(Debug)]
pub enum ExecError {
	/// Process ran and exited unsuccessfully
	Exit { command: String, code: Option<i32> },

	/// Process could not be started
	Spawn { command: String, source: io::Error },

	/// Stream plumbing failed while the process ran
	Io { command: String, source: io::Error },
}

impl ExecError {
	/// True for the process-exit classification
	pub fn is_exit(&self) -> bool {
		matches!(self, ExecError::Exit { .. })
	}

	/// True when the program itself was not found
	pub fn is_not_found(&self) -> bool {
		matches!(self, ExecError::Spawn { source, .. } if source.kind() == io::ErrorKind::NotFound)
	}

	/// Exit code of the process, if it exited with one
	pub fn exit_code(&self) -> Option<i32> {
		match self {
			ExecError::Exit { code, .. } => *code,
			_ => None,
		}
	}
}

impl fmt::Display for ExecError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ExecError::Exit { command, code: Some(code) } => {
				write!(f, "'{}' exited with status {}", command, code)
			}
			ExecError::Exit { command, code: None } => {
				write!(f, "'{}' was terminated by a signal", command)
			}
			ExecError::Spawn { command, source } => {
				write!(f, "Failed to spawn '{}': {}", command, source)
			}
			ExecError::Io { command, source } => {
				write!(f, "I/O error while running '{}': {}", command, source)
			}
		}
	}
}

impl Error for ExecError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			ExecError::Exit { .. } => None,
			ExecError::Spawn { source, .. } | ExecError::Io { source, .. } => Some(source),
		}
	}
}

/// Remote free-port discovery errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortError {
	/// Every sampled candidate was already in use
	Exhausted { attempts: usize },
}

impl fmt::Display for PortError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PortError::Exhausted { attempts } => {
				write!(f, "could not find a free port after {} attempts", attempts)
			}
		}
	}
}

impl Error for PortError {}

/// Outcome of one failed strategy attempt
///
/// `Setup` means the strategy cannot run in this environment and the chain
/// may fall through to the next one. `Execution` means the transfer itself
/// failed and is final. Both carry the stderr captured during the attempt.
#[derive(Debug)]
pub enum CopyError {
	Setup { strategy: &'static str, reason: String, output: Vec<u8> },
	Execution { strategy: &'static str, source: BoxError, output: Vec<u8> },
}

impl CopyError {
	pub fn setup(strategy: &'static str, reason: impl Into<String>) -> Self {
		CopyError::Setup { strategy, reason: reason.into(), output: Vec::new() }
	}

	pub fn execution(strategy: &'static str, source: impl Into<BoxError>) -> Self {
		CopyError::Execution { strategy, source: source.into(), output: Vec::new() }
	}

	/// Attach captured diagnostic output to the error
	pub fn with_output(mut self, captured: Vec<u8>) -> Self {
		match &mut self {
			CopyError::Setup { output, .. } | CopyError::Execution { output, .. } => {
				*output = captured
			}
		}
		self
	}

	pub fn is_setup(&self) -> bool {
		matches!(self, CopyError::Setup { .. })
	}

	pub fn strategy(&self) -> &'static str {
		match self {
			CopyError::Setup { strategy, .. } | CopyError::Execution { strategy, .. } => strategy,
		}
	}

	/// Stderr captured while the strategy ran
	pub fn output(&self) -> &[u8] {
		match self {
			CopyError::Setup { output, .. } | CopyError::Execution { output, .. } => output,
		}
	}
}

impl fmt::Display for CopyError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CopyError::Setup { strategy, reason, .. } => {
				write!(f, "{} strategy unavailable: {}", strategy, reason)
			}
			CopyError::Execution { strategy, source, .. } => {
				write!(f, "{} copy failed: {}", strategy, source)
			}
		}
	}
}

impl Error for CopyError {}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
	/// Config file could not be read
	Read { path: String, source: io::Error },

	/// Config file is not valid TOML for [`crate::config::Config`]
	Parse { path: String, message: String },

	/// Environment variable has an unusable value
	Env { var: String, message: String },
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::Read { path, source } => {
				write!(f, "Failed to read config {}: {}", path, source)
			}
			ConfigError::Parse { path, message } => {
				write!(f, "Invalid config {}: {}", path, message)
			}
			ConfigError::Env { var, message } => write!(f, "Invalid value for {}: {}", var, message),
		}
	}
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_exec_error_classification() {
		let exit = ExecError::Exit { command: "rsync".to_string(), code: Some(23) };
		assert!(exit.is_exit());
		assert_eq!(exit.exit_code(), Some(23));
		assert!(!exit.is_not_found());

		let missing = ExecError::Spawn {
			command: "rsync".to_string(),
			source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
		};
		assert!(!missing.is_exit());
		assert!(missing.is_not_found());
	}

	#[test]
	fn test_copy_error_keeps_output() {
		let err = CopyError::setup("rsync", "rsync not available in container")
			.with_output(b"sh: rsync: not found\n".to_vec());
		assert!(err.is_setup());
		assert_eq!(err.strategy(), "rsync");
		assert_eq!(err.output(), b"sh: rsync: not found\n");
		assert!(err.to_string().contains("rsync not available in container"));
	}

	#[test]
	fn test_execution_error_display() {
		let err = CopyError::execution("tar", "tar extraction failed");
		assert!(!err.is_setup());
		assert_eq!(err.to_string(), "tar copy failed: tar extraction failed");
	}
}

// vim: ts=4
