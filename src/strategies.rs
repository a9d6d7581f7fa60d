//! Copy strategy selection
//!
//! The user-facing `--strategy` values and the fallback order each one
//! expands to.
//!
//! Each enum includes:
//! - FromStr implementation for CLI and config parsing
//! - Display matching the accepted CLI spelling

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// STRATEGY KIND
// ============================================================================

/// Which transfer mechanism to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
	/// Try rsync, then rsync-daemon, then tar (default)
	#[default]
	Auto,

	/// Local rsync driving the remote one through `podsync rsh`
	Rsync,

	/// Ephemeral rsync daemon in the target, reached through a port-forward
	RsyncDaemon,

	/// Tar stream through the remote executor
	Tar,
}

impl FromStr for StrategyKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"" | "auto" => Ok(Self::Auto),
			"rsync" => Ok(Self::Rsync),
			"rsync-daemon" | "rsyncd" => Ok(Self::RsyncDaemon),
			"tar" => Ok(Self::Tar),
			_ => Err(format!(
				"Unknown copy strategy: {}. Valid options: rsync, rsync-daemon, tar (or empty for auto)",
				s
			)),
		}
	}
}

impl std::fmt::Display for StrategyKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Auto => write!(f, "auto"),
			Self::Rsync => write!(f, "rsync"),
			Self::RsyncDaemon => write!(f, "rsync-daemon"),
			Self::Tar => write!(f, "tar"),
		}
	}
}

impl StrategyKind {
	/// Concrete strategies to try, in priority order
	pub fn expand(self) -> Vec<StrategyKind> {
		match self {
			Self::Auto => vec![Self::Rsync, Self::RsyncDaemon, Self::Tar],
			other => vec![other],
		}
	}
}


// vim: ts=4
