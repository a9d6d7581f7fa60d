//! Configuration for podsync
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (Config::default())
//! 2. Config file (~/.config/podsync/config.toml, or --config)
//! 3. Environment variables (PODSYNC_* prefix)
//! 4. CLI flags (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::strategies::StrategyKind;
use crate::validation::{validate_config, ValidationError, Validator};

// ============================================================================
// MAIN CONFIGURATION STRUCT
// ============================================================================

/// Configuration for podsync transfers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	/// How the cluster CLI is invoked for exec and port-forward
	pub cluster: ClusterConfig,

	/// Local rsync binary
	pub rsync_command: String,

	/// Strategy used when --strategy is not given
	pub strategy: StrategyKind,

	/// Log level (trace, debug, info, warn, error)
	pub log_level: String,

	/// Directory for the tar staging file (system temp dir if unset)
	pub temp_dir: Option<PathBuf>,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			cluster: ClusterConfig::default(),
			rsync_command: "rsync".to_string(),
			strategy: StrategyKind::Auto,
			log_level: "warn".to_string(),
			temp_dir: None,
		}
	}
}

// ============================================================================
// NESTED CONFIGURATION STRUCTS
// ============================================================================

/// Cluster CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterConfig {
	/// CLI binary providing `exec` and `port-forward` (e.g. kubectl, oc)
	pub command: String,

	/// Namespace of the target (CLI default if unset)
	pub namespace: Option<String>,

	/// Kubeconfig context (CLI default if unset)
	pub context: Option<String>,
}

impl Default for ClusterConfig {
	fn default() -> Self {
		ClusterConfig { command: "kubectl".to_string(), namespace: None, context: None }
	}
}

impl ClusterConfig {
	/// Global flags placed before the CLI subcommand
	pub fn global_args(&self) -> Vec<String> {
		let mut args = Vec::new();
		if let Some(context) = &self.context {
			args.push("--context".to_string());
			args.push(context.clone());
		}
		if let Some(namespace) = &self.namespace {
			args.push("--namespace".to_string());
			args.push(namespace.clone());
		}
		args
	}
}

// ============================================================================
// LOADING
// ============================================================================

impl Config {
	/// Default config file location
	pub fn default_path() -> Option<PathBuf> {
		if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
			return Some(PathBuf::from(dir).join("podsync").join("config.toml"));
		}
		std::env::var_os("HOME")
			.map(|home| PathBuf::from(home).join(".config").join("podsync").join("config.toml"))
	}

	/// Load config from file and environment
	///
	/// An explicitly given path must exist; the default location is optional.
	pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
		let mut config = match path {
			Some(path) => Self::from_file(path)?,
			None => match Self::default_path() {
				Some(default) if default.is_file() => Self::from_file(&default)?,
				_ => Config::default(),
			},
		};
		config.apply_env(|var| std::env::var(var).ok())?;
		Ok(config)
	}

	/// Parse a TOML config file
	pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
		let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.display().to_string(),
			source,
		})?;
		Self::from_toml_str(&text, &path.display().to_string())
	}

	/// Parse TOML text; `origin` names the source in errors
	pub fn from_toml_str(text: &str, origin: &str) -> Result<Config, ConfigError> {
		toml::from_str(text)
			.map_err(|e| ConfigError::Parse { path: origin.to_string(), message: e.to_string() })
	}

	/// Apply PODSYNC_* overrides using the given variable lookup
	pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(command) = lookup("PODSYNC_CLUSTER_COMMAND") {
			self.cluster.command = command;
		}
		if let Some(namespace) = lookup("PODSYNC_NAMESPACE") {
			self.cluster.namespace = Some(namespace);
		}
		if let Some(context) = lookup("PODSYNC_CONTEXT") {
			self.cluster.context = Some(context);
		}
		if let Some(rsync) = lookup("PODSYNC_RSYNC") {
			self.rsync_command = rsync;
		}
		if let Some(strategy) = lookup("PODSYNC_STRATEGY") {
			self.strategy = StrategyKind::from_str(&strategy).map_err(|message| {
				ConfigError::Env { var: "PODSYNC_STRATEGY".to_string(), message }
			})?;
		}
		if let Some(level) = lookup("PODSYNC_LOG") {
			self.log_level = level;
		}
		if let Some(dir) = lookup("PODSYNC_TMPDIR") {
			self.temp_dir = Some(PathBuf::from(dir));
		}
		Ok(())
	}
}

impl Validator for Config {
	fn validate(&self) -> Result<(), ValidationError> {
		validate_config(self)
	}
}


// vim: ts=4
