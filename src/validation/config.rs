//! Configuration validation functions

use super::ValidationError;
use crate::config::Config;

/// Validate a command name is usable
pub fn validate_command(what: &str, command: &str) -> Result<(), ValidationError> {
	if command.trim().is_empty() {
		return Err(ValidationError::ConfigError(format!("{} command must not be empty", what)));
	}
	Ok(())
}

/// Validate that a strategy collaborator is configured
pub fn validate_present<T>(what: &str, value: &Option<T>) -> Result<(), ValidationError> {
	if value.is_none() {
		return Err(ValidationError::ConfigError(format!("{} is not configured", what)));
	}
	Ok(())
}

/// Validate a loaded configuration
pub fn validate_config(config: &Config) -> Result<(), ValidationError> {
	let mut errors = Vec::new();
	if let Err(e) = validate_command("cluster", &config.cluster.command) {
		errors.push(e);
	}
	if let Err(e) = validate_command("rsync", &config.rsync_command) {
		errors.push(e);
	}
	ValidationError::aggregate(errors)
}


// vim: ts=4
