//! Centralized validation for podsync
//!
//! This module provides common validation functions and traits for:
//! - Path validation (target names, local directories, locality of a pair)
//! - Configuration validation (commands, strategy collaborators)

use std::error::Error;
use std::fmt;

pub mod config;
pub mod path;

pub use config::*;
pub use path::*;

/// Generic validation error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
	/// Invalid configuration
	ConfigError(String),
	/// Invalid path
	PathError(String),
	/// Several problems found at once (e.g. across chain members)
	Multiple(Vec<ValidationError>),
	/// Other validation error
	Other(String),
}

impl ValidationError {
	/// Collapse a list of problems into one error, or none
	pub fn aggregate(mut errors: Vec<ValidationError>) -> Result<(), ValidationError> {
		match errors.len() {
			0 => Ok(()),
			1 => Err(errors.remove(0)),
			_ => Err(ValidationError::Multiple(errors)),
		}
	}
}

impl fmt::Display for ValidationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ValidationError::ConfigError(msg) => write!(f, "Config validation error: {}", msg),
			ValidationError::PathError(msg) => write!(f, "Path validation error: {}", msg),
			ValidationError::Multiple(errors) => {
				let joined: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
				write!(f, "{}", joined.join("; "))
			}
			ValidationError::Other(msg) => write!(f, "Validation error: {}", msg),
		}
	}
}

impl Error for ValidationError {}

/// Trait for validatable types
pub trait Validator {
	/// Validate this type
	/// Returns Ok(()) if valid, Err(ValidationError) if invalid
	fn validate(&self) -> Result<(), ValidationError>;
}


// vim: ts=4
