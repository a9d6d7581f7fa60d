//! Path validation functions

use std::fs;
use std::path::Path;

use super::ValidationError;

/// Longest target name accepted (DNS-1123 subdomain)
pub const MAX_TARGET_NAME_LEN: usize = 253;

/// Check a remote target name
///
/// Target names follow DNS-1123 subdomain rules: lowercase alphanumerics,
/// `-` and `.`, starting and ending with an alphanumeric character.
///
/// # Returns
/// `Ok(())` if valid, otherwise the reason it was rejected
pub fn validate_target_name(name: &str) -> Result<(), String> {
	if name.is_empty() {
		return Err("name must not be empty".to_string());
	}
	if name.len() > MAX_TARGET_NAME_LEN {
		return Err(format!("name must be no more than {} characters", MAX_TARGET_NAME_LEN));
	}

	let is_alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
	if let Some(bad) = name.chars().find(|&c| !(is_alnum(c) || c == '-' || c == '.')) {
		return Err(format!(
			"invalid character '{}': only lowercase alphanumerics, '-' and '.' are allowed",
			bad
		));
	}
	let first = name.chars().next().unwrap_or('-');
	let last = name.chars().last().unwrap_or('-');
	if !is_alnum(first) || !is_alnum(last) {
		return Err("name must start and end with an alphanumeric character".to_string());
	}
	Ok(())
}

/// Validate that a local path exists and is a directory
pub fn validate_local_dir(path: &Path) -> Result<(), ValidationError> {
	match fs::metadata(path) {
		Ok(meta) if meta.is_dir() => Ok(()),
		Ok(_) => Err(ValidationError::PathError(format!(
			"{} is not a directory",
			path.display()
		))),
		Err(e) => Err(ValidationError::PathError(format!("{}: {}", path.display(), e))),
	}
}

/// Validate that exactly one side of a transfer is remote
pub fn validate_mixed_locality(
	source_remote: bool,
	destination_remote: bool,
) -> Result<(), ValidationError> {
	match (source_remote, destination_remote) {
		(true, true) => Err(ValidationError::PathError(
			"source and destination cannot both be remote".to_string(),
		)),
		(false, false) => Err(ValidationError::PathError(
			"source and destination cannot both be local".to_string(),
		)),
		_ => Ok(()),
	}
}


// vim: ts=4
