//! Source/destination path arguments
//!
//! A path argument is either a plain local path or `TARGET:/path` naming a
//! directory inside a remote target.

use std::fmt;
use std::path::Path;

use crate::error::PathSpecError;
use crate::validation::{validate_local_dir, validate_target_name, ValidationError};

/// One endpoint of a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSpec {
	/// Remote target name, `None` for the local filesystem
	pub target: Option<String>,

	/// Path on the endpoint, exactly as given
	pub path: String,
}

impl PathSpec {
	pub fn local(path: impl Into<String>) -> Self {
		PathSpec { target: None, path: path.into() }
	}

	pub fn remote(target: impl Into<String>, path: impl Into<String>) -> Self {
		PathSpec { target: Some(target.into()), path: path.into() }
	}

	/// Parse a command-line path argument
	///
	/// Splits on the first `:`. Without one, or when the prefix is a drive
	/// letter on Windows, the whole string is a local path.
	pub fn parse(raw: &str) -> Result<Self, PathSpecError> {
		if raw.is_empty() {
			return Err(PathSpecError::Empty);
		}
		let Some((prefix, path)) = raw.split_once(':') else {
			return Ok(PathSpec::local(raw));
		};
		if is_drive_letter(prefix) {
			return Ok(PathSpec::local(raw));
		}

		validate_target_name(prefix).map_err(|reason| PathSpecError::InvalidTarget {
			target: prefix.to_string(),
			reason,
		})?;
		if path.is_empty() {
			return Err(PathSpecError::MissingPath { target: prefix.to_string() });
		}
		Ok(PathSpec::remote(prefix, path))
	}

	pub fn is_remote(&self) -> bool {
		self.target.is_some()
	}

	pub fn is_local(&self) -> bool {
		self.target.is_none()
	}

	/// Render back into command-line form
	pub fn render(&self) -> String {
		match &self.target {
			Some(target) => format!("{}:{}", target, self.path),
			None => self.path.clone(),
		}
	}

	/// Render in the form the external rsync binary expects
	pub fn to_native_transfer_path(&self) -> String {
		match &self.target {
			Some(_) => self.render(),
			None if cfg!(windows) => cygwin_path(&self.path),
			None => self.path.clone(),
		}
	}

	/// Whether the path ends in a separator ("contents of" semantics)
	pub fn has_trailing_separator(&self) -> bool {
		self.path.ends_with('/') || (self.is_local() && cfg!(windows) && self.path.ends_with('\\'))
	}

	/// Path with trailing separators removed; the root stays `/`
	pub fn trimmed_path(&self) -> &str {
		let trimmed = self.path.trim_end_matches(|c: char| c == '/' || (cfg!(windows) && c == '\\'));
		if trimmed.is_empty() && !self.path.is_empty() {
			&self.path[..1]
		} else {
			trimmed
		}
	}

	/// Last component of the path, if it has one
	pub fn base_name(&self) -> Option<&str> {
		let trimmed = self.trimmed_path();
		let name = trimmed.rsplit(|c: char| c == '/' || (cfg!(windows) && c == '\\')).next()?;
		match name {
			"" | "." | ".." => None,
			name => Some(name),
		}
	}

	/// Directory containing the path (`.` for a bare relative name)
	pub fn parent(&self) -> String {
		let trimmed = self.trimmed_path();
		match trimmed.rfind('/') {
			Some(0) => "/".to_string(),
			Some(idx) => trimmed[..idx].to_string(),
			None => ".".to_string(),
		}
	}

	/// Check the endpoint before a transfer
	///
	/// Local paths must be existing directories; remote paths are not
	/// checked client-side.
	pub fn validate(&self) -> Result<(), ValidationError> {
		if self.is_remote() {
			return Ok(());
		}
		validate_local_dir(Path::new(&self.path))
	}
}

impl fmt::Display for PathSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.render())
	}
}

/// Whether `prefix` is a drive letter on this host
fn is_drive_letter(prefix: &str) -> bool {
	cfg!(windows) && prefix.len() == 1 && prefix.chars().all(|c| c.is_ascii_alphabetic())
}

/// Rewrite a Windows path into the cygwin form rsync builds understand
///
/// `C:\x\y` becomes `/cygdrive/c/x/y`; paths without a drive only get
/// their separators flipped.
pub fn cygwin_path(path: &str) -> String {
	let flipped = path.replace('\\', "/");
	let bytes = flipped.as_bytes();
	if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
		let drive = (bytes[0] as char).to_ascii_lowercase();
		let rest = flipped[2..].trim_start_matches('/');
		if rest.is_empty() {
			return format!("/cygdrive/{}", drive);
		}
		return format!("/cygdrive/{}/{}", drive, rest);
	}
	flipped
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_local() {
		assert_eq!(PathSpec::parse("./app").unwrap(), PathSpec::local("./app"));
		assert_eq!(PathSpec::parse("/var/data/").unwrap(), PathSpec::local("/var/data/"));
	}

	#[test]
	fn test_parse_remote() {
		let spec = PathSpec::parse("mypod:/data").unwrap();
		assert_eq!(spec.target.as_deref(), Some("mypod"));
		assert_eq!(spec.path, "/data");
		assert!(spec.is_remote());
	}

	#[test]
	fn test_parse_splits_on_first_colon() {
		let spec = PathSpec::parse("web-1:/srv/a:b").unwrap();
		assert_eq!(spec.target.as_deref(), Some("web-1"));
		assert_eq!(spec.path, "/srv/a:b");
	}

	#[test]
	fn test_parse_invalid_target() {
		let err = PathSpec::parse("My_Pod:/data").unwrap_err();
		assert!(matches!(err, PathSpecError::InvalidTarget { ref target, .. } if target == "My_Pod"));
	}

	#[test]
	fn test_parse_empty_and_missing_path() {
		assert_eq!(PathSpec::parse(""), Err(PathSpecError::Empty));
		assert_eq!(
			PathSpec::parse("mypod:"),
			Err(PathSpecError::MissingPath { target: "mypod".to_string() })
		);
	}

	#[cfg(not(windows))]
	#[test]
	fn test_single_letter_prefix_is_a_target_off_windows() {
		let spec = PathSpec::parse("c:/data").unwrap();
		assert_eq!(spec.target.as_deref(), Some("c"));
	}

	#[test]
	fn test_round_trip_remote() {
		for raw in ["mypod:/data", "a:relative/dir/", "api.v2-7d9f:/"] {
			let spec = PathSpec::parse(raw).unwrap();
			assert_eq!(PathSpec::parse(&spec.render()).unwrap(), spec);
			assert_eq!(spec.render(), raw);
		}
	}

	#[cfg(not(windows))]
	#[test]
	fn test_round_trip_local() {
		for raw in ["./app/", "/tmp/x", "relative"] {
			let spec = PathSpec::parse(raw).unwrap();
			assert_eq!(PathSpec::parse(&spec.render()).unwrap(), spec);
		}
	}

	#[test]
	fn test_native_transfer_path() {
		assert_eq!(PathSpec::remote("mypod", "/data").to_native_transfer_path(), "mypod:/data");
		#[cfg(not(windows))]
		assert_eq!(PathSpec::local("./app/").to_native_transfer_path(), "./app/");
	}

	#[test]
	fn test_cygwin_path() {
		assert_eq!(cygwin_path(r"C:\x\y"), "/cygdrive/c/x/y");
		assert_eq!(cygwin_path(r"d:\work\"), "/cygdrive/d/work/");
		assert_eq!(cygwin_path("C:"), "/cygdrive/c");
		assert_eq!(cygwin_path(r"rel\dir"), "rel/dir");
	}

	#[test]
	fn test_trailing_separator_and_names() {
		let spec = PathSpec::local("./app/");
		assert!(spec.has_trailing_separator());
		assert_eq!(spec.trimmed_path(), "./app");
		assert_eq!(spec.base_name(), Some("app"));
		assert_eq!(spec.parent(), ".");

		let spec = PathSpec::remote("mypod", "/srv/data");
		assert!(!spec.has_trailing_separator());
		assert_eq!(spec.base_name(), Some("data"));
		assert_eq!(spec.parent(), "/srv");

		let root = PathSpec::remote("mypod", "/");
		assert_eq!(root.trimmed_path(), "/");
		assert_eq!(root.base_name(), None);
		assert_eq!(PathSpec::remote("mypod", "/data").parent(), "/");
	}

	#[test]
	fn test_validate_only_checks_local() {
		assert!(PathSpec::remote("mypod", "/does/not/exist").validate().is_ok());
		assert!(PathSpec::local("/does/not/exist/anywhere").validate().is_err());
		let dir = tempfile::TempDir::new().unwrap();
		assert!(PathSpec::local(dir.path().to_string_lossy()).validate().is_ok());
	}
}

// vim: ts=4
