//! Include/exclude matching for locally built archives

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

use crate::types::RsyncOptions;
use crate::validation::ValidationError;

/// Pattern matcher using globset, rsync-style
///
/// A pattern matches either the whole path relative to the transfer root
/// or just its last component. Include patterns win over excludes.
pub struct PatternMatcher {
	exclude_set: GlobSet,
	include_set: GlobSet,
}

impl PatternMatcher {
	pub fn new(excludes: &[String], includes: &[String]) -> Result<Self, ValidationError> {
		Ok(PatternMatcher {
			exclude_set: Self::build_glob_set(excludes)?,
			include_set: Self::build_glob_set(includes)?,
		})
	}

	pub fn from_options(options: &RsyncOptions) -> Result<Self, ValidationError> {
		Self::new(&options.excludes, &options.includes)
	}

	fn build_glob_set(patterns: &[String]) -> Result<GlobSet, ValidationError> {
		let mut builder = GlobSetBuilder::new();
		for pattern in patterns {
			// rsync marks directory-only patterns with a trailing slash
			let trimmed = pattern.trim_end_matches('/');
			let glob = Glob::new(trimmed).map_err(|e| {
				ValidationError::ConfigError(format!("Invalid pattern '{}': {}", pattern, e))
			})?;
			builder.add(glob);
		}
		builder
			.build()
			.map_err(|e| ValidationError::ConfigError(format!("Failed to build pattern set: {}", e)))
	}

	fn matches(set: &GlobSet, path: &Path) -> bool {
		set.is_match(path) || path.file_name().is_some_and(|name| set.is_match(name))
	}

	/// Whether `path` (relative to the transfer root) is left out
	pub fn is_excluded(&self, path: &Path) -> bool {
		if Self::matches(&self.include_set, path) {
			return false;
		}
		Self::matches(&self.exclude_set, path)
	}
}


// vim: ts=4
