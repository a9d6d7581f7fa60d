//! Per-invocation transfer request

use crate::pathspec::PathSpec;
use crate::validation::{validate_mixed_locality, ValidationError, Validator};

/// Extra rsync-style options forwarded to the transfer tools
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RsyncOptions {
	/// Show per-file progress
	pub progress: bool,

	/// Compress file data in transit
	pub compress: bool,

	/// Do not transfer permissions
	pub no_perms: bool,

	/// Patterns that override excludes
	pub includes: Vec<String>,

	/// Patterns to leave out of the transfer
	pub excludes: Vec<String>,
}

/// One copy between a local directory and a remote one
///
/// Built once from command-line input and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
	pub source: PathSpec,
	pub destination: PathSpec,

	/// Remove destination entries that are absent from the source
	pub delete: bool,

	/// Suppress per-file output
	pub quiet: bool,

	/// Container within the remote target
	pub container: Option<String>,

	pub options: RsyncOptions,
}

impl TransferRequest {
	pub fn new(source: PathSpec, destination: PathSpec) -> Self {
		TransferRequest {
			source,
			destination,
			delete: false,
			quiet: false,
			container: None,
			options: RsyncOptions::default(),
		}
	}

	pub fn delete(mut self, delete: bool) -> Self {
		self.delete = delete;
		self
	}

	pub fn quiet(mut self, quiet: bool) -> Self {
		self.quiet = quiet;
		self
	}

	pub fn container(mut self, container: Option<String>) -> Self {
		self.container = container;
		self
	}

	pub fn options(mut self, options: RsyncOptions) -> Self {
		self.options = options;
		self
	}

	/// Name of the remote target, whichever side it is on
	pub fn remote_target(&self) -> Option<&str> {
		self.source.target.as_deref().or(self.destination.target.as_deref())
	}

	/// The endpoint living inside the remote target
	pub fn remote_spec(&self) -> Option<&PathSpec> {
		[&self.source, &self.destination].into_iter().find(|spec| spec.is_remote())
	}
}

impl Validator for TransferRequest {
	/// Same-locality pairs are rejected first, then local directories are
	/// checked for existence.
	fn validate(&self) -> Result<(), ValidationError> {
		validate_mixed_locality(self.source.is_remote(), self.destination.is_remote())?;
		self.source.validate()?;
		self.destination.validate()
	}
}


// vim: ts=4
