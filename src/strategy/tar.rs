//! Tar strategy
//!
//! Streams a tar archive through the remote executor. It only needs `sh`
//! and `tar` in the remote target, so it is the last resort of the chain.
//! The archive is staged in a local temp file between packing and
//! unpacking; the local side uses the `tar` crate directly.

use async_trait::async_trait;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::filter::PatternMatcher;
use super::CopyStrategy;
use crate::error::CopyError;
use crate::exec::{argv, RemoteExecutor};
use crate::pathspec::PathSpec;
use crate::types::TransferRequest;
use crate::validation::{validate_present, ValidationError};

const NAME: &str = "tar";

/// Where a source is archived from and under which top-level name
///
/// A trailing separator (or a path with no usable last component) archives
/// the directory's contents; otherwise its basename becomes the single
/// top-level entry.
fn archive_layout(spec: &PathSpec) -> (String, Option<String>) {
	match spec.base_name() {
		Some(name) if !spec.has_trailing_separator() => (spec.trimmed_path().to_string(), Some(name.to_string())),
		_ => (spec.trimmed_path().to_string(), None),
	}
}

/// `sh -c "rm -rf <dir>/*"`
pub fn remote_clear_argv(spec: &PathSpec) -> Vec<String> {
	argv(["sh".to_string(), "-c".to_string(), format!("rm -rf {}/*", shell_words::quote(spec.trimmed_path()))])
}

/// `tar -C <dir> -cf - [--exclude=...] <.|basename>`
pub fn remote_archive_argv(spec: &PathSpec, request: &TransferRequest) -> Vec<String> {
	let (dir, member) = match archive_layout(spec) {
		(_, Some(name)) => (spec.parent(), name),
		(dir, None) => (dir, ".".to_string()),
	};
	let mut args = argv(["tar", "-C"]);
	args.push(dir);
	args.push("-cf".to_string());
	args.push("-".to_string());
	args.extend(request.options.excludes.iter().map(|p| format!("--exclude={}", p)));
	args.push(member);
	args
}

/// `tar -C <dest> -x [-v] -f -`
pub fn remote_extract_argv(spec: &PathSpec, request: &TransferRequest) -> Vec<String> {
	let mut args = argv(["tar", "-C", spec.trimmed_path(), "-x"]);
	if !request.quiet {
		args.push("-v".to_string());
	}
	if request.options.no_perms {
		args.push("--no-same-permissions".to_string());
	}
	args.push("-f".to_string());
	args.push("-".to_string());
	args
}

/// Write an archive of `root` into `out`
///
/// Symlinks are stored as links. Entries are added in name order and
/// anything that is not a file, directory or symlink is skipped.
pub fn build_local_archive(root: &Path, top: Option<&str>, matcher: &PatternMatcher, out: &Path) -> io::Result<()> {
	let mut builder = tar::Builder::new(File::create(out)?);
	builder.follow_symlinks(false);

	let prefix = match top {
		Some(top) => {
			builder.append_dir(top, root)?;
			PathBuf::from(top)
		}
		None => PathBuf::new(),
	};
	append_tree(&mut builder, root, &prefix, Path::new(""), matcher)?;

	let file = builder.into_inner()?;
	file.sync_all()
}

fn append_tree(
	builder: &mut tar::Builder<File>,
	dir: &Path,
	prefix: &Path,
	rel: &Path,
	matcher: &PatternMatcher,
) -> io::Result<()> {
	let mut entries = std::fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
	entries.sort_by_key(|entry| entry.file_name());

	for entry in entries {
		let rel_path = rel.join(entry.file_name());
		if matcher.is_excluded(&rel_path) {
			debug!("Excluded {}", rel_path.display());
			continue;
		}

		let file_type = entry.file_type()?;
		let path = entry.path();
		let name = prefix.join(&rel_path);
		if file_type.is_dir() {
			builder.append_dir(&name, &path)?;
			append_tree(builder, &path, prefix, &rel_path, matcher)?;
		} else if file_type.is_file() || file_type.is_symlink() {
			builder.append_path_with_name(&path, &name)?;
		} else {
			debug!("Skipping special file {}", path.display());
		}
	}
	Ok(())
}

/// Unpack `archive` into `dest`, returning the entry names
pub fn extract_local_archive(archive: &Path, dest: &Path, preserve_permissions: bool) -> io::Result<Vec<String>> {
	let mut archive = tar::Archive::new(File::open(archive)?);
	archive.set_overwrite(true);
	archive.set_preserve_permissions(preserve_permissions);

	let mut names = Vec::new();
	for entry in archive.entries()? {
		let mut entry = entry?;
		let name = entry.path()?.display().to_string();
		entry.unpack_in(dest)?;
		names.push(name);
	}
	Ok(names)
}

/// Remove every entry of a local directory, keeping the directory
pub async fn clear_local_dir(dir: &Path) -> io::Result<()> {
	let mut entries = tokio::fs::read_dir(dir).await?;
	while let Some(entry) = entries.next_entry().await? {
		if entry.file_type().await?.is_dir() {
			tokio::fs::remove_dir_all(entry.path()).await?;
		} else {
			tokio::fs::remove_file(entry.path()).await?;
		}
	}
	Ok(())
}

fn failed(source: impl Into<crate::error::BoxError>) -> CopyError {
	CopyError::execution(NAME, source)
}

/// Copy through a tar stream over the remote executor
#[derive(Default)]
pub struct TarTransferStrategy {
	remote: Option<Arc<dyn RemoteExecutor>>,
	temp_dir: Option<PathBuf>,
}

impl TarTransferStrategy {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_remote(mut self, remote: Arc<dyn RemoteExecutor>) -> Self {
		self.remote = Some(remote);
		self
	}

	/// Directory for the staging archive, system default if `None`
	pub fn with_temp_dir(mut self, dir: Option<PathBuf>) -> Self {
		self.temp_dir = dir;
		self
	}

	fn staging_file(&self) -> io::Result<NamedTempFile> {
		let mut builder = tempfile::Builder::new();
		builder.prefix("podsync-").suffix(".tar");
		match &self.temp_dir {
			Some(dir) => builder.tempfile_in(dir),
			None => builder.tempfile(),
		}
	}

	async fn clear_destination(&self, dest: &PathSpec, remote: &dyn RemoteExecutor) -> Result<(), CopyError> {
		debug!("Clearing destination {}", dest);
		if dest.is_local() {
			return clear_local_dir(Path::new(&dest.path)).await.map_err(failed);
		}

		let mut stdout = Vec::<u8>::new();
		let mut stderr = Vec::<u8>::new();
		remote
			.execute(&remote_clear_argv(dest), None, &mut stdout, &mut stderr)
			.await
			.map_err(|e| failed(e).with_output(stderr))
	}

	async fn pack(&self, request: &TransferRequest, remote: &dyn RemoteExecutor, staging: &Path) -> Result<(), CopyError> {
		let source = &request.source;
		if source.is_local() {
			let matcher = PatternMatcher::from_options(&request.options).map_err(failed)?;
			let (root, top) = archive_layout(source);
			let out = staging.to_path_buf();
			return tokio::task::spawn_blocking(move || {
				build_local_archive(Path::new(&root), top.as_deref(), &matcher, &out)
			})
			.await
			.map_err(failed)?
			.map_err(failed);
		}

		if !request.options.includes.is_empty() {
			debug!("Include patterns are not applied to remote tar sources");
		}
		let mut file = tokio::fs::File::create(staging).await.map_err(failed)?;
		let mut stderr = Vec::<u8>::new();
		let result = remote
			.execute(&remote_archive_argv(source, request), None, &mut file, &mut stderr)
			.await;
		if let Err(e) = result {
			return Err(failed(e).with_output(stderr));
		}
		file.flush().await.map_err(failed)?;
		file.sync_all().await.map_err(failed)
	}

	async fn unpack(&self, request: &TransferRequest, remote: &dyn RemoteExecutor, staging: &Path) -> Result<(), CopyError> {
		let dest = &request.destination;
		if dest.is_local() {
			let archive = staging.to_path_buf();
			let dir = PathBuf::from(&dest.path);
			let preserve = !request.options.no_perms;
			let names = tokio::task::spawn_blocking(move || extract_local_archive(&archive, &dir, preserve))
				.await
				.map_err(failed)?
				.map_err(failed)?;
			if !request.quiet {
				let listing: String = names.iter().map(|name| format!("{}\n", name)).collect();
				let mut stdout = tokio::io::stdout();
				stdout.write_all(listing.as_bytes()).await.map_err(failed)?;
				stdout.flush().await.map_err(failed)?;
			}
			return Ok(());
		}

		let input = tokio::fs::File::open(staging).await.map_err(failed)?;
		let mut stdout = tokio::io::stdout();
		let mut stderr = Vec::<u8>::new();
		remote
			.execute(&remote_extract_argv(dest, request), Some(Box::new(input)), &mut stdout, &mut stderr)
			.await
			.map_err(|e| failed(e).with_output(stderr))
	}
}

#[async_trait]
impl CopyStrategy for TarTransferStrategy {
	fn name(&self) -> &'static str {
		NAME
	}

	async fn copy(&self, request: &TransferRequest) -> Result<(), CopyError> {
		let Some(remote) = &self.remote else {
			return Err(CopyError::setup(NAME, "remote executor is not configured"));
		};

		if request.delete {
			self.clear_destination(&request.destination, remote.as_ref()).await?;
		}

		// Removed when dropped, whichever way this returns
		let staging = self.staging_file().map_err(failed)?;
		info!("Copying {} to {} with tar", request.source, request.destination);
		self.pack(request, remote.as_ref(), staging.path()).await?;
		self.unpack(request, remote.as_ref(), staging.path()).await
	}

	fn validate(&self) -> Result<(), ValidationError> {
		validate_present("remote executor", &self.remote)
	}
}


// vim: ts=4
