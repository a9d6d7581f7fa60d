//! Direct rsync strategy
//!
//! Runs the local rsync binary with `-e <rsh>`, where the remote shell is
//! this tool's own `rsh` subcommand. rsync then starts its server side
//! through the same remote executor every other strategy uses.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::CopyStrategy;
use crate::error::{CopyError, ExecError};
use crate::exec::{argv, execute_captured, LocalExecutor, RemoteExecutor};
use crate::types::TransferRequest;
use crate::validation::{validate_command, validate_present, ValidationError};

const NAME: &str = "rsync";

/// Flags shared by both rsync strategies, before any endpoint arguments
pub(crate) fn rsync_flags(request: &TransferRequest) -> Vec<String> {
	let mut flags = argv(["-a", "--blocking-io", "--omit-dir-times", "--numeric-ids"]);
	flags.push(if request.quiet { "-q" } else { "-v" }.to_string());
	if request.delete {
		flags.push("--delete".to_string());
	}

	let options = &request.options;
	if options.progress {
		flags.push("--progress".to_string());
	}
	if options.compress {
		flags.push("-z".to_string());
	}
	if options.no_perms {
		flags.push("--no-perms".to_string());
	}
	flags.extend(options.includes.iter().map(|p| format!("--include={}", p)));
	flags.extend(options.excludes.iter().map(|p| format!("--exclude={}", p)));
	flags
}

/// Whether `rsync` can be run inside the remote target
pub(crate) async fn remote_has_rsync(remote: &dyn RemoteExecutor) -> bool {
	let (result, captured) = execute_captured(remote, &argv(["rsync", "--version"])).await;
	match result {
		Ok(()) => true,
		Err(e) => {
			debug!("Remote rsync probe failed: {} {}", e, String::from_utf8_lossy(&captured.stderr));
			false
		}
	}
}

/// Turn the outcome of a local rsync run into a strategy result
///
/// A missing local binary is a setup failure. A non-zero exit is a setup
/// failure only if rsync turns out to be missing in the remote target;
/// otherwise it is the transfer failing.
pub(crate) async fn classify_rsync_result(
	strategy: &'static str,
	result: Result<(), ExecError>,
	stderr: Vec<u8>,
	remote: &dyn RemoteExecutor,
) -> Result<(), CopyError> {
	match result {
		Ok(()) => {
			if !stderr.is_empty() {
				let _ = tokio::io::stderr().write_all(&stderr).await;
			}
			Ok(())
		}
		Err(e) if e.is_not_found() => {
			Err(CopyError::setup(strategy, "rsync not available locally").with_output(stderr))
		}
		Err(e) if e.is_exit() => {
			if remote_has_rsync(remote).await {
				Err(CopyError::execution(strategy, e).with_output(stderr))
			} else {
				Err(CopyError::setup(strategy, "rsync not available in container").with_output(stderr))
			}
		}
		Err(e) => Err(CopyError::execution(strategy, e).with_output(stderr)),
	}
}

/// Local rsync talking to a remote rsync over `podsync rsh`
pub struct DirectRsyncStrategy {
	rsync_command: String,
	rsh_command: String,
	local: Option<Arc<dyn LocalExecutor>>,
	remote: Option<Arc<dyn RemoteExecutor>>,
}

impl DirectRsyncStrategy {
	pub fn new(rsync_command: impl Into<String>, rsh_command: impl Into<String>) -> Self {
		DirectRsyncStrategy {
			rsync_command: rsync_command.into(),
			rsh_command: rsh_command.into(),
			local: None,
			remote: None,
		}
	}

	pub fn with_local(mut self, local: Arc<dyn LocalExecutor>) -> Self {
		self.local = Some(local);
		self
	}

	pub fn with_remote(mut self, remote: Arc<dyn RemoteExecutor>) -> Self {
		self.remote = Some(remote);
		self
	}

	/// Full rsync argument list for `request`
	pub fn rsync_args(&self, request: &TransferRequest) -> Vec<String> {
		let mut args = rsync_flags(request);
		args.push("-e".to_string());
		args.push(self.rsh_command.clone());
		args.push(request.source.to_native_transfer_path());
		args.push(request.destination.to_native_transfer_path());
		args
	}
}

#[async_trait]
impl CopyStrategy for DirectRsyncStrategy {
	fn name(&self) -> &'static str {
		NAME
	}

	async fn copy(&self, request: &TransferRequest) -> Result<(), CopyError> {
		let (Some(local), Some(remote)) = (&self.local, &self.remote) else {
			return Err(CopyError::setup(NAME, "executors are not configured"));
		};

		let args = self.rsync_args(request);
		info!("Copying {} to {} with rsync", request.source, request.destination);
		let mut stdout = tokio::io::stdout();
		let mut stderr = Vec::<u8>::new();
		let result = local.run(&self.rsync_command, &args, &mut stdout, &mut stderr).await;
		classify_rsync_result(NAME, result, stderr, remote.as_ref()).await
	}

	fn validate(&self) -> Result<(), ValidationError> {
		let errors: Vec<ValidationError> = [
			validate_command("remote shell", &self.rsh_command),
			validate_present("local executor", &self.local),
			validate_present("remote executor", &self.remote),
		]
		.into_iter()
		.filter_map(Result::err)
		.collect();
		ValidationError::aggregate(errors)
	}
}


// vim: ts=4
