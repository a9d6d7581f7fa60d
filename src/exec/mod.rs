//! Process execution seams
//!
//! Strategies never spawn processes themselves. They go through two traits:
//! [`RemoteExecutor`] runs an argv inside the remote target, and
//! [`LocalExecutor`] runs a local program (rsync). The binary wires in the
//! cluster-CLI and tokio-process implementations; tests substitute fakes.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::error::ExecError;

pub mod local;
pub mod remote;

pub use local::ProcessExecutor;
pub use remote::ClusterExecutor;

/// Owned input stream fed to a process
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Output stream a process writes into
pub type OutputStream<'a> = &'a mut (dyn AsyncWrite + Send + Unpin);

/// Runs commands inside the remote target
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
	/// Run `argv` remotely, feeding `stdin` if given and streaming output
	///
	/// A non-zero remote exit is reported as [`ExecError::Exit`].
	async fn execute(
		&self,
		argv: &[String],
		stdin: Option<BoxedReader>,
		stdout: OutputStream<'_>,
		stderr: OutputStream<'_>,
	) -> Result<(), ExecError>;
}

/// Runs local programs
#[async_trait]
pub trait LocalExecutor: Send + Sync {
	/// Run `program` with `args`, streaming its output
	async fn run(
		&self,
		program: &str,
		args: &[String],
		stdout: OutputStream<'_>,
		stderr: OutputStream<'_>,
	) -> Result<(), ExecError>;
}

/// Output collected from a remote command
#[derive(Debug, Default)]
pub struct Captured {
	pub stdout: Vec<u8>,
	pub stderr: Vec<u8>,
}

impl Captured {
	pub fn stdout_text(&self) -> String {
		String::from_utf8_lossy(&self.stdout).into_owned()
	}
}

/// Run a remote command without input and collect both output streams
///
/// The captured output is returned on failure too, so callers can attach
/// it to the error they report.
pub async fn execute_captured(
	executor: &dyn RemoteExecutor,
	argv: &[String],
) -> (Result<(), ExecError>, Captured) {
	let mut captured = Captured::default();
	let result = executor.execute(argv, None, &mut captured.stdout, &mut captured.stderr).await;
	(result, captured)
}

/// Build an owned argv from string literals
pub fn argv<I, S>(parts: I) -> Vec<String>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	parts.into_iter().map(Into::into).collect()
}

/// Spawn `cmd` and pump its streams until it exits
///
/// stdout and stderr are copied concurrently. Input is fed from a separate
/// task; once the process has exited, any unfinished input is abandoned.
pub(crate) async fn run_process(
	mut cmd: tokio::process::Command,
	command_line: &str,
	stdin: Option<BoxedReader>,
	stdout: OutputStream<'_>,
	stderr: OutputStream<'_>,
) -> Result<(), ExecError> {
	cmd.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(true);

	let mut child = cmd
		.spawn()
		.map_err(|source| ExecError::Spawn { command: command_line.to_string(), source })?;

	let feeder = match (stdin, child.stdin.take()) {
		(Some(mut input), Some(mut pipe)) => Some(tokio::spawn(async move {
			let copied = tokio::io::copy(&mut input, &mut pipe).await;
			let _ = pipe.shutdown().await;
			copied.map(|_| ())
		})),
		_ => None,
	};

	let io_error = |source: std::io::Error| ExecError::Io { command: command_line.to_string(), source };
	let mut child_out = child.stdout.take().ok_or_else(|| {
		io_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout unavailable"))
	})?;
	let mut child_err = child.stderr.take().ok_or_else(|| {
		io_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stderr unavailable"))
	})?;

	let (out_copy, err_copy) = tokio::join!(
		tokio::io::copy(&mut child_out, &mut *stdout),
		tokio::io::copy(&mut child_err, &mut *stderr)
	);
	let status = child.wait().await.map_err(io_error)?;
	out_copy.map_err(io_error)?;
	err_copy.map_err(io_error)?;
	stdout.flush().await.map_err(io_error)?;
	stderr.flush().await.map_err(io_error)?;

	if !status.success() {
		if let Some(feeder) = feeder {
			feeder.abort();
		}
		return Err(ExecError::Exit { command: command_line.to_string(), code: status.code() });
	}

	if let Some(feeder) = feeder {
		if feeder.is_finished() {
			match feeder.await {
				Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(io_error(e)),
				_ => {}
			}
		} else {
			feeder.abort();
		}
	}
	Ok(())
}


// vim: ts=4
