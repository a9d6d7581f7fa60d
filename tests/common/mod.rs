//! Shared fakes for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;

use podsync::exec::{BoxedReader, OutputStream, RemoteExecutor};
use podsync::ExecError;

/// "Remote" executor that runs argv on this host
///
/// Stands in for a container where the local filesystem is the remote one.
pub struct HostExecutor;

#[async_trait]
impl RemoteExecutor for HostExecutor {
	async fn execute(
		&self,
		argv: &[String],
		stdin: Option<BoxedReader>,
		stdout: OutputStream<'_>,
		stderr: OutputStream<'_>,
	) -> Result<(), ExecError> {
		let command = argv.join(" ");
		let io_error = |source: std::io::Error| ExecError::Io { command: command.clone(), source };

		let mut child = tokio::process::Command::new(&argv[0])
			.args(&argv[1..])
			.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.spawn()
			.map_err(|source| ExecError::Spawn { command: command.clone(), source })?;

		let pipe = child.stdin.take();
		let mut child_out = child.stdout.take().unwrap();
		let mut child_err = child.stderr.take().unwrap();
		let feed = async move {
			if let (Some(mut input), Some(mut pipe)) = (stdin, pipe) {
				tokio::io::copy(&mut input, &mut pipe).await?;
				pipe.shutdown().await?;
			}
			Ok::<(), std::io::Error>(())
		};

		let (fed, out, err) = tokio::join!(
			feed,
			tokio::io::copy(&mut child_out, &mut *stdout),
			tokio::io::copy(&mut child_err, &mut *stderr)
		);
		fed.map_err(io_error)?;
		out.map_err(io_error)?;
		err.map_err(io_error)?;
		stdout.flush().await.map_err(io_error)?;

		let status = child.wait().await.map_err(io_error)?;
		if !status.success() {
			return Err(ExecError::Exit { command, code: status.code() });
		}
		Ok(())
	}
}

/// `app/a.txt`, `app/debug.log`, `app/sub/b.txt` under `root`
pub fn sample_tree(root: &Path) {
	let app = root.join("app");
	fs::create_dir_all(app.join("sub")).unwrap();
	fs::write(app.join("a.txt"), "alpha").unwrap();
	fs::write(app.join("debug.log"), "noise").unwrap();
	fs::write(app.join("sub/b.txt"), "beta").unwrap();
}

pub fn path_str(path: &Path) -> String {
	path.to_string_lossy().into_owned()
}

// vim: ts=4
