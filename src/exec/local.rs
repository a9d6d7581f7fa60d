//! Local program execution via tokio::process

use async_trait::async_trait;
use tracing::debug;

use super::{run_process, LocalExecutor, OutputStream};
use crate::error::ExecError;

/// Runs local programs as child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
	pub fn new() -> Self {
		ProcessExecutor
	}
}

#[async_trait]
impl LocalExecutor for ProcessExecutor {
	async fn run(
		&self,
		program: &str,
		args: &[String],
		stdout: OutputStream<'_>,
		stderr: OutputStream<'_>,
	) -> Result<(), ExecError> {
		debug!("Running {} {}", program, args.join(" "));
		let mut cmd = tokio::process::Command::new(program);
		cmd.args(args);
		run_process(cmd, program, None, stdout, stderr).await
	}
}

#[cfg(all(test, unix))]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_process_executor_runs_program() {
		let mut out = Vec::<u8>::new();
		ProcessExecutor::new()
			.run("echo", &["hi".to_string()], &mut out, &mut Vec::<u8>::new())
			.await
			.unwrap();
		assert_eq!(out, b"hi\n");
	}
}

// vim: ts=4
