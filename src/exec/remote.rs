//! Remote execution through the cluster CLI
//!
//! Runs `<cli> [--context C] [--namespace N] exec -i TARGET [-c CONTAINER] -- argv...`
//! as a local child process and pipes the streams through.

use async_trait::async_trait;
use tracing::debug;

use super::{run_process, BoxedReader, OutputStream, RemoteExecutor};
use crate::config::ClusterConfig;
use crate::error::ExecError;

/// Remote executor bound to one target (and optionally one container)
#[derive(Debug, Clone)]
pub struct ClusterExecutor {
	cluster: ClusterConfig,
	target: String,
	container: Option<String>,
}

impl ClusterExecutor {
	pub fn new(cluster: ClusterConfig, target: impl Into<String>, container: Option<String>) -> Self {
		ClusterExecutor { cluster, target: target.into(), container }
	}

	pub fn target(&self) -> &str {
		&self.target
	}

	/// Arguments passed to the cluster CLI for `argv`
	pub fn cli_args(&self, argv: &[String]) -> Vec<String> {
		let mut args = self.cluster.global_args();
		args.push("exec".to_string());
		args.push("-i".to_string());
		args.push(self.target.clone());
		if let Some(container) = &self.container {
			args.push("-c".to_string());
			args.push(container.clone());
		}
		args.push("--".to_string());
		args.extend(argv.iter().cloned());
		args
	}
}

#[async_trait]
impl RemoteExecutor for ClusterExecutor {
	async fn execute(
		&self,
		argv: &[String],
		stdin: Option<BoxedReader>,
		stdout: OutputStream<'_>,
		stderr: OutputStream<'_>,
	) -> Result<(), ExecError> {
		let args = self.cli_args(argv);
		debug!("Remote exec on {}: {}", self.target, argv.join(" "));
		let mut cmd = tokio::process::Command::new(&self.cluster.command);
		cmd.args(&args);
		let command_line = format!("{} exec {} -- {}", self.cluster.command, self.target, argv.join(" "));
		run_process(cmd, &command_line, stdin, stdout, stderr).await
	}
}


// vim: ts=4
