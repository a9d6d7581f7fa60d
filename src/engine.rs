//! Sync engine
//!
//! Validates a request, assembles the strategy chain for the chosen
//! strategy kind and runs it. Captured output of a failed final attempt is
//! written to stderr here; strategies themselves never print diagnostics.

use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::config::{ClusterConfig, Config};
use crate::error::SyncError;
use crate::exec::{LocalExecutor, RemoteExecutor};
use crate::forward::PortForwarder;
use crate::portfind::FreePortFinder;
use crate::strategies::StrategyKind;
use crate::strategy::{
	CopyStrategy, DaemonRsyncStrategy, DirectRsyncStrategy, StrategyChain, TarTransferStrategy,
};
use crate::types::TransferRequest;
use crate::validation::Validator;

/// External capabilities handed to the strategies
///
/// Missing collaborators are reported by chain validation rather than at
/// construction.
#[derive(Clone, Default)]
pub struct Collaborators {
	pub local: Option<Arc<dyn LocalExecutor>>,
	pub remote: Option<Arc<dyn RemoteExecutor>>,
	pub forwarder: Option<Arc<dyn PortForwarder>>,
}

pub struct SyncEngine {
	config: Config,
	rsh_command: String,
	collaborators: Collaborators,
	ports: Arc<FreePortFinder>,
}

impl SyncEngine {
	pub fn new(config: Config, rsh_command: impl Into<String>, collaborators: Collaborators) -> Self {
		SyncEngine {
			config,
			rsh_command: rsh_command.into(),
			collaborators,
			ports: Arc::new(FreePortFinder::from_entropy()),
		}
	}

	/// Replace the port finder, e.g. with a seeded one
	pub fn with_port_finder(mut self, ports: Arc<FreePortFinder>) -> Self {
		self.ports = ports;
		self
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Chain of concrete strategies for `kind`, in fallback order
	pub fn build_chain(&self, kind: StrategyKind) -> StrategyChain {
		StrategyChain::new(kind.expand().into_iter().map(|k| self.build_strategy(k)).collect())
	}

	fn build_strategy(&self, kind: StrategyKind) -> Box<dyn CopyStrategy> {
		let Collaborators { local, remote, forwarder } = &self.collaborators;
		match kind {
			StrategyKind::Auto => Box::new(self.build_chain(kind)),
			StrategyKind::Rsync => {
				let mut strategy = DirectRsyncStrategy::new(&self.config.rsync_command, &self.rsh_command);
				if let Some(local) = local {
					strategy = strategy.with_local(local.clone());
				}
				if let Some(remote) = remote {
					strategy = strategy.with_remote(remote.clone());
				}
				Box::new(strategy)
			}
			StrategyKind::RsyncDaemon => {
				let mut strategy = DaemonRsyncStrategy::new(&self.config.rsync_command, self.ports.clone());
				if let Some(local) = local {
					strategy = strategy.with_local(local.clone());
				}
				if let Some(remote) = remote {
					strategy = strategy.with_remote(remote.clone());
				}
				if let Some(forwarder) = forwarder {
					strategy = strategy.with_forwarder(forwarder.clone());
				}
				Box::new(strategy)
			}
			StrategyKind::Tar => {
				let mut strategy = TarTransferStrategy::new().with_temp_dir(self.config.temp_dir.clone());
				if let Some(remote) = remote {
					strategy = strategy.with_remote(remote.clone());
				}
				Box::new(strategy)
			}
		}
	}

	/// Copy `request` using the strategies `kind` expands to
	pub async fn run(&self, request: &TransferRequest, kind: StrategyKind) -> Result<(), SyncError> {
		request.validate()?;
		let chain = self.build_chain(kind);
		chain.validate()?;

		info!(
			"Syncing {} to {} (strategies: {})",
			request.source,
			request.destination,
			chain.names().join(", ")
		);
		if let Err(e) = chain.copy(request).await {
			if !e.output().is_empty() {
				let mut stderr = tokio::io::stderr();
				stderr.write_all(e.output()).await?;
				stderr.flush().await?;
			}
			return Err(e.into());
		}
		Ok(())
	}
}

/// Remote shell command handed to rsync's `-e`
///
/// Re-invokes this binary's `rsh` subcommand with the same cluster
/// selection, so rsync's server side runs through the same executor.
pub fn rsh_command(
	exe: &Path,
	cluster: &ClusterConfig,
	config_file: Option<&Path>,
	container: Option<&str>,
) -> String {
	let mut parts = vec![exe.to_string_lossy().into_owned()];
	if let Some(config_file) = config_file {
		parts.push("--config".to_string());
		parts.push(config_file.to_string_lossy().into_owned());
	}
	if let Some(context) = &cluster.context {
		parts.push("--context".to_string());
		parts.push(context.clone());
	}
	if let Some(namespace) = &cluster.namespace {
		parts.push("-n".to_string());
		parts.push(namespace.clone());
	}
	parts.push("rsh".to_string());
	if let Some(container) = container {
		parts.push("-c".to_string());
		parts.push(container.to_string());
	}
	shell_words::join(parts)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ExecError;
	use crate::exec::{BoxedReader, OutputStream};
	use crate::pathspec::PathSpec;
	use std::sync::Mutex;

	#[derive(Default)]
	struct RecordingRemote {
		calls: Mutex<Vec<Vec<String>>>,
	}

	#[async_trait::async_trait]
	impl RemoteExecutor for RecordingRemote {
		async fn execute(
			&self,
			argv: &[String],
			_stdin: Option<BoxedReader>,
			_stdout: OutputStream<'_>,
			_stderr: OutputStream<'_>,
		) -> Result<(), ExecError> {
			self.calls.lock().unwrap().push(argv.to_vec());
			Ok(())
		}
	}

	fn engine(collaborators: Collaborators) -> SyncEngine {
		SyncEngine::new(Config::default(), "podsync rsh", collaborators)
			.with_port_finder(Arc::new(FreePortFinder::seeded(9)))
	}

	#[test]
	fn test_build_chain_order() {
		let engine = engine(Collaborators::default());
		assert_eq!(engine.build_chain(StrategyKind::Auto).names(), vec!["rsync", "rsync-daemon", "tar"]);
		assert_eq!(engine.build_chain(StrategyKind::Tar).names(), vec!["tar"]);
	}

	#[tokio::test]
	async fn test_same_locality_rejected_before_transfer() {
		let remote = Arc::new(RecordingRemote::default());
		let engine = engine(Collaborators { remote: Some(remote.clone()), ..Default::default() });
		let request = TransferRequest::new(PathSpec::local("."), PathSpec::local("."));

		let err = engine.run(&request, StrategyKind::Tar).await.unwrap_err();
		assert!(matches!(err, SyncError::Validation(_)));
		assert!(remote.calls.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_missing_collaborators_fail_validation() {
		let engine = engine(Collaborators::default());
		let request = TransferRequest::new(PathSpec::remote("mypod", "/data"), PathSpec::local("."));

		let err = engine.run(&request, StrategyKind::Auto).await.unwrap_err();
		let msg = err.to_string();
		assert!(msg.contains("local executor is not configured"));
		assert!(msg.contains("port forwarder is not configured"));
	}

	#[test]
	fn test_rsh_command() {
		let cluster = ClusterConfig {
			command: "kubectl".to_string(),
			namespace: Some("dev".to_string()),
			context: Some("my ctx".to_string()),
		};
		assert_eq!(
			rsh_command(Path::new("/usr/bin/podsync"), &cluster, None, Some("app")),
			"/usr/bin/podsync --context 'my ctx' -n dev rsh -c app"
		);
		assert_eq!(
			rsh_command(Path::new("/opt/pod sync"), &ClusterConfig::default(), Some(Path::new("/etc/p.toml")), None),
			"'/opt/pod sync' --config /etc/p.toml rsh"
		);
	}
}

// vim: ts=4
