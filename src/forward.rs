//! Local-to-remote TCP port forwarding
//!
//! A forward is requested with a stop channel. [`PortForwarder::forward_ports`]
//! returns as soon as the tunnel is ready or has failed; the tunnel itself
//! keeps running on a background task until the stop channel fires or its
//! sender is dropped.

use async_trait::async_trait;
use std::fmt;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::config::ClusterConfig;
use crate::error::ExecError;

/// Receiving side of a tunnel's stop channel
pub type StopSignal = oneshot::Receiver<()>;

/// One `local:remote` port pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
	pub local: u16,
	pub remote: u16,
}

impl fmt::Display for PortMapping {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.local, self.remote)
	}
}

/// Tunnels local ports to ports inside the remote target
#[async_trait]
pub trait PortForwarder: Send + Sync {
	/// Start forwarding `mappings` until `stop` fires
	///
	/// Returns once forwarding is ready (`Ok`) or failed to start (`Err`).
	/// A forwarder process that exits before becoming ready is reported as
	/// [`ExecError::Exit`].
	async fn forward_ports(&self, mappings: &[PortMapping], stop: StopSignal) -> Result<(), ExecError>;
}

/// An open tunnel owned by one transfer
///
/// Dropping the handle closes the stop channel, which tears the tunnel down.
#[derive(Debug)]
pub struct TunnelHandle {
	local_port: u16,
	stop: Option<oneshot::Sender<()>>,
}

impl TunnelHandle {
	/// Create a handle and the stop signal to hand to the forwarder
	pub fn new(local_port: u16) -> (Self, StopSignal) {
		let (tx, rx) = oneshot::channel();
		(TunnelHandle { local_port, stop: Some(tx) }, rx)
	}

	pub fn local_port(&self) -> u16 {
		self.local_port
	}

	/// Stop the tunnel now
	pub fn close(mut self) {
		self.signal_stop();
	}

	fn signal_stop(&mut self) {
		if let Some(stop) = self.stop.take() {
			debug!("Closing tunnel on local port {}", self.local_port);
			let _ = stop.send(());
		}
	}
}

impl Drop for TunnelHandle {
	fn drop(&mut self) {
		self.signal_stop();
	}
}

/// Port forwarder running `<cli> port-forward TARGET local:remote...`
#[derive(Debug, Clone)]
pub struct ClusterPortForwarder {
	cluster: ClusterConfig,
	target: String,
}

/// Line the cluster CLI prints once a listener is up
const READY_MARKER: &str = "Forwarding from";

impl ClusterPortForwarder {
	pub fn new(cluster: ClusterConfig, target: impl Into<String>) -> Self {
		ClusterPortForwarder { cluster, target: target.into() }
	}

	pub fn cli_args(&self, mappings: &[PortMapping]) -> Vec<String> {
		let mut args = self.cluster.global_args();
		args.push("port-forward".to_string());
		args.push(self.target.clone());
		args.extend(mappings.iter().map(|m| m.to_string()));
		args
	}
}

#[async_trait]
impl PortForwarder for ClusterPortForwarder {
	async fn forward_ports(&self, mappings: &[PortMapping], stop: StopSignal) -> Result<(), ExecError> {
		let args = self.cli_args(mappings);
		let command_line = format!("{} {}", self.cluster.command, args.join(" "));
		debug!("Starting port-forward: {}", command_line);

		let mut child = tokio::process::Command::new(&self.cluster.command)
			.args(&args)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(|source| ExecError::Spawn { command: command_line.clone(), source })?;

		let stdout = child.stdout.take();
		let stderr = child.stderr.take();
		let (ready_tx, ready_rx) = oneshot::channel::<()>();
		let (error_tx, error_rx) = oneshot::channel::<ExecError>();

		if let Some(stderr) = stderr {
			tokio::spawn(async move {
				let mut lines = BufReader::new(stderr).lines();
				while let Ok(Some(line)) = lines.next_line().await {
					debug!("port-forward: {}", line);
				}
			});
		}

		let command = command_line.clone();
		tokio::spawn(async move {
			let mut stop = stop;
			let mut ready_tx = Some(ready_tx);
			let mut error_tx = Some(error_tx);
			let mut lines = stdout.map(|out| BufReader::new(out).lines());
			loop {
				tokio::select! {
					_ = &mut stop => {
						debug!("Stopping port-forward {}", command);
						let _ = child.kill().await;
						break;
					}
					line = next_line(&mut lines) => match line {
						Some(line) => {
							debug!("port-forward: {}", line);
							if line.starts_with(READY_MARKER) {
								if let Some(tx) = ready_tx.take() {
									let _ = tx.send(());
								}
							}
						}
						None => lines = None,
					},
					status = child.wait() => {
						let code = status.ok().and_then(|s| s.code());
						if ready_tx.is_some() {
							if let Some(tx) = error_tx.take() {
								let _ = tx.send(ExecError::Exit { command: command.clone(), code });
							}
						} else {
							warn!("Port-forward exited unexpectedly (status {:?})", code);
						}
						break;
					}
				}
			}
		});

		tokio::select! {
			biased;
			ready = ready_rx => match ready {
				Ok(()) => Ok(()),
				Err(_) => Err(ExecError::Exit { command: command_line, code: None }),
			},
			error = error_rx => match error {
				Ok(e) => Err(e),
				Err(_) => Err(ExecError::Exit { command: command_line, code: None }),
			},
		}
	}
}

/// Next stdout line, pending forever once the stream is exhausted
async fn next_line(
	lines: &mut Option<tokio::io::Lines<BufReader<tokio::process::ChildStdout>>>,
) -> Option<String> {
	match lines {
		Some(reader) => reader.next_line().await.ok().flatten(),
		None => std::future::pending().await,
	}
}


// vim: ts=4
