//! rsync daemon strategy
//!
//! Starts a throw-away `rsync --daemon` inside the remote target on a free
//! port, tunnels a local port to it and runs the local rsync against
//! `rsync://127.0.0.1:<port>/root/...`. The tunnel is stopped and the
//! daemon killed before the copy returns, on every path.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::rsync::{classify_rsync_result, rsync_flags};
use super::CopyStrategy;
use crate::error::{CopyError, ExecError};
use crate::exec::{argv, execute_captured, LocalExecutor, RemoteExecutor};
use crate::forward::{PortForwarder, PortMapping, TunnelHandle};
use crate::pathspec::PathSpec;
use crate::portfind::FreePortFinder;
use crate::types::TransferRequest;
use crate::validation::{validate_command, validate_present, ValidationError};

const NAME: &str = "rsync-daemon";

/// Module name the daemon exports `/` under
const MODULE: &str = "root";

/// Shell script starting the daemon and printing its pid file path
///
/// Both files get a unique name under `${TMPDIR:-/tmp}`. The pid file is
/// waited on for a few seconds since the daemon forks before writing it.
pub(crate) fn daemon_script(id: &str, port: u16) -> String {
	format!(
		concat!(
			"set -e\n",
			"dir=\"${{TMPDIR:-/tmp}}\"\n",
			"conf=\"$dir/podsync-rsyncd-{id}.conf\"\n",
			"pidfile=\"$dir/podsync-rsyncd-{id}.pid\"\n",
			"printf 'pid file = %s\\n[{module}]\\npath = /\\nuse chroot = no\\nread only = no\\n' \"$pidfile\" > \"$conf\"\n",
			"rsync --daemon --config=\"$conf\" --port={port}\n",
			"for i in 1 2 3 4 5 6 7 8 9 10; do [ -s \"$pidfile\" ] && break; sleep 1; done\n",
			"echo \"$pidfile\"\n",
		),
		id = id,
		module = MODULE,
		port = port,
	)
}

/// Render an endpoint for rsync, remote side as a daemon URL
pub(crate) fn daemon_endpoint(spec: &PathSpec, local_port: u16) -> String {
	if spec.is_local() {
		return spec.to_native_transfer_path();
	}
	format!("rsync://127.0.0.1:{}/{}/{}", local_port, MODULE, spec.path.trim_start_matches('/'))
}

/// A daemon running inside the remote target
///
/// [`RemoteDaemon::stop`] kills it and removes its files. If the owner is
/// dropped first, `Drop` schedules the same kill on the runtime. Either way
/// it is sent once.
struct RemoteDaemon {
	pid_file: String,
	conf_file: String,
	port: u16,
	executor: Arc<dyn RemoteExecutor>,
	stopped: bool,
}

impl RemoteDaemon {
	fn new(pid_file: String, port: u16, executor: Arc<dyn RemoteExecutor>) -> Self {
		let conf_file = match pid_file.strip_suffix(".pid") {
			Some(stem) => format!("{}.conf", stem),
			None => format!("{}.conf", pid_file),
		};
		RemoteDaemon { pid_file, conf_file, port, executor, stopped: false }
	}

	fn kill_argv(&self) -> Vec<String> {
		let pid_file = shell_words::quote(&self.pid_file);
		let script = format!(
			"kill $(cat {}); rm -f {} {}",
			pid_file,
			pid_file,
			shell_words::quote(&self.conf_file)
		);
		argv(["sh".to_string(), "-c".to_string(), script])
	}

	async fn stop(mut self) {
		self.stopped = true;
		debug!("Stopping remote rsync daemon ({})", self.pid_file);
		kill_daemon(self.executor.as_ref(), &self.kill_argv()).await;
	}
}

impl Drop for RemoteDaemon {
	fn drop(&mut self) {
		if self.stopped {
			return;
		}
		self.stopped = true;
		let kill = self.kill_argv();
		let executor = self.executor.clone();
		match tokio::runtime::Handle::try_current() {
			Ok(handle) => {
				handle.spawn(async move {
					kill_daemon(executor.as_ref(), &kill).await;
				});
			}
			Err(_) => warn!("Cannot stop remote rsync daemon ({}): no runtime", self.pid_file),
		}
	}
}

async fn kill_daemon(executor: &dyn RemoteExecutor, kill: &[String]) {
	let (result, captured) = execute_captured(executor, kill).await;
	if let Err(e) = result {
		warn!(
			"Failed to stop remote rsync daemon: {} {}",
			e,
			String::from_utf8_lossy(&captured.stderr).trim()
		);
	}
}

/// rsync against a temporary daemon reached through a port-forward
pub struct DaemonRsyncStrategy {
	rsync_command: String,
	local: Option<Arc<dyn LocalExecutor>>,
	remote: Option<Arc<dyn RemoteExecutor>>,
	forwarder: Option<Arc<dyn PortForwarder>>,
	ports: Arc<FreePortFinder>,
}

impl DaemonRsyncStrategy {
	pub fn new(rsync_command: impl Into<String>, ports: Arc<FreePortFinder>) -> Self {
		DaemonRsyncStrategy {
			rsync_command: rsync_command.into(),
			local: None,
			remote: None,
			forwarder: None,
			ports,
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

	pub fn with_forwarder(mut self, forwarder: Arc<dyn PortForwarder>) -> Self {
		self.forwarder = Some(forwarder);
		self
	}

	/// Full rsync argument list talking to the daemon on `local_port`
	pub fn rsync_args(&self, request: &TransferRequest, local_port: u16) -> Vec<String> {
		let mut args = rsync_flags(request);
		args.push(daemon_endpoint(&request.source, local_port));
		args.push(daemon_endpoint(&request.destination, local_port));
		args
	}

	/// Setup failure when the local rsync cannot be spawned at all
	async fn check_local_rsync(&self, local: &dyn LocalExecutor) -> Result<(), CopyError> {
		let mut stdout = Vec::<u8>::new();
		let mut stderr = Vec::<u8>::new();
		match local.run(&self.rsync_command, &argv(["--version"]), &mut stdout, &mut stderr).await {
			Err(e) if e.is_not_found() => Err(CopyError::setup(NAME, "rsync not available locally")),
			Err(e) => {
				debug!("Local rsync version check failed: {}", e);
				Ok(())
			}
			Ok(()) => Ok(()),
		}
	}

	async fn start_daemon(&self, remote: &Arc<dyn RemoteExecutor>) -> Result<RemoteDaemon, CopyError> {
		let port = self
			.ports
			.find_free_remote_port(remote.as_ref())
			.await
			.map_err(|e| CopyError::setup(NAME, e.to_string()))?;

		let script = daemon_script(&Uuid::new_v4().simple().to_string(), port);
		let (result, captured) = execute_captured(remote.as_ref(), &argv(["sh".to_string(), "-c".to_string(), script])).await;
		match result {
			Ok(()) => {}
			Err(e) if e.is_exit() => {
				debug!("Daemon start failed: {}", e);
				return Err(CopyError::setup(NAME, "cannot start remote rsync daemon").with_output(captured.stderr));
			}
			Err(e) => return Err(CopyError::execution(NAME, e).with_output(captured.stderr)),
		}

		let pid_file = captured.stdout_text().trim().to_string();
		if pid_file.is_empty() {
			return Err(CopyError::setup(NAME, "cannot start remote rsync daemon").with_output(captured.stderr));
		}
		info!("Started remote rsync daemon on port {}", port);
		Ok(RemoteDaemon::new(pid_file, port, remote.clone()))
	}

	/// A local port for the tunnel, preferably one the OS just handed out
	async fn local_port(&self) -> u16 {
		match TcpListener::bind("127.0.0.1:0").await.and_then(|l| l.local_addr()) {
			Ok(addr) => addr.port(),
			Err(e) => {
				debug!("Cannot allocate local port ({}), picking one at random", e);
				self.ports.random_port()
			}
		}
	}

	async fn transfer(
		&self,
		request: &TransferRequest,
		daemon: &RemoteDaemon,
		local: &dyn LocalExecutor,
		remote: &dyn RemoteExecutor,
		forwarder: &dyn PortForwarder,
	) -> Result<(), CopyError> {
		let local_port = self.local_port().await;
		let (tunnel, stop) = TunnelHandle::new(local_port);
		let mapping = PortMapping { local: local_port, remote: daemon.port };
		forwarder.forward_ports(&[mapping], stop).await.map_err(|e: ExecError| {
			if e.is_exit() {
				debug!("Port-forward {} failed: {}", mapping, e);
				CopyError::setup(NAME, "cannot start port-forward")
			} else {
				CopyError::execution(NAME, e)
			}
		})?;
		debug!("Tunnel {} ready", mapping);

		let args = self.rsync_args(request, tunnel.local_port());
		info!("Copying {} to {} through rsync daemon", request.source, request.destination);
		let mut stdout = tokio::io::stdout();
		let mut stderr = Vec::<u8>::new();
		let result = local.run(&self.rsync_command, &args, &mut stdout, &mut stderr).await;
		tunnel.close();
		classify_rsync_result(NAME, result, stderr, remote).await
	}
}

#[async_trait]
impl CopyStrategy for DaemonRsyncStrategy {
	fn name(&self) -> &'static str {
		NAME
	}

	async fn copy(&self, request: &TransferRequest) -> Result<(), CopyError> {
		let (Some(local), Some(remote), Some(forwarder)) = (&self.local, &self.remote, &self.forwarder) else {
			return Err(CopyError::setup(NAME, "collaborators are not configured"));
		};

		self.check_local_rsync(local.as_ref()).await?;
		let daemon = self.start_daemon(remote).await?;
		let result = self
			.transfer(request, &daemon, local.as_ref(), remote.as_ref(), forwarder.as_ref())
			.await;
		daemon.stop().await;
		result
	}

	fn validate(&self) -> Result<(), ValidationError> {
		let errors: Vec<ValidationError> = [
			validate_command("rsync", &self.rsync_command),
			validate_present("port forwarder", &self.forwarder),
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
