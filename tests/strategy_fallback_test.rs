//! Fallback through the full strategy chain
//!
//! rsync is "missing" locally and in the container, so both rsync
//! strategies fail at setup and tar has to do the copy.

#![cfg(unix)]

mod common;

use async_trait::async_trait;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use common::{path_str, sample_tree, HostExecutor};
use podsync::config::Config;
use podsync::engine::{Collaborators, SyncEngine};
use podsync::exec::{BoxedReader, LocalExecutor, OutputStream, RemoteExecutor};
use podsync::forward::{PortForwarder, PortMapping, StopSignal};
use podsync::pathspec::PathSpec;
use podsync::portfind::FreePortFinder;
use podsync::strategies::StrategyKind;
use podsync::types::TransferRequest;
use podsync::{ExecError, SyncError};

/// Host executor where `rsync` does not exist
#[derive(Default)]
struct NoRsyncRemote {
	calls: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl RemoteExecutor for NoRsyncRemote {
	async fn execute(
		&self,
		argv: &[String],
		stdin: Option<BoxedReader>,
		stdout: OutputStream<'_>,
		stderr: OutputStream<'_>,
	) -> Result<(), ExecError> {
		self.calls.lock().unwrap().push(argv.to_vec());
		let mentions_rsync = argv[0] == "rsync" || argv.iter().any(|arg| arg.contains("rsync --daemon"));
		if mentions_rsync {
			return Err(ExecError::Exit { command: argv.join(" "), code: Some(127) });
		}
		HostExecutor.execute(argv, stdin, stdout, stderr).await
	}
}

/// Local executor for a machine without rsync
#[derive(Default)]
struct NoRsyncLocal {
	runs: AtomicUsize,
}

#[async_trait]
impl LocalExecutor for NoRsyncLocal {
	async fn run(
		&self,
		program: &str,
		_args: &[String],
		_stdout: OutputStream<'_>,
		_stderr: OutputStream<'_>,
	) -> Result<(), ExecError> {
		self.runs.fetch_add(1, Ordering::SeqCst);
		Err(ExecError::Spawn {
			command: program.to_string(),
			source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
		})
	}
}

#[derive(Default)]
struct UnusedForwarder {
	calls: AtomicUsize,
}

#[async_trait]
impl PortForwarder for UnusedForwarder {
	async fn forward_ports(&self, _mappings: &[PortMapping], _stop: StopSignal) -> Result<(), ExecError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

struct Fixture {
	engine: SyncEngine,
	remote: Arc<NoRsyncRemote>,
	local: Arc<NoRsyncLocal>,
	forwarder: Arc<UnusedForwarder>,
}

fn fixture() -> Fixture {
	let remote = Arc::new(NoRsyncRemote::default());
	let local = Arc::new(NoRsyncLocal::default());
	let forwarder = Arc::new(UnusedForwarder::default());
	let collaborators = Collaborators {
		local: Some(local.clone()),
		remote: Some(remote.clone()),
		forwarder: Some(forwarder.clone()),
	};
	let engine = SyncEngine::new(Config::default(), "podsync rsh", collaborators)
		.with_port_finder(Arc::new(FreePortFinder::seeded(11)));
	Fixture { engine, remote, local, forwarder }
}

#[tokio::test]
async fn test_auto_falls_back_to_tar() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	sample_tree(src.path());
	let fixture = fixture();

	let request = TransferRequest::new(
		PathSpec::local(path_str(&src.path().join("app"))),
		PathSpec::remote("host", path_str(dst.path())),
	)
	.quiet(true);
	fixture.engine.run(&request, StrategyKind::Auto).await.unwrap();

	assert_eq!(fs::read_to_string(dst.path().join("app/a.txt")).unwrap(), "alpha");
	// One direct rsync attempt, one version check by the daemon strategy
	assert_eq!(fixture.local.runs.load(Ordering::SeqCst), 2);
	assert_eq!(fixture.forwarder.calls.load(Ordering::SeqCst), 0);

	// No local rsync, so no daemon was started and nothing is left to kill
	let calls = fixture.remote.calls.lock().unwrap();
	assert!(!calls.iter().any(|argv| argv.iter().any(|a| a.contains("rsync --daemon"))));
	assert!(!calls.iter().any(|argv| argv.iter().any(|a| a.starts_with("kill "))));
}

#[tokio::test]
async fn test_explicit_rsync_reports_setup_failure() {
	let src = TempDir::new().unwrap();
	let fixture = fixture();
	let request = TransferRequest::new(
		PathSpec::local(path_str(src.path())),
		PathSpec::remote("host", "/data"),
	);

	let err = fixture.engine.run(&request, StrategyKind::Rsync).await.unwrap_err();
	match err {
		SyncError::Copy(copy) => {
			assert!(copy.is_setup());
			assert_eq!(copy.to_string(), "rsync strategy unavailable: rsync not available locally");
		}
		other => panic!("unexpected error: {}", other),
	}
}

#[tokio::test]
async fn test_rsync_daemon_only_returns_its_setup_failure() {
	let src = TempDir::new().unwrap();
	let fixture = fixture();
	let request = TransferRequest::new(
		PathSpec::local(path_str(src.path())),
		PathSpec::remote("host", "/data"),
	);

	let err = fixture.engine.run(&request, StrategyKind::RsyncDaemon).await.unwrap_err();
	assert_eq!(err.to_string(), "rsync-daemon strategy unavailable: rsync not available locally");
	assert_eq!(fixture.local.runs.load(Ordering::SeqCst), 1);
	assert!(fixture.remote.calls.lock().unwrap().is_empty());
}

// vim: ts=4
