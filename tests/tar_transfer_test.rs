//! Tar strategy end to end, with this host standing in for the container
//!
//! Needs `sh` and `tar` on the host.

#![cfg(unix)]

mod common;

use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use common::{path_str, sample_tree, HostExecutor};
use podsync::config::Config;
use podsync::engine::{Collaborators, SyncEngine};
use podsync::pathspec::PathSpec;
use podsync::strategies::StrategyKind;
use podsync::types::{RsyncOptions, TransferRequest};

fn engine() -> SyncEngine {
	let collaborators = Collaborators { remote: Some(Arc::new(HostExecutor)), ..Default::default() };
	SyncEngine::new(Config::default(), "podsync rsh", collaborators)
}

// ============================================================================
// Trailing separator semantics
// ============================================================================

#[tokio::test]
async fn test_upload_with_trailing_slash_copies_contents() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	sample_tree(src.path());

	let request = TransferRequest::new(
		PathSpec::local(format!("{}/", src.path().join("app").display())),
		PathSpec::remote("host", path_str(dst.path())),
	)
	.quiet(true);
	engine().run(&request, StrategyKind::Tar).await.unwrap();

	assert_eq!(fs::read_to_string(dst.path().join("a.txt")).unwrap(), "alpha");
	assert_eq!(fs::read_to_string(dst.path().join("sub/b.txt")).unwrap(), "beta");
	assert!(!dst.path().join("app").exists());
}

#[tokio::test]
async fn test_upload_without_trailing_slash_copies_directory() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	sample_tree(src.path());

	let request = TransferRequest::new(
		PathSpec::local(path_str(&src.path().join("app"))),
		PathSpec::remote("host", path_str(dst.path())),
	)
	.quiet(true);
	engine().run(&request, StrategyKind::Tar).await.unwrap();

	assert_eq!(fs::read_to_string(dst.path().join("app/a.txt")).unwrap(), "alpha");
	assert!(!dst.path().join("a.txt").exists());
}

#[tokio::test]
async fn test_download_both_forms() {
	let src = TempDir::new().unwrap();
	sample_tree(src.path());

	let whole = TempDir::new().unwrap();
	let request = TransferRequest::new(
		PathSpec::remote("host", path_str(&src.path().join("app"))),
		PathSpec::local(path_str(whole.path())),
	)
	.quiet(true);
	engine().run(&request, StrategyKind::Tar).await.unwrap();
	assert_eq!(fs::read_to_string(whole.path().join("app/sub/b.txt")).unwrap(), "beta");

	let contents = TempDir::new().unwrap();
	let request = TransferRequest::new(
		PathSpec::remote("host", format!("{}/", src.path().join("app").display())),
		PathSpec::local(path_str(contents.path())),
	)
	.quiet(true);
	engine().run(&request, StrategyKind::Tar).await.unwrap();
	assert_eq!(fs::read_to_string(contents.path().join("sub/b.txt")).unwrap(), "beta");
	assert!(!contents.path().join("app").exists());
}

// ============================================================================
// --delete
// ============================================================================

#[tokio::test]
async fn test_delete_removes_stale_remote_files() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	fs::write(src.path().join("a.txt"), "new").unwrap();
	fs::write(dst.path().join("old.txt"), "stale").unwrap();
	fs::create_dir(dst.path().join("old-dir")).unwrap();

	let request = TransferRequest::new(
		PathSpec::local(format!("{}/", src.path().display())),
		PathSpec::remote("host", path_str(dst.path())),
	)
	.delete(true)
	.quiet(true);
	engine().run(&request, StrategyKind::Tar).await.unwrap();

	assert!(!dst.path().join("old.txt").exists());
	assert!(!dst.path().join("old-dir").exists());
	assert_eq!(fs::read_to_string(dst.path().join("a.txt")).unwrap(), "new");
}

#[tokio::test]
async fn test_delete_removes_stale_local_files() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	fs::write(src.path().join("a.txt"), "new").unwrap();
	fs::write(dst.path().join("old.txt"), "stale").unwrap();

	let request = TransferRequest::new(
		PathSpec::remote("host", format!("{}/", src.path().display())),
		PathSpec::local(path_str(dst.path())),
	)
	.delete(true)
	.quiet(true);
	engine().run(&request, StrategyKind::Tar).await.unwrap();

	assert!(!dst.path().join("old.txt").exists());
	assert_eq!(fs::read_to_string(dst.path().join("a.txt")).unwrap(), "new");
}

#[tokio::test]
async fn test_without_delete_keeps_existing_files() {
	let src = TempDir::new().unwrap();
	let dst = TempDir::new().unwrap();
	fs::write(src.path().join("a.txt"), "new").unwrap();
	fs::write(dst.path().join("old.txt"), "stale").unwrap();

	let request = TransferRequest::new(
		PathSpec::local(format!("{}/", src.path().display())),
		PathSpec::remote("host", path_str(dst.path())),
	)
	.quiet(true);
	engine().run(&request, StrategyKind::Tar).await.unwrap();

	assert!(dst.path().join("old.txt").exists());
	assert!(dst.path().join("a.txt").exists());
}

// ============================================================================
// Filters and failures
// ============================================================================

#[tokio::test]
async fn test_excludes_apply_both_ways() {
	let src = TempDir::new().unwrap();
	sample_tree(src.path());
	let options = RsyncOptions { excludes: vec!["*.log".to_string()], ..Default::default() };

	let up = TempDir::new().unwrap();
	let request = TransferRequest::new(
		PathSpec::local(path_str(&src.path().join("app"))),
		PathSpec::remote("host", path_str(up.path())),
	)
	.quiet(true)
	.options(options.clone());
	engine().run(&request, StrategyKind::Tar).await.unwrap();
	assert!(up.path().join("app/a.txt").exists());
	assert!(!up.path().join("app/debug.log").exists());

	let down = TempDir::new().unwrap();
	let request = TransferRequest::new(
		PathSpec::remote("host", path_str(&src.path().join("app"))),
		PathSpec::local(path_str(down.path())),
	)
	.quiet(true)
	.options(options);
	engine().run(&request, StrategyKind::Tar).await.unwrap();
	assert!(down.path().join("app/a.txt").exists());
	assert!(!down.path().join("app/debug.log").exists());
}

#[tokio::test]
async fn test_missing_remote_source_is_execution_failure() {
	let dst = TempDir::new().unwrap();
	let request = TransferRequest::new(
		PathSpec::remote("host", "/nonexistent/podsync-test-source"),
		PathSpec::local(path_str(dst.path())),
	)
	.quiet(true);

	let err = engine().run(&request, StrategyKind::Tar).await.unwrap_err();
	match err {
		podsync::SyncError::Copy(copy) => {
			assert!(!copy.is_setup());
			assert_eq!(copy.strategy(), "tar");
			assert!(!copy.output().is_empty());
		}
		other => panic!("unexpected error: {}", other),
	}
}

// vim: ts=4
