//! # podsync - rsync-style directory copies into containers
//!
//! podsync copies a directory tree between the local filesystem and a
//! directory inside a remote container, using whichever transfer
//! mechanism works there:
//!
//! 1. local rsync talking to the remote rsync over `podsync rsh`
//! 2. a temporary rsync daemon in the container reached through a port-forward
//! 3. a tar stream through the remote exec channel
//!
//! ## Library use
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use podsync::config::Config;
//! use podsync::engine::{Collaborators, SyncEngine};
//! use podsync::exec::{ClusterExecutor, ProcessExecutor};
//! use podsync::pathspec::PathSpec;
//! use podsync::strategies::StrategyKind;
//! use podsync::types::TransferRequest;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(None)?;
//!     let request = TransferRequest::new(PathSpec::parse("./app/")?, PathSpec::parse("mypod:/data")?);
//!     let collaborators = Collaborators {
//!         local: Some(Arc::new(ProcessExecutor::new())),
//!         remote: Some(Arc::new(ClusterExecutor::new(config.cluster.clone(), "mypod", None))),
//!         forwarder: None,
//!     };
//!     let engine = SyncEngine::new(config, "podsync rsh", collaborators);
//!     engine.run(&request, StrategyKind::Tar).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod forward;
pub mod logging;
pub mod pathspec;
pub mod portfind;
pub mod strategies;
pub mod strategy;
pub mod types;
pub mod validation;

// Re-export commonly used types and functions
pub use config::Config;
pub use engine::{Collaborators, SyncEngine};
pub use error::{CopyError, ExecError, PathSpecError, SyncError};
pub use pathspec::PathSpec;
pub use strategies::StrategyKind;
pub use types::{RsyncOptions, TransferRequest};

// vim: ts=4
