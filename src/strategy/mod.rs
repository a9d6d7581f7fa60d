//! Copy strategies
//!
//! Every transfer mechanism implements [`CopyStrategy`]. Failures are split
//! into setup failures (the mechanism cannot run here) and execution
//! failures (the transfer ran and failed); only [`StrategyChain`] acts on
//! the difference.

use async_trait::async_trait;

use crate::error::CopyError;
use crate::types::TransferRequest;
use crate::validation::ValidationError;

pub mod chain;
pub mod daemon;
pub mod filter;
pub mod rsync;
pub mod tar;

pub use chain::StrategyChain;
pub use daemon::DaemonRsyncStrategy;
pub use rsync::DirectRsyncStrategy;
pub use tar::TarTransferStrategy;

/// One transfer mechanism
#[async_trait]
pub trait CopyStrategy: Send + Sync {
	/// Short name used in messages
	fn name(&self) -> &'static str;

	/// Copy `request.source` into `request.destination`
	async fn copy(&self, request: &TransferRequest) -> Result<(), CopyError>;

	/// Report configuration problems before any work starts
	fn validate(&self) -> Result<(), ValidationError>;
}

// vim: ts=4
