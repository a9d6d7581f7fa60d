//! Ordered fallback over several strategies

use async_trait::async_trait;
use tracing::{debug, warn};

use super::CopyStrategy;
use crate::error::CopyError;
use crate::types::TransferRequest;
use crate::validation::ValidationError;

const NAME: &str = "chain";

/// Tries each strategy in turn until one does not fail at setup
///
/// Success and execution failures end the chain. Setup failures of all
/// but the last member are logged as warnings and discarded.
pub struct StrategyChain {
	strategies: Vec<Box<dyn CopyStrategy>>,
}

impl StrategyChain {
	pub fn new(strategies: Vec<Box<dyn CopyStrategy>>) -> Self {
		StrategyChain { strategies }
	}

	pub fn len(&self) -> usize {
		self.strategies.len()
	}

	pub fn is_empty(&self) -> bool {
		self.strategies.is_empty()
	}

	/// Member names, in order
	pub fn names(&self) -> Vec<&'static str> {
		self.strategies.iter().map(|s| s.name()).collect()
	}
}

#[async_trait]
impl CopyStrategy for StrategyChain {
	fn name(&self) -> &'static str {
		NAME
	}

	async fn copy(&self, request: &TransferRequest) -> Result<(), CopyError> {
		let mut last_setup = None;
		let mut remaining = self.strategies.iter().peekable();

		while let Some(strategy) = remaining.next() {
			debug!("Trying {} strategy", strategy.name());
			let err = match strategy.copy(request).await {
				Ok(()) => return Ok(()),
				Err(err) if err.is_setup() => err,
				Err(err) => return Err(err),
			};

			if let Some(next) = remaining.peek() {
				warn!("{}, falling back to {}", err, next.name());
				if !err.output().is_empty() {
					debug!("{} output:\n{}", strategy.name(), String::from_utf8_lossy(err.output()).trim_end());
				}
			}
			last_setup = Some(err);
		}

		Err(last_setup.unwrap_or_else(|| CopyError::setup(NAME, "no copy strategies configured")))
	}

	fn validate(&self) -> Result<(), ValidationError> {
		if self.strategies.is_empty() {
			return Err(ValidationError::ConfigError("no copy strategies configured".to_string()));
		}
		let errors: Vec<ValidationError> =
			self.strategies.iter().filter_map(|s| s.validate().err()).collect();
		ValidationError::aggregate(errors)
	}
}


// vim: ts=4
