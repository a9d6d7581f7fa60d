//! Free TCP port discovery inside the remote target
//!
//! There is no allocator to ask, so candidates are sampled at random from a
//! fixed range and checked against the remote connection table.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::ops::Range;
use std::sync::Mutex;
use tracing::debug;

use crate::error::PortError;
use crate::exec::{argv, execute_captured, RemoteExecutor};

/// Candidate ports for the remote daemon
pub const PORT_RANGE: Range<u16> = 30000..60000;

/// Random candidates tried before giving up
pub const MAX_ATTEMPTS: usize = 20;

/// Picks unused remote ports with an injected random source
pub struct FreePortFinder {
	rng: Mutex<StdRng>,
}

impl FreePortFinder {
	pub fn new(rng: StdRng) -> Self {
		FreePortFinder { rng: Mutex::new(rng) }
	}

	/// Deterministic finder for tests and reproducible runs
	pub fn seeded(seed: u64) -> Self {
		Self::new(StdRng::seed_from_u64(seed))
	}

	pub fn from_entropy() -> Self {
		Self::new(StdRng::from_entropy())
	}

	/// Uniformly random port in [`PORT_RANGE`]
	pub fn random_port(&self) -> u16 {
		let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
		rng.gen_range(PORT_RANGE)
	}

	/// First of up to [`MAX_ATTEMPTS`] random candidates not in `used`
	pub fn pick(&self, used: &HashSet<u16>) -> Result<u16, PortError> {
		for _ in 0..MAX_ATTEMPTS {
			let candidate = self.random_port();
			if !used.contains(&candidate) {
				return Ok(candidate);
			}
		}
		Err(PortError::Exhausted { attempts: MAX_ATTEMPTS })
	}

	/// Find a port nothing in the remote target is bound to
	///
	/// A table `cat` managed to print before failing (no IPv6 on the target)
	/// still counts. If nothing could be read the used set is empty and the
	/// first random candidate wins.
	pub async fn find_free_remote_port(&self, executor: &dyn RemoteExecutor) -> Result<u16, PortError> {
		let (result, captured) =
			execute_captured(executor, &argv(["cat", "/proc/net/tcp", "/proc/net/tcp6"])).await;
		if let Err(e) = &result {
			if captured.stdout.is_empty() {
				debug!("Cannot read remote connection table ({}), assuming no ports in use", e);
			} else {
				debug!("Remote connection table partially read ({})", e);
			}
		}
		let used = parse_used_ports(&captured.stdout_text());
		debug!("{} remote ports in use", used.len());
		let port = self.pick(&used)?;
		debug!("Selected remote port {}", port);
		Ok(port)
	}
}

impl Default for FreePortFinder {
	fn default() -> Self {
		Self::from_entropy()
	}
}

/// Ports in the local-address column of `/proc/net/tcp{,6}` output
///
/// Rows look like `0: 0100007F:1F90 00000000:0000 0A ...`; the port is the
/// hex number after the last `:` of the second column. Header and
/// malformed rows are skipped.
pub fn parse_used_ports(table: &str) -> HashSet<u16> {
	table
		.lines()
		.filter_map(|line| line.split_whitespace().nth(1))
		.filter_map(|local| local.rsplit_once(':'))
		.filter_map(|(_, port)| u16::from_str_radix(port, 16).ok())
		.collect()
}


// vim: ts=4
