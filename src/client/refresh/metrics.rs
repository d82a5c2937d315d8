// std
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Per-client counters describing refresh traffic.
///
/// Only leaders touch `attempts`, `successes`, and `failures`; every follower bumps `coalesced`
/// once, so `attempts + coalesced` is the number of requests that needed a new token.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
	coalesced: AtomicU64,
}
impl RefreshMetrics {
	/// Refresh exchanges started by a leader.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Relaxed)
	}

	/// Refresh exchanges that produced a new access token.
	pub fn successes(&self) -> u64 {
		self.successes.load(Relaxed)
	}

	/// Refresh exchanges that ended the session.
	pub fn failures(&self) -> u64 {
		self.failures.load(Relaxed)
	}

	/// Requests that waited on someone else's refresh instead of starting one.
	pub fn coalesced(&self) -> u64 {
		self.coalesced.load(Relaxed)
	}

	/// Copies every counter at once.
	pub fn snapshot(&self) -> RefreshStats {
		RefreshStats {
			attempts: self.attempts(),
			successes: self.successes(),
			failures: self.failures(),
			coalesced: self.coalesced(),
		}
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.successes.fetch_add(1, Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Relaxed);
	}

	pub(crate) fn record_coalesced(&self) {
		self.coalesced.fetch_add(1, Relaxed);
	}
}

/// Point-in-time copy of [`RefreshMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshStats {
	/// See [`RefreshMetrics::attempts`].
	pub attempts: u64,
	/// See [`RefreshMetrics::successes`].
	pub successes: u64,
	/// See [`RefreshMetrics::failures`].
	pub failures: u64,
	/// See [`RefreshMetrics::coalesced`].
	pub coalesced: u64,
}
