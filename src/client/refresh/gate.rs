//! Single-flight coordination for access-token refreshes.
//!
//! [`RefreshGate`] holds the in-flight flag and the waiter queue behind one lock. The first
//! request to find the flag clear becomes the leader and receives a [`RefreshLease`]; every
//! request arriving while the flag is set receives a [`RefreshWaiter`] instead. Settling the
//! lease clears the flag and drains the whole queue in a single critical section, so a waiter is
//! either answered by the refresh it queued behind or never enqueued at all.

// std
use std::mem;
// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, auth::TokenSecret, error::RefreshError};

/// Result delivered to every waiter of one refresh.
pub type RefreshOutcome = Result<TokenSecret, RefreshError>;

/// In-flight flag plus waiter queue for one client.
#[derive(Debug, Default)]
pub struct RefreshGate {
	state: Mutex<GateState>,
}
impl RefreshGate {
	/// Admits a request that needs a fresh access token.
	pub fn admit(&self) -> Admission<'_> {
		let mut state = self.state.lock();

		if state.in_flight {
			let ticket = state.next_ticket;
			let (tx, rx) = oneshot::channel();

			state.next_ticket += 1;
			state.waiters.push((ticket, tx));

			Admission::Follower(RefreshWaiter { gate: self, ticket, rx })
		} else {
			state.in_flight = true;

			Admission::Leader(RefreshLease { gate: self, settled: false })
		}
	}

	/// Returns `true` while a lease is outstanding.
	pub fn is_in_flight(&self) -> bool {
		self.state.lock().in_flight
	}

	/// Number of queued waiters.
	pub fn queued(&self) -> usize {
		self.state.lock().waiters.len()
	}

	fn settle(&self, outcome: RefreshOutcome) {
		let waiters = {
			let mut state = self.state.lock();

			state.in_flight = false;

			mem::take(&mut state.waiters)
		};

		for (_, tx) in waiters {
			// A closed receiver belongs to a waiter that is being dropped.
			let _ = tx.send(outcome.clone());
		}
	}

	fn withdraw(&self, ticket: u64) {
		self.state.lock().waiters.retain(|(queued, _)| *queued != ticket);
	}
}

#[derive(Debug, Default)]
struct GateState {
	in_flight: bool,
	next_ticket: u64,
	waiters: Vec<(u64, oneshot::Sender<RefreshOutcome>)>,
}

/// Role assigned by [`RefreshGate::admit`].
#[derive(Debug)]
pub enum Admission<'a> {
	/// The caller must perform the refresh and settle the lease.
	Leader(RefreshLease<'a>),
	/// A refresh is already running; the caller waits for its outcome.
	Follower(RefreshWaiter<'a>),
}

/// Exclusive right to perform the refresh.
///
/// Dropping an unsettled lease releases the flag and rejects every waiter with
/// [`RefreshError::Abandoned`]; the client treats that as a cue to re-admit.
#[derive(Debug)]
pub struct RefreshLease<'a> {
	gate: &'a RefreshGate,
	settled: bool,
}
impl RefreshLease<'_> {
	/// Hands the new access token to every waiter and releases the flag.
	pub fn resolve(self, access: &TokenSecret) {
		self.finish(Ok(access.clone()));
	}

	/// Hands the refresh failure to every waiter and releases the flag.
	pub fn reject(self, error: &RefreshError) {
		self.finish(Err(error.clone()));
	}

	fn finish(mut self, outcome: RefreshOutcome) {
		self.settled = true;
		self.gate.settle(outcome);
	}
}
impl Drop for RefreshLease<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.gate.settle(Err(RefreshError::Abandoned));
		}
	}
}

/// Queue entry for a request waiting on another request's refresh.
///
/// Dropping the waiter (for example when its request times out) removes only its own entry.
#[derive(Debug)]
pub struct RefreshWaiter<'a> {
	gate: &'a RefreshGate,
	ticket: u64,
	rx: oneshot::Receiver<RefreshOutcome>,
}
impl RefreshWaiter<'_> {
	/// Waits for the in-flight refresh to settle.
	pub async fn wait(mut self) -> RefreshOutcome {
		(&mut self.rx).await.unwrap_or(Err(RefreshError::Abandoned))
	}
}
impl Drop for RefreshWaiter<'_> {
	fn drop(&mut self) {
		self.gate.withdraw(self.ticket);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn follower(admission: Admission<'_>) -> RefreshWaiter<'_> {
		match admission {
			Admission::Follower(waiter) => waiter,
			Admission::Leader(_) => panic!("Expected a follower while the refresh is in flight."),
		}
	}

	fn leader(admission: Admission<'_>) -> RefreshLease<'_> {
		match admission {
			Admission::Leader(lease) => lease,
			Admission::Follower(_) => panic!("Expected a leader while no refresh is in flight."),
		}
	}

	#[tokio::test]
	async fn resolve_answers_every_waiter_and_releases_flag() {
		let gate = RefreshGate::default();
		let lease = leader(gate.admit());
		let first = follower(gate.admit());
		let second = follower(gate.admit());

		assert!(gate.is_in_flight());
		assert_eq!(gate.queued(), 2);

		lease.resolve(&TokenSecret::new("A2"));

		assert!(!gate.is_in_flight());
		assert_eq!(gate.queued(), 0);
		assert_eq!(first.wait().await.expect("First waiter should get the token.").expose(), "A2");
		assert_eq!(second.wait().await.expect("Second waiter should get the token.").expose(), "A2");

		let _next = leader(gate.admit());
	}

	#[tokio::test]
	async fn reject_propagates_the_refresh_error() {
		let gate = RefreshGate::default();
		let lease = leader(gate.admit());
		let waiter = follower(gate.admit());

		lease.reject(&RefreshError::Rejected { status: 401, body: "expired".into() });

		let err = waiter.wait().await.expect_err("Waiter should observe the refresh failure.");

		assert!(matches!(err, RefreshError::Rejected { status: 401, .. }));
		assert!(!gate.is_in_flight());
	}

	#[tokio::test]
	async fn dropped_lease_releases_flag_and_abandons_waiters() {
		let gate = RefreshGate::default();
		let lease = leader(gate.admit());
		let waiter = follower(gate.admit());

		drop(lease);

		assert!(!gate.is_in_flight());
		assert!(matches!(waiter.wait().await, Err(RefreshError::Abandoned)));
	}

	#[tokio::test]
	async fn dropped_waiter_leaves_only_its_own_slot() {
		let gate = RefreshGate::default();
		let lease = leader(gate.admit());
		let leaving = follower(gate.admit());
		let staying = follower(gate.admit());

		drop(leaving);

		assert_eq!(gate.queued(), 1);
		assert!(gate.is_in_flight());

		lease.resolve(&TokenSecret::new("A3"));

		assert_eq!(staying.wait().await.expect("Remaining waiter should be answered.").expose(), "A3");
	}
}
