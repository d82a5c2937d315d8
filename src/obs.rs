//! Optional observability helpers for client operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `crm_session.op` with the `op` (operation)
//!   and `stage` (call site) fields. `refresh_role` is filled in when the operation reaches the
//!   refresh gate and `status_class` when a response arrives. Debug/warn events mark token
//!   refreshes.
//! - Enable `metrics` to increment `crm_session_op_total{op, outcome}`,
//!   `crm_session_refresh_role_total{role}`, and `crm_session_response_total{class}`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Client operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Generic API request through the authenticated pipeline.
	Request,
	/// Access-token refresh (automatic or manual).
	Refresh,
	/// Credential login.
	Login,
	/// Account registration.
	Register,
	/// Server-side logout plus local teardown.
	Logout,
	/// Session restore from stored tokens.
	RestoreSession,
	/// Auth guard check for protected views.
	Guard,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Request => "request",
			OpKind::Refresh => "refresh",
			OpKind::Login => "login",
			OpKind::Register => "register",
			OpKind::Logout => "logout",
			OpKind::RestoreSession => "restore_session",
			OpKind::Guard => "guard",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to a client operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Part a request plays at the refresh gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshRole {
	/// Performs the refresh exchange.
	Leader,
	/// Waits on another request's exchange.
	Follower,
}
impl RefreshRole {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshRole::Leader => "leader",
			RefreshRole::Follower => "follower",
		}
	}
}
impl Display for RefreshRole {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Buckets an HTTP status into `1xx` through `5xx`, or `other`.
pub const fn status_class(status: u16) -> &'static str {
	match status {
		100..=199 => "1xx",
		200..=299 => "2xx",
		300..=399 => "3xx",
		400..=499 => "4xx",
		500..=599 => "5xx",
		_ => "other",
	}
}

pub(crate) fn record_refresh_role(role: RefreshRole) {
	record_span_field("refresh_role", role.as_str());
	count_refresh_role(role);
}

pub(crate) fn record_response_status(status: u16) {
	let class = status_class(status);

	record_span_field("status_class", class);
	count_response_class(class);
}

/// Runs `fut` inside an [`OpSpan`] and records attempt/success/failure outcomes around it.
pub(crate) async fn observe<T, Fut>(kind: OpKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	record_op_outcome(kind, OpOutcome::Attempt);

	let result = OpSpan::new(kind, stage).instrument(fut).await;

	match &result {
		Ok(_) => record_op_outcome(kind, OpOutcome::Success),
		Err(_) => record_op_outcome(kind, OpOutcome::Failure),
	}

	result
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn status_classes_bucket_by_hundreds() {
		assert_eq!(status_class(200), "2xx");
		assert_eq!(status_class(204), "2xx");
		assert_eq!(status_class(401), "4xx");
		assert_eq!(status_class(503), "5xx");
		assert_eq!(status_class(99), "other");
		assert_eq!(status_class(600), "other");
	}

	#[tokio::test]
	async fn observe_passes_results_through() {
		record_refresh_role(RefreshRole::Follower);

		let value = observe(OpKind::Guard, "guard", async {
			record_response_status(401);

			Ok(RefreshRole::Leader.to_string())
		})
		.await
		.expect("Observed future should resolve.");

		assert_eq!(value, "leader");

		let err = observe(OpKind::Request, "execute", async {
			Err::<(), _>(Error::Timeout { after: Duration::milliseconds(5) })
		})
		.await
		.expect_err("Failures should pass through.");

		assert!(matches!(err, Error::Timeout { .. }));
	}
}
