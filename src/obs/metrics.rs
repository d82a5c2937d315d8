// self
use crate::obs::{OpKind, OpOutcome, RefreshRole};

/// Bumps `crm_session_op_total{op, outcome}`.
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"crm_session_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Bumps `crm_session_refresh_role_total{role}` once per gate admission.
pub fn count_refresh_role(role: RefreshRole) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("crm_session_refresh_role_total", "role" => role.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = role;
	}
}

/// Bumps `crm_session_response_total{class}` for every response the pipeline receives.
pub fn count_response_class(class: &'static str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("crm_session_response_total", "class" => class).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = class;
	}
}
