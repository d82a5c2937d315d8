// self
use crate::{_prelude::*, obs::OpKind};

/// Future returned by [`OpSpan::instrument`]; a plain passthrough without the `tracing` feature.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`OpSpan::instrument`]; a plain passthrough without the `tracing` feature.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// `crm_session.op` span wrapped around one client operation.
///
/// `refresh_role` and `status_class` start empty and are filled in through
/// [`record_span_field`] once the request reaches the gate or gets a response.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Opens the span for `kind`, tagged with the public method that started it.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"crm_session.op",
				op = kind.as_str(),
				stage,
				refresh_role = tracing::field::Empty,
				status_class = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Attaches the span to `fut` for every poll.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Fills `field` on the innermost operation span; later values replace earlier ones.
pub fn record_span_field(field: &'static str, value: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::Span::current().record(field, value);
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (field, value);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn fields_can_be_filled_inside_an_instrumented_request() {
		let span = OpSpan::new(OpKind::Request, "execute");
		let status = span
			.instrument(async {
				record_span_field("status_class", "4xx");
				record_span_field("refresh_role", "leader");

				401
			})
			.await;

		assert_eq!(status, 401);
	}
}
