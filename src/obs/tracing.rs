// self
use crate::{_prelude::*, auth::SubjectKey, obs::FlowKind};

/// Future returned by [`FlowSpan::instrument`]; a plain passthrough without `tracing`.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`FlowSpan::instrument`]; a plain passthrough without `tracing`.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span around one broker flow, named `kinauna_auth.flow`.
///
/// `valid_token` opens an `acquire` span for the cache lookup. The refresh, exchange and
/// client credentials grants it falls through to nest their own spans inside it, so a single
/// acquisition reads as cache check, refresh, exchange, commit. `stage` names the public
/// method that opened the span. Only the subject key is recorded, never a token.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Span for a flow that is not tied to a user, such as the client credentials grant.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			Self { span: tracing::info_span!("kinauna_auth.flow", flow = kind.as_str(), stage) }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Span for a flow acting on behalf of `subject`.
	pub fn for_subject(kind: FlowKind, stage: &'static str, subject: &SubjectKey) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"kinauna_auth.flow",
				flow = kind.as_str(),
				stage,
				subject = %subject,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage, subject);

			Self {}
		}
	}

	/// Runs `fut` inside the span; no guard is held across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
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

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn subject_span_passes_output_through() {
		let subject = SubjectKey::new("user-42").expect("Subject fixture should be valid.");
		let outer = FlowSpan::for_subject(FlowKind::Acquire, "valid_token", &subject);
		let inner = FlowSpan::new(FlowKind::ClientCredentials, "client_credentials_grant");
		let value = outer.instrument(async { inner.instrument(async { 42 }).await }).await;

		assert_eq!(value, 42);
	}
}
