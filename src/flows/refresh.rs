//! Refresh token grant against the web client.

// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	flows::TokenBroker,
	http::TokenHttpClient,
	oauth::{OAuth2Facade, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::GrantType,
};

impl<C, M> TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Redeems the refresh token of `record` with the web client.
	///
	/// The result keeps the subject and scope of `record`. The authority must answer with an
	/// access token, a refresh token, and a positive `expires_in`; anything less fails with
	/// [`Error::IncompleteResponse`]. No scope is sent, so the authority reissues the scopes
	/// of the original grant.
	pub async fn refresh_grant(&self, record: &TokenRecord) -> Result<TokenRecord> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::for_subject(KIND, "refresh_grant", &record.subject);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.ensure_supported(GrantType::RefreshToken)?;

				let refresh_token = record.refresh_token.as_ref().ok_or_else(|| {
					Error::invalid_argument("record", "the record carries no refresh token")
				})?;
				let issued_at = OffsetDateTime::now_utc();
				let issued =
					self.web_client.refresh_token(self.strategy.as_ref(), refresh_token).await?;
				let refreshed =
					issued.into_record(record.subject.clone(), record.scope.clone(), issued_at)?;

				self.metrics.record_refresh();

				Ok(refreshed)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
