//! RFC 8693 token exchange against the web API client.

// self
use crate::{
	_prelude::*,
	auth::{SubjectKey, TokenRecord, TokenSecret},
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
	/// Exchanges `subject_token` (a user's access token) for an API-scoped token.
	///
	/// Requests [`Self::exchange_scope`] with the web API client. A refresh token in the
	/// response is kept on the returned record.
	pub async fn exchange_grant(
		&self,
		subject: &SubjectKey,
		subject_token: &TokenSecret,
	) -> Result<TokenRecord> {
		const KIND: FlowKind = FlowKind::TokenExchange;

		let span = FlowSpan::for_subject(KIND, "exchange_grant", subject);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.ensure_supported(GrantType::TokenExchange)?;

				if subject_token.is_empty() {
					return Err(Error::invalid_argument("subject_token", "cannot be empty"));
				}

				let issued_at = OffsetDateTime::now_utc();
				let issued = self
					.api_client
					.exchange_token(self.strategy.as_ref(), subject_token, &self.exchange_scope)
					.await?;

				issued.into_record(subject.clone(), self.exchange_scope.clone(), issued_at)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
