//! Client credentials grant for the reserved service key.

// self
use crate::{
	_prelude::*,
	auth::{SubjectKey, TokenRecord},
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
	/// Mints an app-only token for [`SubjectKey::SERVICE`] with the web API client.
	///
	/// Requests [`Self::client_credentials_scope`]; the result never carries a refresh token
	/// unless the authority volunteers one.
	pub async fn client_credentials_grant(&self) -> Result<TokenRecord> {
		const KIND: FlowKind = FlowKind::ClientCredentials;

		let span = FlowSpan::new(KIND, "client_credentials_grant");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.ensure_supported(GrantType::ClientCredentials)?;

				let issued_at = OffsetDateTime::now_utc();
				let issued = self
					.api_client
					.exchange_client_credentials(
						self.strategy.as_ref(),
						&self.client_credentials_scope,
					)
					.await?;

				issued.into_record(
					SubjectKey::service(),
					self.client_credentials_scope.clone(),
					issued_at,
				)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
