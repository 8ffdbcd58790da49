//! Attaches cached bearer tokens to outbound API requests.

// self
use crate::auth::TokenRecord;

/// Attaches a [`TokenRecord`] to an outbound request of any HTTP client.
pub trait RequestSignerExt<Request, Error>
where
	Self: Send + Sync,
{
	/// Returns `request` carrying the authorization derived from `record`.
	fn attach_token(&self, request: Request, record: &TokenRecord) -> Result<Request, Error>;
}

/// Signs reqwest requests with `Authorization: Bearer <access token>`.
#[cfg(feature = "reqwest")]
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerSigner;
#[cfg(feature = "reqwest")]
impl RequestSignerExt<reqwest::RequestBuilder, std::convert::Infallible> for BearerSigner {
	fn attach_token(
		&self,
		request: reqwest::RequestBuilder,
		record: &TokenRecord,
	) -> Result<reqwest::RequestBuilder, std::convert::Infallible> {
		Ok(request.bearer_auth(record.access_token.expose()))
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// crates.io
	use reqwest::header::AUTHORIZATION;
	// self
	use super::*;
	use crate::{
		_prelude::*,
		auth::{ScopeSet, SubjectKey},
	};

	#[test]
	fn bearer_signer_sets_authorization_header() {
		let record = TokenRecord::builder(SubjectKey::service(), ScopeSet::default())
			.access_token("api-token")
			.expires_in(Duration::minutes(5))
			.build()
			.expect("Record fixture should build.");
		let Ok(builder) = BearerSigner
			.attach_token(ReqwestClient::new().get("https://api.kinauna.com/progeny"), &record);
		let request = builder.build().expect("Request should build.");

		assert_eq!(
			request.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok()),
			Some("Bearer api-token")
		);
	}
}
