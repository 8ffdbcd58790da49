//! Per-request view of the signed-in user, supplied by the host.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ContextError};

/// Authentication state of the inbound request that needs an API token.
///
/// The host builds one per request from its own session (cookie, OIDC sign-in) and hands it
/// to the broker so a user's sign-in token can be exchanged for an API-scoped token.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
	/// Whether the request's user passed sign-in.
	pub authenticated: bool,
	/// Access token obtained during sign-in, if the session stored one.
	pub access_token: Option<TokenSecret>,
}
impl RequestContext {
	/// Context for a signed-in user holding the provided sign-in access token.
	pub fn authenticated(access_token: impl Into<String>) -> Self {
		Self { authenticated: true, access_token: Some(TokenSecret::new(access_token)) }
	}

	/// Context for an anonymous request.
	pub fn anonymous() -> Self {
		Self::default()
	}

	/// Returns the subject token usable for a token exchange.
	pub fn subject_token(&self) -> Result<&TokenSecret, ContextError> {
		if !self.authenticated {
			return Err(ContextError::NotAuthenticated);
		}

		self.access_token
			.as_ref()
			.filter(|secret| !secret.is_empty())
			.ok_or(ContextError::MissingAccessToken)
	}
}
