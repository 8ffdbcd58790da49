//! Authority descriptor data structures shared by all grants.

/// Builder API for assembling authority descriptors.
pub mod builder;
/// Grant identifiers and the flag set wired into descriptors.
pub mod grant;

pub use builder::*;
pub use grant::*;

// self
use crate::{_prelude::*, config::AuthEnvironmentConfig, error::ConfigError};

/// Client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Immutable description of the authorization server consumed by flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityDescriptor {
	/// Token endpoint used by every grant.
	pub token_endpoint: Url,
	/// Enabled grant flags.
	pub supported_grants: SupportedGrants,
	/// Client authentication mechanism.
	pub client_auth_method: ClientAuthMethod,
}
impl AuthorityDescriptor {
	/// Creates a new builder for the provided token endpoint.
	pub fn builder(token_endpoint: Url) -> AuthorityDescriptorBuilder {
		AuthorityDescriptorBuilder::new(token_endpoint)
	}

	/// Descriptor for an OpenIddict-style authority: `<authority>/connect/token` with the
	/// refresh, token-exchange, and client-credentials grants enabled and form-posted client
	/// credentials.
	pub fn from_config(config: &AuthEnvironmentConfig) -> Result<Self, ConfigError> {
		Ok(Self::builder(config.token_endpoint()?)
			.support_grants([
				GrantType::RefreshToken,
				GrantType::TokenExchange,
				GrantType::ClientCredentials,
			])
			.client_auth_method(ClientAuthMethod::ClientSecretPost)
			.build()?)
	}

	/// Checks whether the descriptor enables a given grant.
	pub fn supports(&self, grant: GrantType) -> bool {
		self.supported_grants.supports(grant)
	}
}
