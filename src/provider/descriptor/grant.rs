// self
use crate::_prelude::*;

/// OAuth 2.0 grant types the broker issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Refresh Token grant (RFC 6749 section 6).
	RefreshToken,
	/// Token Exchange grant (RFC 8693).
	TokenExchange,
	/// Client Credentials grant for app-only tokens.
	ClientCredentials,
}
impl GrantType {
	/// Returns the `grant_type` form value.
	pub fn as_str(self) -> &'static str {
		match self {
			GrantType::RefreshToken => "refresh_token",
			GrantType::TokenExchange => "urn:ietf:params:oauth:grant-type:token-exchange",
			GrantType::ClientCredentials => "client_credentials",
		}
	}

	/// Returns a short label for logs and error messages.
	pub fn label(self) -> &'static str {
		match self {
			GrantType::RefreshToken => "refresh_token",
			GrantType::TokenExchange => "token_exchange",
			GrantType::ClientCredentials => "client_credentials",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.label())
	}
}

/// Collection of grant flags wired into the descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedGrants {
	/// Indicates whether the Refresh Token grant is enabled.
	pub refresh_token: bool,
	/// Indicates whether the Token Exchange grant is enabled.
	pub token_exchange: bool,
	/// Indicates whether the Client Credentials grant is enabled.
	pub client_credentials: bool,
}
impl SupportedGrants {
	/// Returns true if the provided grant is supported.
	pub fn supports(self, grant: GrantType) -> bool {
		match grant {
			GrantType::RefreshToken => self.refresh_token,
			GrantType::TokenExchange => self.token_exchange,
			GrantType::ClientCredentials => self.client_credentials,
		}
	}

	/// Marks a grant as supported.
	pub fn enable(mut self, grant: GrantType) -> Self {
		match grant {
			GrantType::RefreshToken => self.refresh_token = true,
			GrantType::TokenExchange => self.token_exchange = true,
			GrantType::ClientCredentials => self.client_credentials = true,
		}

		self
	}

	/// Returns true when no grants are enabled.
	pub fn is_empty(self) -> bool {
		!self.refresh_token && !self.token_exchange && !self.client_credentials
	}
}
