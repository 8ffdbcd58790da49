// self
use crate::{
	_prelude::*,
	provider::{AuthorityDescriptor, ClientAuthMethod, GrantType, SupportedGrants},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum AuthorityDescriptorError {
	/// At least one grant must be supported.
	#[error("Descriptor must enable at least one grant type.")]
	NoSupportedGrants,
	/// Token endpoint must use HTTPS unless it points at a loopback host.
	#[error("The token endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Builder for [`AuthorityDescriptor`] values.
#[derive(Debug)]
pub struct AuthorityDescriptorBuilder {
	/// Token endpoint used by every grant.
	pub token_endpoint: Url,
	/// Grants enabled for the authority.
	pub supported_grants: SupportedGrants,
	/// Client authentication method for the token endpoint.
	pub client_auth_method: ClientAuthMethod,
}
impl AuthorityDescriptorBuilder {
	/// Creates a new builder for the provided token endpoint.
	pub fn new(token_endpoint: Url) -> Self {
		Self {
			token_endpoint,
			supported_grants: SupportedGrants::default(),
			client_auth_method: ClientAuthMethod::default(),
		}
	}

	/// Marks a single grant type as supported.
	pub fn support_grant(mut self, grant: GrantType) -> Self {
		self.supported_grants = self.supported_grants.enable(grant);

		self
	}

	/// Marks multiple grants as supported.
	pub fn support_grants<I>(mut self, grants: I) -> Self
	where
		I: IntoIterator<Item = GrantType>,
	{
		for grant in grants {
			self.supported_grants = self.supported_grants.enable(grant);
		}

		self
	}

	/// Overrides the client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<AuthorityDescriptor, AuthorityDescriptorError> {
		let descriptor = AuthorityDescriptor {
			token_endpoint: self.token_endpoint,
			supported_grants: self.supported_grants,
			client_auth_method: self.client_auth_method,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl AuthorityDescriptor {
	fn validate(&self) -> Result<(), AuthorityDescriptorError> {
		if self.supported_grants.is_empty() {
			return Err(AuthorityDescriptorError::NoSupportedGrants);
		}

		validate_endpoint(&self.token_endpoint)
	}
}

// Local development authorities listen on plain HTTP loopback addresses.
fn validate_endpoint(url: &Url) -> Result<(), AuthorityDescriptorError> {
	let loopback = match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
		Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
		None => false,
	};

	if url.scheme() == "https" || (url.scheme() == "http" && loopback) {
		Ok(())
	} else {
		Err(AuthorityDescriptorError::InsecureEndpoint { url: url.to_string() })
	}
}
