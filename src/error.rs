//! Broker-level error types shared across flows, configuration, and stores.

// self
use crate::{_prelude::*, provider::GrantType};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
///
/// Callers decide between retrying and forcing the user through sign-in again with
/// [`Error::is_retryable`] and [`Error::requires_reauthentication`].
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// No usable subject token could be read from the request context.
	#[error(transparent)]
	Context(#[from] ContextError),

	/// Provider rejected the grant (e.g., expired refresh token or foreign subject token).
	#[error("Provider rejected the {grant} grant: {reason}.")]
	InvalidGrant {
		/// Grant that was rejected.
		grant: GrantType,
		/// Provider- or broker-supplied reason string.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed during the {grant} grant: {reason}.")]
	InvalidClient {
		/// Grant that was rejected.
		grant: GrantType,
		/// Provider- or broker-supplied reason string.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Requested scopes exceed what the client may obtain.
	#[error("The {grant} grant was denied the requested scopes: {reason}.")]
	InsufficientScope {
		/// Grant that was rejected.
		grant: GrantType,
		/// Provider- or broker-supplied reason string.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint answered successfully but omitted a required field.
	#[error("Token endpoint response for the {grant} grant is missing a usable {field}.")]
	IncompleteResponse {
		/// Grant whose response was incomplete.
		grant: GrantType,
		/// Name of the missing or unusable response field.
		field: &'static str,
	},
	/// Caller supplied an unusable argument to an explicit cache operation.
	#[error("Invalid {name}: {reason}.")]
	InvalidArgument {
		/// Argument name.
		name: &'static str,
		/// Validation failure summary.
		reason: String,
	},
}
impl Error {
	/// Returns `true` when the failure can only be resolved by signing the user out and
	/// running the interactive sign-in again.
	pub fn requires_reauthentication(&self) -> bool {
		matches!(
			self,
			Self::Context(_)
				| Self::InvalidGrant { .. }
				| Self::InvalidClient { .. }
				| Self::InsufficientScope { .. }
				| Self::IncompleteResponse { .. }
		)
	}

	/// Returns `true` for temporary upstream or network failures.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Transient(_) | Self::Transport(_))
	}

	/// HTTP status attached to the failure, when the provider answered.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::InvalidGrant { status, .. }
			| Self::InvalidClient { status, .. }
			| Self::InsufficientScope { status, .. } => *status,
			Self::Transient(TransientError::TokenEndpoint { status, .. })
			| Self::Transient(TransientError::TokenResponseParse { status, .. }) => *status,
			_ => None,
		}
	}

	pub(crate) fn invalid_argument(name: &'static str, reason: impl Display) -> Self {
		Self::InvalidArgument { name, reason: reason.to_string() }
	}
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A required configuration key is absent or blank.
	#[error("Configuration key `{key}` is missing.")]
	MissingSetting {
		/// Fully suffixed configuration key.
		key: String,
	},
	/// Authority URL cannot be parsed.
	#[error("Configuration key `{key}` does not hold a valid URL.")]
	InvalidAuthority {
		/// Fully suffixed configuration key.
		key: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Deployment environment name is not recognized.
	#[error("Unknown deployment environment `{name}`.")]
	UnknownEnvironment {
		/// Raw environment name.
		name: String,
	},
	/// Authority descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::AuthorityDescriptorError),
	/// Token endpoint URL is not accepted by the OAuth client.
	#[error("Token endpoint URL is invalid.")]
	InvalidTokenEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Descriptor does not enable the requested grant.
	#[error("Authority does not enable the {grant} grant.")]
	UnsupportedGrant {
		/// Disabled grant.
		grant: GrantType,
	},
	/// Request scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Token record builder validation failed.
	#[error("Unable to build token record.")]
	TokenBuild(#[from] crate::auth::TokenRecordBuilderError),
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Provider- or broker-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Reasons a request context could not provide a subject token for exchange.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ContextError {
	/// The caller did not supply a request context.
	#[error("No request context is available and no cached token can be refreshed.")]
	Missing,
	/// The request context belongs to an anonymous user.
	#[error("The request context user is not authenticated.")]
	NotAuthenticated,
	/// The request context is authenticated but carries no access token.
	#[error("The request context does not carry an access token.")]
	MissingAccessToken,
}
