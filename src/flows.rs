//! The token broker: cache lookups, grant orchestration, and explicit cache operations.
//!
//! [`TokenBroker::valid_token`] is the entry point hosts call before every API request. The
//! grants it falls back to are exposed individually as well
//! ([`TokenBroker::refresh_grant`], [`TokenBroker::exchange_grant`],
//! [`TokenBroker::client_credentials_grant`]) for hosts that manage caching themselves.

pub mod common;

mod acquire;
mod cache;
mod client_credentials;
mod exchange;
mod metrics;
mod refresh;

pub use common::*;
pub use metrics::BrokerMetrics;

// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	config::AuthEnvironmentConfig,
	error::ConfigError,
	http::TokenHttpClient,
	oauth::{BasicFacade, ClientIdentity, TransportErrorMapper},
	provider::{AuthorityDescriptor, GrantType, ProviderStrategy},
	store::TokenStore,
};
#[cfg(feature = "reqwest")]
use crate::{
	http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper,
	provider::DefaultProviderStrategy,
};

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenBroker = TokenBroker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Hands out bearer tokens per subject against a single authorization server.
///
/// The broker owns two client identities: the web client, which refreshes the tokens users
/// obtained at sign-in, and the web API client, which exchanges sign-in tokens for
/// API-scoped tokens and runs the client credentials grant for the service key.
#[derive(Clone)]
pub struct TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Process-wide token cache.
	pub store: Arc<dyn TokenStore>,
	/// Token endpoint, enabled grants, and client authentication method.
	pub descriptor: AuthorityDescriptor,
	/// Hooks for request decoration and error classification.
	pub strategy: Arc<dyn ProviderStrategy>,
	/// Scopes requested by the token exchange grant.
	pub exchange_scope: ScopeSet,
	/// Scopes requested by the client credentials grant.
	pub client_credentials_scope: ScopeSet,
	/// In-process counters for cache and grant outcomes.
	pub metrics: Arc<BrokerMetrics>,
	web_client: Arc<BasicFacade<C, M>>,
	api_client: Arc<BasicFacade<C, M>>,
	flow_guards: Arc<FlowGuardMap>,
}
impl<C, M> TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds a broker for `config` on top of a caller-provided transport and error mapper.
	pub fn with_http_client(
		store: Arc<dyn TokenStore>,
		config: &AuthEnvironmentConfig,
		strategy: Arc<dyn ProviderStrategy>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let parts = BrokerParts {
			descriptor: AuthorityDescriptor::from_config(config)?,
			web_client: ClientIdentity::new(&config.web_client_id, &config.client_secret),
			api_client: ClientIdentity::new(&config.web_api_client_id, &config.client_secret),
			api_scopes: config.api_scopes.clone(),
		};

		Self::from_parts(store, parts, strategy, http_client, mapper)
	}

	/// Builds a broker from an explicit descriptor and client identities.
	pub fn from_parts(
		store: Arc<dyn TokenStore>,
		parts: BrokerParts,
		strategy: Arc<dyn ProviderStrategy>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let http_client = http_client.into();
		let mapper = mapper.into();
		let web_client = BasicFacade::from_descriptor(
			&parts.descriptor,
			parts.web_client,
			http_client.clone(),
			mapper.clone(),
		)?;
		let api_client = BasicFacade::from_descriptor(
			&parts.descriptor,
			parts.api_client,
			http_client,
			mapper,
		)?;
		let exchange_scope =
			ScopeSet::for_exchange(parts.api_scopes.iter().cloned()).map_err(ConfigError::from)?;
		let client_credentials_scope =
			ScopeSet::new(parts.api_scopes).map_err(ConfigError::from)?;

		Ok(Self {
			store,
			descriptor: parts.descriptor,
			strategy,
			exchange_scope,
			client_credentials_scope,
			metrics: Default::default(),
			web_client: Arc::new(web_client),
			api_client: Arc::new(api_client),
			flow_guards: Default::default(),
		})
	}

	fn ensure_supported(&self, grant: GrantType) -> Result<()> {
		if self.descriptor.supports(grant) {
			Ok(())
		} else {
			Err(ConfigError::UnsupportedGrant { grant }.into())
		}
	}
}
#[cfg(feature = "reqwest")]
impl TokenBroker<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Builds a broker with its own reqwest transport and the default provider strategy.
	///
	/// The transport does not follow redirects; token endpoints answer directly.
	pub fn new(store: Arc<dyn TokenStore>, config: &AuthEnvironmentConfig) -> Result<Self> {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.map_err(ConfigError::from)?;

		Self::with_http_client(
			store,
			config,
			Arc::new(DefaultProviderStrategy),
			ReqwestHttpClient::with_client(client),
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> Debug for TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenBroker")
			.field("descriptor", &self.descriptor)
			.field("web_client_id", &self.web_client.client_id())
			.field("web_api_client_id", &self.api_client.client_id())
			.field("exchange_scope", &self.exchange_scope)
			.field("client_credentials_scope", &self.client_credentials_scope)
			.finish()
	}
}

/// Explicit inputs for [`TokenBroker::from_parts`].
#[derive(Clone, Debug)]
pub struct BrokerParts {
	/// Validated authority descriptor.
	pub descriptor: AuthorityDescriptor,
	/// Client that refreshes sign-in tokens.
	pub web_client: ClientIdentity,
	/// Client that exchanges tokens and runs client credentials.
	pub api_client: ClientIdentity,
	/// API scope names.
	pub api_scopes: Vec<String>,
}
