//! Token endpoint client used by every grant.
//!
//! Refresh and client-credentials requests go through `oauth2`'s [`BasicClient`]. The
//! RFC 8693 token exchange is not modeled by `oauth2`, so [`BasicFacade::exchange_token`]
//! builds the form POST itself and sends it through the same [`TokenHttpClient`] handle.

pub use oauth2;

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use oauth2::{
	AsyncHttpClient, AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, RefreshToken, RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, SubjectKey, TokenRecord, TokenSecret},
	error::{ConfigError, TransientError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::{
		AuthorityDescriptor, ClientAuthMethod, GrantType, ProviderErrorContext,
		ProviderErrorKind, ProviderStrategy,
	},
};

/// RFC 8693 token type identifier for access tokens.
pub const ACCESS_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:access_token";

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Maps HTTP transport failures into broker [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a broker error.
	fn map_transport_error(
		&self,
		strategy: &dyn ProviderStrategy,
		grant: GrantType,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		_strategy: &dyn ProviderStrategy,
		_grant: GrantType,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => transient(
				format!("HTTP client error occurred while calling the token endpoint: {message}"),
				meta,
			),
			_ => transient("HTTP client error occurred while calling the token endpoint", meta),
		}
	}
}

/// Client id and secret presented to the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientIdentity {
	/// OAuth client identifier.
	pub id: String,
	/// Client secret.
	pub secret: String,
}
impl ClientIdentity {
	/// Creates an identity from an id and secret.
	pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
		Self { id: id.into(), secret: secret.into() }
	}
}
impl Debug for ClientIdentity {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientIdentity")
			.field("id", &self.id)
			.field("secret", &"<redacted>")
			.finish()
	}
}

/// Successful token endpoint response after field validation.
#[derive(Clone, Debug)]
pub(crate) struct IssuedToken {
	pub(crate) access_token: TokenSecret,
	pub(crate) refresh_token: Option<TokenSecret>,
	pub(crate) expires_in: Duration,
}
impl IssuedToken {
	pub(crate) fn into_record(
		self,
		subject: SubjectKey,
		scope: ScopeSet,
		issued_at: OffsetDateTime,
	) -> Result<TokenRecord> {
		TokenRecord::builder(subject, scope)
			.access_token(self.access_token.expose())
			.maybe_refresh_token(self.refresh_token)
			.issued_at(issued_at)
			.expires_in(self.expires_in)
			.build()
			.map_err(|err| ConfigError::from(err).into())
	}
}

pub(crate) trait OAuth2Facade {
	fn refresh_token<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		refresh_token: &'a TokenSecret,
	) -> FacadeFuture<'a, IssuedToken>;

	fn exchange_token<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		subject_token: &'a TokenSecret,
		scope: &'a ScopeSet,
	) -> FacadeFuture<'a, IssuedToken>;

	fn exchange_client_credentials<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		scope: &'a ScopeSet,
	) -> FacadeFuture<'a, IssuedToken>;
}

/// Token endpoint client bound to one client identity.
pub(crate) struct BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	token_endpoint: Url,
	identity: ClientIdentity,
	auth_method: ClientAuthMethod,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &AuthorityDescriptor,
		identity: ClientIdentity,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self> {
		let token_url = TokenUrl::new(descriptor.token_endpoint.to_string())
			.map_err(|source| ConfigError::InvalidTokenEndpoint { source })?;
		let mut oauth_client = BasicClient::new(ClientId::new(identity.id.clone()))
			.set_client_secret(ClientSecret::new(identity.secret.clone()))
			.set_token_uri(token_url);

		if matches!(descriptor.client_auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self {
			oauth_client,
			token_endpoint: descriptor.token_endpoint.clone(),
			identity,
			auth_method: descriptor.client_auth_method,
			http_client,
			error_mapper,
		})
	}

	pub(crate) fn client_id(&self) -> &str {
		&self.identity.id
	}

	fn exchange_request(
		&self,
		strategy: &dyn ProviderStrategy,
		subject_token: &TokenSecret,
		scope: &ScopeSet,
	) -> Result<Request<Vec<u8>>> {
		let mut form = BTreeMap::from([
			("grant_type".to_owned(), GrantType::TokenExchange.as_str().to_owned()),
			("subject_token".to_owned(), subject_token.expose().to_owned()),
			("subject_token_type".to_owned(), ACCESS_TOKEN_TYPE.to_owned()),
			("requested_token_type".to_owned(), ACCESS_TOKEN_TYPE.to_owned()),
		]);

		if !scope.is_empty() {
			form.insert("scope".into(), scope.normalized());
		}

		let mut builder = Request::builder()
			.method(Method::POST)
			.uri(self.token_endpoint.as_str())
			.header(ACCEPT, "application/json")
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded");

		match self.auth_method {
			ClientAuthMethod::ClientSecretBasic => {
				let encode =
					|raw: &str| form_urlencoded::byte_serialize(raw.as_bytes()).collect::<String>();
				let credentials = STANDARD.encode(format!(
					"{}:{}",
					encode(&self.identity.id),
					encode(&self.identity.secret)
				));

				builder = builder.header(AUTHORIZATION, format!("Basic {credentials}"));
			},
			ClientAuthMethod::ClientSecretPost => {
				form.insert("client_id".into(), self.identity.id.clone());
				form.insert("client_secret".into(), self.identity.secret.clone());
			},
		}

		strategy.augment_token_request(GrantType::TokenExchange, &mut form);

		let body =
			form_urlencoded::Serializer::new(String::new()).extend_pairs(form.iter()).finish();

		Ok(builder.body(body.into_bytes()).map_err(ConfigError::from)?)
	}

	fn map_request_error(
		&self,
		strategy: &dyn ProviderStrategy,
		grant: GrantType,
		meta: Option<ResponseMetadata>,
		err: BasicRequestTokenError<HttpClientError<C::TransportError>>,
	) -> Error {
		let meta = meta.as_ref();
		let status = meta.and_then(|value| value.status);
		let failed_status = status.filter(|code| !(200..300).contains(code));

		match err {
			RequestTokenError::ServerResponse(response) =>
				map_error_response(strategy, grant, &response, meta),
			RequestTokenError::Request(error) =>
				self.error_mapper.map_transport_error(strategy, grant, meta, error),
			RequestTokenError::Parse(source, body) => match failed_status {
				Some(code) => {
					let ctx = ProviderErrorContext::new(grant)
						.with_http_status(code)
						.with_body_preview(String::from_utf8_lossy(&body));

					map_provider_failure(strategy, ctx, meta)
				},
				// A 2xx body that only lacks the token is a protocol failure, not an outage.
				None => match serde_json::from_slice::<LenientTokenResponse>(&body)
					.map(|response| response.into_issued(grant))
				{
					Ok(Err(incomplete)) => incomplete,
					_ => TransientError::TokenResponseParse { source, status }.into(),
				},
			},
			RequestTokenError::Other(message) => match failed_status {
				Some(code) => map_provider_failure(
					strategy,
					ProviderErrorContext::new(grant).with_http_status(code),
					meta,
				),
				None => transient(message, meta),
			},
		}
	}
}
impl<C, M> OAuth2Facade for BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn refresh_token<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		refresh_token: &'a TokenSecret,
	) -> FacadeFuture<'a, IssuedToken> {
		const GRANT: GrantType = GrantType::RefreshToken;

		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let refresh_secret = RefreshToken::new(refresh_token.expose().to_owned());
			let mut request = self.oauth_client.exchange_refresh_token(&refresh_secret);

			for (key, value) in augmented_params(strategy, GRANT) {
				request = request.add_extra_param(key, value);
			}

			let response = request
				.request_async(&instrumented)
				.await
				.map_err(|err| self.map_request_error(strategy, GRANT, meta.take(), err))?;
			let issued = issued_from_standard(GRANT, &response)?;

			if issued.refresh_token.is_none() {
				return Err(Error::IncompleteResponse { grant: GRANT, field: "refresh_token" });
			}

			Ok(issued)
		})
	}

	fn exchange_token<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		subject_token: &'a TokenSecret,
		scope: &'a ScopeSet,
	) -> FacadeFuture<'a, IssuedToken> {
		const GRANT: GrantType = GrantType::TokenExchange;

		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let request = self.exchange_request(strategy, subject_token, scope)?;
			let response = instrumented.call(request).await.map_err(|err| {
				self.error_mapper.map_transport_error(strategy, GRANT, meta.take().as_ref(), err)
			})?;
			let status = response.status().as_u16();
			let meta =
				meta.take().unwrap_or(ResponseMetadata { status: Some(status), retry_after: None });

			if !response.status().is_success() {
				let body = response.body();
				let ctx = match serde_json::from_slice::<BasicErrorResponse>(body) {
					Ok(error) =>
						return Err(map_error_response(strategy, GRANT, &error, Some(&meta))),
					Err(_) => ProviderErrorContext::new(GRANT)
						.with_http_status(status)
						.with_body_preview(String::from_utf8_lossy(body)),
				};

				return Err(map_provider_failure(strategy, ctx, Some(&meta)));
			}

			let parsed: LenientTokenResponse = serde_path_to_error::deserialize(
				&mut serde_json::Deserializer::from_slice(response.body()),
			)
			.map_err(|source| TransientError::TokenResponseParse { source, status: Some(status) })?;

			parsed.into_issued(GRANT)
		})
	}

	fn exchange_client_credentials<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		scope: &'a ScopeSet,
	) -> FacadeFuture<'a, IssuedToken> {
		const GRANT: GrantType = GrantType::ClientCredentials;

		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let mut request = self
				.oauth_client
				.exchange_client_credentials()
				.add_scopes(scope.iter().map(|value| Scope::new(value.to_owned())));

			for (key, value) in augmented_params(strategy, GRANT) {
				request = request.add_extra_param(key, value);
			}

			let response = request
				.request_async(&instrumented)
				.await
				.map_err(|err| self.map_request_error(strategy, GRANT, meta.take(), err))?;

			issued_from_standard(GRANT, &response)
		})
	}
}

/// Token response with every field optional, so missing values map to
/// [`Error::IncompleteResponse`] instead of a parse failure.
#[derive(Deserialize)]
struct LenientTokenResponse {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	refresh_token: Option<String>,
}
impl LenientTokenResponse {
	fn into_issued(self, grant: GrantType) -> Result<IssuedToken> {
		let access_token = self
			.access_token
			.filter(|value| !value.is_empty())
			.ok_or(Error::IncompleteResponse { grant, field: "access_token" })?;
		let expires_in = self
			.expires_in
			.filter(|secs| *secs > 0)
			.ok_or(Error::IncompleteResponse { grant, field: "expires_in" })?;

		Ok(IssuedToken {
			access_token: TokenSecret::new(access_token),
			refresh_token: self
				.refresh_token
				.filter(|value| !value.is_empty())
				.map(TokenSecret::new),
			expires_in: Duration::seconds(expires_in),
		})
	}
}

fn issued_from_standard(grant: GrantType, response: &BasicTokenResponse) -> Result<IssuedToken> {
	let access_token = response.access_token().secret();

	if access_token.is_empty() {
		return Err(Error::IncompleteResponse { grant, field: "access_token" });
	}

	let expires_in = response
		.expires_in()
		.map(|value| value.as_secs())
		.filter(|secs| *secs > 0)
		.ok_or(Error::IncompleteResponse { grant, field: "expires_in" })?;
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	Ok(IssuedToken {
		access_token: TokenSecret::new(access_token.as_str()),
		refresh_token: response
			.refresh_token()
			.map(|token| token.secret())
			.filter(|value| !value.is_empty())
			.map(|value| TokenSecret::new(value.as_str())),
		expires_in: Duration::seconds(expires_in),
	})
}

fn augmented_params(
	strategy: &dyn ProviderStrategy,
	grant: GrantType,
) -> BTreeMap<String, String> {
	let mut params = BTreeMap::new();

	strategy.augment_token_request(grant, &mut params);

	params
}

fn map_error_response(
	strategy: &dyn ProviderStrategy,
	grant: GrantType,
	response: &BasicErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> Error {
	let code: &str = response.error().as_ref();
	let mut ctx = ProviderErrorContext::new(grant).with_oauth_error(code);

	if let Some(description) = response.error_description() {
		ctx = ctx.with_error_description(description.as_str());
	}
	if let Some(status) = meta.and_then(|value| value.status) {
		ctx = ctx.with_http_status(status);
	}

	map_provider_failure(strategy, ctx, meta)
}

fn map_provider_failure(
	strategy: &dyn ProviderStrategy,
	ctx: ProviderErrorContext,
	meta: Option<&ResponseMetadata>,
) -> Error {
	let grant = ctx.grant_type;
	let status = ctx.http_status;
	let reason = ctx.reason();

	match strategy.classify_token_error(&ctx) {
		ProviderErrorKind::InvalidGrant => Error::InvalidGrant { grant, reason, status },
		ProviderErrorKind::InvalidClient => Error::InvalidClient { grant, reason, status },
		ProviderErrorKind::InsufficientScope => Error::InsufficientScope { grant, reason, status },
		ProviderErrorKind::Transient => TransientError::TokenEndpoint {
			message: reason,
			status,
			retry_after: meta.and_then(|value| value.retry_after),
		}
		.into(),
	}
}

fn transient(message: impl Into<String>, meta: Option<&ResponseMetadata>) -> Error {
	TransientError::TokenEndpoint {
		message: message.into(),
		status: meta.and_then(|value| value.status),
		retry_after: meta.and_then(|value| value.retry_after),
	}
	.into()
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::TokenEndpoint {
			message: "Request timed out while calling the token endpoint".into(),
			status: meta
				.and_then(|value| value.status)
				.or_else(|| err.status().map(|code| code.as_u16())),
			retry_after: meta.and_then(|value| value.retry_after),
		}
		.into();
	}

	TransportError::from(err).into()
}
