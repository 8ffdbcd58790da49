#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use kinauna_auth::{
	_preludet::*,
	auth::{SubjectKey, TokenSecret},
	config::DeploymentEnvironment,
	flows::TokenBroker,
	oauth::ReqwestTransportErrorMapper,
	provider::{
		AuthorityDescriptor, AuthorityDescriptorError, ClientAuthMethod, DefaultProviderStrategy,
		GrantType, ProviderErrorContext, ProviderErrorKind, ProviderStrategy,
	},
	store::{MemoryStore, TokenStore},
};

fn url(value: &str) -> Url {
	Url::parse(value).expect("Failed to parse mock authority URL.")
}

#[test]
fn descriptor_rejects_insecure_endpoints_and_missing_grants() {
	let err = AuthorityDescriptor::builder(url("https://auth.kinauna.com/connect/token"))
		.build()
		.expect_err("Descriptor builder should reject missing grants.");

	assert_eq!(err, AuthorityDescriptorError::NoSupportedGrants);

	let err = AuthorityDescriptor::builder(url("http://auth.kinauna.com/connect/token"))
		.support_grant(GrantType::ClientCredentials)
		.build()
		.expect_err("Plain HTTP must be rejected for public hosts.");

	assert!(matches!(err, AuthorityDescriptorError::InsecureEndpoint { .. }));

	for loopback in ["http://localhost:5001/connect/token", "http://127.0.0.1:5001/connect/token"] {
		AuthorityDescriptor::builder(url(loopback))
			.support_grant(GrantType::RefreshToken)
			.build()
			.expect("Loopback authorities may use plain HTTP.");
	}
}

#[test]
fn descriptor_support_helpers_cover_flags() {
	let descriptor = AuthorityDescriptor::builder(url("https://auth.kinauna.com/connect/token"))
		.support_grants([GrantType::RefreshToken, GrantType::TokenExchange])
		.build()
		.expect("Descriptor builder should succeed for secure endpoints.");

	assert!(descriptor.supports(GrantType::RefreshToken));
	assert!(descriptor.supports(GrantType::TokenExchange));
	assert!(!descriptor.supports(GrantType::ClientCredentials));
	assert_eq!(descriptor.client_auth_method, ClientAuthMethod::ClientSecretBasic);
}

#[test]
fn descriptor_from_config_targets_connect_token() {
	let config = test_config("https://auth.kinauna.com/");
	let descriptor =
		AuthorityDescriptor::from_config(&config).expect("Descriptor should derive from config.");

	assert_eq!(descriptor.token_endpoint.as_str(), "https://auth.kinauna.com/connect/token");
	assert_eq!(descriptor.client_auth_method, ClientAuthMethod::ClientSecretPost);
	assert!(descriptor.supports(GrantType::RefreshToken));
	assert!(descriptor.supports(GrantType::TokenExchange));
	assert!(descriptor.supports(GrantType::ClientCredentials));
	assert_eq!(config.environment, DeploymentEnvironment::Local);
}

#[test]
fn default_strategy_prefers_oauth_error_fields() {
	let strategy = DefaultProviderStrategy;
	let ctx = ProviderErrorContext::new(GrantType::TokenExchange)
		.with_http_status(400)
		.with_oauth_error("invalid_grant");

	assert_eq!(strategy.classify_token_error(&ctx), ProviderErrorKind::InvalidGrant);

	let ctx = ProviderErrorContext::new(GrantType::ClientCredentials)
		.with_http_status(401)
		.with_oauth_error("invalid_client");

	assert_eq!(strategy.classify_token_error(&ctx), ProviderErrorKind::InvalidClient);
}

#[test]
fn default_strategy_reads_error_description_when_missing_error_code() {
	let strategy = DefaultProviderStrategy;
	let ctx = ProviderErrorContext::new(GrantType::RefreshToken)
		.with_http_status(500)
		.with_error_description("invalid_grant: refresh token already redeemed");

	assert_eq!(strategy.classify_token_error(&ctx), ProviderErrorKind::InvalidGrant);
}

struct ResourceStrategy;
impl ProviderStrategy for ResourceStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		DefaultProviderStrategy.classify_token_error(ctx)
	}

	fn augment_token_request(&self, grant: GrantType, form: &mut BTreeMap<String, String>) {
		form.insert("resource".into(), format!("kinauna:{grant}"));
	}
}

#[tokio::test]
async fn custom_strategy_augments_exchange_requests() {
	let server = MockServer::start_async().await;
	let store: Arc<dyn TokenStore> = Arc::new(MemoryStore::default());
	let strategy: Arc<dyn ProviderStrategy> = Arc::new(ResourceStrategy);
	let broker = TokenBroker::with_http_client(
		store,
		&test_config(&server.base_url()),
		strategy,
		test_reqwest_http_client(),
		ReqwestTransportErrorMapper,
	)
	.expect("Broker should build with a custom strategy.");
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/connect/token")
				.form_urlencoded_tuple("resource", "kinauna:token_exchange");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"api","token_type":"Bearer","expires_in":600}"#);
		})
		.await;
	let record = broker
		.exchange_grant(
			&SubjectKey::new("user-42").expect("Subject fixture."),
			&TokenSecret::new("sign-in-token"),
		)
		.await
		.expect("Augmented exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(record.access_token.expose(), "api");
}
