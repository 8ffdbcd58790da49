#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use kinauna_auth::{
	_preludet::*,
	auth::{RequestContext, SubjectKey, TokenRecordBuilderError, TokenSecret},
	error::{ConfigError, ContextError},
	flows::TokenRequest,
	oauth::ACCESS_TOKEN_TYPE,
	provider::GrantType,
};

const EXCHANGE_GRANT: &str = "urn:ietf:params:oauth:grant-type:token-exchange";

fn subject() -> SubjectKey {
	SubjectKey::new("user-42").expect("Subject fixture should be valid.")
}

#[tokio::test]
async fn exchange_posts_rfc8693_form_with_api_client() {
	let server = MockServer::start_async().await;
	let (broker, store) = build_reqwest_test_broker(&test_config(&server.base_url()));
	let scope = broker.exchange_scope.normalized();
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/connect/token")
				.header("accept", "application/json")
				.form_urlencoded_tuple("grant_type", EXCHANGE_GRANT)
				.form_urlencoded_tuple("subject_token", "sign-in-token")
				.form_urlencoded_tuple("subject_token_type", ACCESS_TOKEN_TYPE)
				.form_urlencoded_tuple("scope", scope.as_str())
				.form_urlencoded_tuple("client_id", "kinauna-web-api")
				.form_urlencoded_tuple("client_secret", "web-secret");
			then.status(200).header("content-type", "application/json").body(
				serde_json::json!({
					"access_token": "api-access",
					"refresh_token": "api-refresh",
					"token_type": "Bearer",
					"expires_in": 3600,
				})
				.to_string(),
			);
		})
		.await;
	let before = OffsetDateTime::now_utc();
	let record = broker
		.exchange_grant(&subject(), &TokenSecret::new("sign-in-token"))
		.await
		.expect("Token exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(record.subject, subject());
	assert_eq!(record.access_token.expose(), "api-access");
	assert_eq!(record.refresh_token.as_ref().map(|secret| secret.expose()), Some("api-refresh"));
	assert!(record.scope.contains("openid"));
	assert!(record.scope.contains("offline_access"));
	assert!(record.scope.contains("progeny-api-local"));
	assert!(record.issued_at >= before);
	assert_eq!(record.expires_at, record.issued_at + Duration::hours(1));
	// The grant alone never touches the cache.
	assert!(store.is_empty());
}

#[tokio::test]
async fn exchange_maps_provider_rejections() {
	let server = MockServer::start_async().await;
	let (broker, _store) = build_reqwest_test_broker(&test_config(&server.base_url()));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/connect/token");
			then.status(400)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_grant","error_description":"subject token expired"}"#);
		})
		.await;
	let err = broker
		.exchange_grant(&subject(), &TokenSecret::new("stale-sign-in-token"))
		.await
		.expect_err("Rejected exchange should fail.");

	mock.assert_async().await;

	match err {
		Error::InvalidGrant { grant, reason, status } => {
			assert_eq!(grant, GrantType::TokenExchange);
			assert_eq!(reason, "invalid_grant: subject token expired");
			assert_eq!(status, Some(400));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
}

#[tokio::test]
async fn exchange_requires_positive_expiry() {
	let server = MockServer::start_async().await;
	let (broker, _store) = build_reqwest_test_broker(&test_config(&server.base_url()));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/connect/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"api-access","token_type":"Bearer"}"#);
		})
		.await;

	let err = broker
		.exchange_grant(&subject(), &TokenSecret::new("sign-in-token"))
		.await
		.expect_err("Responses without expires_in must be rejected.");

	assert!(
		matches!(
			err,
			Error::IncompleteResponse { grant: GrantType::TokenExchange, field: "expires_in" }
		),
		"Unexpected error: {err:?}."
	);
}

#[tokio::test]
async fn exchange_rejects_expiry_beyond_date_range() {
	let server = MockServer::start_async().await;
	let (broker, store) = build_reqwest_test_broker(&test_config(&server.base_url()));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/connect/token");
			then.status(200).header("content-type", "application/json").body(
				r#"{"access_token":"api-access","token_type":"Bearer","expires_in":1000000000000}"#,
			);
		})
		.await;

	let err = broker
		.exchange_grant(&subject(), &TokenSecret::new("sign-in-token"))
		.await
		.expect_err("Unrepresentable expiries must fail without panicking.");

	assert!(
		matches!(
			err,
			Error::Config(ConfigError::TokenBuild(TokenRecordBuilderError::ExpiryOutOfRange))
		),
		"Unexpected error: {err:?}."
	);
	assert!(store.is_empty());
}

#[tokio::test]
async fn exchange_surfaces_server_errors_as_transient() {
	let server = MockServer::start_async().await;
	let (broker, _store) = build_reqwest_test_broker(&test_config(&server.base_url()));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/connect/token");
			then.status(503).body("authority restarting");
		})
		.await;

	let err = broker
		.exchange_grant(&subject(), &TokenSecret::new("sign-in-token"))
		.await
		.expect_err("Unavailable authority should fail.");

	assert!(err.is_retryable(), "Unexpected error: {err:?}.");
	assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn acquisition_needs_a_signed_in_context() {
	let server = MockServer::start_async().await;
	let (broker, store) = build_reqwest_test_broker(&test_config(&server.base_url()));
	let any = server
		.mock_async(|when, then| {
			when.method(POST).path("/connect/token");
			then.status(500);
		})
		.await;
	let missing = broker
		.valid_token(TokenRequest::new(subject()))
		.await
		.expect_err("No context and no cache must fail.");

	assert!(matches!(missing, Error::Context(ContextError::Missing)));

	let tokenless = broker
		.valid_token(
			TokenRequest::new(subject())
				.with_context(RequestContext { authenticated: true, access_token: None }),
		)
		.await
		.expect_err("Signed-in contexts without a token cannot be exchanged.");

	assert!(matches!(tokenless, Error::Context(ContextError::MissingAccessToken)));
	assert!(store.is_empty());

	any.assert_calls_async(0).await;
}

#[tokio::test]
async fn empty_subject_token_is_rejected_locally() {
	let server = MockServer::start_async().await;
	let (broker, _store) = build_reqwest_test_broker(&test_config(&server.base_url()));
	let err = broker
		.exchange_grant(&subject(), &TokenSecret::new(""))
		.await
		.expect_err("Empty subject tokens must be rejected.");

	assert!(matches!(err, Error::InvalidArgument { name: "subject_token", .. }));
}
