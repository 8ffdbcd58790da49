//! Resolves the local-environment settings, acquires the web application's service token
//! with the client-credentials grant, and reuses the cached copy to call an API.

// std
use std::{collections::HashMap, sync::Arc};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use kinauna_auth::{
	config::{AuthEnvironmentConfig, DeploymentEnvironment, keys},
	ext::{BearerSigner, RequestSignerExt},
	flows::{ReqwestTokenBroker, TokenRequest},
	reqwest::Client,
	store::{MemoryStore, TokenStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/connect/token")
				.form_urlencoded_tuple("grant_type", "client_credentials");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-service\",\"token_type\":\"Bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let api_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/Progeny/Mine")
				.header("authorization", "Bearer demo-service");
			then.status(200).body("[]");
		})
		.await;
	let env = DeploymentEnvironment::Local;
	let settings = HashMap::from([
		(env.key(keys::AUTHORITY), server.base_url()),
		(env.key(keys::WEB_CLIENT_ID), "kinauna-web".to_owned()),
		(env.key(keys::WEB_API_CLIENT_ID), "kinauna-web-api".to_owned()),
		(env.key(keys::CLIENT_SECRET), "demo-secret".to_owned()),
		(env.key(keys::PROGENY_API_NAME), "progeny-api-local".to_owned()),
		(env.key(keys::MEDIA_API_NAME), "media-api-local".to_owned()),
	]);
	let config = AuthEnvironmentConfig::resolve(env, &settings)?;
	let store: Arc<dyn TokenStore> = Arc::new(MemoryStore::default());
	let broker = ReqwestTokenBroker::new(store, &config)?;

	// The second lookup is served from the cache.
	broker.valid_token(TokenRequest::service()).await?;

	let record = broker.valid_token(TokenRequest::service()).await?;
	let Ok(request) =
		BearerSigner.attach_token(Client::new().get(server.url("/api/Progeny/Mine")), &record);
	let status = request.send().await?.status();

	println!("Progeny API answered {status} with the cached service token.");

	token_mock.assert_async().await;
	api_mock.assert_async().await;

	Ok(())
}
