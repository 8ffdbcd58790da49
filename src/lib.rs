//! Token cache and acquisition broker for the KinaUna web front-end.
//!
//! [`flows::TokenBroker`] hands out bearer tokens per subject key (a user id, or the
//! reserved service key for machine-to-machine calls), refreshing, exchanging, or minting
//! them against the authorization server when the cached record is missing or expiring.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod ext;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod store;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers shared by unit tests, integration tests, and demos.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::{AuthEnvironmentConfig, DeploymentEnvironment},
		flows::TokenBroker,
		http::ReqwestHttpClient,
		oauth::ReqwestTransportErrorMapper,
		provider::{DefaultProviderStrategy, ProviderStrategy},
		store::{MemoryStore, TokenStore},
	};

	/// Broker type alias used by reqwest-backed integration tests.
	pub type ReqwestTestBroker = TokenBroker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Local-environment configuration pointing at the provided authority (usually a mock
	/// server base URL).
	pub fn test_config(authority: &str) -> AuthEnvironmentConfig {
		AuthEnvironmentConfig::builder(DeploymentEnvironment::Local)
			.authority(Url::parse(authority).expect("Mock authority URL should parse."))
			.web_client_id("kinauna-web")
			.web_api_client_id("kinauna-web-api")
			.client_secret("web-secret")
			.api_scopes(["progeny-api-local", "media-api-local"])
			.build()
			.expect("Test configuration should build successfully.")
	}

	/// Constructs a [`TokenBroker`] backed by an in-memory store, default provider strategy,
	/// and the reqwest transport used across integration tests.
	pub fn build_reqwest_test_broker(
		config: &AuthEnvironmentConfig,
	) -> (ReqwestTestBroker, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let strategy: Arc<dyn ProviderStrategy> = Arc::new(DefaultProviderStrategy);
		let http_client = test_reqwest_http_client();
		let mapper = Arc::new(ReqwestTransportErrorMapper);
		let broker =
			TokenBroker::with_http_client(store, config, strategy, http_client, mapper)
				.expect("Test broker should build from the test configuration.");

		(broker, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _, tokio as _};
