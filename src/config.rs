//! Deployment-environment aware configuration resolved once at startup.
//!
//! Every setting lives under a base key suffixed by the environment (`Local`, `Azure`, or
//! nothing for production), e.g. `AuthenticationServerLocal`. [`AuthEnvironmentConfig::resolve`]
//! reads the suffixed keys from any [`ConfigSource`] and the resulting struct is passed
//! into [`TokenBroker`](crate::flows::TokenBroker); nothing re-reads the environment later.

pub mod environment;
pub mod source;

pub use environment::*;
pub use source::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Base configuration keys (before the environment suffix is appended).
pub mod keys {
	/// Authorization server base URL.
	pub const AUTHORITY: &str = "AuthenticationServer";
	/// Client id the web front-end signs users in with.
	pub const WEB_CLIENT_ID: &str = "WebServerClientId";
	/// Client id used for API-scoped token exchange and client credentials.
	pub const WEB_API_CLIENT_ID: &str = "WebServerApiClientId";
	/// Shared client secret.
	pub const CLIENT_SECRET: &str = "AuthenticationServerClientSecret";
	/// Progeny API scope name.
	pub const PROGENY_API_NAME: &str = "ProgenyApiName";
	/// Media API scope name.
	pub const MEDIA_API_NAME: &str = "MediaApiName";
}

/// Resolved authorization-server settings for one deployment environment.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEnvironmentConfig {
	/// Environment the settings were resolved for.
	pub environment: DeploymentEnvironment,
	/// Authorization server base URL.
	pub authority: Url,
	/// Client id for refreshing sign-in tokens.
	pub web_client_id: String,
	/// Client id for token exchange and client credentials.
	pub web_api_client_id: String,
	/// Client secret shared by both clients.
	pub client_secret: String,
	/// API scope names requested on top of the OIDC scopes.
	pub api_scopes: Vec<String>,
}
impl AuthEnvironmentConfig {
	/// Returns a builder for programmatic construction.
	pub fn builder(environment: DeploymentEnvironment) -> AuthEnvironmentConfigBuilder {
		AuthEnvironmentConfigBuilder::new(environment)
	}

	/// Reads every suffixed key for `environment` from `source`.
	pub fn resolve(
		environment: DeploymentEnvironment,
		source: &dyn ConfigSource,
	) -> Result<Self, ConfigError> {
		let authority_key = environment.key(keys::AUTHORITY);
		let authority = required(source, &authority_key)?;
		let authority = Url::parse(&authority)
			.map_err(|source| ConfigError::InvalidAuthority { key: authority_key, source })?;

		Ok(Self {
			environment,
			authority,
			web_client_id: required(source, &environment.key(keys::WEB_CLIENT_ID))?,
			web_api_client_id: required(source, &environment.key(keys::WEB_API_CLIENT_ID))?,
			client_secret: required(source, &environment.key(keys::CLIENT_SECRET))?,
			api_scopes: vec![
				required(source, &environment.key(keys::PROGENY_API_NAME))?,
				required(source, &environment.key(keys::MEDIA_API_NAME))?,
			],
		})
	}

	/// Token endpoint exposed by the authority (`<authority>/connect/token`).
	pub fn token_endpoint(&self) -> Result<Url, ConfigError> {
		let mut base = self.authority.clone();

		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		base.join("connect/token").map_err(|source| ConfigError::InvalidAuthority {
			key: self.environment.key(keys::AUTHORITY),
			source,
		})
	}
}
impl Debug for AuthEnvironmentConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthEnvironmentConfig")
			.field("environment", &self.environment)
			.field("authority", &self.authority.as_str())
			.field("web_client_id", &self.web_client_id)
			.field("web_api_client_id", &self.web_api_client_id)
			.field("client_secret", &"<redacted>")
			.field("api_scopes", &self.api_scopes)
			.finish()
	}
}

/// Builder for [`AuthEnvironmentConfig`].
#[derive(Debug)]
pub struct AuthEnvironmentConfigBuilder {
	environment: DeploymentEnvironment,
	authority: Option<Url>,
	web_client_id: Option<String>,
	web_api_client_id: Option<String>,
	client_secret: Option<String>,
	api_scopes: Vec<String>,
}
impl AuthEnvironmentConfigBuilder {
	fn new(environment: DeploymentEnvironment) -> Self {
		Self {
			environment,
			authority: None,
			web_client_id: None,
			web_api_client_id: None,
			client_secret: None,
			api_scopes: Vec::new(),
		}
	}

	/// Sets the authority URL.
	pub fn authority(mut self, url: Url) -> Self {
		self.authority = Some(url);

		self
	}

	/// Sets the web client id.
	pub fn web_client_id(mut self, id: impl Into<String>) -> Self {
		self.web_client_id = Some(id.into());

		self
	}

	/// Sets the web API client id.
	pub fn web_api_client_id(mut self, id: impl Into<String>) -> Self {
		self.web_api_client_id = Some(id.into());

		self
	}

	/// Sets the shared client secret.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Replaces the API scope names.
	pub fn api_scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.api_scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Validates presence of every field and produces the config.
	pub fn build(self) -> Result<AuthEnvironmentConfig, ConfigError> {
		let env = self.environment;
		let missing = |base: &str| ConfigError::MissingSetting { key: env.key(base) };

		Ok(AuthEnvironmentConfig {
			environment: env,
			authority: self.authority.ok_or_else(|| missing(keys::AUTHORITY))?,
			web_client_id: non_blank(self.web_client_id)
				.ok_or_else(|| missing(keys::WEB_CLIENT_ID))?,
			web_api_client_id: non_blank(self.web_api_client_id)
				.ok_or_else(|| missing(keys::WEB_API_CLIENT_ID))?,
			client_secret: non_blank(self.client_secret)
				.ok_or_else(|| missing(keys::CLIENT_SECRET))?,
			api_scopes: self.api_scopes,
		})
	}
}

fn required(source: &dyn ConfigSource, key: &str) -> Result<String, ConfigError> {
	non_blank(source.get(key)).ok_or_else(|| ConfigError::MissingSetting { key: key.to_owned() })
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.map(|raw| raw.trim().to_owned()).filter(|trimmed| !trimmed.is_empty())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn staging_source() -> HashMap<String, String> {
		HashMap::from_iter(
			[
				("AuthenticationServerAzure", "https://auth.staging.kinauna.com"),
				("WebServerClientIdAzure", "kinauna-web-azure"),
				("WebServerApiClientIdAzure", "kinauna-web-api-azure"),
				("AuthenticationServerClientSecretAzure", "azure-secret"),
				("ProgenyApiNameAzure", "progeny-api-azure"),
				("MediaApiNameAzure", "media-api-azure"),
				("AuthenticationServer", "https://auth.kinauna.com"),
			]
			.map(|(k, v)| (k.to_owned(), v.to_owned())),
		)
	}

	#[test]
	fn resolve_reads_environment_suffixed_keys() {
		let config =
			AuthEnvironmentConfig::resolve(DeploymentEnvironment::Staging, &staging_source())
				.expect("Staging settings should resolve.");

		assert_eq!(config.authority.as_str(), "https://auth.staging.kinauna.com/");
		assert_eq!(config.web_client_id, "kinauna-web-azure");
		assert_eq!(config.web_api_client_id, "kinauna-web-api-azure");
		assert_eq!(config.api_scopes, vec!["progeny-api-azure", "media-api-azure"]);
	}

	#[test]
	fn resolve_reports_the_missing_suffixed_key() {
		let err =
			AuthEnvironmentConfig::resolve(DeploymentEnvironment::Production, &staging_source())
				.expect_err("Production keys are incomplete.");

		assert!(
			matches!(err, ConfigError::MissingSetting { ref key } if key == "WebServerClientId"),
			"Unexpected error: {err:?}."
		);
	}

	#[test]
	fn token_endpoint_appends_connect_token() {
		let mut config =
			AuthEnvironmentConfig::resolve(DeploymentEnvironment::Staging, &staging_source())
				.expect("Staging settings should resolve.");

		assert_eq!(
			config.token_endpoint().expect("Endpoint should join.").as_str(),
			"https://auth.staging.kinauna.com/connect/token"
		);

		config.authority = Url::parse("https://auth.kinauna.com/identity").expect("URL fixture.");

		assert_eq!(
			config.token_endpoint().expect("Endpoint should join.").as_str(),
			"https://auth.kinauna.com/identity/connect/token"
		);
	}

	#[test]
	fn debug_redacts_client_secret() {
		let config =
			AuthEnvironmentConfig::resolve(DeploymentEnvironment::Staging, &staging_source())
				.expect("Staging settings should resolve.");

		assert!(!format!("{config:?}").contains("azure-secret"));
	}
}
