//! Key/value sources the configuration is resolved from.

// std
use std::env;
// self
use crate::_prelude::*;

/// Key/value lookup read by
/// [`AuthEnvironmentConfig::resolve`](super::AuthEnvironmentConfig::resolve).
pub trait ConfigSource {
	/// Returns the raw value stored under `key`, if any.
	fn get(&self, key: &str) -> Option<String>;
}
impl ConfigSource for HashMap<String, String> {
	fn get(&self, key: &str) -> Option<String> {
		HashMap::get(self, key).cloned()
	}
}
impl ConfigSource for BTreeMap<String, String> {
	fn get(&self, key: &str) -> Option<String> {
		BTreeMap::get(self, key).cloned()
	}
}

/// Reads settings from process environment variables, optionally namespaced by a prefix
/// (`KINAUNA_` turns `AuthenticationServerLocal` into `KINAUNA_AuthenticationServerLocal`).
#[derive(Clone, Debug, Default)]
pub struct EnvSource {
	prefix: Option<String>,
}
impl EnvSource {
	/// Reads variables named exactly like the configuration keys.
	pub fn new() -> Self {
		Self::default()
	}

	/// Reads variables named `<prefix><key>`.
	pub fn with_prefix(prefix: impl Into<String>) -> Self {
		Self { prefix: Some(prefix.into()) }
	}
}
impl ConfigSource for EnvSource {
	fn get(&self, key: &str) -> Option<String> {
		match &self.prefix {
			Some(prefix) => env::var(format!("{prefix}{key}")).ok(),
			None => env::var(key).ok(),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn map_sources_return_owned_values() {
		let hash = HashMap::from_iter([("MediaApiName".to_owned(), "media-api".to_owned())]);
		let tree = BTreeMap::from_iter([("MediaApiName".to_owned(), "media-api".to_owned())]);

		assert_eq!(ConfigSource::get(&hash, "MediaApiName").as_deref(), Some("media-api"));
		assert_eq!(ConfigSource::get(&tree, "MediaApiName").as_deref(), Some("media-api"));
		assert_eq!(ConfigSource::get(&tree, "ProgenyApiName"), None);
	}

	#[test]
	fn env_source_applies_prefix() {
		let source = EnvSource::with_prefix("KINAUNA_AUTH_TEST_UNSET_");

		assert_eq!(source.get("AuthenticationServer"), None);
	}
}
