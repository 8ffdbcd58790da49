//! Deployment targets and the key suffix each one selects.

// self
use crate::{_prelude::*, error::ConfigError};

/// Deployment target selecting which suffixed configuration keys apply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeploymentEnvironment {
	/// Developer machine.
	Local,
	/// Staging slot hosted on Azure.
	Staging,
	#[default]
	/// Production.
	Production,
}
impl DeploymentEnvironment {
	/// Suffix appended to every configuration key.
	pub const fn key_suffix(self) -> &'static str {
		match self {
			Self::Local => "Local",
			Self::Staging => "Azure",
			Self::Production => "",
		}
	}

	/// Returns a stable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Local => "local",
			Self::Staging => "staging",
			Self::Production => "production",
		}
	}

	/// Appends the environment suffix to `base`.
	pub fn key(self, base: &str) -> String {
		format!("{base}{}", self.key_suffix())
	}
}
impl Display for DeploymentEnvironment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for DeploymentEnvironment {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let trimmed = s.trim();

		if trimmed.eq_ignore_ascii_case("local") || trimmed.eq_ignore_ascii_case("development") {
			Ok(Self::Local)
		} else if trimmed.eq_ignore_ascii_case("staging") || trimmed.eq_ignore_ascii_case("azure")
		{
			Ok(Self::Staging)
		} else if trimmed.eq_ignore_ascii_case("production") {
			Ok(Self::Production)
		} else {
			Err(ConfigError::UnknownEnvironment { name: s.to_owned() })
		}
	}
}
impl TryFrom<String> for DeploymentEnvironment {
	type Error = ConfigError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}
impl From<DeploymentEnvironment> for String {
	fn from(value: DeploymentEnvironment) -> Self {
		value.as_str().to_owned()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn suffixes_match_configuration_layout() {
		let base = "AuthenticationServer";

		assert_eq!(DeploymentEnvironment::Local.key(base), "AuthenticationServerLocal");
		assert_eq!(DeploymentEnvironment::Staging.key(base), "AuthenticationServerAzure");
		assert_eq!(DeploymentEnvironment::Production.key(base), "AuthenticationServer");
	}

	#[test]
	fn parsing_is_case_insensitive() {
		let parse = |raw: &str| raw.parse::<DeploymentEnvironment>().ok();

		assert_eq!(parse("LOCAL"), Some(DeploymentEnvironment::Local));
		assert_eq!(parse(" Azure "), Some(DeploymentEnvironment::Staging));
		assert_eq!(parse("production"), Some(DeploymentEnvironment::Production));
		assert!("qa".parse::<DeploymentEnvironment>().is_err());
		assert_eq!(
			serde_json::from_str::<DeploymentEnvironment>("\"staging\"").ok(),
			Some(DeploymentEnvironment::Staging)
		);
	}
}
