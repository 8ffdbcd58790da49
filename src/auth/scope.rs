//! Scope sets requested from the authorization server.

// std
use std::collections::BTreeSet;
// self
use crate::_prelude::*;

/// OpenID Connect scopes always requested when exchanging a user's sign-in token.
pub const OIDC_SCOPES: [&str; 5] = ["openid", "profile", "email", "roles", "offline_access"];

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Normalized set of OAuth scopes.
///
/// Scopes are deduplicated and sorted so two sets assembled in different orders compare
/// equal and render the same `scope` form value.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ScopeSet(Arc<[String]>);
impl ScopeSet {
	/// Creates a normalized scope set from any iterator.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Ok(Self(normalize(scopes)?))
	}

	/// Scope set used for token exchange: [`OIDC_SCOPES`] plus the API scopes.
	pub fn for_exchange<I, S>(api_scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let oidc = OIDC_SCOPES.iter().map(|scope| (*scope).to_owned());

		Self::new(oidc.chain(api_scopes.into_iter().map(Into::<String>::into)))
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if the normalized set contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.binary_search_by(|candidate| candidate.as_str().cmp(scope)).is_ok()
	}

	/// Iterator over normalized scopes.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(|s| s.as_str())
	}

	/// Returns the space-delimited form value.
	pub fn normalized(&self) -> String {
		self.0.join(" ")
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.0).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}

impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	/// Parses a space-delimited `scope` value; the empty string yields an empty set.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim() {
			"" if !s.is_empty() => Err(ScopeValidationError::Empty),
			trimmed => Self::new(trimmed.split_whitespace()),
		}
	}
}
impl TryFrom<Vec<String>> for ScopeSet {
	type Error = ScopeValidationError;

	fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl From<ScopeSet> for Vec<String> {
	fn from(value: ScopeSet) -> Self {
		value.0.to_vec()
	}
}

fn normalize<I, S>(scopes: I) -> Result<Arc<[String]>, ScopeValidationError>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	let scopes = scopes
		.into_iter()
		.map(|scope| {
			let scope: String = scope.into();

			if scope.is_empty() {
				Err(ScopeValidationError::Empty)
			} else if scope.contains(char::is_whitespace) {
				Err(ScopeValidationError::ContainsWhitespace { scope })
			} else {
				Ok(scope)
			}
		})
		.collect::<Result<BTreeSet<_>, _>>()?;

	Ok(scopes.into_iter().collect())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn scopes_normalize_order_and_duplicates() {
		let lhs = ScopeSet::new(["profile", "email", "email"])
			.expect("Left-hand scope set should be valid.");
		let rhs =
			ScopeSet::new(["email", "profile"]).expect("Right-hand scope set should be valid.");

		assert_eq!(lhs, rhs);
		assert_eq!(lhs.normalized(), "email profile");
	}

	#[test]
	fn exchange_scopes_include_oidc_set() {
		let scopes = ScopeSet::for_exchange(["progeny-api", "media-api"])
			.expect("Exchange scope set should be valid.");

		for scope in OIDC_SCOPES {
			assert!(scopes.contains(scope), "Missing OIDC scope {scope}.");
		}

		assert!(scopes.contains("progeny-api"));
		assert!(scopes.contains("media-api"));
		assert_eq!(scopes.len(), OIDC_SCOPES.len() + 2);
	}

	#[test]
	fn scopes_round_trip_through_json_as_lists() {
		let scopes = ScopeSet::new(["progeny-api", "openid"]).expect("Scope fixture.");
		let json = serde_json::to_string(&scopes).expect("Scopes should serialize.");

		assert_eq!(json, r#"["openid","progeny-api"]"#);
		assert!(serde_json::from_str::<ScopeSet>(r#"["bad scope"]"#).is_err());
	}

	#[test]
	fn scopes_reject_whitespace_and_empty_entries() {
		let err = ScopeSet::new([" profile "]).expect_err("Padded scopes must be rejected.");

		assert!(matches!(err, ScopeValidationError::ContainsWhitespace { .. }));
		assert!(ScopeSet::new([""]).is_err());
		assert!(ScopeSet::from_str("").is_ok(), "Empty string represents an empty scope set.");
		assert!(ScopeSet::from_str("   ").is_err(), "Whitespace-only input must be rejected.");
	}
}
