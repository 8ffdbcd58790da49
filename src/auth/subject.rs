//! Subject keys naming the identity a cached token belongs to.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const SUBJECT_MAX_LEN: usize = 128;

/// Error returned when subject key validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum SubjectKeyError {
	/// The key was empty.
	#[error("Subject key cannot be empty.")]
	Empty,
	/// The key contains whitespace characters.
	#[error("Subject key contains whitespace.")]
	ContainsWhitespace,
	/// The key exceeded the allowed character count.
	#[error("Subject key exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Logical identity under which a token is cached: a user id, or [`SubjectKey::SERVICE`]
/// for service-to-service access.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectKey(String);
impl SubjectKey {
	/// Reserved key meaning "no end user, call the API as the web application itself".
	pub const SERVICE: &'static str = "progeny-api";

	/// Creates a validated key.
	pub fn new(value: impl AsRef<str>) -> Result<Self, SubjectKeyError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}

	/// Returns the reserved service key.
	pub fn service() -> Self {
		Self(Self::SERVICE.to_owned())
	}

	/// Normalizes an optional caller-supplied key: absent or empty input selects the
	/// service key, anything else is validated.
	pub fn resolve(value: Option<&str>) -> Result<Self, SubjectKeyError> {
		match value {
			None | Some("") => Ok(Self::service()),
			Some(view) => Self::new(view),
		}
	}

	/// Returns `true` for the reserved service key.
	pub fn is_service(&self) -> bool {
		self.0 == Self::SERVICE
	}
}
impl Deref for SubjectKey {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for SubjectKey {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for SubjectKey {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<SubjectKey> for String {
	fn from(value: SubjectKey) -> Self {
		value.0
	}
}
impl TryFrom<String> for SubjectKey {
	type Error = SubjectKeyError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl FromStr for SubjectKey {
	type Err = SubjectKeyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for SubjectKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Subject({})", self.0)
	}
}
impl Display for SubjectKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

fn validate_view(view: &str) -> Result<(), SubjectKeyError> {
	if view.is_empty() {
		return Err(SubjectKeyError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(SubjectKeyError::ContainsWhitespace);
	}
	if view.len() > SUBJECT_MAX_LEN {
		return Err(SubjectKeyError::TooLong { max: SUBJECT_MAX_LEN });
	}

	Ok(())
}
