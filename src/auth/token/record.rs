//! Immutable token record structs, validity checks, and builders.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, SubjectKey, token::secret::TokenSecret},
};

/// Token type carried by every record the broker issues.
pub const BEARER: &str = "Bearer";

/// Lifecycle status for a token record relative to a skew margin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token can be used; expiry is further away than the skew margin.
	Valid,
	/// Token has not expired yet but falls inside the skew margin.
	Expiring,
	/// Token exceeded its expiry instant.
	Expired,
}

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenRecordBuilderError {
	/// Issued when no (or an empty) access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Issued when `issued_at + expires_in` falls outside the representable date range.
	#[error("Relative expiry overflows the supported date range.")]
	ExpiryOutOfRange,
}

/// Immutable record describing the bearer token cached for one subject.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenRecord {
	/// Subject the token was issued for.
	pub subject: SubjectKey,
	/// Normalized scopes requested for this record.
	pub scope: ScopeSet,
	/// Token type; always [`BEARER`].
	pub token_type: String,
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret, if the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Instant the record was minted.
	pub issued_at: OffsetDateTime,
	/// Absolute access token expiry.
	pub expires_at: OffsetDateTime,
}
impl TokenRecord {
	/// Safety margin subtracted from the expiry before a token is considered unusable.
	pub const DEFAULT_SKEW: Duration = Duration::minutes(1);

	/// Returns a builder for the provided subject and scope.
	pub fn builder(subject: SubjectKey, scope: ScopeSet) -> TokenRecordBuilder {
		TokenRecordBuilder::new(subject, scope)
	}

	/// Computes the lifecycle status at `instant` using the provided skew margin.
	pub fn status_at(&self, instant: OffsetDateTime, skew: Duration) -> TokenStatus {
		if instant >= self.expires_at {
			return TokenStatus::Expired;
		}
		if instant >= self.expires_at.saturating_sub(skew) {
			return TokenStatus::Expiring;
		}

		TokenStatus::Valid
	}

	/// Returns `true` iff `instant < expires_at - skew`.
	pub fn is_valid_at(&self, instant: OffsetDateTime, skew: Duration) -> bool {
		matches!(self.status_at(instant, skew), TokenStatus::Valid)
	}

	/// Validity check against the current clock and [`Self::DEFAULT_SKEW`].
	pub fn is_valid(&self) -> bool {
		self.is_valid_at(OffsetDateTime::now_utc(), Self::DEFAULT_SKEW)
	}

	/// Returns `true` when the record carries a refresh token.
	pub fn can_refresh(&self) -> bool {
		self.refresh_token.is_some()
	}

	/// Renders the `Authorization` header value (`Bearer <token>`).
	pub fn authorization_header(&self) -> String {
		format!("{} {}", self.token_type, self.access_token.expose())
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("subject", &self.subject)
			.field("scope", &self.scope)
			.field("token_type", &self.token_type)
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug)]
pub struct TokenRecordBuilder {
	subject: SubjectKey,
	scope: ScopeSet,
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenRecordBuilder {
	fn new(subject: SubjectKey, scope: ScopeSet) -> Self {
		Self {
			subject,
			scope,
			access_token: None,
			refresh_token: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
		}
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides an optional refresh token secret.
	pub fn maybe_refresh_token(mut self, token: Option<TokenSecret>) -> Self {
		self.refresh_token = token;

		self
	}

	/// Consumes the builder and produces a [`TokenRecord`].
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let access_token = self
			.access_token
			.filter(|secret| !secret.is_empty())
			.ok_or(TokenRecordBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) =>
				issued_at.checked_add(delta).ok_or(TokenRecordBuilderError::ExpiryOutOfRange)?,
			(None, None) => return Err(TokenRecordBuilderError::MissingExpiry),
		};

		Ok(TokenRecord {
			subject: self.subject,
			scope: self.scope,
			token_type: BEARER.into(),
			access_token,
			refresh_token: self.refresh_token.filter(|secret| !secret.is_empty()),
			issued_at,
			expires_at,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn record(expires_at: OffsetDateTime) -> TokenRecord {
		TokenRecord::builder(
			SubjectKey::new("user-42").expect("Subject fixture should be valid."),
			ScopeSet::new(["openid"]).expect("Scope fixture should be valid."),
		)
		.access_token("access")
		.refresh_token("refresh")
		.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
		.expires_at(expires_at)
		.build()
		.expect("Token record builder should succeed.")
	}

	#[test]
	fn status_respects_skew_margin() {
		let record = record(macros::datetime!(2025-01-01 01:00 UTC));
		let skew = TokenRecord::DEFAULT_SKEW;
		let status = |instant: OffsetDateTime| record.status_at(instant, skew);

		assert_eq!(status(macros::datetime!(2025-01-01 00:58:59 UTC)), TokenStatus::Valid);
		assert_eq!(status(macros::datetime!(2025-01-01 00:59 UTC)), TokenStatus::Expiring);
		assert_eq!(status(macros::datetime!(2025-01-01 00:59:30 UTC)), TokenStatus::Expiring);
		assert_eq!(status(macros::datetime!(2025-01-01 01:00 UTC)), TokenStatus::Expired);
		assert!(record.is_valid_at(macros::datetime!(2025-01-01 00:30 UTC), skew));
		assert!(!record.is_valid_at(macros::datetime!(2025-01-01 00:59:30 UTC), skew));
		assert!(record.is_valid_at(macros::datetime!(2025-01-01 00:59:30 UTC), Duration::ZERO));
	}

	#[test]
	fn builder_handles_relative_expiry() {
		let record = TokenRecord::builder(
			SubjectKey::service(),
			ScopeSet::new(["progeny-api"]).expect("Scope fixture should be valid."),
		)
		.access_token("secret")
		.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
		.expires_in(Duration::minutes(30))
		.build()
		.expect("Token record builder should support relative expiry calculations.");

		assert_eq!(record.expires_at, macros::datetime!(2025-01-01 00:30 UTC));
		assert_eq!(record.token_type, BEARER);
		assert!(!record.can_refresh());
		assert_eq!(record.authorization_header(), "Bearer secret");
	}

	#[test]
	fn builder_rejects_missing_token_or_expiry() {
		let subject = SubjectKey::service();
		let scope = ScopeSet::default();
		let err = TokenRecord::builder(subject.clone(), scope.clone())
			.access_token("")
			.expires_in(Duration::minutes(5))
			.build()
			.expect_err("Empty access tokens must be rejected.");

		assert_eq!(err, TokenRecordBuilderError::MissingAccessToken);

		let err = TokenRecord::builder(subject, scope)
			.access_token("access")
			.build()
			.expect_err("Records without expiry must be rejected.");

		assert_eq!(err, TokenRecordBuilderError::MissingExpiry);
	}

	#[test]
	fn builder_rejects_expiry_past_date_range() {
		let err = TokenRecord::builder(SubjectKey::service(), ScopeSet::default())
			.access_token("access")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::seconds(1_000_000_000_000))
			.build()
			.expect_err("Expiries beyond the calendar range must be rejected.");

		assert_eq!(err, TokenRecordBuilderError::ExpiryOutOfRange);
	}

	#[test]
	fn debug_redacts_secrets() {
		let rendered = format!("{:?}", record(macros::datetime!(2025-01-01 01:00 UTC)));

		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains("\"access\""));
		assert!(!rendered.contains("refresh\""));
	}
}
