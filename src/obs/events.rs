// self
use crate::{
	_prelude::*,
	auth::{SubjectKey, TokenRecord},
};

/// Cache transitions reported by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheEvent {
	/// A valid cached record was returned without contacting the authority.
	Hit,
	/// A new or replacement record was stored.
	Stored,
	/// An entry was dropped after a failed refresh or an explicit removal.
	Evicted,
	/// The refresh path failed and acquisition continues through another grant.
	FallThrough,
}
impl CacheEvent {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheEvent::Hit => "hit",
			CacheEvent::Stored => "stored",
			CacheEvent::Evicted => "evicted",
			CacheEvent::FallThrough => "fall_through",
		}
	}
}
impl Display for CacheEvent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Logs a cache transition for `subject`; only a fingerprint of the access token is emitted.
pub fn record_cache_event(event: CacheEvent, subject: &SubjectKey, record: Option<&TokenRecord>) {
	#[cfg(feature = "tracing")]
	{
		let fingerprint = record.map(|record| record.access_token.fingerprint());
		let fingerprint = fingerprint.as_deref().unwrap_or("-");

		let expires_at = record.map(|record| record.expires_at);

		match event {
			CacheEvent::Hit => tracing::debug!(
				event = event.as_str(),
				subject = %subject,
				token = fingerprint,
				expires_at = ?expires_at,
				"Serving cached token."
			),
			CacheEvent::Stored => tracing::debug!(
				event = event.as_str(),
				subject = %subject,
				token = fingerprint,
				expires_at = ?expires_at,
				"Stored token."
			),
			CacheEvent::Evicted => tracing::warn!(
				event = event.as_str(),
				subject = %subject,
				token = fingerprint,
				"Evicted cached token."
			),
			CacheEvent::FallThrough => tracing::warn!(
				event = event.as_str(),
				subject = %subject,
				token = fingerprint,
				"Refresh failed; acquiring a new token."
			),
		}
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (event, subject, record);
	}
}
