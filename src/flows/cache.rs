//! Explicit cache operations for hosts that manage records themselves (for example right
//! after the interactive sign-in, or on sign-out).

// self
use crate::{
	_prelude::*,
	auth::{SubjectKey, TokenRecord},
	flows::TokenBroker,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, CacheEvent},
};

impl<C, M> TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Caches `record` under `subject` unless an entry already exists.
	///
	/// Returns `true` when the record was inserted. The record is re-keyed to `subject`.
	pub async fn store_token(&self, subject: &str, record: TokenRecord) -> Result<bool> {
		let record = keyed_record(subject, record)?;
		let inserted = self.store.insert(record.clone()).await?;

		if inserted {
			obs::record_cache_event(CacheEvent::Stored, &record.subject, Some(&record));
		}

		Ok(inserted)
	}

	/// Caches `record` under `subject`, replacing any existing entry.
	///
	/// An invalid subject or an empty access token fails with [`Error::InvalidArgument`] and
	/// leaves the cache untouched.
	pub async fn update_token(&self, subject: &str, record: TokenRecord) -> Result<()> {
		let record = keyed_record(subject, record)?;

		self.store.upsert(record.clone()).await?;
		obs::record_cache_event(CacheEvent::Stored, &record.subject, Some(&record));

		Ok(())
	}

	/// Drops the entry for `subject`; a missing entry or an unusable key is a no-op.
	pub async fn remove_token(&self, subject: &str) -> Result<()> {
		let Ok(subject) = SubjectKey::new(subject) else {
			return Ok(());
		};

		if let Some(removed) = self.store.remove(&subject).await? {
			obs::record_cache_event(CacheEvent::Evicted, &subject, Some(&removed));
		}

		Ok(())
	}

	/// Returns the cached record for `subject` without acquiring or validating it.
	pub async fn cached_token(&self, subject: &SubjectKey) -> Result<Option<TokenRecord>> {
		Ok(self.store.fetch(subject).await?)
	}
}

fn keyed_record(subject: &str, mut record: TokenRecord) -> Result<TokenRecord> {
	let subject = SubjectKey::new(subject).map_err(|err| Error::invalid_argument("subject", err))?;

	if record.access_token.is_empty() {
		return Err(Error::invalid_argument("record", "access token cannot be empty"));
	}

	record.subject = subject;

	Ok(record)
}
