//! Storage contract for cached token records, keyed by subject.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{SubjectKey, TokenRecord},
};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Process-wide cache of token records, at most one per subject.
///
/// Every operation is atomic with respect to a single key.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Returns the record cached for `subject`, if any.
	fn fetch<'a>(&'a self, subject: &'a SubjectKey) -> StoreFuture<'a, Option<TokenRecord>>;

	/// Inserts `record` only when its subject has no entry; returns whether it was inserted.
	fn insert(&self, record: TokenRecord) -> StoreFuture<'_, bool>;

	/// Inserts or replaces the entry for the record's subject.
	fn upsert(&self, record: TokenRecord) -> StoreFuture<'_, ()>;

	/// Removes and returns the entry for `subject`.
	fn remove<'a>(&'a self, subject: &'a SubjectKey) -> StoreFuture<'a, Option<TokenRecord>>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Records could not be encoded or decoded by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
