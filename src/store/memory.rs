//! In-process [`TokenStore`] shared by every request of one host process.

// self
use crate::{
	_prelude::*,
	auth::{SubjectKey, TokenRecord},
	store::{StoreFuture, TokenStore},
};

type StoreMap = Arc<RwLock<HashMap<SubjectKey, TokenRecord>>>;

/// Thread-safe map from subject to its cached record.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of cached subjects.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn insert_now(&self, record: TokenRecord) -> bool {
		let mut guard = self.0.write();

		if guard.contains_key(&record.subject) {
			return false;
		}

		guard.insert(record.subject.clone(), record);

		true
	}
}
impl TokenStore for MemoryStore {
	fn fetch<'a>(&'a self, subject: &'a SubjectKey) -> StoreFuture<'a, Option<TokenRecord>> {
		let record = self.0.read().get(subject).cloned();

		Box::pin(async move { Ok(record) })
	}

	fn insert(&self, record: TokenRecord) -> StoreFuture<'_, bool> {
		let inserted = self.insert_now(record);

		Box::pin(async move { Ok(inserted) })
	}

	fn upsert(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		self.0.write().insert(record.subject.clone(), record);

		Box::pin(async { Ok(()) })
	}

	fn remove<'a>(&'a self, subject: &'a SubjectKey) -> StoreFuture<'a, Option<TokenRecord>> {
		let removed = self.0.write().remove(subject);

		Box::pin(async move { Ok(removed) })
	}
}
