//! Cache-first token acquisition with per-subject single-flight.
//!
//! [`TokenBroker::valid_token`] serializes callers per subject key, so concurrent requests
//! for an expired subject trigger at most one grant; waiters find the fresh record in the
//! cache once the guard is released. Different subjects never block each other.

// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	error::ContextError,
	flows::{TokenBroker, TokenRequest, common},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, CacheEvent, FlowKind, FlowOutcome, FlowSpan},
};

impl<C, M> TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns a token for `request.subject` that stays valid beyond the skew margin.
	///
	/// 1. A cached record that is still valid is returned without a network call.
	/// 2. A stale user record holding a refresh token is refreshed with the web client and the
	///    new access token is exchanged for an API-scoped one. If either step fails, the entry
	///    is evicted and acquisition continues below.
	/// 3. The service key runs the client credentials grant.
	/// 4. Any other subject exchanges the access token of `request.context`; without a
	///    signed-in context this fails with [`Error::Context`].
	///
	/// Newly obtained records replace the cache entry before being returned.
	pub async fn valid_token(&self, request: TokenRequest) -> Result<TokenRecord> {
		const KIND: FlowKind = FlowKind::Acquire;

		let span = FlowSpan::for_subject(KIND, "valid_token", &request.subject);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let guard = common::flow_guard(self, &request.subject);
				let _singleflight = guard.lock().await;

				self.acquire(&request).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => {
				self.metrics.record_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	async fn acquire(&self, request: &TokenRequest) -> Result<TokenRecord> {
		let subject = &request.subject;
		let cached = self.store.fetch(subject).await?;

		let now = OffsetDateTime::now_utc();

		let usable = cached.as_ref().filter(|record| !request.should_refresh(record, now));

		if let Some(record) = usable {
			self.metrics.record_cache_hit();
			obs::record_cache_event(CacheEvent::Hit, subject, Some(record));

			return Ok(record.clone());
		}

		if let Some(stale) = cached.filter(|record| record.can_refresh() && !subject.is_service())
		{
			match self.refresh_and_exchange(&stale).await {
				Ok(fresh) => return self.commit(fresh).await,
				Err(_err) => {
					self.store.remove(subject).await?;
					self.metrics.record_eviction();
					obs::record_cache_event(CacheEvent::FallThrough, subject, Some(&stale));

					#[cfg(feature = "tracing")]
					tracing::debug!(subject = %subject, error = %_err, "Refresh path failed.");
				},
			}
		}

		let fresh = if subject.is_service() {
			self.client_credentials_grant().await?
		} else {
			let context = request.context.as_ref().ok_or(ContextError::Missing)?;

			self.exchange_grant(subject, context.subject_token()?).await?
		};

		self.commit(fresh).await
	}

	async fn refresh_and_exchange(&self, stale: &TokenRecord) -> Result<TokenRecord> {
		let refreshed = self.refresh_grant(stale).await?;
		let mut exchanged = self.exchange_grant(&stale.subject, &refreshed.access_token).await?;

		if exchanged.refresh_token.is_none() {
			exchanged.refresh_token = refreshed.refresh_token;
		}

		Ok(exchanged)
	}

	async fn commit(&self, record: TokenRecord) -> Result<TokenRecord> {
		self.store.upsert(record.clone()).await?;
		self.metrics.record_acquisition();
		obs::record_cache_event(CacheEvent::Stored, &record.subject, Some(&record));

		Ok(record)
	}
}
