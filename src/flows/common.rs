//! Request parameters and the per-subject guards shared by the flows.

// self
use crate::{
	_prelude::*,
	auth::{RequestContext, SubjectKey, TokenRecord},
	flows::TokenBroker,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
};

/// Input for [`TokenBroker::valid_token`].
#[derive(Clone, Debug)]
pub struct TokenRequest {
	/// Subject whose token is requested.
	pub subject: SubjectKey,
	/// Signed-in user of the inbound request, used for token exchange.
	pub context: Option<RequestContext>,
	/// Skips the cached record even when it is still valid.
	pub force: bool,
	/// Margin subtracted from the expiry before a cached record counts as unusable.
	pub skew: Duration,
}
impl TokenRequest {
	/// Request for `subject` without a request context.
	pub fn new(subject: SubjectKey) -> Self {
		Self { subject, context: None, force: false, skew: TokenRecord::DEFAULT_SKEW }
	}

	/// Request for the reserved service key.
	pub fn service() -> Self {
		Self::new(SubjectKey::service())
	}

	/// Request for a raw subject string; absent or empty input selects the service key.
	pub fn for_subject(subject: Option<&str>) -> Result<Self> {
		let subject = SubjectKey::resolve(subject)
			.map_err(|err| Error::invalid_argument("subject", err))?;

		Ok(Self::new(subject))
	}

	/// Attaches the inbound request's context.
	pub fn with_context(mut self, context: RequestContext) -> Self {
		self.context = Some(context);

		self
	}

	/// Bypasses the cached record.
	pub fn force_refresh(mut self) -> Self {
		self.force = true;

		self
	}

	/// Overrides the skew margin; negative values clamp to zero.
	pub fn with_skew(mut self, skew: Duration) -> Self {
		self.skew = if skew.is_negative() { Duration::ZERO } else { skew };

		self
	}

	/// Returns `true` when `record` must not be served as-is at `now`.
	pub fn should_refresh(&self, record: &TokenRecord, now: OffsetDateTime) -> bool {
		self.force || !record.is_valid_at(now, self.skew)
	}
}

pub(crate) type FlowGuardMap = Mutex<HashMap<SubjectKey, Arc<AsyncMutex<()>>>>;

/// One caller's claim on a subject's single-flight slot.
///
/// Dropping the claim removes the slot once no other caller holds or waits on it. This also
/// runs when the owning future is cancelled mid-acquisition.
pub(crate) struct FlowGuard<'a> {
	guards: &'a FlowGuardMap,
	subject: SubjectKey,
	slot: Arc<AsyncMutex<()>>,
}
impl<'a> FlowGuard<'a> {
	pub(crate) fn claim(guards: &'a FlowGuardMap, subject: &SubjectKey) -> Self {
		let slot = guards
			.lock()
			.entry(subject.clone())
			.or_insert_with(|| Arc::new(AsyncMutex::new(())))
			.clone();

		Self { guards, subject: subject.clone(), slot }
	}

	/// Waits until this caller owns the subject.
	pub(crate) async fn lock(&self) -> async_lock::MutexGuard<'_, ()> {
		self.slot.lock().await
	}
}
impl Drop for FlowGuard<'_> {
	fn drop(&mut self) {
		let mut guards = self.guards.lock();
		let ours = guards.get(&self.subject).is_some_and(|slot| Arc::ptr_eq(slot, &self.slot));

		// One reference lives in the map, the other is ours.
		if ours && Arc::strong_count(&self.slot) == 2 {
			guards.remove(&self.subject);
		}
	}
}

/// Claims the single-flight slot for a subject, creating it on demand.
pub(crate) fn flow_guard<'a, C, M>(
	broker: &'a TokenBroker<C, M>,
	subject: &SubjectKey,
) -> FlowGuard<'a>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	FlowGuard::claim(&broker.flow_guards, subject)
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::ScopeSet;

	fn record() -> TokenRecord {
		TokenRecord::builder(SubjectKey::service(), ScopeSet::default())
			.access_token("access")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Record fixture should build.")
	}

	#[test]
	fn should_refresh_honors_skew_and_force() {
		let record = record();
		let request = TokenRequest::service();
		let early = macros::datetime!(2025-01-01 00:30 UTC);
		let late = macros::datetime!(2025-01-01 00:59:30 UTC);

		assert!(!request.should_refresh(&record, early));
		assert!(request.should_refresh(&record, late));
		assert!(!request.clone().with_skew(Duration::ZERO).should_refresh(&record, late));
		assert!(!request.clone().with_skew(Duration::seconds(-5)).should_refresh(&record, late));
		assert!(request.force_refresh().should_refresh(&record, early));
	}

	#[tokio::test]
	async fn flow_guard_slot_is_dropped_with_its_last_claim() {
		let guards = FlowGuardMap::default();
		let subject = SubjectKey::new("user-42").expect("Subject fixture should be valid.");
		let holder = FlowGuard::claim(&guards, &subject);
		let held = holder.lock().await;
		let waiter = tokio::time::timeout(std::time::Duration::from_millis(20), async {
			let claim = FlowGuard::claim(&guards, &subject);
			let _owned = claim.lock().await;
		})
		.await;

		// The waiter was cancelled while queued behind the holder.
		assert!(waiter.is_err());
		assert_eq!(guards.lock().len(), 1);

		drop(held);
		drop(holder);

		assert!(guards.lock().is_empty());
	}

	#[test]
	fn for_subject_normalizes_and_validates() {
		let service = TokenRequest::for_subject(None).expect("Absent subject is the service key.");
		let empty = TokenRequest::for_subject(Some("")).expect("Empty subject is the service key.");

		assert!(service.subject.is_service());
		assert!(empty.subject.is_service());

		let user = TokenRequest::for_subject(Some("user-42")).expect("User subject is valid.");

		assert_eq!(&*user.subject, "user-42");
		assert!(matches!(
			TokenRequest::for_subject(Some("user 42")),
			Err(Error::InvalidArgument { name: "subject", .. })
		));
	}
}
