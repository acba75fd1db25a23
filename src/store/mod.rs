//! Storage-layer contracts: object-safe async traits the host implements
//! against whatever database backs a deployment, plus an in-memory
//! reference implementation used by tests and examples.

pub mod memory;

// self
use crate::{
	_prelude::*,
	connection::Connection,
	grant::GrantSnapshot,
	ids::{ConnectionId, DeliveryId, IdempotencyKey, InstallationId, OutboxEventId, ProviderId},
	scope::ScopeRef,
	sync::job::SyncJob,
	webhook::DeliveryRecord,
};

/// Boxed future returned by every store method, matching the object-safe async trait pattern
/// used throughout the storage layer.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Failure surfaced by a storage backend.
#[derive(Debug, ThisError)]
pub enum StoreError {
	/// The requested key does not exist.
	#[error("Key not found: {0}.")]
	NotFound(String),
	/// A compare-and-swap refresh token did not match the stored version.
	#[error("Compare-and-swap refresh mismatch for key: {0}.")]
	CasMismatch(String),
	/// Backend-specific I/O or driver failure.
	#[error("Storage backend failure: {0}.")]
	Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}
impl StoreError {
	/// Wraps a backend-specific driver error.
	pub fn backend(err: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Backend(Box::new(err))
	}
}

/// Outcome of a compare-and-swap write against a versioned record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareAndSwapOutcome {
	/// The write applied; the record now carries the new version.
	Updated,
	/// The caller's expected version no longer matched what was stored.
	RefreshMismatch,
	/// No record existed at the key.
	Missing,
}

/// Persists [`Connection`] records and resolves them by provider/scope.
pub trait ConnectionStore: Send + Sync {
	/// Inserts or replaces a connection record.
	fn put<'a>(&'a self, connection: Connection) -> StoreFuture<'a, ()>;

	/// Loads a connection by id.
	fn get<'a>(&'a self, id: &'a ConnectionId) -> StoreFuture<'a, Connection>;

	/// Lists every active connection for a `(provider, scope)` pair, used to detect ambiguity.
	fn find_by_provider_scope<'a>(
		&'a self,
		provider: &'a ProviderId,
		scope: &'a ScopeRef,
	) -> StoreFuture<'a, Vec<Connection>>;

	/// Atomically replaces a connection only if `expected_version` still matches what is stored.
	fn compare_and_swap<'a>(
		&'a self,
		id: &'a ConnectionId,
		expected_version: u64,
		next: Connection,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;

	/// Lists every connection matching a `(scope, external_account_id)` pair, used by callback
	/// completion to detect whether an existing connection should be reused or conflicts.
	fn find_by_scope_and_external_account<'a>(
		&'a self,
		scope: &'a ScopeRef,
		external_account_id: &'a str,
	) -> StoreFuture<'a, Vec<Connection>>;

	/// Removes a connection record entirely.
	fn delete<'a>(&'a self, id: &'a ConnectionId) -> StoreFuture<'a, ()>;
}

/// Persists the encrypted credential envelope for a connection, keyed by connection id.
pub trait CredentialStore: Send + Sync {
	/// Upserts the encrypted credential blob for a connection.
	fn put<'a>(&'a self, connection: &'a ConnectionId, envelope: String) -> StoreFuture<'a, ()>;

	/// Fetches the encrypted credential blob for a connection.
	fn get<'a>(&'a self, connection: &'a ConnectionId) -> StoreFuture<'a, String>;
}

/// Tracks which webhook topics a connection is currently subscribed to at the provider.
pub trait SubscriptionStore: Send + Sync {
	/// Replaces the full set of subscribed topics for a connection.
	fn put<'a>(&'a self, connection: &'a ConnectionId, topics: Vec<String>) -> StoreFuture<'a, ()>;

	/// Loads the subscribed topics for a connection; empty if none recorded.
	fn get<'a>(&'a self, connection: &'a ConnectionId) -> StoreFuture<'a, Vec<String>>;
}

/// Background sync job storage, keyed by `(connection, resource)`.
pub trait SyncJobStore: Send + Sync {
	/// Inserts a brand-new job, replacing any existing one for the same `(connection, resource)`.
	fn put<'a>(&'a self, job: SyncJob) -> StoreFuture<'a, ()>;

	/// Loads the current job for a `(connection, resource)` pair, if one exists.
	fn get<'a>(&'a self, connection: &'a ConnectionId, resource: &'a str) -> StoreFuture<'a, Option<SyncJob>>;

	/// Atomically replaces a job only if `expected_version` still matches what is stored.
	fn compare_and_swap<'a>(
		&'a self,
		connection: &'a ConnectionId,
		resource: &'a str,
		expected_version: u64,
		next: SyncJob,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;
}

/// Persists the current [`GrantSnapshot`] per connection.
pub trait GrantStore: Send + Sync {
	/// Stores the snapshot that supersedes any prior one for this connection.
	fn put<'a>(&'a self, connection: &'a ConnectionId, snapshot: GrantSnapshot) -> StoreFuture<'a, ()>;

	/// Loads the current snapshot for a connection.
	fn get<'a>(&'a self, connection: &'a ConnectionId) -> StoreFuture<'a, GrantSnapshot>;
}

/// Persists installation records (host-app-level binding, independent of any single connection).
pub trait InstallationStore: Send + Sync {
	/// Inserts or replaces an installation record.
	fn put<'a>(&'a self, id: InstallationId, scope: ScopeRef, provider: ProviderId) -> StoreFuture<'a, ()>;

	/// Loads an installation record.
	fn get<'a>(&'a self, id: &'a InstallationId) -> StoreFuture<'a, (ScopeRef, ProviderId)>;
}

/// Single-use, TTL-bounded OAuth state storage (CSRF/PKCE correlation).
pub trait OAuthStateStore: Send + Sync {
	/// Stores a state value with an expiry; keys are single-use and removed by `take`.
	fn put<'a>(&'a self, state: &'a str, payload: Vec<u8>, expires_at: OffsetDateTime) -> StoreFuture<'a, ()>;

	/// Removes and returns the state payload if present and unexpired.
	fn take<'a>(&'a self, state: &'a str) -> StoreFuture<'a, Vec<u8>>;
}

/// Replay ledger keyed by `(provider, shop, jti)` for embedded session tokens.
pub trait ReplayLedger: Send + Sync {
	/// Records a `jti` as consumed; returns `Err(StoreError::CasMismatch)` if already present.
	fn consume<'a>(
		&'a self,
		provider: &'a ProviderId,
		shop: &'a str,
		jti: &'a str,
		expires_at: OffsetDateTime,
	) -> StoreFuture<'a, ()>;
}

/// Webhook delivery ledger: claim/complete/fail lifecycle with idempotent recording.
pub trait DeliveryLedger: Send + Sync {
	/// Records a newly received delivery if its `(provider, delivery_id)` pair is unseen.
	fn record<'a>(&'a self, record: DeliveryRecord) -> StoreFuture<'a, bool>;

	/// Loads a delivery record by provider and delivery id.
	fn get<'a>(&'a self, provider: &'a ProviderId, delivery_id: &'a DeliveryId) -> StoreFuture<'a, DeliveryRecord>;

	/// Atomically replaces a delivery record, enforcing version-based CAS.
	fn compare_and_swap<'a>(
		&'a self,
		provider: &'a ProviderId,
		delivery_id: &'a DeliveryId,
		expected_version: u64,
		next: DeliveryRecord,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;
}

/// Outbound sync cursor storage, keyed by `(connection, resource)`.
pub trait SyncCursorStore: Send + Sync {
	/// Loads the current cursor value, if any.
	fn get<'a>(&'a self, connection: &'a ConnectionId, resource: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Advances the cursor; callers only ever move it forward.
	fn advance<'a>(&'a self, connection: &'a ConnectionId, resource: &'a str, cursor: String) -> StoreFuture<'a, ()>;
}

/// Outbox dispatcher storage: claim/ack/retry/dead-letter lifecycle.
pub trait OutboxStore: Send + Sync {
	/// Enqueues a new outbox entry.
	fn enqueue<'a>(&'a self, id: OutboxEventId, connection: ConnectionId, payload: Vec<u8>) -> StoreFuture<'a, ()>;

	/// Claims up to `limit` queued or retry-ready entries, marking them claimed.
	fn claim<'a>(&'a self, limit: usize) -> StoreFuture<'a, Vec<(OutboxEventId, ConnectionId, Vec<u8>)>>;

	/// Marks an entry as successfully delivered.
	fn ack<'a>(&'a self, id: &'a OutboxEventId) -> StoreFuture<'a, ()>;

	/// Marks an entry for retry after `not_before`, or dead-letters it past the retry budget.
	fn retry_or_dead_letter<'a>(
		&'a self,
		id: &'a OutboxEventId,
		not_before: OffsetDateTime,
		max_attempts: u32,
	) -> StoreFuture<'a, ()>;
}

/// Idempotency claim storage guarding capability invocations.
pub trait IdempotencyClaimStore: Send + Sync {
	/// Claims a key for the duration of an in-flight invocation; fails if already claimed and
	/// unexpired.
	fn claim<'a>(&'a self, key: &'a IdempotencyKey, lease_until: OffsetDateTime) -> StoreFuture<'a, bool>;

	/// Stores the completed response bytes under a claimed key and releases the lease.
	fn complete<'a>(&'a self, key: &'a IdempotencyKey, response: Vec<u8>) -> StoreFuture<'a, ()>;

	/// Returns the completed response bytes for a key, if the invocation already finished.
	fn completed_response<'a>(&'a self, key: &'a IdempotencyKey) -> StoreFuture<'a, Option<Vec<u8>>>;

	/// Releases a claim without recording completion (used on failure).
	fn release<'a>(&'a self, key: &'a IdempotencyKey) -> StoreFuture<'a, ()>;
}

/// Per-`(connection, bucket)` rate-limit state.
pub trait RateLimitStateStore: Send + Sync {
	/// Loads the current token count and window start for a bucket.
	fn get<'a>(&'a self, connection: &'a ConnectionId, bucket: &'a str) -> StoreFuture<'a, Option<(u32, OffsetDateTime)>>;

	/// Stores the updated token count and window start for a bucket.
	fn put<'a>(&'a self, connection: &'a ConnectionId, bucket: &'a str, tokens: u32, window_start: OffsetDateTime) -> StoreFuture<'a, ()>;
}

/// Append-only activity sink; writers must never block capability invocation on slow storage.
pub trait ActivitySink: Send + Sync {
	/// Appends an activity record's serialized payload, best-effort.
	fn append<'a>(&'a self, connection: &'a ConnectionId, payload: Vec<u8>) -> StoreFuture<'a, ()>;

	/// Prunes records older than `older_than`, then trims down to `row_cap` most-recent records
	/// if still over budget. Returns the number of records removed.
	fn prune<'a>(&'a self, older_than: OffsetDateTime, row_cap: usize) -> StoreFuture<'a, usize>;
}
