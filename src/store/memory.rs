//! In-memory reference store: backs unit/integration tests and the
//! cfg-gated test prelude; not intended for production persistence.

// self
use crate::{
	_prelude::*,
	connection::Connection,
	grant::GrantSnapshot,
	ids::{ConnectionId, DeliveryId, IdempotencyKey, InstallationId, OutboxEventId, ProviderId},
	scope::ScopeRef,
	store::{
		ActivitySink, CompareAndSwapOutcome, ConnectionStore, CredentialStore, DeliveryLedger, GrantStore,
		IdempotencyClaimStore, InstallationStore, OAuthStateStore, OutboxStore, RateLimitStateStore, ReplayLedger,
		StoreError, StoreFuture, SubscriptionStore, SyncCursorStore, SyncJobStore,
	},
	sync::job::SyncJob,
	webhook::DeliveryRecord,
};

/// Single backend implementing every store trait with `parking_lot`-guarded `HashMap`s.
#[derive(Default)]
pub struct MemoryStore {
	connections: RwLock<HashMap<ConnectionId, Connection>>,
	grants: RwLock<HashMap<ConnectionId, GrantSnapshot>>,
	installations: RwLock<HashMap<InstallationId, (ScopeRef, ProviderId)>>,
	oauth_state: RwLock<HashMap<String, (Vec<u8>, OffsetDateTime)>>,
	replay: RwLock<std::collections::HashSet<(ProviderId, String, String)>>,
	deliveries: RwLock<HashMap<(ProviderId, DeliveryId), DeliveryRecord>>,
	cursors: RwLock<HashMap<(ConnectionId, String), String>>,
	outbox: RwLock<HashMap<OutboxEventId, (ConnectionId, Vec<u8>, u32, OffsetDateTime)>>,
	idempotency: RwLock<HashMap<IdempotencyKey, (OffsetDateTime, Option<Vec<u8>>)>>,
	rate_limits: RwLock<HashMap<(ConnectionId, String), (u32, OffsetDateTime)>>,
	activity: RwLock<Vec<(ConnectionId, Vec<u8>, OffsetDateTime)>>,
	credentials: RwLock<HashMap<ConnectionId, String>>,
	subscriptions: RwLock<HashMap<ConnectionId, Vec<String>>>,
	sync_jobs: RwLock<HashMap<(ConnectionId, String), SyncJob>>,
}
impl ConnectionStore for MemoryStore {
	fn put<'a>(&'a self, connection: Connection) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.connections.write().insert(connection.id.clone(), connection);

			Ok(())
		})
	}

	fn get<'a>(&'a self, id: &'a ConnectionId) -> StoreFuture<'a, Connection> {
		Box::pin(async move {
			self.connections.read().get(id).cloned().ok_or_else(|| StoreError::NotFound(id.to_string()))
		})
	}

	fn find_by_provider_scope<'a>(
		&'a self,
		provider: &'a ProviderId,
		scope: &'a ScopeRef,
	) -> StoreFuture<'a, Vec<Connection>> {
		Box::pin(async move {
			Ok(self
				.connections
				.read()
				.values()
				.filter(|c| &c.provider == provider && &c.scope == scope)
				.cloned()
				.collect())
		})
	}

	fn compare_and_swap<'a>(
		&'a self,
		id: &'a ConnectionId,
		expected_version: u64,
		next: Connection,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move {
			let mut connections = self.connections.write();

			match connections.get(id) {
				None => Ok(CompareAndSwapOutcome::Missing),
				Some(current) if current.version != expected_version => Ok(CompareAndSwapOutcome::RefreshMismatch),
				Some(_) => {
					connections.insert(id.clone(), next);

					Ok(CompareAndSwapOutcome::Updated)
				},
			}
		})
	}

	fn find_by_scope_and_external_account<'a>(
		&'a self,
		scope: &'a ScopeRef,
		external_account_id: &'a str,
	) -> StoreFuture<'a, Vec<Connection>> {
		Box::pin(async move {
			Ok(self
				.connections
				.read()
				.values()
				.filter(|c| &c.scope == scope && c.external_account_id.as_deref() == Some(external_account_id))
				.cloned()
				.collect())
		})
	}

	fn delete<'a>(&'a self, id: &'a ConnectionId) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.connections.write().remove(id);

			Ok(())
		})
	}
}
impl CredentialStore for MemoryStore {
	fn put<'a>(&'a self, connection: &'a ConnectionId, envelope: String) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.credentials.write().insert(connection.clone(), envelope);

			Ok(())
		})
	}

	fn get<'a>(&'a self, connection: &'a ConnectionId) -> StoreFuture<'a, String> {
		Box::pin(async move {
			self.credentials.read().get(connection).cloned().ok_or_else(|| StoreError::NotFound(connection.to_string()))
		})
	}
}
impl SubscriptionStore for MemoryStore {
	fn put<'a>(&'a self, connection: &'a ConnectionId, topics: Vec<String>) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.subscriptions.write().insert(connection.clone(), topics);

			Ok(())
		})
	}

	fn get<'a>(&'a self, connection: &'a ConnectionId) -> StoreFuture<'a, Vec<String>> {
		Box::pin(async move { Ok(self.subscriptions.read().get(connection).cloned().unwrap_or_default()) })
	}
}
impl SyncJobStore for MemoryStore {
	fn put<'a>(&'a self, job: SyncJob) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.sync_jobs.write().insert((job.connection.clone(), job.resource.clone()), job);

			Ok(())
		})
	}

	fn get<'a>(&'a self, connection: &'a ConnectionId, resource: &'a str) -> StoreFuture<'a, Option<SyncJob>> {
		Box::pin(async move { Ok(self.sync_jobs.read().get(&(connection.clone(), resource.to_owned())).cloned()) })
	}

	fn compare_and_swap<'a>(
		&'a self,
		connection: &'a ConnectionId,
		resource: &'a str,
		expected_version: u64,
		next: SyncJob,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move {
			let key = (connection.clone(), resource.to_owned());
			let mut jobs = self.sync_jobs.write();

			match jobs.get(&key) {
				None => Ok(CompareAndSwapOutcome::Missing),
				Some(current) if current.version != expected_version => Ok(CompareAndSwapOutcome::RefreshMismatch),
				Some(_) => {
					jobs.insert(key, next);

					Ok(CompareAndSwapOutcome::Updated)
				},
			}
		})
	}
}
impl GrantStore for MemoryStore {
	fn put<'a>(&'a self, connection: &'a ConnectionId, snapshot: GrantSnapshot) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.grants.write().insert(connection.clone(), snapshot);

			Ok(())
		})
	}

	fn get<'a>(&'a self, connection: &'a ConnectionId) -> StoreFuture<'a, GrantSnapshot> {
		Box::pin(async move {
			self.grants.read().get(connection).cloned().ok_or_else(|| StoreError::NotFound(connection.to_string()))
		})
	}
}
impl InstallationStore for MemoryStore {
	fn put<'a>(&'a self, id: InstallationId, scope: ScopeRef, provider: ProviderId) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.installations.write().insert(id, (scope, provider));

			Ok(())
		})
	}

	fn get<'a>(&'a self, id: &'a InstallationId) -> StoreFuture<'a, (ScopeRef, ProviderId)> {
		Box::pin(async move {
			self.installations.read().get(id).cloned().ok_or_else(|| StoreError::NotFound(id.to_string()))
		})
	}
}
impl OAuthStateStore for MemoryStore {
	fn put<'a>(&'a self, state: &'a str, payload: Vec<u8>, expires_at: OffsetDateTime) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.oauth_state.write().insert(state.to_owned(), (payload, expires_at));

			Ok(())
		})
	}

	fn take<'a>(&'a self, state: &'a str) -> StoreFuture<'a, Vec<u8>> {
		Box::pin(async move {
			let (payload, expires_at) =
				self.oauth_state.write().remove(state).ok_or_else(|| StoreError::NotFound(state.to_owned()))?;

			if expires_at <= OffsetDateTime::now_utc() {
				return Err(StoreError::NotFound(state.to_owned()));
			}

			Ok(payload)
		})
	}
}
impl ReplayLedger for MemoryStore {
	fn consume<'a>(
		&'a self,
		provider: &'a ProviderId,
		shop: &'a str,
		jti: &'a str,
		_expires_at: OffsetDateTime,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let key = (provider.clone(), shop.to_owned(), jti.to_owned());
			let mut replay = self.replay.write();

			if !replay.insert(key) {
				return Err(StoreError::CasMismatch(jti.to_owned()));
			}

			Ok(())
		})
	}
}
impl DeliveryLedger for MemoryStore {
	fn record<'a>(&'a self, record: DeliveryRecord) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			let key = (record.provider.clone(), record.delivery_id.clone());
			let mut deliveries = self.deliveries.write();

			if deliveries.contains_key(&key) {
				return Ok(false);
			}

			deliveries.insert(key, record);

			Ok(true)
		})
	}

	fn get<'a>(&'a self, provider: &'a ProviderId, delivery_id: &'a DeliveryId) -> StoreFuture<'a, DeliveryRecord> {
		Box::pin(async move {
			self.deliveries
				.read()
				.get(&(provider.clone(), delivery_id.clone()))
				.cloned()
				.ok_or_else(|| StoreError::NotFound(delivery_id.to_string()))
		})
	}

	fn compare_and_swap<'a>(
		&'a self,
		provider: &'a ProviderId,
		delivery_id: &'a DeliveryId,
		expected_version: u64,
		next: DeliveryRecord,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move {
			let key = (provider.clone(), delivery_id.clone());
			let mut deliveries = self.deliveries.write();

			match deliveries.get(&key) {
				None => Ok(CompareAndSwapOutcome::Missing),
				Some(current) if current.version != expected_version => Ok(CompareAndSwapOutcome::RefreshMismatch),
				Some(_) => {
					deliveries.insert(key, next);

					Ok(CompareAndSwapOutcome::Updated)
				},
			}
		})
	}
}
impl SyncCursorStore for MemoryStore {
	fn get<'a>(&'a self, connection: &'a ConnectionId, resource: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move { Ok(self.cursors.read().get(&(connection.clone(), resource.to_owned())).cloned()) })
	}

	fn advance<'a>(&'a self, connection: &'a ConnectionId, resource: &'a str, cursor: String) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.cursors.write().insert((connection.clone(), resource.to_owned()), cursor);

			Ok(())
		})
	}
}
impl OutboxStore for MemoryStore {
	fn enqueue<'a>(&'a self, id: OutboxEventId, connection: ConnectionId, payload: Vec<u8>) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.outbox.write().insert(id, (connection, payload, 0, OffsetDateTime::now_utc()));

			Ok(())
		})
	}

	fn claim<'a>(&'a self, limit: usize) -> StoreFuture<'a, Vec<(OutboxEventId, ConnectionId, Vec<u8>)>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let outbox = self.outbox.read();

			Ok(outbox
				.iter()
				.filter(|(_, (_, _, _, not_before))| *not_before <= now)
				.take(limit)
				.map(|(id, (connection, payload, _, _))| (id.clone(), connection.clone(), payload.clone()))
				.collect())
		})
	}

	fn ack<'a>(&'a self, id: &'a OutboxEventId) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.outbox.write().remove(id);

			Ok(())
		})
	}

	fn retry_or_dead_letter<'a>(
		&'a self,
		id: &'a OutboxEventId,
		not_before: OffsetDateTime,
		max_attempts: u32,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut outbox = self.outbox.write();

			if let Some(entry) = outbox.get_mut(id) {
				entry.2 += 1;

				if entry.2 >= max_attempts {
					outbox.remove(id);
				} else {
					entry.3 = not_before;
				}
			}

			Ok(())
		})
	}
}
impl IdempotencyClaimStore for MemoryStore {
	fn claim<'a>(&'a self, key: &'a IdempotencyKey, lease_until: OffsetDateTime) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			let mut claims = self.idempotency.write();
			let now = OffsetDateTime::now_utc();

			match claims.get(key) {
				Some((expires, _)) if *expires > now => Ok(false),
				_ => {
					claims.insert(key.clone(), (lease_until, None));

					Ok(true)
				},
			}
		})
	}

	fn complete<'a>(&'a self, key: &'a IdempotencyKey, response: Vec<u8>) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.idempotency.write().insert(key.clone(), (OffsetDateTime::now_utc(), Some(response)));

			Ok(())
		})
	}

	fn completed_response<'a>(&'a self, key: &'a IdempotencyKey) -> StoreFuture<'a, Option<Vec<u8>>> {
		Box::pin(async move { Ok(self.idempotency.read().get(key).and_then(|(_, r)| r.clone())) })
	}

	fn release<'a>(&'a self, key: &'a IdempotencyKey) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.idempotency.write().remove(key);

			Ok(())
		})
	}
}
impl RateLimitStateStore for MemoryStore {
	fn get<'a>(&'a self, connection: &'a ConnectionId, bucket: &'a str) -> StoreFuture<'a, Option<(u32, OffsetDateTime)>> {
		Box::pin(async move { Ok(self.rate_limits.read().get(&(connection.clone(), bucket.to_owned())).copied()) })
	}

	fn put<'a>(
		&'a self,
		connection: &'a ConnectionId,
		bucket: &'a str,
		tokens: u32,
		window_start: OffsetDateTime,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.rate_limits.write().insert((connection.clone(), bucket.to_owned()), (tokens, window_start));

			Ok(())
		})
	}
}
impl ActivitySink for MemoryStore {
	fn append<'a>(&'a self, connection: &'a ConnectionId, payload: Vec<u8>) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.activity.write().push((connection.clone(), payload, OffsetDateTime::now_utc()));

			Ok(())
		})
	}

	fn prune<'a>(&'a self, older_than: OffsetDateTime, row_cap: usize) -> StoreFuture<'a, usize> {
		Box::pin(async move {
			let mut activity = self.activity.write();
			let before = activity.len();

			activity.retain(|(_, _, at)| *at >= older_than);

			if activity.len() > row_cap {
				let excess = activity.len() - row_cap;

				activity.drain(..excess);
			}

			Ok(before - activity.len())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn connection_cas_rejects_stale_version() {
		let store = MemoryStore::default();
		let connection = Connection::pending(
			ConnectionId::new("conn-1").expect("Connection id fixture should be valid."),
			ScopeRef::new("user", "usr_1").expect("Scope fixture should be valid."),
			ProviderId::new("shopify").expect("Provider id fixture should be valid."),
			crate::auth::kind::AuthKind::OAuth2AuthCode,
		);

		ConnectionStore::put(&store, connection.clone()).await.expect("Put should succeed.");

		let stale = connection.transition(crate::connection::ConnectionStatus::Active);
		let outcome = ConnectionStore::compare_and_swap(&store, &connection.id, 99, stale)
			.await
			.expect("Compare-and-swap call should not error.");

		assert_eq!(outcome, CompareAndSwapOutcome::RefreshMismatch);
	}

	#[tokio::test]
	async fn idempotency_claim_blocks_concurrent_duplicate() {
		let store = MemoryStore::default();
		let key = IdempotencyKey::new("key-1").expect("Idempotency key fixture should be valid.");
		let lease_until = OffsetDateTime::now_utc() + Duration::seconds(30);

		assert!(IdempotencyClaimStore::claim(&store, &key, lease_until).await.expect("Claim should not error."));
		assert!(!IdempotencyClaimStore::claim(&store, &key, lease_until).await.expect("Claim should not error."));
	}
}
