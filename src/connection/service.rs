//! Connection lifecycle operations: `Connect`, `StartReconsent`,
//! `CompleteCallback`, `CompleteReconsent`, `Refresh`, `Revoke`.

// self
use crate::{
	_prelude::*,
	auth::{credential::ActiveCredential, kind::AuthKind},
	connection::{Connection, ConnectionStatus, locker::ConnectionLocker},
	error::ConflictError,
	grant::{GrantSet, GrantSnapshot},
	ids::{ConnectionId, OutboxEventId, ProviderId},
	provider::registry::ProviderRegistry,
	scope::ScopeRef,
	secret::Encrypt,
	store::{CompareAndSwapOutcome, ConnectionStore, CredentialStore, GrantStore, OutboxStore},
};

/// Resolves a callback URL for a provider, since redirect URIs are
/// deployment-specific (multi-tenant hosts often mint one per connection).
pub trait CallbackUrlResolver: Send + Sync {
	/// Returns the redirect URI a connection's authorization flow should use.
	fn resolve(&self, provider: &ProviderId, connection: &ConnectionId) -> Result<Url, Error>;
}

/// Orchestrates the connection state machine against a [`ConnectionStore`] and [`GrantStore`].
pub struct ConnectionService {
	/// Connection records.
	pub connections: Arc<dyn ConnectionStore>,
	/// Grant snapshots.
	pub grants: Arc<dyn GrantStore>,
	/// Encrypted credential envelopes.
	pub credentials: Arc<dyn CredentialStore>,
	/// Lifecycle event sink; a transition is only visible downstream once its event lands here.
	pub outbox: Arc<dyn OutboxStore>,
	/// Encrypts credential material before it is handed to [`CredentialStore`].
	pub encryptor: Arc<dyn Encrypt>,
	/// Refresh single-flight leases.
	pub locker: Arc<ConnectionLocker>,
	/// Provider plugins, consulted to normalize a provider's granted permissions before they are
	/// captured in a grant snapshot.
	pub providers: Arc<ProviderRegistry>,
}

#[derive(Serialize)]
struct LifecycleEvent<'a> {
	connection_id: &'a str,
	status: ConnectionStatus,
}
impl ConnectionService {
	/// `Connect`: creates a new `pending_auth` connection for `(provider, scope)`, or returns a
	/// conflict if an ambiguous active connection already exists and the caller did not disambiguate.
	pub async fn connect(
		&self,
		id: ConnectionId,
		scope: ScopeRef,
		provider: ProviderId,
		auth_kind: AuthKind,
	) -> Result<Connection, Error> {
		let existing = self.connections.find_by_provider_scope(&provider, &scope).await?;

		if existing.iter().any(|c| c.status.is_usable()) {
			return Err(Error::Conflict(ConflictError::ConnectionResolutionAmbiguous));
		}

		let connection = Connection::pending(id, scope, provider, auth_kind);

		self.connections.put(connection.clone()).await?;

		Ok(connection)
	}

	/// `CompleteCallback`: transitions a pending connection to `active` once the provider
	/// exchange has produced credential material, an external account identifier, and a grant
	/// snapshot.
	///
	/// If another connection already exists for the same `(scope, external_account_id)` under
	/// the same provider, that connection is reused (its pending record is discarded) rather than
	/// creating a second binding to the same external account. A match under a *different*
	/// provider is a genuine conflict.
	pub async fn complete_callback(
		&self,
		id: &ConnectionId,
		external_account_id: impl Into<String>,
		credential: ActiveCredential,
		requested: crate::grant::GrantSet,
		granted: crate::grant::GrantSet,
	) -> Result<Connection, Error> {
		let external_account_id = external_account_id.into();

		if external_account_id.trim().is_empty() {
			return Err(Error::bad_input("external_account_id must be non-empty on callback completion."));
		}

		let pending = self.connections.get(id).await?;
		let siblings =
			self.connections.find_by_scope_and_external_account(&pending.scope, &external_account_id).await?;
		let mut reuse_target = None;

		for sibling in siblings {
			if sibling.id == pending.id {
				continue;
			}
			if sibling.provider != pending.provider {
				return Err(Error::Conflict(ConflictError::DuplicateExternalAccount { external_account_id }));
			}
			if sibling.status != ConnectionStatus::Revoked {
				reuse_target = Some(sibling);
			}
		}

		let target = reuse_target.unwrap_or(pending);
		let mut next = target.transition(ConnectionStatus::Active);

		next.external_account_id = Some(external_account_id);

		match self.connections.compare_and_swap(&target.id, target.version, next.clone()).await? {
			CompareAndSwapOutcome::Updated => {},
			CompareAndSwapOutcome::RefreshMismatch => {
				return Err(Error::Conflict(ConflictError::ConnectionResolutionAmbiguous));
			},
			CompareAndSwapOutcome::Missing => return Err(Error::not_found("connection", target.id.to_string())),
		}

		if target.id != *id {
			self.connections.delete(id).await?;
		}

		let granted = self.normalize_granted(&target.provider, granted);

		self.persist_credential(&target.id, &credential).await?;
		self.grants.put(&target.id, GrantSnapshot::initial(requested, granted)).await?;
		self.emit_lifecycle_event(&next).await;

		Ok(next)
	}

	/// Encrypts and persists `credential` for `id`.
	async fn persist_credential(&self, id: &ConnectionId, credential: &ActiveCredential) -> Result<(), Error> {
		let plaintext = serde_json::to_vec(credential)
			.map_err(|source| Error::internal(format!("Credential did not serialize: {source}.")))?;
		let envelope = self.encryptor.encrypt(&plaintext)?;

		self.credentials.put(id, envelope).await?;

		Ok(())
	}

	/// Normalizes `granted` through the connection's provider plugin, when registered. Unknown
	/// providers pass the raw set through unchanged rather than failing the callback.
	fn normalize_granted(&self, provider: &ProviderId, granted: GrantSet) -> GrantSet {
		match self.providers.get(provider) {
			Some(plugin) => plugin.normalize_granted_permissions(&granted),
			None => granted,
		}
	}

	/// Best-effort lifecycle notification; enqueue failures never fail the transition itself.
	async fn emit_lifecycle_event(&self, connection: &Connection) {
		let event = LifecycleEvent { connection_id: connection.id.as_ref(), status: connection.status };

		let Ok(payload) = serde_json::to_vec(&event) else { return };

		let _ = self.outbox.enqueue(OutboxEventId::random(), connection.id.clone(), payload).await;
	}

	/// `StartReconsent`: marks an active connection as requiring re-consent (e.g. a capability
	/// now needs a grant the connection never requested).
	pub async fn start_reconsent(&self, id: &ConnectionId) -> Result<Connection, Error> {
		self.transition(id, ConnectionStatus::ReconsentRequired).await
	}

	/// `CompleteReconsent`: re-activates a connection after the user approves additional grants,
	/// recording the superseding snapshot.
	pub async fn complete_reconsent(
		&self,
		id: &ConnectionId,
		requested: crate::grant::GrantSet,
		granted: crate::grant::GrantSet,
	) -> Result<Connection, Error> {
		let connection = self.connections.get(id).await?;
		let granted = self.normalize_granted(&connection.provider, granted);
		let previous = self.grants.get(id).await?;

		self.grants.put(id, previous.next(requested, granted)).await?;

		self.transition(id, ConnectionStatus::Active).await
	}

	/// `Refresh`: acquires the connection's single-flight lease, then invokes `refresh_fn` to
	/// produce new credential material. Failure transitions the connection to `refresh_failed`.
	pub async fn refresh<F, Fut>(&self, id: &ConnectionId, refresh_fn: F) -> Result<Connection, Error>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<(), Error>>,
	{
		let _lease = self.locker.acquire(id).await;
		let current = self.connections.get(id).await?;

		match refresh_fn().await {
			Ok(()) => {
				if current.status == ConnectionStatus::Active {
					return Ok(current);
				}

				self.transition(id, ConnectionStatus::Active).await
			},
			Err(error) if error.is_retryable() => {
				// A transient provider/transport failure does not indict the credential itself;
				// leave the connection as-is so the next scheduled refresh can retry.
				Err(error)
			},
			Err(error) => {
				self.transition(id, ConnectionStatus::RefreshFailed).await?;

				Err(error)
			},
		}
	}

	/// `Revoke`: terminally marks a connection revoked; credential material should be discarded
	/// by the caller via [`crate::secret`] separately.
	pub async fn revoke(&self, id: &ConnectionId) -> Result<Connection, Error> {
		self.transition(id, ConnectionStatus::Revoked).await
	}

	async fn transition(&self, id: &ConnectionId, status: ConnectionStatus) -> Result<Connection, Error> {
		let current = self.connections.get(id).await?;
		let next = current.transition(status);

		match self.connections.compare_and_swap(id, current.version, next.clone()).await? {
			CompareAndSwapOutcome::Updated => {
				self.emit_lifecycle_event(&next).await;

				Ok(next)
			},
			CompareAndSwapOutcome::RefreshMismatch => {
				Err(Error::Conflict(ConflictError::ConnectionResolutionAmbiguous))
			},
			CompareAndSwapOutcome::Missing => Err(Error::not_found("connection", id.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::strategy::AuthStrategy,
		provider::descriptor::ProviderDescriptor,
		provider::plugin::Provider,
		secret::local_aes::LocalAesKey,
		store::memory::MemoryStore,
	};

	struct HierarchicalProvider(ProviderDescriptor);
	impl Provider for HierarchicalProvider {
		fn descriptor(&self) -> &ProviderDescriptor {
			&self.0
		}

		fn strategy(&self, _kind: AuthKind) -> Option<Arc<dyn AuthStrategy>> {
			None
		}

		fn normalize_granted_permissions(&self, granted: &GrantSet) -> GrantSet {
			if granted.contains("admin") {
				GrantSet::new(granted.grants.iter().cloned().chain(["read".to_owned()])).expect("Expansion stays valid.")
			} else {
				granted.clone()
			}
		}
	}

	fn service_with_provider(provider: Arc<dyn Provider>) -> (ConnectionService, Arc<MemoryStore>) {
		let store = Arc::new(MemoryStore::default());
		let registry = Arc::new(ProviderRegistry::default());

		registry.register(provider);

		let service = ConnectionService {
			connections: store.clone(),
			grants: store.clone(),
			credentials: store.clone(),
			outbox: store.clone(),
			encryptor: Arc::new(LocalAesKey::new("test-kid", 1, &[0_u8; 32])),
			locker: Arc::new(ConnectionLocker::default()),
			providers: registry,
		};

		(service, store)
	}

	#[tokio::test]
	async fn complete_callback_expands_implied_grants_via_the_provider() {
		let descriptor = ProviderDescriptor::builder("hierarchical", "https://api.example".parse().unwrap())
			.unwrap()
			.auth_kind(AuthKind::ApiKey)
			.build()
			.unwrap();
		let (service, _store) = service_with_provider(Arc::new(HierarchicalProvider(descriptor)));
		let connection_id = ConnectionId::new("conn-1").unwrap();
		let scope = ScopeRef::new("user", "usr-1").unwrap();
		let provider = ProviderId::new("hierarchical").unwrap();

		service.connect(connection_id.clone(), scope, provider, AuthKind::ApiKey).await.unwrap();
		service
			.complete_callback(
				&connection_id,
				"acct-1",
				ActiveCredential::static_secret("key-1"),
				GrantSet::new(["admin"]).unwrap(),
				GrantSet::new(["admin"]).unwrap(),
			)
			.await
			.unwrap();

		let snapshot = service.grants.get(&connection_id).await.unwrap();

		assert!(snapshot.granted.contains("read"));
		assert!(snapshot.granted.contains("admin"));
	}
}
