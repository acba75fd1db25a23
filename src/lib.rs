//! Embeddable integration runtime: multi-provider auth, envelope-encrypted
//! credentials, capability-gated provider operations, and webhook/sync
//! ledgers for backends that connect tenants to third-party platforms.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod activity;
pub mod auth;
pub mod capability;
pub mod connection;
pub mod error;
pub mod facade;
pub mod grant;
pub mod ids;
pub mod obs;
pub mod provider;
pub mod scope;
pub mod secret;
pub mod store;
pub mod sync;
pub mod webhook;

#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		activity::ActivityLog,
		auth::kind::AuthKind,
		capability::{CapabilityRuntime, rate_limit::FixedWindowPolicy, transport::ReqwestTransportAdapter},
		connection::{locker::ConnectionLocker, service::ConnectionService},
		facade::Service,
		ids::{ConnectionId, ProviderId},
		provider::registry::ProviderRegistry,
		scope::ScopeRef,
		secret::local_aes::LocalAesKey,
		store::memory::MemoryStore,
	};

	/// Builds a reqwest client that accepts the self-signed certificates `httpmock` produces.
	pub fn test_reqwest_client() -> ReqwestClient {
		ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.")
	}

	/// Constructs a pre-wired [`Service`] backed by a single in-memory [`MemoryStore`], returning
	/// the service alongside the shared store so tests can inspect persisted state directly.
	pub fn build_test_service() -> (Service, Arc<MemoryStore>) {
		let store = Arc::new(MemoryStore::default());
		let connections = ConnectionService {
			connections: store.clone(),
			grants: store.clone(),
			credentials: store.clone(),
			outbox: store.clone(),
			encryptor: Arc::new(LocalAesKey::new("test-kid", 1, &[0_u8; 32])),
			locker: Arc::new(ConnectionLocker::default()),
			providers: Arc::new(ProviderRegistry::default()),
		};
		let capabilities = CapabilityRuntime {
			connections: store.clone(),
			grants: store.clone(),
			idempotency: store.clone(),
			transport: Arc::new(ReqwestTransportAdapter::new(test_reqwest_client())),
			rate_limit_policy: FixedWindowPolicy { limit: 100, window: Duration::seconds(60) },
		};
		let outbox = crate::sync::outbox::OutboxDispatcher {
			store: store.clone(),
			max_attempts: 5,
			retry_backoff: Duration::seconds(30),
		};
		let activity = Some(Arc::new(ActivityLog::new(store.clone(), None)));

		let service = Service::new(connections, capabilities, store.clone(), store.clone(), outbox, activity)
			.expect("Test service construction should succeed with an activity log present.");

		(service, store)
	}

	/// Convenience fixture: a fresh connection id, scope, and provider id for tests.
	pub fn fixture_identity() -> (ConnectionId, ScopeRef, ProviderId, AuthKind) {
		(
			ConnectionId::new("conn-test-1").expect("Connection id fixture should be valid."),
			ScopeRef::new("user", "usr-test-1").expect("Scope fixture should be valid."),
			ProviderId::new("example").expect("Provider id fixture should be valid."),
			AuthKind::ApiKey,
		)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::Client as ReqwestClient;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
