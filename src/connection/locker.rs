//! Single-flight refresh lease: ensures only one in-flight refresh exists
//! per connection, so concurrent capability invocations don't stampede the
//! provider's token endpoint.

// self
use crate::{_prelude::*, ids::ConnectionId};

/// Keyed guard table handing out a per-connection async lease.
///
/// Leases that are never released (e.g. a crashed holder) do not wedge the key forever: the
/// table entry is reclaimed once its `Arc` strong count drops to zero, so a fresh lease is
/// created rather than blocking indefinitely.
#[derive(Default)]
pub struct ConnectionLocker {
	guards: Mutex<HashMap<ConnectionId, Arc<AsyncMutex<()>>>>,
}
impl ConnectionLocker {
	/// Acquires the refresh lease for `connection`, blocking until any concurrent refresh
	/// finishes, then holding it for the returned guard's lifetime.
	pub async fn acquire(&self, connection: &ConnectionId) -> OwnedLease {
		let guard = {
			let mut guards = self.guards.lock();

			guards.entry(connection.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
		};

		let permit = guard.lock_arc().await;

		OwnedLease { _permit: permit }
	}
}

/// RAII handle releasing a connection's refresh lease on drop.
pub struct OwnedLease {
	_permit: async_lock::MutexGuardArc<()>,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn serializes_concurrent_refreshes() {
		let locker = Arc::new(ConnectionLocker::default());
		let connection = ConnectionId::new("conn-1").expect("Connection id fixture should be valid.");
		let counter = Arc::new(Mutex::new(0_u32));

		let mut handles = Vec::new();

		for _ in 0..4 {
			let locker = locker.clone();
			let connection = connection.clone();
			let counter = counter.clone();

			handles.push(tokio::spawn(async move {
				let _lease = locker.acquire(&connection).await;
				let mut value = counter.lock();

				*value += 1;
			}));
		}

		for handle in handles {
			handle.await.expect("Task should not panic.");
		}

		assert_eq!(*counter.lock(), 4);
	}
}
