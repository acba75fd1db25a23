//! Monotonic sync cursors, keyed by `(connection, resource)`.

// self
use crate::{_prelude::*, ids::ConnectionId, store::SyncCursorStore};

/// Advances and reads per-resource sync cursors for a connection.
pub struct CursorTracker {
	/// Backing cursor storage.
	pub store: Arc<dyn SyncCursorStore>,
}
impl CursorTracker {
	/// Returns the current cursor for `(connection, resource)`, if one has been recorded.
	pub async fn current(&self, connection: &ConnectionId, resource: &str) -> Result<Option<String>, Error> {
		Ok(self.store.get(connection, resource).await?)
	}

	/// Advances the cursor to `next`. Callers are responsible for only ever moving it forward;
	/// the store does not itself compare cursor ordering since cursor formats are provider-specific
	/// opaque strings.
	pub async fn advance(&self, connection: &ConnectionId, resource: &str, next: String) -> Result<(), Error> {
		self.store.advance(connection, resource, next).await?;

		Ok(())
	}
}
