//! Outbox dispatcher: claim -> ack/retry -> dead-letter lifecycle for
//! outbound sync events.

// self
use crate::{_prelude::*, ids::ConnectionId, ids::OutboxEventId, store::OutboxStore};

/// Drains an [`OutboxStore`] by dispatching claimed entries through a caller-supplied sender.
pub struct OutboxDispatcher {
	/// Backing outbox storage.
	pub store: Arc<dyn OutboxStore>,
	/// Maximum delivery attempts before dead-lettering an entry.
	pub max_attempts: u32,
	/// Backoff applied before an entry becomes retry-eligible again.
	pub retry_backoff: Duration,
}
impl OutboxDispatcher {
	/// Enqueues a new outbound event for a connection.
	pub async fn enqueue(&self, id: OutboxEventId, connection: ConnectionId, payload: Vec<u8>) -> Result<(), Error> {
		self.store.enqueue(id, connection, payload).await?;

		Ok(())
	}

	/// Claims up to `limit` ready entries and dispatches each through `send`, acking on success
	/// and retry/dead-lettering on failure.
	pub async fn drain<F, Fut>(&self, limit: usize, send: F) -> Result<usize, Error>
	where
		F: Fn(ConnectionId, Vec<u8>) -> Fut,
		Fut: Future<Output = Result<(), Error>>,
	{
		let claimed = self.store.claim(limit).await?;
		let count = claimed.len();

		for (id, connection, payload) in claimed {
			match send(connection, payload).await {
				Ok(()) => self.store.ack(&id).await?,
				Err(_) => {
					self.store
						.retry_or_dead_letter(&id, OffsetDateTime::now_utc() + self.retry_backoff, self.max_attempts)
						.await?
				},
			}
		}

		Ok(count)
	}
}
