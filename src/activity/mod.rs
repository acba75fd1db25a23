//! Activity log: a bounded, non-blocking writer that never stalls a
//! capability invocation waiting on slow storage.

// self
use crate::{_prelude::*, ids::ConnectionId, store::ActivitySink};

const DEFAULT_QUEUE_DEPTH: usize = 128;

/// A single activity record queued for persistence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityRecord {
	/// Connection the activity pertains to.
	pub connection: ConnectionId,
	/// Short event kind, e.g. `capability.invoked`.
	pub kind: String,
	/// Instant the event occurred.
	pub at: OffsetDateTime,
}

/// Retention policy applied by on-demand pruning: records older than `ttl` are dropped, then the
/// remainder is trimmed down to `row_cap` records if still over budget.
#[derive(Clone, Copy, Debug)]
pub struct RetentionPolicy {
	/// Maximum age a record may reach before it is eligible for pruning.
	pub ttl: Duration,
	/// Maximum number of records kept regardless of age.
	pub row_cap: usize,
}

/// Bounded-queue writer fronting one or more [`ActivitySink`] backends.
///
/// When the queue is full, the oldest queued record is written straight to the fallback sink
/// instead of being dropped — activity logging is best-effort, but an overflow still degrades to
/// a slower path rather than silently losing the record.
pub struct ActivityLog {
	primary: Arc<dyn ActivitySink>,
	fallback: Option<Arc<dyn ActivitySink>>,
	queue: Mutex<std::collections::VecDeque<(ConnectionId, Vec<u8>)>>,
	depth: usize,
}
impl ActivityLog {
	/// Creates a log with the default queue depth (128 entries).
	pub fn new(primary: Arc<dyn ActivitySink>, fallback: Option<Arc<dyn ActivitySink>>) -> Self {
		Self::with_depth(primary, fallback, DEFAULT_QUEUE_DEPTH)
	}

	/// Creates a log with an explicit queue depth.
	pub fn with_depth(primary: Arc<dyn ActivitySink>, fallback: Option<Arc<dyn ActivitySink>>, depth: usize) -> Self {
		Self { primary, fallback, queue: Mutex::new(std::collections::VecDeque::with_capacity(depth)), depth }
	}

	/// Enqueues a record. When the queue is already at capacity, the oldest queued entry is
	/// evicted and written directly to the fallback sink before the new record is queued, so
	/// overflow degrades to slower storage rather than losing data.
	pub async fn record(&self, connection: ConnectionId, record: &ActivityRecord) {
		let Ok(payload) = serde_json::to_vec(record) else { return };
		let evicted = {
			let mut queue = self.queue.lock();
			let evicted = if queue.len() >= self.depth { queue.pop_front() } else { None };

			queue.push_back((connection, payload));

			evicted
		};

		if let Some((connection, payload)) = evicted {
			if let Some(fallback) = &self.fallback {
				let _ = fallback.append(&connection, payload).await;
			}
		}
	}

	/// Flushes queued records to the primary sink, falling back on primary failure.
	pub async fn flush(&self) -> usize {
		let drained: Vec<_> = {
			let mut queue = self.queue.lock();

			queue.drain(..).collect()
		};
		let count = drained.len();

		for (connection, payload) in drained {
			if self.primary.append(&connection, payload.clone()).await.is_err() {
				if let Some(fallback) = &self.fallback {
					let _ = fallback.append(&connection, payload).await;
				}
			}
		}

		count
	}

	/// Prunes the primary (and, when present, fallback) sink according to `policy`, invoked on
	/// demand by a caller rather than on a schedule. Returns the total number of records removed.
	pub async fn prune(&self, policy: RetentionPolicy) -> usize {
		let cutoff = OffsetDateTime::now_utc() - policy.ttl;
		let mut removed = self.primary.prune(cutoff, policy.row_cap).await.unwrap_or(0);

		if let Some(fallback) = &self.fallback {
			removed += fallback.prune(cutoff, policy.row_cap).await.unwrap_or(0);
		}

		removed
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreFuture;

	#[derive(Default)]
	struct RecordingSink {
		appended: Mutex<Vec<Vec<u8>>>,
	}
	impl ActivitySink for RecordingSink {
		fn append<'a>(&'a self, _connection: &'a ConnectionId, payload: Vec<u8>) -> StoreFuture<'a, ()> {
			Box::pin(async move {
				self.appended.lock().push(payload);

				Ok(())
			})
		}

		fn prune<'a>(&'a self, _older_than: OffsetDateTime, _row_cap: usize) -> StoreFuture<'a, usize> {
			Box::pin(async move { Ok(0) })
		}
	}

	fn record(kind: &str) -> ActivityRecord {
		ActivityRecord { connection: ConnectionId::new("conn-1").unwrap(), kind: kind.into(), at: OffsetDateTime::now_utc() }
	}

	#[tokio::test]
	async fn overflow_degrades_to_fallback_instead_of_dropping() {
		let fallback = Arc::new(RecordingSink::default());
		let log = ActivityLog::with_depth(Arc::new(RecordingSink::default()), Some(fallback.clone()), 1);

		log.record(ConnectionId::new("conn-1").unwrap(), &record("first")).await;
		log.record(ConnectionId::new("conn-1").unwrap(), &record("second")).await;

		assert_eq!(fallback.appended.lock().len(), 1);
	}

	#[tokio::test]
	async fn flush_drains_the_queue_into_the_primary_sink() {
		let primary = Arc::new(RecordingSink::default());
		let log = ActivityLog::new(primary.clone(), None);

		log.record(ConnectionId::new("conn-1").unwrap(), &record("first")).await;

		let flushed = log.flush().await;

		assert_eq!(flushed, 1);
		assert_eq!(primary.appended.lock().len(), 1);
	}
}
