//! Background sync job tracking, independent of the resource-level cursor.

// self
use crate::{_prelude::*, ids::ConnectionId};

/// Lifecycle status of a background sync job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncJobStatus {
	/// Queued but not yet picked up by a worker.
	Pending,
	/// Currently executing.
	Running,
	/// Finished successfully.
	Completed,
	/// Finished with an unrecoverable error.
	Failed,
}

/// A single background sync job for a `(connection, resource)` pair (e.g. an initial full
/// resync, distinct from the incremental [`crate::sync::cursor::CursorTracker`] cursor).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncJob {
	/// Connection this job syncs on behalf of.
	pub connection: ConnectionId,
	/// Resource being synced, e.g. `orders`.
	pub resource: String,
	/// Current lifecycle status.
	pub status: SyncJobStatus,
	/// Monotonic version, bumped on every transition (used for CAS).
	pub version: u64,
	/// Last status transition timestamp.
	pub updated_at: OffsetDateTime,
}
impl SyncJob {
	/// Creates a brand-new job in `pending`.
	pub fn pending(connection: ConnectionId, resource: impl Into<String>) -> Self {
		Self { connection, resource: resource.into(), status: SyncJobStatus::Pending, version: 1, updated_at: OffsetDateTime::now_utc() }
	}

	/// Returns a copy transitioned to `status`, with version/timestamp bumped.
	pub fn transition(&self, status: SyncJobStatus) -> Self {
		let mut next = self.clone();

		next.status = status;
		next.version += 1;
		next.updated_at = OffsetDateTime::now_utc();

		next
	}
}
