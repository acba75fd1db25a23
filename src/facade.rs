//! The embeddable façade: a single entry point delegating commands and
//! queries to the connection, capability, webhook, and sync services.

// self
use crate::{
	_prelude::*,
	activity::ActivityLog,
	capability::CapabilityRuntime,
	connection::service::ConnectionService,
	store::{DeliveryLedger, SyncCursorStore},
	sync::{cursor::CursorTracker, outbox::OutboxDispatcher},
};

/// Aggregates every service the façade delegates to.
///
/// Construction fails fast: an activity log is mandatory so capability invocations always have
/// somewhere to record audit activity, even if that somewhere is an in-memory sink in tests.
pub struct Service {
	/// Connection lifecycle operations.
	pub connections: ConnectionService,
	/// Capability invocation pipeline.
	pub capabilities: CapabilityRuntime,
	/// Webhook delivery ledger.
	pub deliveries: Arc<dyn DeliveryLedger>,
	/// Sync cursor tracking.
	pub cursors: CursorTracker,
	/// Outbox dispatch.
	pub outbox: OutboxDispatcher,
	/// Activity log.
	pub activity: Arc<ActivityLog>,
}
impl Service {
	/// Builds a façade from its collaborators. Returns
	/// [`crate::error::Error::Internal`] when `activity` is absent, since every other service
	/// depends on activity logging being available for audit trails.
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		connections: ConnectionService,
		capabilities: CapabilityRuntime,
		deliveries: Arc<dyn DeliveryLedger>,
		cursor_store: Arc<dyn SyncCursorStore>,
		outbox: OutboxDispatcher,
		activity: Option<Arc<ActivityLog>>,
	) -> Result<Self, Error> {
		let activity = activity.ok_or_else(|| {
			Error::internal("Service requires an activity log; none was supplied.")
		})?;

		Ok(Self {
			connections,
			capabilities,
			deliveries,
			cursors: CursorTracker { store: cursor_store },
			outbox,
			activity,
		})
	}
}
