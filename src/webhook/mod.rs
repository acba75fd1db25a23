//! Inbound webhook ledger: verification, delivery records, and the
//! claim/complete/fail processing lifecycle.

pub mod verify;

// self
use crate::{_prelude::*, ids::DeliveryId, ids::ProviderId};

/// Lifecycle state of an inbound webhook delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
	/// Recorded, not yet picked up for processing.
	Pending,
	/// Claimed by a worker and currently being handled.
	Processing,
	/// Successfully handled.
	Processed,
	/// Handling failed; eligible for another attempt after `not_before`.
	RetryReady,
	/// Exhausted its retry budget.
	Dead,
}

/// A single inbound webhook delivery tracked through to completion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeliveryRecord {
	/// Provider that sent the delivery.
	pub provider: ProviderId,
	/// Provider-supplied delivery identifier (deduplication key).
	pub delivery_id: DeliveryId,
	/// Raw request body, retained for replay/debugging.
	pub body: Vec<u8>,
	/// Current lifecycle state.
	pub status: DeliveryStatus,
	/// Number of processing attempts made so far.
	pub attempts: u32,
	/// Earliest instant a retry may be attempted.
	pub not_before: Option<OffsetDateTime>,
	/// Monotonic version for CAS updates.
	pub version: u64,
	/// Instant the delivery was first recorded.
	pub received_at: OffsetDateTime,
}
impl DeliveryRecord {
	/// Creates a new pending delivery record.
	pub fn new(provider: ProviderId, delivery_id: DeliveryId, body: Vec<u8>) -> Self {
		Self {
			provider,
			delivery_id,
			body,
			status: DeliveryStatus::Pending,
			attempts: 0,
			not_before: None,
			version: 1,
			received_at: OffsetDateTime::now_utc(),
		}
	}

	/// Returns a copy claimed for processing.
	pub fn claim(&self) -> Self {
		let mut next = self.clone();

		next.status = DeliveryStatus::Processing;
		next.attempts += 1;
		next.version += 1;

		next
	}

	/// Returns a copy marked processed.
	pub fn complete(&self) -> Self {
		let mut next = self.clone();

		next.status = DeliveryStatus::Processed;
		next.version += 1;

		next
	}

	/// Returns a copy marked for retry, or dead-lettered once `max_attempts` is reached.
	pub fn fail(&self, not_before: OffsetDateTime, max_attempts: u32) -> Self {
		let mut next = self.clone();

		next.status = if next.attempts >= max_attempts { DeliveryStatus::Dead } else { DeliveryStatus::RetryReady };
		next.not_before = Some(not_before);
		next.version += 1;

		next
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn retry_budget_dead_letters() {
		let record = DeliveryRecord::new(
			"shopify".parse().expect("Provider id fixture should be valid."),
			"dlv-1".parse().expect("Delivery id fixture should be valid."),
			b"{}".to_vec(),
		);
		let mut current = record;

		for _ in 0..3 {
			current = current.claim().fail(OffsetDateTime::now_utc(), 3);
		}

		assert_eq!(current.status, DeliveryStatus::Dead);
	}
}
