//! Outbox dispatch integration tests: claim/ack and claim/retry/dead-letter.

use integrations_broker::{ids::{ConnectionId, OutboxEventId}, store::memory::MemoryStore, sync::outbox::OutboxDispatcher};
use std::sync::Arc;
use time::Duration;

#[tokio::test]
async fn successful_send_acks_entry() {
	let store = Arc::new(MemoryStore::default());
	let dispatcher = OutboxDispatcher { store, max_attempts: 3, retry_backoff: Duration::seconds(1) };
	let connection = ConnectionId::new("conn-1").expect("Connection id fixture should be valid.");

	dispatcher
		.enqueue(OutboxEventId::new("evt-1").expect("Outbox event id fixture should be valid."), connection, b"payload".to_vec())
		.await
		.expect("Enqueue should succeed.");

	let drained = dispatcher.drain(10, |_connection, _payload| async { Ok(()) }).await.expect("Drain should succeed.");
	assert_eq!(drained, 1);

	let remaining = dispatcher.drain(10, |_connection, _payload| async { Ok(()) }).await.expect("Drain should succeed.");
	assert_eq!(remaining, 0);
}

#[tokio::test]
async fn failed_send_dead_letters_after_max_attempts() {
	let store = Arc::new(MemoryStore::default());
	let dispatcher = OutboxDispatcher { store, max_attempts: 2, retry_backoff: Duration::ZERO };
	let connection = ConnectionId::new("conn-1").expect("Connection id fixture should be valid.");

	dispatcher
		.enqueue(OutboxEventId::new("evt-2").expect("Outbox event id fixture should be valid."), connection, b"payload".to_vec())
		.await
		.expect("Enqueue should succeed.");

	for _ in 0..2 {
		dispatcher
			.drain(10, |_connection, _payload| async { Err(integrations_broker::error::Error::internal("boom")) })
			.await
			.expect("Drain should succeed.");
	}

	let drained = dispatcher.drain(10, |_connection, _payload| async { Ok(()) }).await.expect("Drain should succeed.");
	assert_eq!(drained, 0, "Entry should have been dead-lettered and no longer claimable.");
}
