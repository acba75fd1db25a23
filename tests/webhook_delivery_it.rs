//! Webhook ledger integration tests: dedup on record, claim/complete/fail
//! lifecycle, and signature verification templates.

use integrations_broker::{
	store::DeliveryLedger,
	webhook::{DeliveryRecord, DeliveryStatus, verify::{VerificationTemplate, verify}},
};

#[tokio::test]
async fn duplicate_delivery_is_not_recorded_twice() {
	let store = integrations_broker::store::memory::MemoryStore::default();
	let provider: integrations_broker::ids::ProviderId = "shopify".parse().expect("Provider id fixture should be valid.");
	let delivery_id: integrations_broker::ids::DeliveryId = "dlv-1".parse().expect("Delivery id fixture should be valid.");

	let first = store
		.record(DeliveryRecord::new(provider, delivery_id.clone(), b"{}".to_vec()))
		.await
		.expect("Record should not error.");
	let second = store
		.record(DeliveryRecord::new("shopify".parse().unwrap(), delivery_id, b"{}".to_vec()))
		.await
		.expect("Record should not error.");

	assert!(first);
	assert!(!second);
}

#[tokio::test]
async fn claim_complete_cycle_transitions_state() {
	let store = integrations_broker::store::memory::MemoryStore::default();
	let provider: integrations_broker::ids::ProviderId = "shopify".parse().expect("Provider id fixture should be valid.");
	let delivery_id: integrations_broker::ids::DeliveryId = "dlv-2".parse().expect("Delivery id fixture should be valid.");
	let record = DeliveryRecord::new(provider.clone(), delivery_id.clone(), b"{}".to_vec());

	store.record(record.clone()).await.expect("Record should not error.");

	let claimed = record.claim();
	store.compare_and_swap(&provider, &delivery_id, record.version, claimed.clone()).await.expect("CAS should not error.");

	let completed = claimed.complete();
	store
		.compare_and_swap(&provider, &delivery_id, claimed.version, completed.clone())
		.await
		.expect("CAS should not error.");

	let loaded = store.get(&provider, &delivery_id).await.expect("Delivery should be found.");
	assert_eq!(loaded.status, DeliveryStatus::Processed);
}

#[test]
fn meta_template_roundtrips_against_hex_prefixed_signature() {
	let secret = "super-secret";
	let body = b"{\"field\":\"value\"}";

	let signature = {
		use hmac::{Hmac, Mac};
		use sha2::Sha256;

		let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
		mac.update(body);
		format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
	};

	assert!(verify(VerificationTemplate::MetaHexPrefixed, secret, body, &signature));
}
