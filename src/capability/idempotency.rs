//! Stable idempotency key derivation for capability invocations.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	ids::{ConnectionId, IdempotencyKey},
};

/// Computes a stable idempotency key from the invocation's identity: connection, capability
/// name, and a caller-supplied request fingerprint (e.g. a hash of the normalized request body).
///
/// Hashing with SHA-256 rather than [`DefaultHasher`] keeps the key stable across process
/// restarts and Rust versions, which a `Hash`-derived key would not guarantee.
pub fn derive_key(connection: &ConnectionId, capability: &str, request_fingerprint: &str) -> IdempotencyKey {
	let mut hasher = Sha256::new();

	hasher.update(connection.as_ref().as_bytes());
	hasher.update(b"\0");
	hasher.update(capability.as_bytes());
	hasher.update(b"\0");
	hasher.update(request_fingerprint.as_bytes());

	let encoded = URL_SAFE_NO_PAD.encode(hasher.finalize());

	IdempotencyKey::new(encoded).expect("Base64-encoded SHA-256 digest is always a valid IdempotencyKey.")
}

/// Computes a stable fingerprint of a request body/params map, independent of field order.
///
/// Uses SHA-256 rather than [`std::collections::hash_map::DefaultHasher`] for the same reason
/// [`derive_key`] does: the fingerprint feeds directly into the idempotency key, so it must stay
/// stable across process restarts and Rust versions.
pub fn fingerprint_params(params: &[(&str, &str)]) -> String {
	let mut sorted = params.to_vec();

	sorted.sort_unstable();

	let mut hasher = Sha256::new();

	for (key, value) in &sorted {
		hasher.update(key.as_bytes());
		hasher.update(b"\0");
		hasher.update(value.as_bytes());
		hasher.update(b"\0");
	}

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn derivation_is_stable_and_order_independent() {
		let connection = ConnectionId::new("conn-1").expect("Connection id fixture should be valid.");
		let fp_a = fingerprint_params(&[("a", "1"), ("b", "2")]);
		let fp_b = fingerprint_params(&[("b", "2"), ("a", "1")]);

		assert_eq!(fp_a, fp_b);

		let key_a = derive_key(&connection, "crm.accounts.create", &fp_a);
		let key_b = derive_key(&connection, "crm.accounts.create", &fp_b);

		assert_eq!(key_a, key_b);
	}
}
