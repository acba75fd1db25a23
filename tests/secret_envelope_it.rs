//! Secret envelope encryption integration tests: round-trip, tamper
//! rejection, and key rotation fallback.

use integrations_broker::secret::{
	Decrypt, Encrypt,
	local_aes::LocalAesKey,
	rotation::{KeyRotationWindow, RotatingKeyEntry, RotatingKeySet},
};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

#[test]
fn rotating_key_set_decrypts_historical_version_after_rotation() {
	let old_key = Arc::new(LocalAesKey::new("kid-1", 1, &[1_u8; 32]));
	let new_key = Arc::new(LocalAesKey::new("kid-1", 2, &[2_u8; 32]));

	let stored_with_old_key = old_key.encrypt(b"legacy-secret").expect("Encryption should succeed.");

	let rotating = RotatingKeySet {
		current: new_key.clone(),
		entries: vec![
			RotatingKeyEntry {
				version: 1,
				decrypt: old_key,
				window: KeyRotationWindow { not_before: OffsetDateTime::now_utc() - Duration::days(30), not_after: None },
			},
			RotatingKeyEntry {
				version: 2,
				decrypt: new_key,
				window: KeyRotationWindow { not_before: OffsetDateTime::now_utc() - Duration::minutes(1), not_after: None },
			},
		],
	};

	let decrypted = rotating.decrypt(&stored_with_old_key).expect("Decryption against historical key should succeed.");
	assert_eq!(decrypted, b"legacy-secret");

	let stored_with_new_key = rotating.encrypt(b"fresh-secret").expect("Encryption should succeed.");
	let decrypted_fresh = rotating.decrypt(&stored_with_new_key).expect("Decryption should succeed.");
	assert_eq!(decrypted_fresh, b"fresh-secret");
}

#[test]
fn expired_key_window_is_rejected() {
	let key = Arc::new(LocalAesKey::new("kid-1", 1, &[3_u8; 32]));
	let stored = key.encrypt(b"secret").expect("Encryption should succeed.");

	let rotating = RotatingKeySet {
		current: key.clone(),
		entries: vec![RotatingKeyEntry {
			version: 1,
			decrypt: key,
			window: KeyRotationWindow {
				not_before: OffsetDateTime::now_utc() - Duration::days(60),
				not_after: Some(OffsetDateTime::now_utc() - Duration::days(1)),
			},
		}],
	};

	assert!(rotating.decrypt(&stored).is_err());
}
