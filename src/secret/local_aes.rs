//! AES-256-GCM envelope backend with a locally held key.

// crates.io
use aes_gcm::{
	Aes256Gcm, Nonce,
	aead::{Aead, KeyInit, Payload},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::RngCore;
// self
use crate::{
	_prelude::*,
	secret::{Decrypt, Encrypt, Envelope, EnvelopeAlgorithm, EnvelopeBody, aad_for},
};

const NONCE_LEN: usize = 12;

/// Encrypts and decrypts secret envelopes with a locally held AES-256-GCM key.
pub struct LocalAesKey {
	/// Key identifier embedded in every envelope this key produces.
	pub kid: String,
	/// Key version embedded in every envelope this key produces.
	pub ver: u32,
	cipher: Aes256Gcm,
}
impl LocalAesKey {
	/// Builds a key from 32 raw bytes.
	pub fn new(kid: impl Into<String>, ver: u32, key_bytes: &[u8; 32]) -> Self {
		Self { kid: kid.into(), ver, cipher: Aes256Gcm::new_from_slice(key_bytes).expect("32-byte key is always valid.") }
	}
}
impl Encrypt for LocalAesKey {
	fn encrypt(&self, plaintext: &[u8]) -> Result<String, Error> {
		let mut nonce_bytes = [0_u8; NONCE_LEN];

		rand::rng().fill_bytes(&mut nonce_bytes);

		let aad = aad_for(&self.kid, self.ver, EnvelopeAlgorithm::Aes256Gcm);
		let ciphertext = self
			.cipher
			.encrypt(Nonce::from_slice(&nonce_bytes), Payload { msg: plaintext, aad: aad.as_bytes() })
			.map_err(|_| Error::internal("AES-GCM encryption failed."))?;

		let envelope = Envelope {
			body: EnvelopeBody {
				kid: self.kid.clone(),
				ver: self.ver,
				alg: EnvelopeAlgorithm::Aes256Gcm,
				nonce: Some(STANDARD.encode(nonce_bytes)),
				ciphertext: STANDARD.encode(ciphertext),
				meta: None,
			},
		};

		Ok(envelope.to_stored())
	}
}
impl Decrypt for LocalAesKey {
	fn decrypt(&self, stored: &str) -> Result<Vec<u8>, Error> {
		let envelope = Envelope::parse(stored)?;

		if envelope.body.kid != self.kid || envelope.body.ver != self.ver {
			return Err(Error::bad_input("Envelope key identity does not match this key."));
		}

		let nonce_b64 = envelope.body.nonce.as_deref().ok_or_else(|| Error::bad_input("Envelope is missing a nonce."))?;
		let nonce_bytes = STANDARD.decode(nonce_b64).map_err(|source| Error::bad_input(source.to_string()))?;
		let ciphertext =
			STANDARD.decode(&envelope.body.ciphertext).map_err(|source| Error::bad_input(source.to_string()))?;
		let aad = envelope.aad();

		self.cipher
			.decrypt(Nonce::from_slice(&nonce_bytes), Payload { msg: &ciphertext, aad: aad.as_bytes() })
			.map_err(|_| Error::AuthFailed(crate::error::AuthFailedError::InvalidClient {
				reason: "Envelope failed authenticated decryption.".into(),
			}))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn round_trips_plaintext() {
		let key = LocalAesKey::new("kid-1", 1, &[7_u8; 32]);
		let stored = key.encrypt(b"super-secret-token").expect("Encryption should succeed.");
		let decrypted = key.decrypt(&stored).expect("Decryption should succeed.");

		assert_eq!(decrypted, b"super-secret-token");
	}

	#[test]
	fn rejects_tampered_ciphertext() {
		let key = LocalAesKey::new("kid-1", 1, &[7_u8; 32]);
		let stored = key.encrypt(b"super-secret-token").expect("Encryption should succeed.");
		let mut envelope = Envelope::parse(&stored).expect("Envelope should parse.");

		envelope.body.ciphertext = STANDARD.encode(b"tampered-bytes-of-same-length!!");

		assert!(key.decrypt(&envelope.to_stored()).is_err());
	}
}
