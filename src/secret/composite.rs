//! Primary + fallback failover policy across two independent envelope backends.

// self
use crate::{
	_prelude::*,
	secret::{Decrypt, Encrypt},
};

/// Whether a failed primary backend call should fall back to the secondary, or fail outright.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailoverPolicy {
	/// A primary failure is always propagated; the fallback is never consulted.
	StrictFail,
	/// A primary failure falls back to the secondary backend.
	FallbackAllowed,
}

/// Wraps a primary encryption backend with an optional fallback, e.g. local AES while a KMS
/// migration is in flight.
pub struct CompositeSecretBackend {
	/// Primary backend, used for all new encryption and tried first on decrypt.
	pub primary: Arc<dyn Decrypt>,
	/// Primary backend's encrypt half.
	pub primary_encrypt: Arc<dyn Encrypt>,
	/// Fallback decrypt backend, consulted when the primary fails and the policy allows it.
	pub fallback: Option<Arc<dyn Decrypt>>,
	/// Failover policy applied on primary decrypt failure.
	pub policy: FailoverPolicy,
}
impl Encrypt for CompositeSecretBackend {
	fn encrypt(&self, plaintext: &[u8]) -> Result<String, Error> {
		self.primary_encrypt.encrypt(plaintext)
	}
}
impl Decrypt for CompositeSecretBackend {
	fn decrypt(&self, stored: &str) -> Result<Vec<u8>, Error> {
		match self.primary.decrypt(stored) {
			Ok(plaintext) => Ok(plaintext),
			Err(primary_error) => match (self.policy, &self.fallback) {
				(FailoverPolicy::FallbackAllowed, Some(fallback)) => fallback.decrypt(stored),
				_ => Err(primary_error),
			},
		}
	}
}
