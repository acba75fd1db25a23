//! Key rotation windows: multiple key versions may be valid for decryption
//! simultaneously while only one is used for new encryption.

// self
use crate::{
	_prelude::*,
	secret::{Decrypt, Encrypt, Envelope},
};

/// Validity window during which a key version may still decrypt existing envelopes.
#[derive(Clone, Copy, Debug)]
pub struct KeyRotationWindow {
	/// Earliest instant this key version is considered valid for decryption.
	pub not_before: OffsetDateTime,
	/// Latest instant this key version is considered valid for decryption, if retired.
	pub not_after: Option<OffsetDateTime>,
}
impl KeyRotationWindow {
	/// Returns true if `at` falls within this window.
	pub fn contains(&self, at: OffsetDateTime) -> bool {
		at >= self.not_before && self.not_after.is_none_or(|na| at <= na)
	}
}

/// A key version paired with the window it is valid for decryption.
pub struct RotatingKeyEntry {
	/// Key version identifier matched against an envelope's `ver` field.
	pub version: u32,
	/// Backend used to decrypt envelopes at this version.
	pub decrypt: Arc<dyn Decrypt>,
	/// Validity window for this version.
	pub window: KeyRotationWindow,
}

/// Encrypts with the current key version and decrypts against any compatible, in-window
/// historical version.
pub struct RotatingKeySet {
	/// The key used for all new encryption.
	pub current: Arc<dyn Encrypt>,
	/// All known key versions, including `current`'s decrypt half, for decryption fallback.
	pub entries: Vec<RotatingKeyEntry>,
}
impl Encrypt for RotatingKeySet {
	fn encrypt(&self, plaintext: &[u8]) -> Result<String, Error> {
		self.current.encrypt(plaintext)
	}
}
impl Decrypt for RotatingKeySet {
	fn decrypt(&self, stored: &str) -> Result<Vec<u8>, Error> {
		let envelope = Envelope::parse(stored)?;
		let now = OffsetDateTime::now_utc();

		let entry = self
			.entries
			.iter()
			.find(|e| e.version == envelope.body.ver && e.window.contains(now))
			.ok_or_else(|| Error::bad_input(format!("No valid key for version {}.", envelope.body.ver)))?;

		entry.decrypt.decrypt(stored)
	}
}
