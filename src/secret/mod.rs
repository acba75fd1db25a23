//! Secret envelope encryption: credential material is never persisted in
//! the clear. Every backend emits the same `"services.secret.v1:" + json`
//! envelope format, regardless of which key-management scheme backs it.

pub mod composite;
pub mod local_aes;
pub mod rotation;

// self
use crate::_prelude::*;

const ENVELOPE_PREFIX: &str = "services.secret.v1:";

/// Supported envelope encryption algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvelopeAlgorithm {
	/// AES-256-GCM with a locally held key.
	Aes256Gcm,
	/// Delegated to a cloud KMS envelope-encryption API.
	Kms,
	/// Delegated to a HashiCorp Vault transit backend.
	Vault,
}
impl Display for EnvelopeAlgorithm {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let label = match self {
			Self::Aes256Gcm => "aes-256-gcm",
			Self::Kms => "kms",
			Self::Vault => "vault",
		};

		f.write_str(label)
	}
}

/// The JSON payload embedded after the `services.secret.v1:` prefix.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvelopeBody {
	/// Key identifier used to encrypt this envelope.
	pub kid: String,
	/// Key version, used to pick the right decryption key during rotation.
	pub ver: u32,
	/// Algorithm used.
	pub alg: EnvelopeAlgorithm,
	/// Nonce, base64-encoded, when `alg` requires one (AES-GCM).
	pub nonce: Option<String>,
	/// Ciphertext, base64-encoded.
	pub ciphertext: String,
	/// Opaque backend-specific metadata (e.g. KMS key ARN).
	pub meta: Option<HashMap<String, String>>,
}

/// A parsed, not-yet-decrypted secret envelope.
#[derive(Clone, Debug)]
pub struct Envelope {
	/// Decoded envelope body.
	pub body: EnvelopeBody,
}
impl Envelope {
	/// Parses a stored ciphertext string into an [`Envelope`].
	pub fn parse(stored: &str) -> Result<Self, Error> {
		let json = stored
			.strip_prefix(ENVELOPE_PREFIX)
			.ok_or_else(|| Error::bad_input("Ciphertext is missing the services.secret.v1 prefix."))?;
		let body: EnvelopeBody = serde_json::from_str(json).map_err(|source| Error::bad_input(source.to_string()))?;

		Ok(Self { body })
	}

	/// Serializes `body` back into the `"services.secret.v1:" + json` stored form.
	pub fn to_stored(&self) -> String {
		format!("{ENVELOPE_PREFIX}{}", serde_json::to_string(&self.body).expect("EnvelopeBody always serializes."))
	}

	/// Computes the additional authenticated data bound into this envelope's ciphertext.
	pub fn aad(&self) -> String {
		aad_for(&self.body.kid, self.body.ver, self.body.alg)
	}
}

/// Computes the AAD string `"services.secret.v1|<kid>|<ver>|<alg>"` for a given key identity.
pub fn aad_for(kid: &str, ver: u32, alg: EnvelopeAlgorithm) -> String {
	format!("services.secret.v1|{kid}|{ver}|{alg}")
}

/// Encrypts plaintext into a stored envelope string.
pub trait Encrypt: Send + Sync {
	/// Encrypts `plaintext`, returning the `"services.secret.v1:" + json` stored form.
	fn encrypt(&self, plaintext: &[u8]) -> Result<String, Error>;
}

/// Decrypts a stored envelope string back into plaintext.
pub trait Decrypt: Send + Sync {
	/// Decrypts `stored`, returning the original plaintext.
	fn decrypt(&self, stored: &str) -> Result<Vec<u8>, Error>;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn round_trips_through_stored_string() {
		let envelope = Envelope {
			body: EnvelopeBody {
				kid: "k1".into(),
				ver: 1,
				alg: EnvelopeAlgorithm::Aes256Gcm,
				nonce: Some("bm9uY2U".into()),
				ciphertext: "Y2lwaGVy".into(),
				meta: None,
			},
		};
		let stored = envelope.to_stored();

		assert!(stored.starts_with(ENVELOPE_PREFIX));

		let parsed = Envelope::parse(&stored).expect("Envelope should parse.");

		assert_eq!(parsed.body.kid, "k1");
		assert_eq!(parsed.aad(), "services.secret.v1|k1|1|aes-256-gcm");
	}
}
