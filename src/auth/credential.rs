//! Active credential material: the secret payload kept alongside a
//! [`crate::connection::Connection`], always redacted in `Debug`/`Display`.

// self
use crate::_prelude::*;

/// A secret value whose `Debug`/`Display` implementations never reveal the payload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);
impl Secret {
	/// Wraps a raw secret value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Exposes the raw secret value. Callers must not log or persist the result unredacted.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Secret(<redacted>)")
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// The decrypted, in-memory credential material active for a connection.
///
/// Never logged or persisted as-is; [`crate::secret`] handles envelope
/// encryption at rest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActiveCredential {
	/// Primary bearer/access secret (token, API key, PAT, password, etc.).
	pub primary: Secret,
	/// Refresh secret, when the auth kind supports autonomous refresh.
	pub refresh: Option<Secret>,
	/// Expiry of `primary`, when the provider supplies one.
	pub expires_at: Option<OffsetDateTime>,
	/// Opaque auth-kind-specific extra fields (e.g. AWS session token, mTLS cert fingerprint).
	pub extra: HashMap<String, String>,
}
impl ActiveCredential {
	/// Creates credential material with no refresh secret or expiry (e.g. API key, PAT, HMAC).
	pub fn static_secret(primary: impl Into<String>) -> Self {
		Self { primary: Secret::new(primary), refresh: None, expires_at: None, extra: HashMap::new() }
	}

	/// Returns true when `primary` has expired as of now.
	pub fn is_expired(&self) -> bool {
		self.expires_at.is_some_and(|at| at <= OffsetDateTime::now_utc())
	}

	/// Returns true when `primary` expires within `window` from now.
	pub fn expires_within(&self, window: Duration) -> bool {
		self.expires_at.is_some_and(|at| at <= OffsetDateTime::now_utc() + window)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_never_prints_payload() {
		let secret = Secret::new("sk-super-secret");

		assert_eq!(format!("{secret:?}"), "Secret(<redacted>)");
		assert_eq!(secret.to_string(), "<redacted>");
		assert_eq!(secret.expose(), "sk-super-secret");
	}

	#[test]
	fn expiry_helpers() {
		let mut credential = ActiveCredential::static_secret("tok");
		assert!(!credential.is_expired());

		credential.expires_at = Some(OffsetDateTime::now_utc() - Duration::seconds(1));
		assert!(credential.is_expired());
	}
}
