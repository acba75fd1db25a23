//! Single-use CSRF/PKCE correlation state persisted between `BeginAuth` and
//! the provider's callback.

// self
use crate::_prelude::*;

/// Correlation payload stored under a random `state` parameter during an OAuth2 authorization
/// redirect, and consumed exactly once on callback.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OAuthStateRecord {
	/// Connection this authorization flow will complete into.
	pub connection_id: String,
	/// PKCE code verifier, when the provider's descriptor requires PKCE.
	pub pkce_verifier: Option<String>,
	/// Redirect URI that must match the one presented at callback.
	pub redirect_uri: String,
	/// Grants that were requested when the flow began.
	pub requested_grants: Vec<String>,
	/// Instant after which this record is no longer valid.
	pub expires_at: OffsetDateTime,
}
impl OAuthStateRecord {
	/// Returns true if `self` has expired as of now.
	pub fn is_expired(&self) -> bool {
		self.expires_at <= OffsetDateTime::now_utc()
	}

	/// Serializes to bytes for storage via [`crate::store::OAuthStateStore`].
	pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
		serde_json::to_vec(self)
	}

	/// Deserializes from bytes read back from [`crate::store::OAuthStateStore`].
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
		serde_json::from_slice(bytes)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn round_trips_through_bytes() {
		let record = OAuthStateRecord {
			connection_id: "conn-1".into(),
			pkce_verifier: Some("verifier".into()),
			redirect_uri: "https://host.example/callback".into(),
			requested_grants: vec!["read".into()],
			expires_at: OffsetDateTime::now_utc() + Duration::minutes(10),
		};
		let bytes = record.to_bytes().expect("Serialization should succeed.");
		let restored = OAuthStateRecord::from_bytes(&bytes).expect("Deserialization should succeed.");

		assert_eq!(restored.connection_id, record.connection_id);
		assert!(!restored.is_expired());
	}
}
