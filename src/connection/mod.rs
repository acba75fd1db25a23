//! Connection lifecycle: the state machine binding a scope to a provider via
//! an auth strategy, independent of the credential material itself.

pub mod locker;
pub mod service;

// self
use crate::{
	_prelude::*,
	auth::kind::AuthKind,
	ids::ConnectionId,
	ids::ProviderId,
	scope::ScopeRef,
};

/// Lifecycle state of a [`Connection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
	/// Auth flow started but not yet completed.
	PendingAuth,
	/// Credential is valid and usable.
	Active,
	/// Provider requires the user to re-consent (e.g., scope upgrade).
	ReconsentRequired,
	/// The last refresh attempt failed terminally.
	RefreshFailed,
	/// The connection was explicitly revoked.
	Revoked,
}
impl ConnectionStatus {
	/// Returns true if capability invocation is permitted in this state.
	pub fn is_usable(self) -> bool {
		matches!(self, Self::Active)
	}
}

/// A binding between a [`ScopeRef`] and a provider, tracked independently of
/// the credential material backing it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Connection {
	/// Unique identifier.
	pub id: ConnectionId,
	/// Owning principal.
	pub scope: ScopeRef,
	/// Provider this connection authenticates against.
	pub provider: ProviderId,
	/// Auth strategy kind used for this connection.
	pub auth_kind: AuthKind,
	/// Current lifecycle state.
	pub status: ConnectionStatus,
	/// Optional external account identifier (for duplicate-binding detection).
	pub external_account_id: Option<String>,
	/// Monotonic version, bumped on every state transition (used for CAS).
	pub version: u64,
	/// Creation timestamp.
	pub created_at: OffsetDateTime,
	/// Last state transition timestamp.
	pub updated_at: OffsetDateTime,
}
impl Connection {
	/// Creates a brand-new connection in `pending_auth`.
	pub fn pending(
		id: ConnectionId,
		scope: ScopeRef,
		provider: ProviderId,
		auth_kind: AuthKind,
	) -> Self {
		let now = OffsetDateTime::now_utc();

		Self {
			id,
			scope,
			provider,
			auth_kind,
			status: ConnectionStatus::PendingAuth,
			external_account_id: None,
			version: 1,
			created_at: now,
			updated_at: now,
		}
	}

	/// Returns a copy transitioned to the given status, with version/timestamp bumped.
	pub fn transition(&self, status: ConnectionStatus) -> Self {
		let mut next = self.clone();

		next.status = status;
		next.version += 1;
		next.updated_at = OffsetDateTime::now_utc();

		next
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn transition_bumps_version() {
		let connection = Connection::pending(
			"conn-1".parse().expect("Connection id fixture should be valid."),
			ScopeRef::new("user", "usr_1").expect("Scope fixture should be valid."),
			"shopify".parse().expect("Provider id fixture should be valid."),
			AuthKind::OAuth2AuthCode,
		);
		let active = connection.transition(ConnectionStatus::Active);

		assert_eq!(active.version, 2);
		assert!(active.status.is_usable());
		assert!(!connection.status.is_usable());
	}
}
