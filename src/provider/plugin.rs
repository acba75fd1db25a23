//! The `Provider` plugin surface: the seam every concrete integration
//! implements to plug into the runtime.

// self
use crate::{
	_prelude::*,
	auth::{kind::AuthKind, strategy::AuthStrategy},
	grant::GrantSet,
	provider::descriptor::ProviderDescriptor,
};

/// A registered provider plugin: its static descriptor plus the auth strategy backing it.
pub trait Provider: Send + Sync {
	/// Static descriptor (id, auth kinds, capabilities, endpoints).
	fn descriptor(&self) -> &ProviderDescriptor;

	/// Returns the signing/refresh strategy for `kind`, or `None` if unsupported.
	fn strategy(&self, kind: AuthKind) -> Option<Arc<dyn AuthStrategy>>;

	/// Normalizes a raw granted set into this provider's canonical grants, expanding any grants
	/// implied by hierarchy rules (e.g. `admin` implying `read`). Applied once, when a connection's
	/// grant snapshot is first captured or superseded. The default is the identity expansion:
	/// providers with flat, non-hierarchical grants need not override it.
	fn normalize_granted_permissions(&self, granted: &GrantSet) -> GrantSet {
		granted.clone()
	}
}

/// Optional extension: providers whose embedded/storefront session tokens exchange into a
/// connection directly, without a redirect-based authorization step.
pub trait EmbeddedAuthProvider: Provider {
	/// HMAC/JWT shared secret used to validate embedded session tokens for this provider.
	fn embedded_shared_secret(&self) -> &str;
}
