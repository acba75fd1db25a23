//! Per-auth-kind signing/refresh strategies.

pub mod aws_sigv4;
pub mod oauth2_auth_code;
pub mod oauth2_client_credentials;
pub mod service_account_jwt;
pub mod simple;

pub mod form;

// self
use crate::{
	_prelude::*,
	auth::credential::ActiveCredential,
	capability::transport::{TransportAdapter, TransportRequest},
};

/// Per-auth-kind behavior: how a strategy refreshes its credential and how it signs an outgoing
/// request with the current credential.
///
/// Strategies that cannot refresh (API key, PAT, HMAC, Basic, mTLS) return
/// [`crate::error::AuthFailedError::Revoked`]-free `Ok` only when called incorrectly; in
/// practice [`crate::auth::kind::AuthKind::supports_refresh`] gates whether `refresh` is ever
/// invoked.
pub trait AuthStrategy: Send + Sync {
	/// Signs or decorates an outbound request with the current credential.
	fn sign<'a>(
		&'a self,
		credential: &'a ActiveCredential,
		request: TransportRequest,
	) -> Result<TransportRequest, Error>;

	/// Produces fresh credential material from the current one, dispatching whatever
	/// token-endpoint exchange the auth kind requires through `transport`. Only called for auth
	/// kinds where [`crate::auth::kind::AuthKind::supports_refresh`] is true.
	fn refresh<'a>(
		&'a self,
		credential: &'a ActiveCredential,
		transport: &'a dyn TransportAdapter,
	) -> Pin<Box<dyn Future<Output = Result<ActiveCredential, Error>> + Send + 'a>>;
}
