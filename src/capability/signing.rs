//! Thin signing seam used by the capability pipeline to decorate a
//! [`TransportRequest`] with whatever credential material the connection's
//! [`crate::auth::strategy::AuthStrategy`] requires.

// self
use crate::{_prelude::*, auth::credential::ActiveCredential, auth::strategy::AuthStrategy, capability::transport::TransportRequest};

/// Signs `request` using `strategy` and the currently active credential.
pub fn sign_request(
	strategy: &dyn AuthStrategy,
	credential: &ActiveCredential,
	request: TransportRequest,
) -> Result<TransportRequest, Error> {
	strategy.sign(credential, request)
}
