//! Capability-gated provider operation runtime: the pipeline that turns a
//! named capability invocation into a signed, rate-limited, idempotent
//! provider request.

pub mod idempotency;
pub mod rate_limit;
pub mod resolver;
pub mod signing;
pub mod transport;

// self
use crate::{
	_prelude::*,
	auth::{credential::ActiveCredential, strategy::AuthStrategy},
	connection::Connection,
	error::Error,
	grant::{CapabilityDecision, CapabilityDescriptor, GrantSnapshot},
	ids::ConnectionId,
	store::{ConnectionStore, GrantStore, IdempotencyClaimStore},
	capability::{
		rate_limit::{FixedWindowPolicy, RateLimitContext, RateLimitDecision},
		resolver::{CapabilityOperationInput, CapabilityOperationResolver},
		transport::{TransportAdapter, TransportRequest, TransportResponse},
	},
};

/// A fully-resolved provider operation request, prior to signing.
pub struct ProviderOperationRequest {
	/// Capability being invoked.
	pub capability: CapabilityDescriptor,
	/// The request to sign and dispatch.
	pub transport_request: TransportRequest,
	/// Stable fingerprint of the request parameters, used to derive the idempotency key.
	pub request_fingerprint: String,
	/// Rate-limit bucket this request accounts against.
	pub rate_limit_bucket: String,
}

/// Result of a capability invocation: the provider's response plus any optional grants that were
/// missing and caused the request to run in degraded mode.
pub struct CapabilityInvocationOutcome {
	/// The provider's response.
	pub response: TransportResponse,
	/// Optional grants missing at evaluation time, so callers can inform end users.
	pub missing_optional: Vec<String>,
}

/// Collaborators the capability runtime needs to invoke a single capability.
pub struct CapabilityRuntime {
	/// Connection records.
	pub connections: Arc<dyn ConnectionStore>,
	/// Grant snapshots.
	pub grants: Arc<dyn GrantStore>,
	/// Idempotency claims.
	pub idempotency: Arc<dyn IdempotencyClaimStore>,
	/// Transport dispatcher.
	pub transport: Arc<dyn TransportAdapter>,
	/// Auth strategy used to sign requests, keyed by connection's auth kind elsewhere; here the
	/// caller resolves and passes the concrete strategy since strategy resolution is
	/// provider/auth-kind specific.
	pub rate_limit_policy: FixedWindowPolicy,
}
impl CapabilityRuntime {
	/// Runs the full capability invocation pipeline:
	/// resolve connection -> load grant snapshot -> evaluate capability -> compute idempotency
	/// key -> sign -> dispatch -> update rate-limit state -> release claim.
	pub async fn invoke(
		&self,
		connection_id: &ConnectionId,
		strategy: &dyn AuthStrategy,
		credential: &ActiveCredential,
		resolver: &dyn CapabilityOperationResolver,
		input: CapabilityOperationInput,
	) -> Result<CapabilityInvocationOutcome, Error> {
		let connection = self.connections.get(connection_id).await?;

		if !connection.status.is_usable() {
			return Err(Error::PolicyDenied {
				capability: input.capability.name.clone(),
				missing: vec!["connection:active".into()],
			});
		}

		let snapshot: GrantSnapshot = self.grants.get(connection_id).await?;
		let decision = input.capability.evaluate(&snapshot.granted);
		let missing_optional = match &decision {
			CapabilityDecision::Degraded { missing_optional } => missing_optional.clone(),
			_ => Vec::new(),
		};
		let capability_name = input.capability.name.clone();
		let request = resolver.resolve_capability_operation(&input, &decision)?;

		let idempotency_key = idempotency::derive_key(connection_id, &capability_name, &request.request_fingerprint);
		let lease_until = OffsetDateTime::now_utc() + Duration::seconds(30);

		if !self.idempotency.claim(&idempotency_key, lease_until).await? {
			if let Some(cached) = self.idempotency.completed_response(&idempotency_key).await? {
				let response = TransportResponse { status: 200, headers: Vec::new(), body: cached };

				return Ok(CapabilityInvocationOutcome { response, missing_optional });
			}

			return Err(Error::Transient(crate::error::TransientError::LockTimeout(idempotency_key.to_string())));
		}

		let outcome = self.dispatch(&connection, strategy, credential, request).await;

		match &outcome {
			Ok(response) => {
				let _ = self.idempotency.complete(&idempotency_key, response.body.clone()).await;
			},
			Err(_) => {
				let _ = self.idempotency.release(&idempotency_key).await;
			},
		}

		outcome.map(|response| CapabilityInvocationOutcome { response, missing_optional })
	}

	async fn dispatch(
		&self,
		connection: &Connection,
		strategy: &dyn AuthStrategy,
		credential: &ActiveCredential,
		request: ProviderOperationRequest,
	) -> Result<TransportResponse, Error> {
		let _ = connection;

		let decision = self.rate_limit_policy.evaluate(RateLimitContext { state: None, bucket: &request.rate_limit_bucket });

		if let RateLimitDecision::Throttled(directive) = decision {
			return Err(Error::RateLimited { retry_after: Some(directive.retry_after) });
		}

		let signed = signing::sign_request(strategy, credential, request.transport_request)?;
		let response = self.transport.dispatch(signed).await?;

		if response.status == 429 {
			return Err(Error::RateLimited { retry_after: response.retry_after() });
		}
		if (500..600).contains(&response.status) {
			return Err(Error::Transient(crate::error::TransientError::Endpoint {
				message: format!("Provider returned status {}.", response.status),
				status: Some(response.status),
				retry_after: response.retry_after(),
			}));
		}

		Ok(response)
	}
}
