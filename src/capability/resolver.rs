//! Resolves a capability invocation's grant decision into a concrete provider request, switching
//! transport kind or parameters when the decision is degraded.

// self
use crate::{
	_prelude::*,
	capability::{ProviderOperationRequest, idempotency, transport::{HttpMethod, TransportRequest}},
	error::Error,
	grant::{CapabilityDecision, CapabilityDescriptor},
};

/// A single transport shape a provider can be invoked with: a method, URL, and request body.
#[derive(Clone, Debug)]
pub struct OperationShape {
	/// HTTP method for this shape.
	pub method: HttpMethod,
	/// Endpoint URL for this shape.
	pub url: Url,
	/// Request body, when the operation sends one.
	pub body: Option<Vec<u8>>,
	/// Parameters fingerprinted to derive the idempotency key for this shape.
	pub fingerprint_params: Vec<(String, String)>,
}
impl OperationShape {
	fn to_transport_request(&self) -> TransportRequest {
		let mut request = TransportRequest::new(self.method, self.url.clone());

		if let Some(body) = &self.body {
			request = request.with_body(body.clone());
		}

		request
	}
}

/// Everything [`CapabilityOperationResolver`] needs to build a [`ProviderOperationRequest`] for a
/// single capability invocation: the descriptor plus the primary and (optional) degraded
/// transport shapes a provider registered for it.
pub struct CapabilityOperationInput {
	/// Capability being invoked.
	pub capability: CapabilityDescriptor,
	/// Shape used when the decision is [`CapabilityDecision::Allowed`].
	pub primary: OperationShape,
	/// Shape used when the decision is [`CapabilityDecision::Degraded`] (e.g. `bulk` falling back
	/// to `rest`). `None` means the primary shape is reused even when degraded.
	pub degraded: Option<OperationShape>,
	/// Rate-limit bucket this request accounts against.
	pub rate_limit_bucket: String,
}

/// Turns a capability invocation's grant decision into the concrete request to dispatch.
///
/// Implemented by providers (or by [`FixedOperationResolver`] for the common two-shape case) so
/// that [`crate::capability::CapabilityRuntime::invoke`] never has to know provider-specific
/// transport details.
pub trait CapabilityOperationResolver: Send + Sync {
	/// Resolves `input` against `decision`, returning the request to sign and dispatch.
	fn resolve_capability_operation(
		&self,
		input: &CapabilityOperationInput,
		decision: &CapabilityDecision,
	) -> Result<ProviderOperationRequest, Error>;
}

/// Resolver that switches between a fixed primary and degraded [`OperationShape`] based on the
/// decision, reporting missing optional grants via [`ProviderOperationRequest`] metadata.
pub struct FixedOperationResolver;
impl CapabilityOperationResolver for FixedOperationResolver {
	fn resolve_capability_operation(
		&self,
		input: &CapabilityOperationInput,
		decision: &CapabilityDecision,
	) -> Result<ProviderOperationRequest, Error> {
		let shape = match decision {
			CapabilityDecision::Degraded { .. } => input.degraded.as_ref().unwrap_or(&input.primary),
			CapabilityDecision::Allowed => &input.primary,
			CapabilityDecision::Blocked { missing } => {
				return Err(Error::PolicyDenied { capability: input.capability.name.clone(), missing: missing.clone() });
			},
		};

		let pairs: Vec<(&str, &str)> =
			shape.fingerprint_params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

		Ok(ProviderOperationRequest {
			capability: input.capability.clone(),
			transport_request: shape.to_transport_request(),
			request_fingerprint: idempotency::fingerprint_params(&pairs),
			rate_limit_bucket: input.rate_limit_bucket.clone(),
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::grant::DeniedBehavior;

	fn shape(path: &str) -> OperationShape {
		OperationShape {
			method: HttpMethod::Get,
			url: format!("https://api.example{path}").parse().unwrap(),
			body: None,
			fingerprint_params: vec![("path".into(), path.into())],
		}
	}

	#[test]
	fn degraded_decision_uses_the_degraded_shape() {
		let capability = CapabilityDescriptor {
			name: "crm.accounts.bulk_export".into(),
			required_grants: vec!["api.read".into()],
			optional_grants: vec!["bulk.export".into()],
			denied_behavior: DeniedBehavior::Degrade,
		};
		let input = CapabilityOperationInput {
			capability,
			primary: shape("/bulk/export"),
			degraded: Some(shape("/rest/export")),
			rate_limit_bucket: "salesforce".into(),
		};
		let decision = CapabilityDecision::Degraded { missing_optional: vec!["bulk.export".into()] };
		let resolved = FixedOperationResolver
			.resolve_capability_operation(&input, &decision)
			.expect("Degraded resolution should succeed.");

		assert_eq!(resolved.transport_request.url.path(), "/rest/export");
	}

	#[test]
	fn allowed_decision_uses_the_primary_shape() {
		let capability = CapabilityDescriptor::new("crm.accounts.read", ["api.read"]);
		let input = CapabilityOperationInput {
			capability,
			primary: shape("/bulk/export"),
			degraded: Some(shape("/rest/export")),
			rate_limit_bucket: "salesforce".into(),
		};
		let resolved = FixedOperationResolver
			.resolve_capability_operation(&input, &CapabilityDecision::Allowed)
			.expect("Allowed resolution should succeed.");

		assert_eq!(resolved.transport_request.url.path(), "/bulk/export");
	}

	#[test]
	fn blocked_decision_is_rejected() {
		let capability = CapabilityDescriptor::new("crm.accounts.read", ["api.read"]);
		let input = CapabilityOperationInput {
			capability,
			primary: shape("/bulk/export"),
			degraded: None,
			rate_limit_bucket: "salesforce".into(),
		};
		let decision = CapabilityDecision::Blocked { missing: vec!["api.read".into()] };

		assert!(FixedOperationResolver.resolve_capability_operation(&input, &decision).is_err());
	}
}
