//! Capability invocation pipeline integration tests: grant gating,
//! idempotent replay, and dispatch through a mock provider endpoint.

use httpmock::MockServer;
use integrations_broker::{
	_preludet::{build_test_service, fixture_identity},
	auth::{credential::ActiveCredential, strategy::simple::ApiKeyStrategy},
	capability::resolver::{CapabilityOperationInput, FixedOperationResolver, OperationShape},
	capability::transport::HttpMethod,
	grant::{CapabilityDescriptor, GrantSet},
};

fn descriptor() -> CapabilityDescriptor {
	CapabilityDescriptor::new("accounts.read", ["api.read"])
}

#[tokio::test]
async fn blocked_capability_returns_policy_denied() -> color_eyre::Result<()> {
	let (service, _store) = build_test_service();
	let (connection_id, scope, provider, auth_kind) = fixture_identity();

	service.connections.connect(connection_id.clone(), scope, provider, auth_kind).await?;
	service
		.connections
		.complete_callback(
			&connection_id,
			"acct-1",
			ActiveCredential::static_secret("key-1"),
			GrantSet::new(Vec::<String>::new())?,
			GrantSet::new(Vec::<String>::new())?,
		)
		.await?;

	let strategy = ApiKeyStrategy { header: "X-Api-Key".into() };
	let credential = ActiveCredential::static_secret("key-1");
	let input = CapabilityOperationInput {
		capability: descriptor(),
		primary: OperationShape {
			method: HttpMethod::Get,
			url: "https://api.example/accounts".parse()?,
			body: None,
			fingerprint_params: Vec::new(),
		},
		degraded: None,
		rate_limit_bucket: "accounts.read".into(),
	};

	let result = service.capabilities.invoke(&connection_id, &strategy, &credential, &FixedOperationResolver, input).await;

	assert!(result.is_err());

	Ok(())
}

#[tokio::test]
async fn allowed_capability_dispatches_and_caches_idempotent_response() -> color_eyre::Result<()> {
	let server = MockServer::start();
	let mock = server.mock(|when, then| {
		when.method(httpmock::Method::GET).path("/accounts");
		then.status(200).body("{\"ok\":true}");
	});

	let (service, _store) = build_test_service();
	let (connection_id, scope, provider, auth_kind) = fixture_identity();

	service.connections.connect(connection_id.clone(), scope, provider, auth_kind).await?;
	service
		.connections
		.complete_callback(
			&connection_id,
			"acct-1",
			ActiveCredential::static_secret("key-1"),
			GrantSet::new(["api.read"])?,
			GrantSet::new(["api.read"])?,
		)
		.await?;

	let strategy = ApiKeyStrategy { header: "X-Api-Key".into() };
	let credential = ActiveCredential::static_secret("key-1");
	let url: reqwest::Url = server.url("/accounts").parse()?;

	let build_input = || CapabilityOperationInput {
		capability: descriptor(),
		primary: OperationShape { method: HttpMethod::Get, url: url.clone(), body: None, fingerprint_params: Vec::new() },
		degraded: None,
		rate_limit_bucket: "accounts.read".into(),
	};

	let first =
		service.capabilities.invoke(&connection_id, &strategy, &credential, &FixedOperationResolver, build_input()).await?;
	assert!(first.response.is_success());

	let second =
		service.capabilities.invoke(&connection_id, &strategy, &credential, &FixedOperationResolver, build_input()).await?;
	assert_eq!(first.response.body, second.response.body);

	assert_eq!(mock.hits(), 1);

	Ok(())
}
