//! Connection lifecycle integration tests: connect, complete, reconsent, revoke.

use integrations_broker::{
	_preludet::{build_test_service, fixture_identity},
	auth::credential::ActiveCredential,
	connection::ConnectionStatus,
	grant::GrantSet,
};

#[tokio::test]
async fn connect_then_complete_callback_activates() -> color_eyre::Result<()> {
	let (service, _store) = build_test_service();
	let (connection_id, scope, provider, auth_kind) = fixture_identity();

	let connection = service.connections.connect(connection_id.clone(), scope, provider, auth_kind).await?;
	assert_eq!(connection.status, ConnectionStatus::PendingAuth);

	let requested = GrantSet::new(["read"])?;
	let granted = GrantSet::new(["read"])?;
	let activated = service
		.connections
		.complete_callback(&connection_id, "acct-1", ActiveCredential::static_secret("tok-1"), requested, granted)
		.await?;

	assert_eq!(activated.status, ConnectionStatus::Active);
	assert!(activated.status.is_usable());

	Ok(())
}

#[tokio::test]
async fn duplicate_active_connection_is_rejected() -> color_eyre::Result<()> {
	let (service, _store) = build_test_service();
	let (connection_id, scope, provider, auth_kind) = fixture_identity();

	service.connections.connect(connection_id.clone(), scope.clone(), provider.clone(), auth_kind).await?;
	service
		.connections
		.complete_callback(
			&connection_id,
			"acct-1",
			ActiveCredential::static_secret("tok-1"),
			GrantSet::new(["read"])?,
			GrantSet::new(["read"])?,
		)
		.await?;

	let second_id = "conn-test-2".parse().expect("Connection id fixture should be valid.");
	let result = service.connections.connect(second_id, scope, provider, auth_kind).await;

	assert!(result.is_err());

	Ok(())
}

#[tokio::test]
async fn reconsent_round_trip_supersedes_snapshot() -> color_eyre::Result<()> {
	let (service, _store) = build_test_service();
	let (connection_id, scope, provider, auth_kind) = fixture_identity();

	service.connections.connect(connection_id.clone(), scope, provider, auth_kind).await?;
	service
		.connections
		.complete_callback(
			&connection_id,
			"acct-1",
			ActiveCredential::static_secret("tok-1"),
			GrantSet::new(["read"])?,
			GrantSet::new(["read"])?,
		)
		.await?;

	service.connections.start_reconsent(&connection_id).await?;

	let reconsented = service
		.connections
		.complete_reconsent(&connection_id, GrantSet::new(["read", "write"])?, GrantSet::new(["read", "write"])?)
		.await?;

	assert_eq!(reconsented.status, ConnectionStatus::Active);

	Ok(())
}

#[tokio::test]
async fn revoke_is_terminal() -> color_eyre::Result<()> {
	let (service, _store) = build_test_service();
	let (connection_id, scope, provider, auth_kind) = fixture_identity();

	service.connections.connect(connection_id.clone(), scope, provider, auth_kind).await?;
	let revoked = service.connections.revoke(&connection_id).await?;

	assert_eq!(revoked.status, ConnectionStatus::Revoked);
	assert!(!revoked.status.is_usable());

	Ok(())
}
