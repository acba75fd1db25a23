//! Storefront/embedded-app session token claims and replay guarding.

// crates.io
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
// self
use crate::{
	_prelude::*,
	auth::{credential::ActiveCredential, strategy::{form::build_form_request, oauth2_auth_code::parse_standard_token_response}},
	capability::transport::TransportAdapter,
	error::AuthFailedError,
	ids::ProviderId,
	store::ReplayLedger,
};

/// Which token type to request on the embedded-session token exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedTokenType {
	/// Offline access, usable without the embedding session present.
	Offline,
	/// Online access, scoped to the lifetime of the embedding session.
	Online,
}
impl RequestedTokenType {
	fn as_wire(self) -> &'static str {
		match self {
			Self::Offline => "offline_access",
			Self::Online => "online_access",
		}
	}
}

/// Clock tolerances and the replay window applied when validating embedded session tokens.
#[derive(Clone, Copy, Debug)]
pub struct EmbeddedSessionPolicy {
	/// Allowed clock drift between the broker and the token issuer.
	pub clock_skew: Duration,
	/// Maximum age a token's `iat` may have before it is rejected as stale.
	pub max_issued_at_age: Duration,
	/// How long a consumed `jti` is remembered by the replay ledger.
	pub replay_ttl: Duration,
}
impl Default for EmbeddedSessionPolicy {
	fn default() -> Self {
		Self { clock_skew: Duration::seconds(30), max_issued_at_age: Duration::minutes(15), replay_ttl: Duration::minutes(5) }
	}
}

/// Decoded, validated claims from an embedded-app session token (HS256 JWT).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddedSessionClaims {
	/// Issuer (the provider's platform domain, e.g. `https://<shop>/admin`).
	pub iss: String,
	/// The shop/site/tenant identifier the embedding app was installed into.
	pub dest: String,
	/// Audience (broker-configured client id).
	pub aud: String,
	/// Subject (end user id on the provider's platform), when present.
	pub sub: Option<String>,
	/// Not-before time, Unix seconds.
	pub nbf: i64,
	/// Expiration time, Unix seconds.
	pub exp: i64,
	/// Issued-at time, Unix seconds.
	pub iat: i64,
	/// JWT id, used for single-use replay protection.
	pub jti: String,
}
impl EmbeddedSessionClaims {
	/// Validates signature, audience, host-matching, and the clock-skew-tolerant time window,
	/// returning the decoded claims. Does not touch the replay ledger; see
	/// [`authenticate`] for the full exchange flow.
	pub fn decode(
		token: &str,
		shared_secret: &str,
		expected_audience: &str,
		policy: &EmbeddedSessionPolicy,
	) -> Result<Self, AuthFailedError> {
		let mut validation = Validation::new(Algorithm::HS256);

		validation.set_audience(&[expected_audience]);
		validation.validate_exp = false;
		validation.validate_nbf = false;

		let key = DecodingKey::from_secret(shared_secret.as_bytes());
		let data = decode::<Self>(token, &key, &validation)
			.map_err(|source| AuthFailedError::SessionRejected { reason: source.to_string() })?;
		let claims = data.claims;

		claims.check_time_window(policy)?;
		claims.check_hosts_match()?;

		if claims.jti.trim().is_empty() {
			return Err(AuthFailedError::SessionRejected { reason: "Token is missing a jti.".into() });
		}

		Ok(claims)
	}

	fn check_time_window(&self, policy: &EmbeddedSessionPolicy) -> Result<(), AuthFailedError> {
		let now = OffsetDateTime::now_utc().unix_timestamp();
		let skew = policy.clock_skew.whole_seconds();

		if self.exp + skew < now {
			return Err(AuthFailedError::SessionRejected { reason: "Token has expired.".into() });
		}
		if self.nbf - skew > now {
			return Err(AuthFailedError::SessionRejected { reason: "Token is not yet valid.".into() });
		}
		if self.iat - skew > now || now - self.iat > policy.max_issued_at_age.whole_seconds() + skew {
			return Err(AuthFailedError::SessionRejected { reason: "Token issued-at time is outside the allowed window.".into() });
		}

		Ok(())
	}

	fn check_hosts_match(&self) -> Result<(), AuthFailedError> {
		let iss_host = Url::parse(&self.iss).ok().and_then(|url| url.host_str().map(str::to_owned));
		let dest_host = Url::parse(&self.dest).ok().and_then(|url| url.host_str().map(str::to_owned));

		match (iss_host, dest_host) {
			(Some(iss_host), Some(dest_host)) if iss_host == dest_host => Ok(()),
			_ => Err(AuthFailedError::SessionRejected { reason: "Token iss and dest hosts do not match.".into() }),
		}
	}

	/// Shop fingerprint used as the replay ledger's partition key alongside `jti`.
	pub fn shop_key(&self) -> &str {
		&self.dest
	}
}

/// Validates an embedded session token, enforces single-use via `replay`, and exchanges it for
/// access-token credential material. A failed exchange still consumes the `jti`: the token was
/// presented, so it cannot be retried even if the exchange itself errors.
#[allow(clippy::too_many_arguments)]
pub async fn authenticate(
	token: &str,
	shared_secret: &str,
	expected_audience: &str,
	provider: &ProviderId,
	policy: &EmbeddedSessionPolicy,
	replay: &dyn ReplayLedger,
	transport: &dyn TransportAdapter,
	token_url: Url,
	client_id: &str,
	client_secret: &str,
	requested_token_type: RequestedTokenType,
) -> Result<ActiveCredential, Error> {
	let claims = EmbeddedSessionClaims::decode(token, shared_secret, expected_audience, policy)?;
	let shop = claims.shop_key().to_owned();
	let expires_at = OffsetDateTime::now_utc() + policy.replay_ttl;

	replay.consume(provider, &shop, &claims.jti, expires_at).await.map_err(|source| match source {
		crate::store::StoreError::CasMismatch(jti) => Error::AuthFailed(AuthFailedError::ReplayDetected { jti }),
		other => Error::Storage(other),
	})?;

	let params = vec![
		("grant_type", "urn:ietf:params:oauth:grant-type:token-exchange"),
		("subject_token", token),
		("subject_token_type", "urn:ietf:params:oauth:token-type:id_token"),
		("requested_token_type", requested_token_type.as_wire()),
		("client_id", client_id),
		("client_secret", client_secret),
	];
	let request = build_form_request(token_url, &params);
	let response = transport.dispatch(request).await?;

	if !response.is_success() {
		return Err(Error::AuthFailed(AuthFailedError::InvalidGrant {
			reason: format!("Token exchange returned status {} for an embedded session.", response.status),
		}));
	}

	parse_standard_token_response(&response.body)
}

#[cfg(test)]
mod tests {
	// crates.io
	use jsonwebtoken::{EncodingKey, Header, encode};
	// self
	use super::*;
	use crate::{capability::transport::{TransportRequest, TransportResponse}, store::memory::MemoryStore};

	fn token(secret: &str, aud: &str, exp_delta: i64, jti: &str) -> String {
		let now = time::OffsetDateTime::now_utc().unix_timestamp();
		let claims = EmbeddedSessionClaims {
			iss: "https://shop-1.example/admin".into(),
			dest: "https://shop-1.example".into(),
			aud: aud.into(),
			sub: Some("user-1".into()),
			nbf: now - 60,
			exp: now + exp_delta,
			iat: now - 30,
			jti: jti.into(),
		};

		encode(&Header::new(jsonwebtoken::Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
			.expect("Token fixture should encode.")
	}

	#[test]
	fn decodes_valid_token() {
		let jwt = token("shh", "client-1", 3600, "jti-1");
		let claims =
			EmbeddedSessionClaims::decode(&jwt, "shh", "client-1", &EmbeddedSessionPolicy::default()).expect("Token should decode.");

		assert_eq!(claims.shop_key(), "https://shop-1.example");
	}

	#[test]
	fn rejects_wrong_audience() {
		let jwt = token("shh", "client-1", 3600, "jti-1");

		assert!(EmbeddedSessionClaims::decode(&jwt, "shh", "client-2", &EmbeddedSessionPolicy::default()).is_err());
	}

	#[test]
	fn rejects_expired_token() {
		let jwt = token("shh", "client-1", -3600, "jti-1");

		assert!(EmbeddedSessionClaims::decode(&jwt, "shh", "client-1", &EmbeddedSessionPolicy::default()).is_err());
	}

	#[test]
	fn rejects_mismatched_hosts() {
		let now = time::OffsetDateTime::now_utc().unix_timestamp();
		let claims = EmbeddedSessionClaims {
			iss: "https://platform.example".into(),
			dest: "https://shop-1.example".into(),
			aud: "client-1".into(),
			sub: None,
			nbf: now - 60,
			exp: now + 3600,
			iat: now - 30,
			jti: "jti-1".into(),
		};
		let jwt = encode(&Header::new(jsonwebtoken::Algorithm::HS256), &claims, &EncodingKey::from_secret(b"shh"))
			.expect("Token fixture should encode.");

		assert!(EmbeddedSessionClaims::decode(&jwt, "shh", "client-1", &EmbeddedSessionPolicy::default()).is_err());
	}

	struct EchoTransport;
	impl TransportAdapter for EchoTransport {
		fn dispatch<'a>(
			&'a self,
			_request: TransportRequest,
		) -> Pin<Box<dyn Future<Output = Result<TransportResponse, Error>> + Send + 'a>> {
			Box::pin(async move {
				Ok(TransportResponse {
					status: 200,
					headers: Vec::new(),
					body: br#"{"access_token":"exchanged-token","expires_in":3600}"#.to_vec(),
				})
			})
		}
	}

	#[tokio::test]
	async fn rejects_replayed_jti() {
		let provider = ProviderId::new("shopify").expect("Provider id should be valid.");
		let store = MemoryStore::default();
		let policy = EmbeddedSessionPolicy::default();
		let transport = EchoTransport;
		let jwt = token("shh", "client-1", 3600, "jti-replay");

		let first = authenticate(
			&jwt,
			"shh",
			"client-1",
			&provider,
			&policy,
			&store,
			&transport,
			"https://token.example/exchange".parse().unwrap(),
			"client-1",
			"app-secret",
			RequestedTokenType::Offline,
		)
		.await;

		assert!(first.is_ok());

		let second = authenticate(
			&jwt,
			"shh",
			"client-1",
			&provider,
			&policy,
			&store,
			&transport,
			"https://token.example/exchange".parse().unwrap(),
			"client-1",
			"app-secret",
			RequestedTokenType::Offline,
		)
		.await;

		assert!(matches!(second, Err(Error::AuthFailed(AuthFailedError::ReplayDetected { .. }))));
	}
}
