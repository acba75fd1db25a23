//! Service-account JWT bearer assertion strategy (Google-style): the broker
//! signs a short-lived claim set with a service account's private key and
//! exchanges it for an access token.

// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
// self
use crate::{
	_prelude::*,
	auth::{
		credential::ActiveCredential,
		strategy::{AuthStrategy, form::build_form_request, oauth2_auth_code::parse_standard_token_response},
	},
	capability::transport::{TransportAdapter, TransportRequest},
	error::{AuthFailedError, ConfigError},
};

#[derive(Serialize)]
struct Claims<'a> {
	iss: &'a str,
	scope: &'a str,
	aud: &'a str,
	exp: i64,
	iat: i64,
}

/// Signs and exchanges service-account JWT bearer assertions.
pub struct ServiceAccountJwtStrategy {
	/// Service account email, used as `iss` and `sub`.
	pub client_email: String,
	/// PEM-encoded RSA private key.
	pub private_key_pem: String,
	/// Token endpoint audience.
	pub token_url: Url,
	/// Space-delimited scopes requested on every assertion.
	pub scope: String,
	/// Assertion lifetime; providers typically cap this at one hour.
	pub assertion_lifetime: Duration,
}
impl ServiceAccountJwtStrategy {
	/// Builds a signed JWT assertion ready to present to the token endpoint.
	pub fn build_assertion(&self) -> Result<String, Error> {
		let now = OffsetDateTime::now_utc();
		let claims = Claims {
			iss: &self.client_email,
			scope: &self.scope,
			aud: self.token_url.as_str(),
			exp: (now + self.assertion_lifetime).unix_timestamp(),
			iat: now.unix_timestamp(),
		};
		let key = EncodingKey::from_rsa_pem(self.private_key_pem.as_bytes())
			.map_err(|source| ConfigError::InvalidKeyMaterial { reason: source.to_string() })?;

		encode(&Header::new(Algorithm::RS256), &claims, &key)
			.map_err(|source| Error::Config(ConfigError::InvalidKeyMaterial { reason: source.to_string() }))
	}

	/// Builds the token-endpoint request body exchanging a signed assertion for an access token.
	pub fn token_request_body(&self, assertion: &str) -> Vec<(String, String)> {
		vec![
			("grant_type".to_owned(), "urn:ietf:params:oauth:grant-type:jwt-bearer".to_owned()),
			("assertion".to_owned(), assertion.to_owned()),
		]
	}

	/// Parses the token endpoint's JSON response into credential material.
	pub fn parse_token_response(raw_json: &[u8]) -> Result<ActiveCredential, Error> {
		parse_standard_token_response(raw_json)
	}
}
impl AuthStrategy for ServiceAccountJwtStrategy {
	fn sign<'a>(&'a self, credential: &'a ActiveCredential, request: TransportRequest) -> Result<TransportRequest, Error> {
		Ok(request.with_header("Authorization", format!("Bearer {}", credential.primary.expose())))
	}

	fn refresh<'a>(
		&'a self,
		_credential: &'a ActiveCredential,
		transport: &'a dyn TransportAdapter,
	) -> Pin<Box<dyn Future<Output = Result<ActiveCredential, Error>> + Send + 'a>> {
		Box::pin(async move {
			let assertion = self.build_assertion()?;
			let params = self.token_request_body(&assertion);
			let pairs: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
			let request = build_form_request(self.token_url.clone(), &pairs);
			let response = transport.dispatch(request).await?;

			if !response.is_success() {
				return Err(Error::AuthFailed(AuthFailedError::InvalidGrant {
					reason: format!("Token endpoint returned status {} during assertion exchange.", response.status),
				}));
			}

			parse_standard_token_response(&response.body)
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn token_request_body_is_jwt_bearer() {
		let strategy = ServiceAccountJwtStrategy {
			client_email: "svc@example.iam".into(),
			private_key_pem: String::new(),
			token_url: "https://oauth2.example/token".parse().unwrap(),
			scope: "https://api.example/read".into(),
			assertion_lifetime: Duration::minutes(30),
		};
		let body = strategy.token_request_body("assertion-value");

		assert!(body.iter().any(|(k, v)| k == "grant_type" && v.contains("jwt-bearer")));
	}
}
