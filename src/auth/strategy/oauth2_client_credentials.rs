//! Two-legged OAuth2 client-credentials strategy.

// self
use crate::{
	_prelude::*,
	auth::{
		credential::ActiveCredential,
		strategy::{AuthStrategy, form::build_form_request, oauth2_auth_code::parse_standard_token_response},
	},
	capability::transport::{TransportAdapter, TransportRequest},
	error::AuthFailedError,
};

/// Client-credentials strategy: the broker itself is the resource owner, so refresh simply
/// re-runs the client-credentials grant rather than presenting a refresh token.
pub struct OAuth2ClientCredentialsStrategy {
	/// Token endpoint.
	pub token_url: Url,
	/// Registered client id.
	pub client_id: String,
	/// Client secret.
	pub client_secret: String,
	/// Scopes requested on every grant.
	pub scopes: Vec<String>,
}
impl OAuth2ClientCredentialsStrategy {
	/// Builds the token-endpoint request body for a client-credentials grant.
	pub fn token_request_body(&self) -> Vec<(String, String)> {
		let mut params = vec![
			("grant_type".to_owned(), "client_credentials".to_owned()),
			("client_id".to_owned(), self.client_id.clone()),
			("client_secret".to_owned(), self.client_secret.clone()),
		];

		if !self.scopes.is_empty() {
			params.push(("scope".to_owned(), self.scopes.join(" ")));
		}

		params
	}

	/// Parses the token endpoint's JSON response into credential material.
	pub fn parse_token_response(raw_json: &[u8]) -> Result<ActiveCredential, Error> {
		parse_standard_token_response(raw_json)
	}
}
impl AuthStrategy for OAuth2ClientCredentialsStrategy {
	fn sign<'a>(&'a self, credential: &'a ActiveCredential, request: TransportRequest) -> Result<TransportRequest, Error> {
		Ok(request.with_header("Authorization", format!("Bearer {}", credential.primary.expose())))
	}

	fn refresh<'a>(
		&'a self,
		_credential: &'a ActiveCredential,
		transport: &'a dyn TransportAdapter,
	) -> Pin<Box<dyn Future<Output = Result<ActiveCredential, Error>> + Send + 'a>> {
		Box::pin(async move {
			let params = self.token_request_body();
			let pairs: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
			let request = build_form_request(self.token_url.clone(), &pairs);
			let response = transport.dispatch(request).await?;

			if !response.is_success() {
				return Err(Error::AuthFailed(AuthFailedError::InvalidGrant {
					reason: format!("Token endpoint returned status {} during refresh.", response.status),
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
	fn request_body_includes_scopes() {
		let strategy = OAuth2ClientCredentialsStrategy {
			token_url: "https://host.example/token".parse().unwrap(),
			client_id: "client".into(),
			client_secret: "secret".into(),
			scopes: vec!["read".into(), "write".into()],
		};
		let body = strategy.token_request_body();

		assert!(body.iter().any(|(k, v)| k == "scope" && v == "read write"));
	}
}
