//! Three-legged OAuth2 authorization-code strategy, with optional PKCE.

// crates.io
use oauth2::{
	AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet, PkceCodeChallenge,
	PkceCodeVerifier, RedirectUrl, RefreshToken, Scope, TokenUrl, basic::BasicClient,
};
// self
use crate::{
	_prelude::*,
	auth::{credential::ActiveCredential, oauth_state::OAuthStateRecord, strategy::{AuthStrategy, form::build_form_request}},
	capability::transport::{TransportAdapter, TransportRequest},
	error::{AuthFailedError, ConfigError},
};

/// Authorization-code strategy. Token exchange and refresh are performed over whatever
/// [`crate::capability::transport::TransportAdapter`] the host wires up; this type only builds
/// the request/response shape expected by the OAuth2 token endpoint.
pub struct OAuth2AuthCodeStrategy {
	/// Authorization endpoint.
	pub auth_url: Url,
	/// Token endpoint.
	pub token_url: Url,
	/// Registered client id.
	pub client_id: String,
	/// Client secret, when the provider requires confidential clients.
	pub client_secret: Option<String>,
	/// Whether PKCE should be attached to the authorization request.
	pub use_pkce: bool,
}
impl OAuth2AuthCodeStrategy {
	fn client(
		&self,
		redirect_uri: &Url,
	) -> Result<BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>, ConfigError> {
		let auth_url = AuthUrl::new(self.auth_url.to_string()).map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let token_url = TokenUrl::new(self.token_url.to_string()).map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let redirect = RedirectUrl::new(redirect_uri.to_string()).map_err(|source| ConfigError::InvalidRedirect { source })?;

		let mut client = BasicClient::new(ClientId::new(self.client_id.clone()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_redirect_uri(redirect);

		if let Some(secret) = &self.client_secret {
			client = client.set_client_secret(ClientSecret::new(secret.clone()));
		}

		Ok(client)
	}

	/// Builds the authorization redirect URL and the state record to persist via
	/// [`crate::store::OAuthStateStore`] until the callback arrives, keyed by the returned CSRF
	/// state value. When `state` is `None`, a fresh random token is generated.
	pub fn begin(
		&self,
		redirect_uri: &Url,
		connection_id: &str,
		scopes: &[String],
		state: Option<&str>,
	) -> Result<(Url, String, OAuthStateRecord), Error> {
		let client = self.client(redirect_uri).map_err(Error::Config)?;
		let mut request = match state {
			Some(state) => client.authorize_url(|| CsrfToken::new(state.to_owned())),
			None => client.authorize_url(CsrfToken::new_random),
		};

		for scope in scopes {
			request = request.add_scope(Scope::new(scope.clone()));
		}

		let pkce_verifier = if self.use_pkce {
			let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();

			request = request.set_pkce_challenge(challenge);

			Some(verifier)
		} else {
			None
		};

		let (url, csrf_token) = request.url();
		let record = OAuthStateRecord {
			connection_id: connection_id.to_owned(),
			pkce_verifier: pkce_verifier.map(|v: PkceCodeVerifier| v.secret().clone()),
			redirect_uri: redirect_uri.to_string(),
			requested_grants: scopes.to_vec(),
			expires_at: OffsetDateTime::now_utc() + Duration::minutes(10),
		};

		Ok((url, csrf_token.secret().clone(), record))
	}

	/// Exchanges an authorization code for credential material. The caller supplies the
	/// provider's raw token response body (already dispatched through the capability transport),
	/// since this strategy does not perform network I/O itself.
	pub fn parse_token_response(raw_json: &[u8]) -> Result<ActiveCredential, Error> {
		parse_standard_token_response(raw_json)
	}

	/// Builds the token-endpoint request body for a code exchange (the caller dispatches it
	/// through the capability transport and feeds the response to [`Self::parse_token_response`]).
	pub fn code_exchange_body(&self, code: &str, state: &OAuthStateRecord) -> Vec<(String, String)> {
		let mut params = vec![
			("grant_type".to_owned(), "authorization_code".to_owned()),
			("code".to_owned(), code.to_owned()),
			("redirect_uri".to_owned(), state.redirect_uri.clone()),
			("client_id".to_owned(), self.client_id.clone()),
		];

		if let Some(secret) = &self.client_secret {
			params.push(("client_secret".to_owned(), secret.clone()));
		}
		if let Some(verifier) = &state.pkce_verifier {
			params.push(("code_verifier".to_owned(), verifier.clone()));
		}

		let _ = AuthorizationCode::new(code.to_owned());

		params
	}
}
impl AuthStrategy for OAuth2AuthCodeStrategy {
	fn sign<'a>(&'a self, credential: &'a ActiveCredential, request: TransportRequest) -> Result<TransportRequest, Error> {
		Ok(request.with_header("Authorization", format!("Bearer {}", credential.primary.expose())))
	}

	fn refresh<'a>(
		&'a self,
		credential: &'a ActiveCredential,
		transport: &'a dyn TransportAdapter,
	) -> Pin<Box<dyn Future<Output = Result<ActiveCredential, Error>> + Send + 'a>> {
		Box::pin(async move {
			let refresh = credential.refresh.as_ref().ok_or(Error::Config(ConfigError::MissingRefreshToken))?;
			let _ = RefreshToken::new(refresh.expose().to_owned());

			let mut params = vec![
				("grant_type".to_owned(), "refresh_token".to_owned()),
				("refresh_token".to_owned(), refresh.expose().to_owned()),
				("client_id".to_owned(), self.client_id.clone()),
			];

			if let Some(secret) = &self.client_secret {
				params.push(("client_secret".to_owned(), secret.clone()));
			}

			let pairs: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
			let request = build_form_request(self.token_url.clone(), &pairs);
			let response = transport.dispatch(request).await?;

			if !response.is_success() {
				return Err(Error::AuthFailed(AuthFailedError::InvalidGrant {
					reason: format!("Token endpoint returned status {} during refresh.", response.status),
				}));
			}

			let mut refreshed = parse_standard_token_response(&response.body)?;

			if refreshed.refresh.is_none() {
				refreshed.refresh = Some(refresh.clone());
			}
			for (key, value) in &credential.extra {
				refreshed.extra.entry(key.clone()).or_insert_with(|| value.clone());
			}

			Ok(refreshed)
		})
	}
}

/// Parses a standard `{access_token, refresh_token?, expires_in?, token_type}` JSON body as
/// returned by most OAuth2 token endpoints.
pub(crate) fn parse_standard_token_response(raw_json: &[u8]) -> Result<ActiveCredential, Error> {
	#[derive(Deserialize)]
	struct Body {
		access_token: String,
		refresh_token: Option<String>,
		expires_in: Option<i64>,
	}

	let mut deserializer = serde_json::Deserializer::from_slice(raw_json);
	let body: Body = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::Transient(crate::error::TransientError::ResponseParse { source, status: None }))?;

	Ok(ActiveCredential {
		primary: crate::auth::credential::Secret::new(body.access_token),
		refresh: body.refresh_token.map(crate::auth::credential::Secret::new),
		expires_at: body.expires_in.map(|secs| OffsetDateTime::now_utc() + Duration::seconds(secs)),
		extra: HashMap::new(),
	})
}
