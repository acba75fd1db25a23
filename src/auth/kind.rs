//! Enumeration of supported authentication strategies.

// self
use crate::_prelude::*;

/// Identifies which [`crate::auth::strategy::AuthStrategy`] backs a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
	/// Three-legged OAuth2 authorization-code flow (optionally with PKCE).
	OAuth2AuthCode,
	/// Two-legged OAuth2 client-credentials flow.
	OAuth2ClientCredentials,
	/// Static API key sent as a header or query parameter.
	ApiKey,
	/// Personal access token.
	Pat,
	/// HMAC-signed request authentication.
	Hmac,
	/// HTTP Basic authentication.
	Basic,
	/// Mutual TLS client-certificate authentication.
	Mtls,
	/// AWS Signature Version 4 request signing.
	AwsSigv4,
	/// Service-account JWT bearer assertion (e.g. Google-style).
	ServiceAccountJwt,
	/// Storefront/embedded-app session token exchange.
	EmbeddedSession,
}
impl AuthKind {
	/// Returns true when this kind supports autonomous refresh without user interaction.
	pub fn supports_refresh(self) -> bool {
		matches!(self, Self::OAuth2AuthCode | Self::OAuth2ClientCredentials | Self::ServiceAccountJwt)
	}
}
impl Display for AuthKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let label = match self {
			Self::OAuth2AuthCode => "oauth2_auth_code",
			Self::OAuth2ClientCredentials => "oauth2_client_credentials",
			Self::ApiKey => "api_key",
			Self::Pat => "pat",
			Self::Hmac => "hmac",
			Self::Basic => "basic",
			Self::Mtls => "mtls",
			Self::AwsSigv4 => "aws_sigv4",
			Self::ServiceAccountJwt => "service_account_jwt",
			Self::EmbeddedSession => "embedded_session",
		};

		f.write_str(label)
	}
}
