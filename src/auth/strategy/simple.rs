//! Strategies with no refresh cycle: static secrets decorated onto the
//! request in a kind-specific way.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
// self
use crate::{
	_prelude::*,
	auth::{credential::ActiveCredential, strategy::AuthStrategy},
	capability::transport::{TransportAdapter, TransportRequest},
	error::ConfigError,
};

fn no_refresh<'a>(
) -> Pin<Box<dyn Future<Output = Result<ActiveCredential, Error>> + Send + 'a>> {
	Box::pin(async move { Err(Error::Internal("Auth kind does not support refresh.".into())) })
}

/// Sends the credential as a static header (`Authorization: Bearer <key>` by default).
pub struct ApiKeyStrategy {
	/// Header name to carry the key.
	pub header: String,
}
impl AuthStrategy for ApiKeyStrategy {
	fn sign<'a>(&'a self, credential: &'a ActiveCredential, request: TransportRequest) -> Result<TransportRequest, Error> {
		Ok(request.with_header(self.header.clone(), credential.primary.expose().to_owned()))
	}

	fn refresh<'a>(
		&'a self,
		_credential: &'a ActiveCredential,
		_transport: &'a dyn TransportAdapter,
	) -> Pin<Box<dyn Future<Output = Result<ActiveCredential, Error>> + Send + 'a>> {
		no_refresh()
	}
}

/// Sends a personal access token as a bearer header.
pub struct PatStrategy;
impl AuthStrategy for PatStrategy {
	fn sign<'a>(&'a self, credential: &'a ActiveCredential, request: TransportRequest) -> Result<TransportRequest, Error> {
		Ok(request.with_header("Authorization", format!("Bearer {}", credential.primary.expose())))
	}

	fn refresh<'a>(
		&'a self,
		_credential: &'a ActiveCredential,
		_transport: &'a dyn TransportAdapter,
	) -> Pin<Box<dyn Future<Output = Result<ActiveCredential, Error>> + Send + 'a>> {
		no_refresh()
	}
}

/// HTTP Basic authentication using `primary` as `user:pass`.
pub struct BasicStrategy;
impl AuthStrategy for BasicStrategy {
	fn sign<'a>(&'a self, credential: &'a ActiveCredential, request: TransportRequest) -> Result<TransportRequest, Error> {
		let encoded = STANDARD.encode(credential.primary.expose().as_bytes());

		Ok(request.with_header("Authorization", format!("Basic {encoded}")))
	}

	fn refresh<'a>(
		&'a self,
		_credential: &'a ActiveCredential,
		_transport: &'a dyn TransportAdapter,
	) -> Pin<Box<dyn Future<Output = Result<ActiveCredential, Error>> + Send + 'a>> {
		no_refresh()
	}
}

/// mTLS authentication: the certificate is presented at the transport layer, so signing only
/// validates that the credential carries the expected client-cert fingerprint metadata.
pub struct MtlsStrategy;
impl AuthStrategy for MtlsStrategy {
	fn sign<'a>(&'a self, credential: &'a ActiveCredential, request: TransportRequest) -> Result<TransportRequest, Error> {
		if !credential.extra.contains_key("client_cert_fingerprint") {
			return Err(Error::Config(ConfigError::InvalidKeyMaterial {
				reason: "mTLS credential is missing a client_cert_fingerprint.".into(),
			}));
		}

		Ok(request)
	}

	fn refresh<'a>(
		&'a self,
		_credential: &'a ActiveCredential,
		_transport: &'a dyn TransportAdapter,
	) -> Pin<Box<dyn Future<Output = Result<ActiveCredential, Error>> + Send + 'a>> {
		no_refresh()
	}
}

/// HMAC-SHA256 request signing: signs `method\npath\nbody` and sends the digest in a header.
pub struct HmacStrategy {
	/// Header carrying the base64 signature.
	pub signature_header: String,
}
impl AuthStrategy for HmacStrategy {
	fn sign<'a>(&'a self, credential: &'a ActiveCredential, request: TransportRequest) -> Result<TransportRequest, Error> {
		let mut mac = Hmac::<Sha256>::new_from_slice(credential.primary.expose().as_bytes())
			.map_err(|source| Error::Config(ConfigError::InvalidKeyMaterial { reason: source.to_string() }))?;
		let canonical = format!(
			"{:?}\n{}\n{}",
			request.method,
			request.url.path(),
			request.body.as_deref().map(|b| String::from_utf8_lossy(b).into_owned()).unwrap_or_default()
		);

		mac.update(canonical.as_bytes());

		let signature = STANDARD.encode(mac.finalize().into_bytes());

		Ok(request.with_header(self.signature_header.clone(), signature))
	}

	fn refresh<'a>(
		&'a self,
		_credential: &'a ActiveCredential,
		_transport: &'a dyn TransportAdapter,
	) -> Pin<Box<dyn Future<Output = Result<ActiveCredential, Error>> + Send + 'a>> {
		no_refresh()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::capability::transport::HttpMethod;

	#[test]
	fn api_key_adds_header() {
		let strategy = ApiKeyStrategy { header: "X-Api-Key".into() };
		let credential = ActiveCredential::static_secret("key-123");
		let request = TransportRequest::new(HttpMethod::Get, "https://host.example/a".parse().unwrap());
		let signed = strategy.sign(&credential, request).expect("Signing should succeed.");

		assert!(signed.headers.contains(&("X-Api-Key".to_string(), "key-123".to_string())));
	}

	#[test]
	fn hmac_signature_is_deterministic() {
		let strategy = HmacStrategy { signature_header: "X-Signature".into() };
		let credential = ActiveCredential::static_secret("shared-secret");
		let request = TransportRequest::new(HttpMethod::Post, "https://host.example/a".parse().unwrap())
			.with_body(b"payload".to_vec());

		let first = strategy.sign(&credential, request.clone()).expect("Signing should succeed.");
		let second = strategy.sign(&credential, request).expect("Signing should succeed.");

		assert_eq!(first.headers, second.headers);
	}
}
