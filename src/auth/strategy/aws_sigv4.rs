//! AWS Signature Version 4 request signing.

// crates.io
use hex::encode as hex_encode;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{credential::ActiveCredential, strategy::AuthStrategy},
	capability::transport::{TransportAdapter, TransportRequest},
};

const UNRESERVED: &AsciiSet = &CONTROLS
	.add(b' ')
	.add(b'"')
	.add(b'#')
	.add(b'<')
	.add(b'>')
	.add(b'?')
	.add(b'`')
	.add(b'{')
	.add(b'}')
	.add(b'/')
	.add(b'%');

type HmacSha256 = Hmac<Sha256>;

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
	let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length.");

	mac.update(data);
	mac.finalize().into_bytes().to_vec()
}

fn sha256_hex(data: &[u8]) -> String {
	hex_encode(Sha256::digest(data))
}

/// Where the SigV4 signature material is placed on the outgoing request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SigningMode {
	/// `Authorization` header plus `x-amz-date`/`x-amz-content-sha256` headers (the common case
	/// for direct API calls).
	Header,
	/// `X-Amz-*` query parameters appended to the URL (presigned URLs, e.g. for browser-initiated
	/// requests or services that cannot set custom headers).
	Query {
		/// How long the presigned URL remains valid.
		expires_in: Duration,
	},
}

/// Signs requests against an AWS service endpoint using SigV4.
pub struct AwsSigV4Strategy {
	/// AWS region, e.g. `us-east-1`.
	pub region: String,
	/// AWS service name, e.g. `execute-api`.
	pub service: String,
	/// Whether to sign via headers or a presigned query string.
	pub mode: SigningMode,
}
impl AwsSigV4Strategy {
	fn canonical_request(
		&self,
		request: &TransportRequest,
		extra_query: &[(String, String)],
		headers: &[(String, String)],
		payload_hash: &str,
	) -> (String, String) {
		let method = format!("{:?}", request.method).to_uppercase();
		let canonical_uri = if request.url.path().is_empty() { "/".to_owned() } else { request.url.path().to_owned() };

		let mut query_pairs: Vec<(String, String)> = request
			.url
			.query_pairs()
			.map(|(k, v)| (utf8_percent_encode(&k, UNRESERVED).to_string(), utf8_percent_encode(&v, UNRESERVED).to_string()))
			.chain(extra_query.iter().cloned())
			.collect();

		query_pairs.sort();

		let canonical_query = query_pairs.into_iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");

		let mut headers = headers.to_vec();

		headers.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));

		let canonical_headers = headers
			.iter()
			.map(|(k, v)| format!("{}:{}\n", k.to_lowercase(), v.trim()))
			.collect::<String>();
		let signed_headers = headers.iter().map(|(k, _)| k.to_lowercase()).collect::<Vec<_>>().join(";");

		let canonical_request = format!(
			"{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
		);

		(canonical_request, signed_headers)
	}

	fn amz_date(now: OffsetDateTime) -> Result<String, Error> {
		let amz_date = now
			.format(&time::format_description::well_known::Iso8601::DEFAULT)
			.map_err(|e| Error::internal(e.to_string()))?;
		let amz_date = amz_date.replace(['-', ':'], "");

		Ok(amz_date.split('.').next().unwrap_or(&amz_date).to_owned() + "Z")
	}

	fn sign_string(&self, secret_key: &str, date_stamp: &str, string_to_sign: &str) -> String {
		let k_date = hmac(format!("AWS4{secret_key}").as_bytes(), date_stamp.as_bytes());
		let k_region = hmac(&k_date, self.region.as_bytes());
		let k_service = hmac(&k_region, self.service.as_bytes());
		let k_signing = hmac(&k_service, b"aws4_request");

		hex_encode(hmac(&k_signing, string_to_sign.as_bytes()))
	}

	/// Computes the `Authorization` header value and `x-amz-date`/`x-amz-content-sha256` headers
	/// for `request`, signed with `credential`'s `primary` (access key id) and `extra["secret_access_key"]`.
	pub fn compute_signature(
		&self,
		credential: &ActiveCredential,
		request: &TransportRequest,
		now: OffsetDateTime,
	) -> Result<Vec<(String, String)>, Error> {
		let secret_key = credential
			.extra
			.get("secret_access_key")
			.ok_or_else(|| Error::bad_input("AWS credential is missing secret_access_key."))?;
		let access_key_id = credential.primary.expose();
		let payload_hash = sha256_hex(request.body.as_deref().unwrap_or_default());
		let amz_date = Self::amz_date(now)?;
		let date_stamp = &amz_date[0..8];
		let host = request.url.host_str().unwrap_or_default().to_owned();

		let mut headers = request.headers.clone();

		headers.push(("host".to_owned(), host));
		headers.push(("x-amz-date".to_owned(), amz_date.clone()));

		let (canonical_request, signed_headers) = self.canonical_request(request, &[], &headers, &payload_hash);
		let credential_scope = format!("{date_stamp}/{}/{}/aws4_request", self.region, self.service);
		let string_to_sign =
			format!("AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{}", sha256_hex(canonical_request.as_bytes()));
		let signature = self.sign_string(secret_key, date_stamp, &string_to_sign);

		let authorization = format!(
			"AWS4-HMAC-SHA256 Credential={access_key_id}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}"
		);

		let mut extra_headers = vec![
			("x-amz-date".to_owned(), amz_date),
			("x-amz-content-sha256".to_owned(), payload_hash),
			("Authorization".to_owned(), authorization),
		];

		if let Some(token) = credential.extra.get("session_token") {
			extra_headers.push(("x-amz-security-token".to_owned(), token.clone()));
		}

		Ok(extra_headers)
	}

	/// Computes a presigned URL for `request`, carrying the full signature in `X-Amz-*` query
	/// parameters rather than headers.
	pub fn compute_presigned_url(
		&self,
		credential: &ActiveCredential,
		request: &TransportRequest,
		expires_in: Duration,
		now: OffsetDateTime,
	) -> Result<Url, Error> {
		let secret_key = credential
			.extra
			.get("secret_access_key")
			.ok_or_else(|| Error::bad_input("AWS credential is missing secret_access_key."))?;
		let access_key_id = credential.primary.expose();
		let amz_date = Self::amz_date(now)?;
		let date_stamp = &amz_date[0..8];
		let host = request.url.host_str().unwrap_or_default().to_owned();
		let credential_scope = format!("{date_stamp}/{}/{}/aws4_request", self.region, self.service);

		let mut extra_query = vec![
			("X-Amz-Algorithm".to_owned(), "AWS4-HMAC-SHA256".to_owned()),
			("X-Amz-Credential".to_owned(), format!("{access_key_id}/{credential_scope}")),
			("X-Amz-Date".to_owned(), amz_date.clone()),
			("X-Amz-Expires".to_owned(), expires_in.whole_seconds().to_string()),
			("X-Amz-SignedHeaders".to_owned(), "host".to_owned()),
		];

		if let Some(token) = credential.extra.get("session_token") {
			extra_query.push(("X-Amz-Security-Token".to_owned(), token.clone()));
		}

		let encoded_query: Vec<(String, String)> = extra_query
			.iter()
			.map(|(k, v)| (utf8_percent_encode(k, UNRESERVED).to_string(), utf8_percent_encode(v, UNRESERVED).to_string()))
			.collect();

		let payload_hash = "UNSIGNED-PAYLOAD";
		let headers = vec![("host".to_owned(), host)];
		let (canonical_request, _) = self.canonical_request(request, &encoded_query, &headers, payload_hash);
		let string_to_sign =
			format!("AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{}", sha256_hex(canonical_request.as_bytes()));
		let signature = self.sign_string(secret_key, date_stamp, &string_to_sign);

		let mut url = request.url.clone();

		{
			let mut pairs = url.query_pairs_mut();

			for (key, value) in &extra_query {
				pairs.append_pair(key, value);
			}
			pairs.append_pair("X-Amz-Signature", &signature);
		}

		Ok(url)
	}
}
impl AuthStrategy for AwsSigV4Strategy {
	fn sign<'a>(&'a self, credential: &'a ActiveCredential, mut request: TransportRequest) -> Result<TransportRequest, Error> {
		match self.mode {
			SigningMode::Header => {
				for (name, value) in self.compute_signature(credential, &request, OffsetDateTime::now_utc())? {
					request = request.with_header(name, value);
				}

				Ok(request)
			},
			SigningMode::Query { expires_in } => {
				request.url = self.compute_presigned_url(credential, &request, expires_in, OffsetDateTime::now_utc())?;

				Ok(request)
			},
		}
	}

	fn refresh<'a>(
		&'a self,
		_credential: &'a ActiveCredential,
		_transport: &'a dyn TransportAdapter,
	) -> Pin<Box<dyn Future<Output = Result<ActiveCredential, Error>> + Send + 'a>> {
		Box::pin(async move { Err(Error::Internal("AWS SigV4 credentials are not refreshed by the broker.".into())) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::capability::transport::HttpMethod;

	#[test]
	fn signature_is_deterministic_for_a_fixed_instant() {
		let strategy =
			AwsSigV4Strategy { region: "us-east-1".into(), service: "execute-api".into(), mode: SigningMode::Header };
		let mut credential = ActiveCredential::static_secret("AKIDEXAMPLE");

		credential.extra.insert("secret_access_key".into(), "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY".into());

		let request = TransportRequest::new(HttpMethod::Get, "https://service.us-east-1.amazonaws.com/?a=1".parse().unwrap());
		let now = OffsetDateTime::now_utc();

		let first = strategy.compute_signature(&credential, &request, now).expect("Signing should succeed.");
		let second = strategy.compute_signature(&credential, &request, now).expect("Signing should succeed.");

		assert_eq!(first, second);
	}

	#[test]
	fn query_mode_places_signature_in_the_url() {
		let strategy =
			AwsSigV4Strategy { region: "us-east-1".into(), service: "execute-api".into(), mode: SigningMode::Query {
				expires_in: Duration::minutes(5),
			} };
		let mut credential = ActiveCredential::static_secret("AKIDEXAMPLE");

		credential.extra.insert("secret_access_key".into(), "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY".into());

		let request = TransportRequest::new(HttpMethod::Get, "https://service.us-east-1.amazonaws.com/".parse().unwrap());
		let signed = strategy.sign(&credential, request).expect("Signing should succeed.");
		let query: HashMap<_, _> = signed.url.query_pairs().into_owned().collect();

		assert_eq!(query.get("X-Amz-Algorithm").map(String::as_str), Some("AWS4-HMAC-SHA256"));
		assert!(query.contains_key("X-Amz-Credential"));
		assert!(query.contains_key("X-Amz-Date"));
		assert_eq!(query.get("X-Amz-Expires").map(String::as_str), Some("300"));
		assert_eq!(query.get("X-Amz-SignedHeaders").map(String::as_str), Some("host"));
		assert!(query.contains_key("X-Amz-Signature"));
	}
}
