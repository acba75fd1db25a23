//! Transport abstraction: a capability invocation is signed, then dispatched
//! through whichever [`TransportAdapter`] matches the provider's transport
//! kind (HTTP REST, GraphQL-over-HTTP, etc).

// self
use crate::_prelude::*;

/// HTTP-ish method; kept as a small enum rather than pulling in a full HTTP crate dependency at
/// this layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
	/// HTTP GET.
	Get,
	/// HTTP POST.
	Post,
	/// HTTP PUT.
	Put,
	/// HTTP PATCH.
	Patch,
	/// HTTP DELETE.
	Delete,
}

/// A provider-operation request after capability resolution but before signing.
#[derive(Clone, Debug)]
pub struct TransportRequest {
	/// HTTP method.
	pub method: HttpMethod,
	/// Fully-qualified target URL.
	pub url: Url,
	/// Request headers, in insertion order.
	pub headers: Vec<(String, String)>,
	/// Request body, when applicable.
	pub body: Option<Vec<u8>>,
}
impl TransportRequest {
	/// Creates a request with no headers or body.
	pub fn new(method: HttpMethod, url: Url) -> Self {
		Self { method, url, headers: Vec::new(), body: None }
	}

	/// Appends a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Sets the request body.
	pub fn with_body(mut self, body: Vec<u8>) -> Self {
		self.body = Some(body);

		self
	}
}

/// A normalized provider-operation response.
#[derive(Clone, Debug)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: Vec<(String, String)>,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl TransportResponse {
	/// Returns true for 2xx status codes.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Parses the `Retry-After` header as a duration, supporting both delay-seconds and
	/// HTTP-date forms (delay-seconds only; HTTP-date parsing is left to callers who need it).
	pub fn retry_after(&self) -> Option<Duration> {
		self.headers
			.iter()
			.find(|(name, _)| name.eq_ignore_ascii_case("retry-after"))
			.and_then(|(_, value)| value.trim().parse::<i64>().ok())
			.map(Duration::seconds)
	}
}

/// Dispatches a signed [`TransportRequest`] and returns a [`TransportResponse`].
///
/// Implemented once per transport kind (HTTP REST, GraphQL) and resolved by provider descriptor.
pub trait TransportAdapter: Send + Sync {
	/// Dispatches the request over the network.
	fn dispatch<'a>(
		&'a self,
		request: TransportRequest,
	) -> Pin<Box<dyn Future<Output = Result<TransportResponse, Error>> + Send + 'a>>;
}

#[cfg(feature = "reqwest")]
/// [`TransportAdapter`] backed by a shared [`reqwest::Client`].
pub struct ReqwestTransportAdapter {
	client: ReqwestClient,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransportAdapter {
	/// Wraps an existing reqwest client.
	pub fn new(client: ReqwestClient) -> Self {
		Self { client }
	}
}
#[cfg(feature = "reqwest")]
impl TransportAdapter for ReqwestTransportAdapter {
	fn dispatch<'a>(
		&'a self,
		request: TransportRequest,
	) -> Pin<Box<dyn Future<Output = Result<TransportResponse, Error>> + Send + 'a>> {
		Box::pin(async move {
			let method = match request.method {
				HttpMethod::Get => reqwest::Method::GET,
				HttpMethod::Post => reqwest::Method::POST,
				HttpMethod::Put => reqwest::Method::PUT,
				HttpMethod::Patch => reqwest::Method::PATCH,
				HttpMethod::Delete => reqwest::Method::DELETE,
			};
			let mut builder = self.client.request(method, request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name, value);
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(crate::error::TransportError::from)?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.map(|(name, value)| (name.to_string(), value.to_str().unwrap_or_default().to_owned()))
				.collect();
			let body = response.bytes().await.map_err(crate::error::TransportError::from)?.to_vec();

			Ok(TransportResponse { status, headers, body })
		})
	}
}
