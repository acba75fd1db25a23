//! Shared form-POST helper for the OAuth-family token-endpoint strategies.

// self
use crate::{
	_prelude::*,
	capability::transport::{HttpMethod, TransportRequest},
};

/// Builds a `application/x-www-form-urlencoded` POST request against `url`.
pub fn build_form_request(url: Url, params: &[(&str, &str)]) -> TransportRequest {
	let body = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(params).finish();

	TransportRequest::new(HttpMethod::Post, url)
		.with_header("content-type", "application/x-www-form-urlencoded")
		.with_body(body.into_bytes())
}
