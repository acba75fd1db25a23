//! Webhook signature verification templates for common providers.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
// self
use crate::_prelude::*;

type HmacSha256 = Hmac<Sha256>;

/// A provider-specific webhook signature scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationTemplate {
	/// Shopify: base64 HMAC-SHA256 in `X-Shopify-Hmac-Sha256`.
	ShopifyHmacBase64,
	/// Meta/Facebook: hex HMAC-SHA256, `sha256=<hex>` in `X-Hub-Signature-256`.
	MetaHexPrefixed,
	/// TikTok: raw hex HMAC-SHA256 in a signature header.
	TikTokHex,
	/// Pinterest: raw hex HMAC-SHA256 in a signature header.
	PinterestHex,
	/// A shared secret compared directly against a query/header token (e.g. Google channel
	/// tokens), with no HMAC involved.
	SharedSecretMatch,
}

/// Verifies a webhook body against a provided signature value using `template`.
pub fn verify(template: VerificationTemplate, secret: &str, body: &[u8], signature: &str) -> bool {
	match template {
		VerificationTemplate::ShopifyHmacBase64 => {
			let expected = STANDARD.encode(compute_hmac(secret, body));

			constant_time_eq(expected.as_bytes(), signature.as_bytes())
		},
		VerificationTemplate::MetaHexPrefixed => {
			let Some(hex_part) = signature.strip_prefix("sha256=") else { return false };
			let expected = hex::encode(compute_hmac(secret, body));

			constant_time_eq(expected.as_bytes(), hex_part.as_bytes())
		},
		VerificationTemplate::TikTokHex | VerificationTemplate::PinterestHex => {
			let expected = hex::encode(compute_hmac(secret, body));

			constant_time_eq(expected.as_bytes(), signature.as_bytes())
		},
		VerificationTemplate::SharedSecretMatch => constant_time_eq(secret.as_bytes(), signature.as_bytes()),
	}
}

fn compute_hmac(secret: &str, body: &[u8]) -> Vec<u8> {
	let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length.");

	mac.update(body);
	mac.finalize().into_bytes().to_vec()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
	if a.len() != b.len() {
		return false;
	}

	a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn shopify_template_accepts_matching_signature() {
		let secret = "shh";
		let body = b"{\"id\":1}";
		let signature = STANDARD.encode(compute_hmac(secret, body));

		assert!(verify(VerificationTemplate::ShopifyHmacBase64, secret, body, &signature));
		assert!(!verify(VerificationTemplate::ShopifyHmacBase64, secret, body, "wrong"));
	}

	#[test]
	fn meta_template_requires_prefix() {
		let secret = "shh";
		let body = b"payload";
		let signature = format!("sha256={}", hex::encode(compute_hmac(secret, body)));

		assert!(verify(VerificationTemplate::MetaHexPrefixed, secret, body, &signature));
		assert!(!verify(VerificationTemplate::MetaHexPrefixed, secret, body, &hex::encode(compute_hmac(secret, body))));
	}
}
