//! Strongly typed identifiers enforced across the broker domain.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty or whitespace.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier.
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
	/// Provider identifiers must be lowercase slugs.
	#[error("{kind} identifier must be a lowercase slug (letters, digits, `-`, `_`, `.`).")]
	NotASlug {
		/// Kind of identifier.
		kind: &'static str,
	},
}

def_id! { ProviderId, "Lowercased slug identifying a registered provider.", "Provider" }
def_id! { ConnectionId, "Unique identifier for a Connection record.", "Connection" }
def_id! { DeliveryId, "Provider-supplied identifier for an inbound webhook delivery.", "Delivery" }
def_id! { OutboxEventId, "Unique identifier for an outbox entry.", "OutboxEvent" }
def_id! { InstallationId, "Unique identifier for an installation record.", "Installation" }
def_id! { IdempotencyKey, "Stable hash identifying an idempotent capability invocation.", "IdempotencyKey" }
def_id! { ClaimId, "Opaque lease token issued when claiming a delivery or outbox entry.", "ClaimId" }
impl ClaimId {
	/// Generates a fresh random lease token.
	pub fn random() -> Self {
		Self(uuid::Uuid::new_v4().to_string())
	}
}
impl OutboxEventId {
	/// Generates a fresh random event id.
	pub fn random() -> Self {
		Self(uuid::Uuid::new_v4().to_string())
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

/// Validates that a provider id is a lowercase slug (`[a-z0-9._-]+`).
pub fn validate_provider_slug(view: &str) -> Result<(), IdentifierError> {
	validate_view("Provider", view)?;

	let is_slug =
		view.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'));

	if !is_slug {
		return Err(IdentifierError::NotASlug { kind: "Provider" });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_whitespace() {
		assert!(ConnectionId::new(" conn-1").is_err());
		assert!(ConnectionId::new("conn-1 ").is_err());

		let id = ConnectionId::new("conn-1").expect("Connection id fixture should be valid.");

		assert_eq!(id.as_ref(), "conn-1");
	}

	#[test]
	fn provider_slug_validation() {
		assert!(validate_provider_slug("github").is_ok());
		assert!(validate_provider_slug("Shopify").is_err());
		assert!(validate_provider_slug("has space").is_err());
		assert!(validate_provider_slug("shopify-plus_v2.1").is_ok());
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let payload = "\"conn-42\"";
		let id: ConnectionId =
			serde_json::from_str(payload).expect("Connection id should deserialize.");

		assert_eq!(id.as_ref(), "conn-42");
		assert!(serde_json::from_str::<ConnectionId>("\"with space\"").is_err());
	}

	#[test]
	fn claim_id_random_is_unique() {
		assert_ne!(ClaimId::random(), ClaimId::random());
	}

	#[test]
	fn outbox_event_id_random_is_unique() {
		assert_ne!(OutboxEventId::random(), OutboxEventId::random());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<ConnectionId, u8> = HashMap::from_iter([(
			ConnectionId::new("conn-1").expect("Connection id fixture should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("conn-1"), Some(&7));
	}
}
