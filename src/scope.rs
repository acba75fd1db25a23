//! Scope reference model: the owning principal of a Connection.

// self
use crate::_prelude::*;

/// Errors emitted when validating a [`ScopeRef`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// The scope type string was empty.
	#[error("Scope type cannot be empty.")]
	EmptyType,
	/// The scope id string was empty.
	#[error("Scope id cannot be empty.")]
	EmptyId,
}

/// Identifies the owning principal of a connection.
///
/// `kind` is free-form but conventionally `user` or `org`; `id` is an
/// opaque, host-assigned identifier. Never infer a `ScopeRef` from a token —
/// it must always come from the caller.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScopeRef {
	/// Scope type, e.g. `user` or `org`.
	pub kind: String,
	/// Opaque identifier within `kind`.
	pub id: String,
}
impl ScopeRef {
	/// Creates a new scope reference after validating both fields are non-empty.
	pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Result<Self, ScopeValidationError> {
		let kind = kind.into();
		let id = id.into();

		if kind.is_empty() {
			return Err(ScopeValidationError::EmptyType);
		}
		if id.is_empty() {
			return Err(ScopeValidationError::EmptyId);
		}

		Ok(Self { kind, id })
	}

	/// Stable cache/lookup key combining type and id.
	pub fn fingerprint(&self) -> String {
		format!("{}:{}", self.kind, self.id)
	}
}
impl Display for ScopeRef {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}/{}", self.kind, self.id)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn rejects_empty_fields() {
		assert!(matches!(ScopeRef::new("", "1"), Err(ScopeValidationError::EmptyType)));
		assert!(matches!(ScopeRef::new("user", ""), Err(ScopeValidationError::EmptyId)));
	}

	#[test]
	fn fingerprint_is_stable() {
		let scope = ScopeRef::new("user", "usr_1").expect("Scope fixture should be valid.");

		assert_eq!(scope.fingerprint(), "user:usr_1");
		assert_eq!(scope.to_string(), "user/usr_1");
	}
}
