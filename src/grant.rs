//! Canonical grant strings, grant sets, and capability descriptors.

// std
use std::{
	cmp::Ordering,
	collections::BTreeSet,
	hash::{Hash, Hasher},
	sync::OnceLock,
};
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use serde::{Deserializer, Serializer, de::Error as DeError, ser::SerializeSeq};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Errors emitted when validating a grant set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum GrantValidationError {
	/// Grant entries cannot be empty.
	#[error("Grant entries cannot be empty.")]
	Empty,
	/// Grants cannot contain embedded whitespace.
	#[error("Grant contains whitespace: {grant}.")]
	ContainsWhitespace {
		/// The offending grant string.
		grant: String,
	},
}

/// Normalized set of canonical, provider-namespaced grant strings.
///
/// Grants are deduplicated and sorted so equality, ordering, and hashing stay
/// consistent regardless of the order callers supply them in. `fingerprint`
/// lazily caches a base64 (no padding) SHA-256 digest of the normalized,
/// space-joined string; [`Hash`] reuses that cache.
#[derive(Default)]
pub struct GrantSet {
	/// The normalized grants.
	pub grants: Arc<[String]>,
	fingerprint_cache: OnceLock<String>,
}
impl GrantSet {
	/// Creates a normalized grant set from any iterator, case-sensitive after normalization.
	pub fn new<I, S>(grants: I) -> Result<Self, GrantValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Ok(Self { grants: normalize(grants)?, fingerprint_cache: OnceLock::new() })
	}

	/// Number of distinct grants.
	pub fn len(&self) -> usize {
		self.grants.len()
	}

	/// Returns true if no grants are defined.
	pub fn is_empty(&self) -> bool {
		self.grants.is_empty()
	}

	/// Returns true if the set contains the provided grant.
	pub fn contains(&self, grant: &str) -> bool {
		self.grants.binary_search_by(|candidate| candidate.as_str().cmp(grant)).is_ok()
	}

	/// Iterator over normalized grants.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.grants.iter().map(|s| s.as_str())
	}

	/// Space-delimited normalized string representation.
	pub fn normalized(&self) -> String {
		self.grants.join(" ")
	}

	/// Stable fingerprint derived from the normalized grant list.
	pub fn fingerprint(&self) -> String {
		self.fingerprint_cache.get_or_init(|| compute_fingerprint(&self.grants)).clone()
	}

	/// Returns the grants missing from `self` that are present in `required`.
	pub fn missing_from<'a>(&self, required: impl IntoIterator<Item = &'a str>) -> Vec<String> {
		required.into_iter().filter(|g| !self.contains(g)).map(ToOwned::to_owned).collect()
	}

	/// Returns true when every grant in `required` is present.
	pub fn contains_all<'a>(&self, required: impl IntoIterator<Item = &'a str>) -> bool {
		required.into_iter().all(|g| self.contains(g))
	}

	/// Returns true when at least one grant in `optional` is present.
	pub fn contains_any<'a>(&self, optional: impl IntoIterator<Item = &'a str>) -> bool {
		optional.into_iter().any(|g| self.contains(g))
	}
}
impl Clone for GrantSet {
	fn clone(&self) -> Self {
		Self { grants: self.grants.clone(), fingerprint_cache: OnceLock::new() }
	}
}
impl PartialEq for GrantSet {
	fn eq(&self, other: &Self) -> bool {
		self.grants == other.grants
	}
}
impl Eq for GrantSet {}
impl PartialOrd for GrantSet {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for GrantSet {
	fn cmp(&self, other: &Self) -> Ordering {
		self.grants.cmp(&other.grants)
	}
}
impl Hash for GrantSet {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.fingerprint_cache.get_or_init(|| compute_fingerprint(&self.grants)).hash(state);
	}
}
impl Debug for GrantSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("GrantSet").field(&self.grants).finish()
	}
}
impl Display for GrantSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}
impl TryFrom<Vec<String>> for GrantSet {
	type Error = GrantValidationError;

	fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl<'a> IntoIterator for &'a GrantSet {
	type IntoIter = std::iter::Map<std::slice::Iter<'a, String>, fn(&'a String) -> &'a str>;
	type Item = &'a str;

	fn into_iter(self) -> Self::IntoIter {
		self.grants.iter().map(|s| s.as_str())
	}
}
impl FromStr for GrantSet {
	type Err = GrantValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Ok(Self::default());
		}
		if s.chars().all(char::is_whitespace) {
			return Err(GrantValidationError::Empty);
		}

		Self::new(s.split_whitespace())
	}
}
impl Serialize for GrantSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(self.grants.len()))?;

		for grant in self.grants.iter() {
			seq.serialize_element(grant)?;
		}

		seq.end()
	}
}
impl<'de> Deserialize<'de> for GrantSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = <Vec<String>>::deserialize(deserializer)?;

		GrantSet::new(values).map_err(DeError::custom)
	}
}

fn normalize<I, S>(grants: I) -> Result<Arc<[String]>, GrantValidationError>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	let mut set = BTreeSet::new();

	for grant in grants {
		let owned: String = grant.into();

		if owned.is_empty() {
			return Err(GrantValidationError::Empty);
		}
		if owned.chars().any(char::is_whitespace) {
			return Err(GrantValidationError::ContainsWhitespace { grant: owned });
		}

		set.insert(owned);
	}

	Ok(Arc::from(set.into_iter().collect::<Vec<_>>()))
}

fn compute_fingerprint(grants: &[String]) -> String {
	let normalized = grants.join(" ");
	let mut hasher = Sha256::new();

	hasher.update(normalized.as_bytes());

	STANDARD_NO_PAD.encode(hasher.finalize())
}

/// Behavior when a capability's optional grants are missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeniedBehavior {
	/// The invocation is refused outright.
	Block,
	/// The invocation proceeds with reduced transport/parameters.
	Degrade,
}

/// Describes a single named provider action guarded by grants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
	/// Dotted capability name, e.g. `crm.accounts.read`.
	pub name: String,
	/// Grants that must all be present.
	pub required_grants: Vec<String>,
	/// Grants where at least one presence upgrades the invocation out of degrade mode.
	pub optional_grants: Vec<String>,
	/// Behavior applied when optional grants are missing.
	pub denied_behavior: DeniedBehavior,
}
impl CapabilityDescriptor {
	/// Creates a descriptor that blocks outright when optional grants are missing.
	pub fn new(name: impl Into<String>, required_grants: impl IntoIterator<Item = impl Into<String>>) -> Self {
		Self {
			name: name.into(),
			required_grants: required_grants.into_iter().map(Into::into).collect(),
			optional_grants: Vec::new(),
			denied_behavior: DeniedBehavior::Block,
		}
	}

	/// Adds optional grants and marks the descriptor as degrade-capable.
	pub fn with_degrade(mut self, optional_grants: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.optional_grants = optional_grants.into_iter().map(Into::into).collect();
		self.denied_behavior = DeniedBehavior::Degrade;

		self
	}
}

/// Outcome of evaluating a [`CapabilityDescriptor`] against a [`GrantSet`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CapabilityDecision {
	/// All required grants present and no optional grants missing.
	Allowed,
	/// All required grants present but one or more optional grants missing; descriptor allows degrade.
	Degraded {
		/// Optional grants that were missing.
		missing_optional: Vec<String>,
	},
	/// Required grants missing, or optional grants missing with `denied_behavior = Block`.
	Blocked {
		/// Grants that caused the block.
		missing: Vec<String>,
	},
}
impl CapabilityDescriptor {
	/// Evaluates this descriptor's grant requirements against a snapshot's granted set.
	pub fn evaluate(&self, granted: &GrantSet) -> CapabilityDecision {
		let missing_required = granted.missing_from(self.required_grants.iter().map(String::as_str));

		if !missing_required.is_empty() {
			return CapabilityDecision::Blocked { missing: missing_required };
		}

		if self.optional_grants.is_empty() {
			return CapabilityDecision::Allowed;
		}

		let missing_optional = granted.missing_from(self.optional_grants.iter().map(String::as_str));

		if missing_optional.is_empty() {
			return CapabilityDecision::Allowed;
		}

		match self.denied_behavior {
			DeniedBehavior::Degrade => CapabilityDecision::Degraded { missing_optional },
			DeniedBehavior::Block => CapabilityDecision::Blocked { missing: missing_optional },
		}
	}
}

/// Immutable, versioned record of requested/granted grants for a connection.
///
/// A new snapshot supersedes the previous one atomically; snapshots are never
/// mutated in place.
#[derive(Clone, Debug)]
pub struct GrantSnapshot {
	/// Monotonically increasing version number.
	pub version: u64,
	/// Grants requested during the auth flow.
	pub requested: GrantSet,
	/// Grants actually returned by the provider.
	pub granted: GrantSet,
	/// Instant this snapshot was captured.
	pub captured_at: OffsetDateTime,
}
impl GrantSnapshot {
	/// Builds the first snapshot (version 1) for a connection.
	pub fn initial(requested: GrantSet, granted: GrantSet) -> Self {
		Self { version: 1, requested, granted, captured_at: OffsetDateTime::now_utc() }
	}

	/// Builds the snapshot that supersedes `self`.
	pub fn next(&self, requested: GrantSet, granted: GrantSet) -> Self {
		Self { version: self.version + 1, requested, granted, captured_at: OffsetDateTime::now_utc() }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn grants_normalize_and_hash_stably() {
		let lhs = GrantSet::new(["shopify:read_products", "shopify:read_products", "shopify:write_orders"])
			.expect("Left-hand grant set should be valid.");
		let rhs = GrantSet::new(["shopify:write_orders", "shopify:read_products"])
			.expect("Right-hand grant set should be valid.");

		assert_eq!(lhs, rhs);
		assert_eq!(lhs.fingerprint(), rhs.fingerprint());
	}

	#[test]
	fn capability_evaluates_block_degrade_allow() {
		let blocked = CapabilityDescriptor::new("crm.accounts.read", ["api.read"]);
		let degradeable =
			CapabilityDescriptor::new("crm.accounts.bulk_export", ["api.read"]).with_degrade(["bulk.export"]);

		let empty = GrantSet::default();
		assert!(matches!(blocked.evaluate(&empty), CapabilityDecision::Blocked { .. }));

		let read_only = GrantSet::new(["api.read"]).expect("Grant fixture should be valid.");
		assert!(matches!(degradeable.evaluate(&read_only), CapabilityDecision::Degraded { .. }));

		let full = GrantSet::new(["api.read", "bulk.export"]).expect("Grant fixture should be valid.");
		assert!(matches!(full.evaluate_with(&degradeable), CapabilityDecision::Allowed));
	}

	trait EvalExt {
		fn evaluate_with(&self, descriptor: &CapabilityDescriptor) -> CapabilityDecision;
	}
	impl EvalExt for GrantSet {
		fn evaluate_with(&self, descriptor: &CapabilityDescriptor) -> CapabilityDecision {
			descriptor.evaluate(self)
		}
	}

	#[test]
	fn snapshot_versions_increase() {
		let granted = GrantSet::new(["a"]).expect("Grant fixture should be valid.");
		let first = GrantSnapshot::initial(granted.clone(), granted.clone());
		let second = first.next(granted.clone(), granted);

		assert_eq!(first.version, 1);
		assert_eq!(second.version, 2);
	}
}
