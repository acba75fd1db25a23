//! Static description of a provider: endpoints, supported auth kinds, and
//! declared capabilities.

// self
use crate::{
	_prelude::*,
	auth::kind::AuthKind,
	grant::CapabilityDescriptor,
	ids::{ProviderId, validate_provider_slug},
};

/// Errors raised while building a [`ProviderDescriptor`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ProviderDescriptorError {
	/// The provider id failed slug validation.
	#[error(transparent)]
	Id(#[from] crate::ids::IdentifierError),
	/// An endpoint URL was malformed.
	#[error("Endpoint `{field}` is not a valid URL: {reason}.")]
	InvalidEndpoint {
		/// Field name that failed to parse.
		field: &'static str,
		/// Underlying parse failure message.
		reason: String,
	},
	/// No auth kinds were declared.
	#[error("At least one auth kind must be declared.")]
	NoAuthKinds,
}

/// Authorization and token endpoints for OAuth2-style auth kinds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint, when the provider supports a redirect-based flow.
	pub authorize_url: Option<Url>,
	/// Token endpoint.
	pub token_url: Option<Url>,
	/// Base URL for provider-operation capability dispatch.
	pub api_base_url: Url,
}

/// Immutable description of a registered provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Provider identifier (lowercase slug).
	pub id: ProviderId,
	/// Human-readable display name.
	pub display_name: String,
	/// Auth kinds this provider supports.
	pub supported_auth_kinds: Vec<AuthKind>,
	/// Scope/principal kinds this provider's connections may be owned by (e.g. `user`, `org`).
	pub supported_scope_kinds: Vec<String>,
	/// Declared endpoints.
	pub endpoints: ProviderEndpoints,
	/// Capabilities this provider exposes.
	pub capabilities: Vec<CapabilityDescriptor>,
}
impl ProviderDescriptor {
	/// Starts building a descriptor for `id`.
	pub fn builder(id: impl AsRef<str>, api_base_url: Url) -> Result<ProviderDescriptorBuilder, ProviderDescriptorError> {
		validate_provider_slug(id.as_ref()).map_err(ProviderDescriptorError::Id)?;

		Ok(ProviderDescriptorBuilder {
			id: ProviderId::new(id.as_ref()).map_err(ProviderDescriptorError::Id)?,
			display_name: None,
			supported_auth_kinds: Vec::new(),
			supported_scope_kinds: Vec::new(),
			authorize_url: None,
			token_url: None,
			api_base_url,
			capabilities: Vec::new(),
		})
	}

	/// Returns the capability descriptor named `name`, if declared.
	pub fn capability(&self, name: &str) -> Option<&CapabilityDescriptor> {
		self.capabilities.iter().find(|c| c.name == name)
	}
}

/// Builder for [`ProviderDescriptor`], validating endpoint URLs and ensuring at least one auth
/// kind is declared.
pub struct ProviderDescriptorBuilder {
	id: ProviderId,
	display_name: Option<String>,
	supported_auth_kinds: Vec<AuthKind>,
	supported_scope_kinds: Vec<String>,
	authorize_url: Option<Url>,
	token_url: Option<Url>,
	api_base_url: Url,
	capabilities: Vec<CapabilityDescriptor>,
}
impl ProviderDescriptorBuilder {
	/// Sets the display name.
	pub fn display_name(mut self, name: impl Into<String>) -> Self {
		self.display_name = Some(name.into());

		self
	}

	/// Adds a supported auth kind.
	pub fn auth_kind(mut self, kind: AuthKind) -> Self {
		self.supported_auth_kinds.push(kind);

		self
	}

	/// Adds a supported scope kind.
	pub fn scope_kind(mut self, kind: impl Into<String>) -> Self {
		self.supported_scope_kinds.push(kind.into());

		self
	}

	/// Sets the authorization endpoint.
	pub fn authorize_url(mut self, url: Url) -> Self {
		self.authorize_url = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_url(mut self, url: Url) -> Self {
		self.token_url = Some(url);

		self
	}

	/// Adds a capability.
	pub fn capability(mut self, capability: CapabilityDescriptor) -> Self {
		self.capabilities.push(capability);

		self
	}

	/// Finalizes the descriptor, validating that at least one auth kind was declared.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		if self.supported_auth_kinds.is_empty() {
			return Err(ProviderDescriptorError::NoAuthKinds);
		}

		Ok(ProviderDescriptor {
			id: self.id,
			display_name: self.display_name.unwrap_or_else(|| "Unnamed provider".to_owned()),
			supported_auth_kinds: self.supported_auth_kinds,
			supported_scope_kinds: self.supported_scope_kinds,
			endpoints: ProviderEndpoints {
				authorize_url: self.authorize_url,
				token_url: self.token_url,
				api_base_url: self.api_base_url,
			},
			capabilities: self.capabilities,
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn build_requires_auth_kind() {
		let err = ProviderDescriptor::builder("shopify", "https://api.shopify.com".parse().unwrap())
			.expect("Builder construction should succeed.")
			.build()
			.expect_err("Build should fail without an auth kind.");

		assert!(matches!(err, ProviderDescriptorError::NoAuthKinds));
	}

	#[test]
	fn build_succeeds_with_auth_kind_and_capability() {
		let descriptor = ProviderDescriptor::builder("shopify", "https://api.shopify.com".parse().unwrap())
			.expect("Builder construction should succeed.")
			.auth_kind(AuthKind::OAuth2AuthCode)
			.capability(CapabilityDescriptor::new("orders.read", ["read_orders"]))
			.build()
			.expect("Build should succeed.");

		assert!(descriptor.capability("orders.read").is_some());
	}
}
