//! In-memory registry resolving providers and their capabilities by id.

// self
use crate::{_prelude::*, grant::CapabilityDescriptor, ids::ProviderId, provider::plugin::Provider};

/// Looks up registered [`Provider`] plugins by id.
#[derive(Default)]
pub struct ProviderRegistry {
	providers: RwLock<HashMap<ProviderId, Arc<dyn Provider>>>,
}
impl ProviderRegistry {
	/// Registers a provider, replacing any existing registration with the same id.
	pub fn register(&self, provider: Arc<dyn Provider>) {
		self.providers.write().insert(provider.descriptor().id.clone(), provider);
	}

	/// Looks up a provider by id.
	pub fn get(&self, id: &ProviderId) -> Option<Arc<dyn Provider>> {
		self.providers.read().get(id).cloned()
	}

	/// Lists the capabilities declared by `id`'s descriptor.
	pub fn capabilities(&self, id: &ProviderId) -> Vec<CapabilityDescriptor> {
		self.get(id).map(|p| p.descriptor().capabilities.clone()).unwrap_or_default()
	}
}
