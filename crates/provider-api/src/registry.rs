use std::sync::Arc;

use indexmap::IndexMap;

use crate::descriptor::ProviderId;
use crate::error::RegistryError;
use crate::provider::SearchProvider;

/// Registry of all providers contributing to a search session.
///
/// Registration order is preserved; [`by_priority`](Self::by_priority)
/// yields a stable priority-sorted view, so equal-priority providers keep
/// their registration order.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: IndexMap<ProviderId, Arc<dyn SearchProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry without any providers registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its declared id.
    pub fn register<P>(&mut self, provider: P) -> Result<(), RegistryError>
    where
        P: SearchProvider + 'static,
    {
        self.register_arc(Arc::new(provider))
    }

    /// Register an already-shared provider instance.
    pub fn register_arc(&mut self, provider: Arc<dyn SearchProvider>) -> Result<(), RegistryError> {
        let id = provider.id();
        if self.providers.contains_key(id) {
            return Err(RegistryError::DuplicateId { id });
        }
        self.providers.insert(id, provider);
        Ok(())
    }

    /// Lookup a provider servicing the requested id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<dyn SearchProvider>> {
        self.providers.get(id)
    }

    /// Iterate over all registered providers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SearchProvider>> {
        self.providers.values()
    }

    /// All providers sorted by ascending priority, registration order
    /// breaking ties.
    #[must_use]
    pub fn by_priority(&self) -> Vec<Arc<dyn SearchProvider>> {
        let mut providers: Vec<_> = self.providers.values().cloned().collect();
        providers.sort_by_key(|provider| provider.priority());
        providers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;
    use crate::descriptor::ProviderDescriptor;
    use crate::error::ProviderError;
    use crate::item::Item;
    use crate::query::{ItemFilter, SearchQuery};

    struct StaticProvider(&'static ProviderDescriptor);

    impl SearchProvider for StaticProvider {
        fn descriptor(&self) -> &'static ProviderDescriptor {
            self.0
        }

        fn fetch(
            &self,
            _query: &SearchQuery,
            _filter: Option<&ItemFilter>,
            _token: &CancellationToken,
            _emit: &mut dyn FnMut(Item) -> bool,
        ) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    static FILES: ProviderDescriptor = ProviderDescriptor {
        id: "files",
        priority: 10,
        supports_multi_select: true,
        available_while_indexing: false,
    };

    static SYMBOLS: ProviderDescriptor = ProviderDescriptor {
        id: "symbols",
        priority: 5,
        supports_multi_select: false,
        available_while_indexing: false,
    };

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut registry = ProviderRegistry::new();
        registry.register(StaticProvider(&FILES)).unwrap();

        let err = registry.register(StaticProvider(&FILES)).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateId { id: "files" });
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn by_priority_sorts_ascending() {
        let mut registry = ProviderRegistry::new();
        registry.register(StaticProvider(&FILES)).unwrap();
        registry.register(StaticProvider(&SYMBOLS)).unwrap();

        let ordered: Vec<_> = registry
            .by_priority()
            .iter()
            .map(|provider| provider.id())
            .collect();
        assert_eq!(ordered, vec!["symbols", "files"]);
    }
}
