use std::fmt;
use std::sync::Arc;

use medley_provider_api::{Item, ProviderId, SearchProvider};

/// One row of the aggregated result list: an item bound to the provider
/// that produced it and that provider's merge priority.
///
/// The trailing "more results" marker of a truncated provider is also a
/// `ResultEntry`, carrying no item payload; it is created by the list
/// itself, never by an engine.
#[derive(Clone)]
pub struct ResultEntry {
    provider: Arc<dyn SearchProvider>,
    priority: i32,
    payload: Payload,
}

#[derive(Clone)]
enum Payload {
    Hit(Item),
    More,
}

impl ResultEntry {
    #[must_use]
    pub fn new(item: Item, provider: Arc<dyn SearchProvider>) -> Self {
        let priority = provider.priority();
        Self {
            provider,
            priority,
            payload: Payload::Hit(item),
        }
    }

    /// Synthetic trailing marker for a truncated provider run.
    pub(crate) fn more(provider: Arc<dyn SearchProvider>) -> Self {
        let priority = provider.priority();
        Self {
            provider,
            priority,
            payload: Payload::More,
        }
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<dyn SearchProvider> {
        &self.provider
    }

    #[must_use]
    pub fn provider_id(&self) -> ProviderId {
        self.provider.id()
    }

    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The carried item, `None` for the more-marker.
    #[must_use]
    pub fn item(&self) -> Option<&Item> {
        match &self.payload {
            Payload::Hit(item) => Some(item),
            Payload::More => None,
        }
    }

    #[must_use]
    pub fn is_more(&self) -> bool {
        matches!(self.payload, Payload::More)
    }
}

impl fmt::Debug for ResultEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("ResultEntry");
        debug
            .field("provider", &self.provider_id())
            .field("priority", &self.priority);
        match &self.payload {
            Payload::Hit(item) => debug.field("item", &item.id),
            Payload::More => debug.field("more", &true),
        };
        debug.finish()
    }
}
