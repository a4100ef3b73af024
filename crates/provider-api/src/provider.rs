use crate::cancellation::CancellationToken;
use crate::descriptor::{ProviderDescriptor, ProviderId};
use crate::error::ProviderError;
use crate::item::Item;
use crate::query::{ItemFilter, SearchQuery};

/// A pluggable source of search results.
///
/// Implementations stream matching items through `emit` in the order they
/// should be presented; that order is preserved end-to-end within the
/// provider's group. Applying the query's [`Matcher`](crate::Matcher) and
/// the optional filter is the provider's concern.
pub trait SearchProvider: Send + Sync {
    /// Static descriptor advertising provider metadata.
    fn descriptor(&self) -> &'static ProviderDescriptor;

    fn id(&self) -> ProviderId {
        self.descriptor().id
    }

    fn priority(&self) -> i32 {
        self.descriptor().priority
    }

    /// Execute a query and stream results.
    ///
    /// `emit` returns `false` when the caller wants no further results
    /// (cancellation, or its per-provider limit was reached); the provider
    /// should stop promptly. Returning `Ok` before `emit` said stop means
    /// the provider is exhausted for this query.
    fn fetch(
        &self,
        query: &SearchQuery,
        filter: Option<&ItemFilter>,
        token: &CancellationToken,
        emit: &mut dyn FnMut(Item) -> bool,
    ) -> Result<(), ProviderError>;
}
