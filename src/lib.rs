//! Incremental multi-provider search aggregation.
//!
//! A [`SearchSession`] takes a user-typed query, fans it out concurrently
//! to the providers registered in a
//! [`ProviderRegistry`](medley_provider_api::ProviderRegistry), and merges
//! their streaming results into one ordered, de-duplicated, paginated
//! [`ResultList`] delivered to a consumer through range events. Rapid
//! input edits are debounced, superseded searches are cancelled
//! cooperatively, and notification bursts are coalesced so the consumer
//! repaints at a bounded rate.
//!
//! The root module re-exports the types embedders need so they can wire a
//! session without digging through the module hierarchy; the provider
//! contract lives in the `medley-provider-api` crate, re-exported here as
//! [`provider_api`].

pub mod coalesce;
pub mod config;
pub mod entry;
pub mod events;
pub mod list;
pub mod search;
pub mod session;

pub use crate::coalesce::EventCoalescer;
pub use crate::config::SearchConfig;
pub use crate::entry::ResultEntry;
pub use crate::events::{EngineEvent, EngineEventKind, ExhaustionMap, SearchListener};
pub use crate::list::{ListError, ListEvent, ResultList};
pub use crate::search::{
    FilterMap, MoreRequest, ParallelEngine, ProviderBudget, SearchEngine, SearchHandle,
    SearchRequest, SerialEngine,
};
pub use crate::session::{ResultsView, SearchScope, SearchSession, SessionState, SkipReason};

pub use medley_provider_api as provider_api;
pub use medley_provider_api::{
    CancellationToken, Item, ItemFilter, Matcher, ProviderDescriptor, ProviderError, ProviderId,
    ProviderRegistry, SearchProvider, SearchQuery,
};
