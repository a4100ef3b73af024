//! Provider contract for the `medley` search aggregator.
//!
//! A provider is an external source of search results: it advertises a
//! static [`ProviderDescriptor`] (identity, merge priority, capability
//! flags) and implements [`SearchProvider::fetch`], streaming matching
//! [`Item`]s through an `emit` callback until it is exhausted or the
//! callback asks it to stop. Providers are registered as trait objects in a
//! [`ProviderRegistry`]; the aggregator never inspects them beyond this
//! contract.

pub mod cancellation;
pub mod descriptor;
pub mod error;
pub mod item;
pub mod provider;
pub mod query;
pub mod registry;

pub use cancellation::CancellationToken;
pub use descriptor::{ProviderDescriptor, ProviderId};
pub use error::{ProviderError, RegistryError};
pub use item::Item;
pub use provider::SearchProvider;
pub use query::{ItemFilter, Matcher, SearchQuery};
pub use registry::ProviderRegistry;
