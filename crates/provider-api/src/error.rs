use thiserror::Error;

use crate::descriptor::ProviderId;

/// Failure raised inside a provider's `fetch`.
///
/// The engine recovers from these locally: the failing provider is treated
/// as exhausted with whatever it already emitted, and sibling providers are
/// unaffected.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider's backing source could not be reached or queried.
    #[error("provider backend unavailable: {0}")]
    Unavailable(String),

    /// Any other provider-specific failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors that can occur when mutating a [`ProviderRegistry`](crate::ProviderRegistry).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A provider attempted to register an identifier that already exists.
    #[error("provider id '{id}' is already registered")]
    DuplicateId { id: ProviderId },
}
