/// Identifier of a registered provider.
pub type ProviderId = &'static str;

/// Static descriptor advertising provider metadata.
///
/// Providers with a lower `priority` merge earlier in the aggregated list;
/// providers sharing a priority keep their registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderDescriptor {
    /// Unique identifier for this provider.
    pub id: ProviderId,
    /// Merge weight. Lower values group earlier in the result list.
    pub priority: i32,
    /// Whether the consumer may select several of this provider's results
    /// at once.
    pub supports_multi_select: bool,
    /// Whether this provider can answer queries while its backing index is
    /// still being rebuilt.
    pub available_while_indexing: bool,
}
