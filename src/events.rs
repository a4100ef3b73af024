//! Event vocabulary between engine workers and the owner loop.
//!
//! Workers publish [`EngineEvent`]s through an `mpsc` channel — the single
//! hand-off point between provider threads and the thread that owns the
//! result list. The `id` correlates every event with the request that
//! produced it so the session can drop events from superseded requests.

use std::collections::HashMap;

use medley_provider_api::ProviderId;

use crate::entry::ResultEntry;

/// Per-provider flag: `true` when more results exist past the limit the
/// provider was capped at.
pub type ExhaustionMap = HashMap<ProviderId, bool>;

/// Message published by an engine worker.
#[derive(Debug)]
pub struct EngineEvent {
    /// Identifier correlating the message with the originating request.
    pub id: u64,
    pub kind: EngineEventKind,
}

#[derive(Debug)]
pub enum EngineEventKind {
    /// Freshly discovered entries, in emission order.
    Added(Vec<ResultEntry>),
    /// Previously reported entries that went stale.
    Removed(Vec<ResultEntry>),
    /// Terminal event: every provider either completed or was cancelled.
    Finished(ExhaustionMap),
}

/// Sink for aggregated search notifications.
///
/// The session implements this over the result list and the consumer view;
/// the coalescer sits in front of it to bound delivery rate.
pub trait SearchListener {
    /// Entries discovered since the last notification, in arrival order.
    fn elements_added(&mut self, entries: Vec<ResultEntry>);

    /// Entries that should no longer be shown.
    fn elements_removed(&mut self, entries: Vec<ResultEntry>);

    /// The search completed; the map says which providers have more
    /// results past their limit. Always observed after all content
    /// notifications of the same request.
    fn search_finished(&mut self, has_more: ExhaustionMap);
}
