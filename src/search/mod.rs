//! Search engines: fan a query out to providers and stream results back.
//!
//! Two interchangeable strategies implement [`SearchEngine`]: a serial one
//! running providers in priority order on a single worker, and a parallel
//! one spreading them over a bounded pool. Both publish through one
//! `mpsc::Sender<EngineEvent>` so the owner loop stays the single writer
//! of the result list, and both cancel cooperatively through the token in
//! the returned [`SearchHandle`].

mod parallel;
mod serial;

pub use parallel::ParallelEngine;
pub use serial::SerialEngine;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use medley_provider_api::{
    CancellationToken, Item, ItemFilter, ProviderId, SearchProvider, SearchQuery,
};
use tracing::warn;

use crate::entry::ResultEntry;
use crate::events::{EngineEvent, EngineEventKind, ExhaustionMap};

/// Number of fresh entries a streaming worker buffers before publishing a
/// batch.
pub(crate) const STREAM_BATCH_SIZE: usize = 128;

/// One provider together with its per-request result cap.
pub struct ProviderBudget {
    pub provider: Arc<dyn SearchProvider>,
    pub limit: usize,
}

/// Per-provider filter predicates forwarded to `fetch`.
pub type FilterMap = HashMap<ProviderId, ItemFilter>;

/// Immutable description of one fan-out search.
pub struct SearchRequest {
    /// Correlation id stamped on every event this request produces.
    pub id: u64,
    pub pattern: String,
    pub include_out_of_scope: bool,
    pub budgets: Vec<ProviderBudget>,
    pub filters: FilterMap,
}

/// Pagination request for a single provider.
pub struct MoreRequest {
    pub id: u64,
    pub pattern: String,
    pub include_out_of_scope: bool,
    pub provider: Arc<dyn SearchProvider>,
    /// New total cap: previously found items plus one page.
    pub new_limit: usize,
    /// Items already shown for this provider. They are skipped on re-fetch
    /// but still count toward the new limit.
    pub already_found: Vec<Item>,
    pub filter: Option<ItemFilter>,
}

/// Cancellation handle over one engine invocation.
#[derive(Clone, Debug)]
pub struct SearchHandle {
    id: u64,
    token: CancellationToken,
}

impl SearchHandle {
    pub(crate) fn new(id: u64, token: CancellationToken) -> Self {
        Self { id, token }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request cooperative cancellation of the invocation.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Strategy contract shared by the serial and parallel engines.
pub trait SearchEngine: Send {
    /// Fan `request` out to its providers. Returns immediately; results
    /// arrive as [`EngineEvent`]s on the engine's channel.
    fn search(&self, request: SearchRequest) -> SearchHandle;

    /// Raise one provider's limit and fetch the next page.
    fn find_more(&self, request: MoreRequest) -> SearchHandle;
}

/// One provider's unit of work.
pub(crate) struct ProviderJob {
    pub provider: Arc<dyn SearchProvider>,
    pub limit: usize,
    pub filter: Option<ItemFilter>,
    pub already_found: Vec<Item>,
}

/// What one provider run observed.
pub(crate) struct ProviderRun {
    /// The limit was reached with the provider not yet exhausted.
    pub has_more: bool,
    /// Indices into `already_found` the provider emitted again.
    pub re_emitted: HashSet<usize>,
}

/// Drive a single provider's fetch to completion, cap, or cancellation.
///
/// Accepted emissions are counted against the job limit; items already
/// found in a previous round are skipped but still counted, so a stable
/// provider re-fetching under a raised limit yields exactly the next page.
/// Provider failures are swallowed here: logged, partial results kept,
/// sibling providers unaffected.
pub(crate) fn run_provider(
    job: &ProviderJob,
    query: &SearchQuery,
    token: &CancellationToken,
    id: u64,
    flush_every: Option<usize>,
    events: &Sender<EngineEvent>,
) -> ProviderRun {
    let seen: HashMap<&Item, usize> = job
        .already_found
        .iter()
        .enumerate()
        .map(|(index, item)| (item, index))
        .collect();
    let mut re_emitted: HashSet<usize> = HashSet::new();
    let mut fresh: Vec<ResultEntry> = Vec::new();
    let mut accepted = 0usize;
    let mut truncated = false;
    let mut hung_up = false;

    let result = job
        .provider
        .fetch(query, job.filter.as_ref(), token, &mut |item| {
            if token.is_cancelled() {
                return false;
            }
            match seen.get(&item) {
                Some(&index) => {
                    re_emitted.insert(index);
                }
                None => fresh.push(ResultEntry::new(item, Arc::clone(&job.provider))),
            }
            accepted += 1;
            if accepted >= job.limit {
                truncated = true;
                return false;
            }
            if let Some(batch) = flush_every
                && fresh.len() >= batch
            {
                let entries = std::mem::take(&mut fresh);
                if events
                    .send(EngineEvent {
                        id,
                        kind: EngineEventKind::Added(entries),
                    })
                    .is_err()
                {
                    hung_up = true;
                    return false;
                }
            }
            true
        });

    if token.is_cancelled() || hung_up {
        return ProviderRun {
            has_more: false,
            re_emitted,
        };
    }
    if !fresh.is_empty() {
        let _ = events.send(EngineEvent {
            id,
            kind: EngineEventKind::Added(fresh),
        });
    }
    let has_more = match result {
        Ok(()) => truncated,
        Err(error) => {
            warn!(
                provider = job.provider.id(),
                %error,
                "provider failed, keeping partial results"
            );
            false
        }
    };
    ProviderRun {
        has_more,
        re_emitted,
    }
}

/// Shared pagination path: one worker for the single requested provider.
pub(crate) fn spawn_find_more(events: &Sender<EngineEvent>, request: MoreRequest) -> SearchHandle {
    let token = CancellationToken::new();
    let handle = SearchHandle::new(request.id, token.clone());
    let events = events.clone();
    thread::spawn(move || {
        let query = SearchQuery::new(request.pattern, request.include_out_of_scope);
        let job = ProviderJob {
            provider: request.provider,
            limit: request.new_limit,
            filter: request.filter,
            already_found: request.already_found,
        };
        let run = run_provider(
            &job,
            &query,
            &token,
            request.id,
            Some(STREAM_BATCH_SIZE),
            &events,
        );
        if token.is_cancelled() {
            return;
        }
        // an exhausted re-fetch is authoritative: anything shown before
        // that the provider no longer emits has gone stale
        if !run.has_more {
            let stale: Vec<ResultEntry> = job
                .already_found
                .iter()
                .enumerate()
                .filter(|(index, _)| !run.re_emitted.contains(index))
                .map(|(_, item)| ResultEntry::new(item.clone(), Arc::clone(&job.provider)))
                .collect();
            if !stale.is_empty() {
                let _ = events.send(EngineEvent {
                    id: request.id,
                    kind: EngineEventKind::Removed(stale),
                });
            }
        }
        let mut has_more = ExhaustionMap::new();
        has_more.insert(job.provider.id(), run.has_more);
        let _ = events.send(EngineEvent {
            id: request.id,
            kind: EngineEventKind::Finished(has_more),
        });
    });
    handle
}

#[cfg(test)]
pub(crate) mod support {
    //! In-memory providers for engine and session tests.

    use super::*;
    use medley_provider_api::{ProviderDescriptor, ProviderError};

    /// Provider serving a fixed item set, optionally failing mid-stream.
    pub(crate) struct FixtureProvider {
        descriptor: &'static ProviderDescriptor,
        items: Vec<Item>,
        fail_after: Option<usize>,
    }

    impl FixtureProvider {
        pub(crate) fn new(descriptor: &'static ProviderDescriptor, texts: &[&str]) -> Self {
            let items = texts.iter().map(|text| Item::new(*text, *text)).collect();
            Self {
                descriptor,
                items,
                fail_after: None,
            }
        }

        pub(crate) fn failing_after(mut self, emitted: usize) -> Self {
            self.fail_after = Some(emitted);
            self
        }
    }

    impl SearchProvider for FixtureProvider {
        fn descriptor(&self) -> &'static ProviderDescriptor {
            self.descriptor
        }

        fn fetch(
            &self,
            query: &SearchQuery,
            filter: Option<&ItemFilter>,
            _token: &CancellationToken,
            emit: &mut dyn FnMut(Item) -> bool,
        ) -> Result<(), ProviderError> {
            let mut emitted = 0usize;
            for item in &self.items {
                if self.fail_after == Some(emitted) {
                    return Err(ProviderError::Unavailable("fixture backend gone".into()));
                }
                if !query.matcher().matches(&item.text) {
                    continue;
                }
                if let Some(filter) = filter
                    && !filter(item)
                {
                    continue;
                }
                emitted += 1;
                if !emit(item.clone()) {
                    break;
                }
            }
            Ok(())
        }
    }
}
