use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;

use medley_provider_api::{CancellationToken, SearchQuery};
use tracing::debug;

use crate::events::{EngineEvent, EngineEventKind, ExhaustionMap};

use super::{
    MoreRequest, ProviderJob, STREAM_BATCH_SIZE, SearchEngine, SearchHandle, SearchRequest,
    run_provider, spawn_find_more,
};

const FALLBACK_WORKERS: usize = 4;

/// Runs all providers concurrently over a bounded worker pool.
///
/// Workers pull provider jobs from a shared queue and stream batches as
/// results arrive, so the first results show up without waiting for slow
/// providers. Arrival order across providers is not guaranteed — only
/// within-provider order is — and every batch funnels through the single
/// event channel, keeping the owner loop the sole writer of the list. The
/// last worker to finish a job publishes the terminal event with the
/// collected exhaustion map.
pub struct ParallelEngine {
    events: Sender<EngineEvent>,
    workers: usize,
}

impl ParallelEngine {
    #[must_use]
    pub fn new(events: Sender<EngineEvent>) -> Self {
        let workers = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(FALLBACK_WORKERS);
        Self { events, workers }
    }

    /// Override the worker pool size.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

impl SearchEngine for ParallelEngine {
    fn search(&self, request: SearchRequest) -> SearchHandle {
        let token = CancellationToken::new();
        let handle = SearchHandle::new(request.id, token.clone());
        let SearchRequest {
            id,
            pattern,
            include_out_of_scope,
            budgets,
            mut filters,
        } = request;

        let jobs: VecDeque<ProviderJob> = budgets
            .into_iter()
            .map(|budget| {
                let filter = filters.remove(budget.provider.id());
                ProviderJob {
                    provider: budget.provider,
                    limit: budget.limit,
                    filter,
                    already_found: Vec::new(),
                }
            })
            .collect();

        let job_count = jobs.len();
        if job_count == 0 {
            let _ = self.events.send(EngineEvent {
                id,
                kind: EngineEventKind::Finished(ExhaustionMap::new()),
            });
            return handle;
        }

        let query = Arc::new(SearchQuery::new(pattern, include_out_of_scope));
        let queue = Arc::new(Mutex::new(jobs));
        let remaining = Arc::new(AtomicUsize::new(job_count));
        let exhaustion = Arc::new(Mutex::new(ExhaustionMap::new()));
        let worker_count = self.workers.min(job_count);
        debug!(providers = job_count, workers = worker_count, "starting parallel search");

        for _ in 0..worker_count {
            let query = Arc::clone(&query);
            let queue = Arc::clone(&queue);
            let remaining = Arc::clone(&remaining);
            let exhaustion = Arc::clone(&exhaustion);
            let events = self.events.clone();
            let token = token.clone();

            thread::spawn(move || {
                loop {
                    let job = queue.lock().unwrap().pop_front();
                    let Some(job) = job else { break };

                    let run = run_provider(
                        &job,
                        &query,
                        &token,
                        id,
                        Some(STREAM_BATCH_SIZE),
                        &events,
                    );
                    exhaustion
                        .lock()
                        .unwrap()
                        .insert(job.provider.id(), run.has_more);

                    if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                        let has_more = std::mem::take(&mut *exhaustion.lock().unwrap());
                        let _ = events.send(EngineEvent {
                            id,
                            kind: EngineEventKind::Finished(has_more),
                        });
                    }
                }
            });
        }

        handle
    }

    fn find_more(&self, request: MoreRequest) -> SearchHandle {
        spawn_find_more(&self.events, request)
    }
}
