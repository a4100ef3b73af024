use std::sync::mpsc::Sender;
use std::thread;

use medley_provider_api::{CancellationToken, SearchQuery};

use crate::events::{EngineEvent, EngineEventKind, ExhaustionMap};

use super::{
    MoreRequest, ProviderJob, SearchEngine, SearchHandle, SearchRequest, run_provider,
    spawn_find_more,
};

/// Runs providers one at a time, in ascending priority order, on a single
/// worker thread.
///
/// Event ordering is deterministic and each provider contributes one added
/// batch, at the cost of latency before low-priority providers report.
pub struct SerialEngine {
    events: Sender<EngineEvent>,
}

impl SerialEngine {
    #[must_use]
    pub fn new(events: Sender<EngineEvent>) -> Self {
        Self { events }
    }
}

impl SearchEngine for SerialEngine {
    fn search(&self, request: SearchRequest) -> SearchHandle {
        let token = CancellationToken::new();
        let handle = SearchHandle::new(request.id, token.clone());
        let events = self.events.clone();

        thread::spawn(move || {
            let SearchRequest {
                id,
                pattern,
                include_out_of_scope,
                mut budgets,
                mut filters,
            } = request;
            let query = SearchQuery::new(pattern, include_out_of_scope);
            budgets.sort_by_key(|budget| budget.provider.priority());

            let mut has_more = ExhaustionMap::new();
            for budget in budgets {
                if token.is_cancelled() {
                    break;
                }
                let job = ProviderJob {
                    filter: filters.remove(budget.provider.id()),
                    already_found: Vec::new(),
                    provider: budget.provider,
                    limit: budget.limit,
                };
                let run = run_provider(&job, &query, &token, id, None, &events);
                has_more.insert(job.provider.id(), run.has_more);
            }

            let _ = events.send(EngineEvent {
                id,
                kind: EngineEventKind::Finished(has_more),
            });
        });

        handle
    }

    fn find_more(&self, request: MoreRequest) -> SearchHandle {
        spawn_find_more(&self.events, request)
    }
}
