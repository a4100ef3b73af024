//! One logical user query from keystroke to delivered results.
//!
//! The session owns the debounce of rapid input changes, the cancellation
//! of superseded engine invocations, the result list, and the coalescer
//! wiring. It is pumped from a single owner loop: workers publish engine
//! events into a channel, and [`SearchSession::pump`] drains that channel,
//! applies surviving events to the list, and relays the fired range events
//! to the consumer's [`ResultsView`]. Events whose request id no longer
//! matches an active lane are dropped, so a cancelled search can never
//! mutate the list late.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Instant;

use medley_provider_api::{ItemFilter, ProviderId, ProviderRegistry, SearchProvider};
use tracing::{debug, error};

use crate::coalesce::EventCoalescer;
use crate::config::SearchConfig;
use crate::entry::ResultEntry;
use crate::events::{EngineEvent, EngineEventKind, ExhaustionMap, SearchListener};
use crate::list::{ListError, ListEvent, ResultList};
use crate::search::{
    FilterMap, MoreRequest, ParallelEngine, ProviderBudget, SearchEngine, SearchHandle,
    SearchRequest, SerialEngine,
};

/// Which providers a search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Merge all registered providers.
    All,
    /// Only the named provider, with its higher result limit.
    Single(ProviderId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Debouncing,
    Running,
    Finished,
    Cancelled,
}

/// Why a scheduled search was skipped without starting the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The backing index is rebuilding and no active provider tolerates
    /// that.
    IndexRebuilding,
}

/// Consumer-side sink for list mutations and search lifecycle.
///
/// Implemented by the presentation layer and handed to
/// [`SearchSession::pump`]; all calls happen on the owner loop.
pub trait ResultsView {
    /// `len` entries were inserted at `start` for `provider`.
    fn items_added(&mut self, start: usize, len: usize, provider: ProviderId);

    /// `len` entries were removed at `start`. `provider` is `None` when
    /// the whole list was cleared.
    fn items_removed(&mut self, start: usize, len: usize, provider: Option<ProviderId>);

    /// A search (or a "load more" round) completed; the map says which
    /// providers still have results past their limit.
    fn search_finished(&mut self, has_more: &ExhaustionMap);

    /// A scheduled search was skipped; show an explanatory empty state.
    fn search_skipped(&mut self, reason: SkipReason) {
        let _ = reason;
    }
}

/// Orchestrates debouncing, engine invocations, and list updates for one
/// consumer.
pub struct SearchSession {
    registry: ProviderRegistry,
    config: SearchConfig,
    engine: Box<dyn SearchEngine>,
    events: Receiver<EngineEvent>,
    list: ResultList,
    coalescer: EventCoalescer,
    pattern: String,
    include_out_of_scope: bool,
    scope: SearchScope,
    filters: FilterMap,
    index_rebuilding: bool,
    state: SessionState,
    debounce_deadline: Option<Instant>,
    next_request_id: u64,
    active: Option<SearchHandle>,
    more: Option<SearchHandle>,
}

impl SearchSession {
    /// Create a session with the strategy selected by `config`
    /// (`serial_search` picks the serial engine, otherwise the parallel
    /// one).
    #[must_use]
    pub fn new(registry: ProviderRegistry, config: SearchConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        let engine: Box<dyn SearchEngine> = if config.serial_search {
            Box::new(SerialEngine::new(tx))
        } else {
            let mut engine = ParallelEngine::new(tx);
            if let Some(workers) = config.parallel_workers {
                engine = engine.with_workers(workers);
            }
            Box::new(engine)
        };
        Self::with_engine(registry, config, engine, rx)
    }

    /// Create a session over a caller-supplied engine and its event
    /// channel.
    #[must_use]
    pub fn with_engine(
        registry: ProviderRegistry,
        config: SearchConfig,
        engine: Box<dyn SearchEngine>,
        events: Receiver<EngineEvent>,
    ) -> Self {
        let coalescer = EventCoalescer::new(config.coalesce_window());
        Self {
            registry,
            config,
            engine,
            events,
            list: ResultList::new(),
            coalescer,
            pattern: String::new(),
            include_out_of_scope: false,
            scope: SearchScope::All,
            filters: FilterMap::new(),
            index_rebuilding: false,
            state: SessionState::Idle,
            debounce_deadline: None,
            next_request_id: 0,
            active: None,
            more: None,
        }
    }

    // -- consumer entry points ------------------------------------------

    /// Submit a new pattern. Cancels running work and restarts the
    /// debounce timer.
    pub fn set_pattern(&mut self, pattern: impl Into<String>, now: Instant) {
        self.pattern = pattern.into();
        self.schedule_rebuild(now);
    }

    /// Toggle searching beyond the default scope.
    pub fn set_include_out_of_scope(&mut self, include: bool, now: Instant) {
        if self.include_out_of_scope != include {
            self.include_out_of_scope = include;
            self.schedule_rebuild(now);
        }
    }

    /// Switch between the merged view and a single provider.
    pub fn set_scope(&mut self, scope: SearchScope, now: Instant) {
        if self.scope != scope {
            self.scope = scope;
            self.schedule_rebuild(now);
        }
    }

    /// Install or clear a per-provider result filter.
    pub fn set_filter(&mut self, provider: ProviderId, filter: Option<ItemFilter>, now: Instant) {
        match filter {
            Some(filter) => {
                self.filters.insert(provider, filter);
            }
            None => {
                self.filters.remove(provider);
            }
        }
        self.schedule_rebuild(now);
    }

    /// Report whether the backing index is being rebuilt. Clearing the
    /// flag re-runs the current query, so a search typed during indexing
    /// is not lost.
    pub fn set_index_rebuilding(&mut self, rebuilding: bool, now: Instant) {
        if self.index_rebuilding == rebuilding {
            return;
        }
        self.index_rebuilding = rebuilding;
        if !rebuilding {
            self.schedule_rebuild(now);
        }
    }

    /// Fetch the next page for one provider. Runs on its own lane and
    /// leaves the main search state untouched.
    pub fn show_more(&mut self, provider: ProviderId) {
        let Some(provider_arc) = self.registry.get(provider).cloned() else {
            return;
        };
        if let Some(handle) = self.more.take() {
            handle.cancel();
        }
        let already_found = self.list.found_items(provider);
        let new_limit = already_found.len() + self.config.page_size_for(&self.scope);
        let id = self.next_id();
        debug!(provider, new_limit, "requesting more results");
        self.more = Some(self.engine.find_more(MoreRequest {
            id,
            pattern: self.pattern.clone(),
            include_out_of_scope: self.include_out_of_scope,
            provider: provider_arc,
            new_limit,
            already_found,
            filter: self.filters.get(provider).cloned(),
        }));
    }

    /// Cancel the debounce timer and any running engine invocations.
    /// Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.debounce_deadline = None;
        if let Some(handle) = self.active.take() {
            handle.cancel();
        }
        if let Some(handle) = self.more.take() {
            handle.cancel();
        }
        self.coalescer.reset();
        if self.state != SessionState::Idle {
            self.state = SessionState::Cancelled;
        }
    }

    // -- owner loop ------------------------------------------------------

    /// Drain engine events, apply surviving ones to the list, flush due
    /// coalescer windows, and fire an expired debounce timer.
    ///
    /// Called from the owner loop; `now` drives every deadline. A list
    /// invariant violation aborts the active request (cancel, clear, log)
    /// and is returned for central handling.
    pub fn pump(
        &mut self,
        now: Instant,
        view: &mut dyn ResultsView,
    ) -> Result<(), ListError> {
        let mut apply = ApplyToList {
            list: &mut self.list,
            view: &mut *view,
            failure: None,
        };
        let mut active_id = self.active.as_ref().map(SearchHandle::id);
        let mut more_id = self.more.as_ref().map(SearchHandle::id);

        while apply.failure.is_none() {
            match self.events.try_recv() {
                Ok(event) => {
                    let is_main = Some(event.id) == active_id;
                    let is_more = Some(event.id) == more_id;
                    if !is_main && !is_more {
                        // superseded request, drop late events
                        continue;
                    }
                    match event.kind {
                        EngineEventKind::Added(entries) => {
                            self.coalescer.push_added(now, entries, &mut apply);
                        }
                        EngineEventKind::Removed(entries) => {
                            self.coalescer.push_removed(now, entries, &mut apply);
                        }
                        EngineEventKind::Finished(has_more) => {
                            self.coalescer.finish(has_more, &mut apply);
                            if is_main {
                                self.active = None;
                                active_id = None;
                                self.state = SessionState::Finished;
                            } else {
                                self.more = None;
                                more_id = None;
                            }
                        }
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        if apply.failure.is_none() {
            self.coalescer.pump(now, &mut apply);
        }

        let failure = apply.failure.take();
        drop(apply);
        if let Some(err) = failure {
            error!(%err, "result list invariant violated, aborting request");
            self.abort(view);
            return Err(err);
        }

        if let Some(deadline) = self.debounce_deadline
            && now >= deadline
        {
            self.debounce_deadline = None;
            self.start_search(view);
        }
        Ok(())
    }

    // -- queries ---------------------------------------------------------

    #[must_use]
    pub fn list(&self) -> &ResultList {
        &self.list
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn scope(&self) -> SearchScope {
        self.scope
    }

    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    // -- internals -------------------------------------------------------

    fn schedule_rebuild(&mut self, now: Instant) {
        if let Some(handle) = self.active.take() {
            handle.cancel();
        }
        if let Some(handle) = self.more.take() {
            handle.cancel();
        }
        self.debounce_deadline = Some(now + self.config.debounce());
        self.state = SessionState::Debouncing;
    }

    fn start_search(&mut self, view: &mut dyn ResultsView) {
        if let Some(handle) = self.active.take() {
            handle.cancel();
        }
        if let Some(handle) = self.more.take() {
            handle.cancel();
        }
        self.coalescer.reset();
        if let Some(event) = self.list.clear() {
            forward(view, event);
        }

        let providers = self.active_providers();
        if self.index_rebuilding
            && !providers
                .iter()
                .any(|provider| provider.descriptor().available_while_indexing)
        {
            debug!("index rebuilding and no active provider tolerates it, skipping search");
            self.state = SessionState::Idle;
            view.search_skipped(SkipReason::IndexRebuilding);
            return;
        }

        let limit = self.config.limit_for(&self.scope);
        let budgets = providers
            .into_iter()
            .map(|provider| ProviderBudget { provider, limit })
            .collect();
        let id = self.next_id();
        debug!(id, pattern = %self.pattern, "starting search");
        self.active = Some(self.engine.search(SearchRequest {
            id,
            pattern: self.pattern.clone(),
            include_out_of_scope: self.include_out_of_scope,
            budgets,
            filters: self.filters.clone(),
        }));
        self.state = SessionState::Running;
    }

    fn abort(&mut self, view: &mut dyn ResultsView) {
        if let Some(handle) = self.active.take() {
            handle.cancel();
        }
        if let Some(handle) = self.more.take() {
            handle.cancel();
        }
        self.coalescer.reset();
        if let Some(event) = self.list.clear() {
            forward(view, event);
        }
        self.state = SessionState::Idle;
    }

    fn active_providers(&self) -> Vec<Arc<dyn SearchProvider>> {
        match self.scope {
            SearchScope::All => self.registry.by_priority(),
            SearchScope::Single(id) => self.registry.get(id).cloned().into_iter().collect(),
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_request_id = self.next_request_id.saturating_add(1);
        self.next_request_id
    }
}

fn forward(view: &mut dyn ResultsView, event: ListEvent) {
    match event {
        ListEvent::Added {
            start,
            len,
            provider,
        } => view.items_added(start, len, provider),
        ListEvent::Removed {
            start,
            len,
            provider,
        } => view.items_removed(start, len, provider),
    }
}

/// Downstream sink of the coalescer: applies surviving notifications to
/// the list and relays the fired range events to the consumer.
struct ApplyToList<'a> {
    list: &'a mut ResultList,
    view: &'a mut dyn ResultsView,
    failure: Option<ListError>,
}

impl ApplyToList<'_> {
    fn insert_batch(&mut self, batch: Vec<ResultEntry>) {
        if batch.is_empty() || self.failure.is_some() {
            return;
        }
        match self.list.insert(batch) {
            Ok(Some(event)) => forward(self.view, event),
            Ok(None) => {}
            Err(err) => self.failure = Some(err),
        }
    }
}

impl SearchListener for ApplyToList<'_> {
    fn elements_added(&mut self, entries: Vec<ResultEntry>) {
        if self.failure.is_some() {
            return;
        }
        // split into consecutive same-provider batches so interleaved
        // flushes keep each provider's arrival order
        let mut batch: Vec<ResultEntry> = Vec::new();
        for entry in entries {
            if batch
                .last()
                .is_some_and(|prev| prev.provider_id() != entry.provider_id())
            {
                let ready = std::mem::take(&mut batch);
                self.insert_batch(ready);
            }
            batch.push(entry);
        }
        self.insert_batch(batch);
    }

    fn elements_removed(&mut self, entries: Vec<ResultEntry>) {
        for entry in entries {
            if self.failure.is_some() {
                return;
            }
            let Some(item) = entry.item() else { continue };
            match self.list.remove(item, entry.provider_id()) {
                Ok(Some(event)) => forward(self.view, event),
                Ok(None) => {}
                Err(err) => self.failure = Some(err),
            }
        }
    }

    fn search_finished(&mut self, has_more: ExhaustionMap) {
        for (&provider, &more) in &has_more {
            if self.failure.is_some() {
                return;
            }
            match self.list.set_has_more(provider, more) {
                Ok(Some(event)) => forward(self.view, event),
                Ok(None) => {}
                Err(err) => self.failure = Some(err),
            }
        }
        self.view.search_finished(&has_more);
    }
}
