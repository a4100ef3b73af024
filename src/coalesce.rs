//! Time-windowed batching between engine events and the downstream sink.
//!
//! Bursty providers can emit far faster than a consumer wants to repaint.
//! The coalescer buffers added/removed notifications for a configurable
//! window and flushes them as one batch per kind, preserving arrival
//! order. The terminal finished notification is never buffered: pending
//! content flushes first, so the consumer always observes results before
//! being told the search is complete.
//!
//! There is no ambient timer. The owner loop drives the coalescer with
//! explicit [`pump`](EventCoalescer::pump) calls against `Instant`
//! deadlines, the same way it pumps every other background stream.

use std::mem;
use std::time::{Duration, Instant};

use crate::entry::ResultEntry;
use crate::events::{ExhaustionMap, SearchListener};

/// Coalesces bursts of add/remove notifications into fewer, larger batches.
#[derive(Debug)]
pub struct EventCoalescer {
    window: Duration,
    added: Vec<ResultEntry>,
    removed: Vec<ResultEntry>,
    deadline: Option<Instant>,
}

impl EventCoalescer {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            added: Vec::new(),
            removed: Vec::new(),
            deadline: None,
        }
    }

    /// Queue added entries. With a zero window they pass straight through.
    pub fn push_added(
        &mut self,
        now: Instant,
        entries: Vec<ResultEntry>,
        downstream: &mut dyn SearchListener,
    ) {
        if entries.is_empty() {
            return;
        }
        if self.window.is_zero() {
            downstream.elements_added(entries);
            return;
        }
        self.added.extend(entries);
        self.arm(now);
        self.pump(now, downstream);
    }

    /// Queue removed entries. With a zero window they pass straight through.
    pub fn push_removed(
        &mut self,
        now: Instant,
        entries: Vec<ResultEntry>,
        downstream: &mut dyn SearchListener,
    ) {
        if entries.is_empty() {
            return;
        }
        if self.window.is_zero() {
            downstream.elements_removed(entries);
            return;
        }
        self.removed.extend(entries);
        self.arm(now);
        self.pump(now, downstream);
    }

    /// Deliver the terminal notification, flushing any pending content
    /// first so the consumer never hears "finished" before the results.
    pub fn finish(&mut self, has_more: ExhaustionMap, downstream: &mut dyn SearchListener) {
        self.flush(downstream);
        downstream.search_finished(has_more);
    }

    /// Flush buffered batches whose window has expired.
    pub fn pump(&mut self, now: Instant, downstream: &mut dyn SearchListener) {
        if let Some(deadline) = self.deadline
            && now >= deadline
        {
            self.flush(downstream);
        }
    }

    /// Next instant at which [`pump`](Self::pump) would flush, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drop buffered notifications without delivering them. Used when the
    /// request they belong to has been superseded.
    pub fn reset(&mut self) {
        self.added.clear();
        self.removed.clear();
        self.deadline = None;
    }

    fn arm(&mut self, now: Instant) {
        if self.deadline.is_none() {
            self.deadline = Some(now + self.window);
        }
    }

    fn flush(&mut self, downstream: &mut dyn SearchListener) {
        self.deadline = None;
        // buffers are detached before the sink runs, so anything queued
        // during delivery lands in the next window
        let added = mem::take(&mut self.added);
        let removed = mem::take(&mut self.removed);
        if !added.is_empty() {
            downstream.elements_added(added);
        }
        if !removed.is_empty() {
            downstream.elements_removed(removed);
        }
    }
}
