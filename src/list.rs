//! Ordered, de-duplicated merge of per-provider result runs.
//!
//! Entries for one provider always form a contiguous run; runs are ordered
//! by ascending provider priority, and a truncated run carries a single
//! synthetic trailing "more" marker. Mutations return the one range event
//! they fired so the owner can relay it to the consumer.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

use medley_provider_api::{Item, ProviderId, SearchProvider};
use thiserror::Error;

use crate::entry::ResultEntry;

/// Single notification fired by a list mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    /// A contiguous range of entries was added for one provider.
    Added {
        start: usize,
        len: usize,
        provider: ProviderId,
    },
    /// A contiguous range of entries was removed. `provider` is `None` when
    /// the whole list was cleared.
    Removed {
        start: usize,
        len: usize,
        provider: Option<ProviderId>,
    },
}

/// Invariant violations detected during a list mutation.
///
/// These are programming defects, fatal to the active request: the caller
/// aborts and clears rather than continuing with a possibly-wrong merge.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListError {
    /// A provider's entries were found split across non-adjacent positions.
    #[error("result list lost contiguity for provider '{provider}'")]
    BrokenContiguity { provider: ProviderId },

    /// An insert batch contained entries from more than one provider.
    #[error("insert batch mixes providers '{expected}' and '{found}'")]
    MixedProviders {
        expected: ProviderId,
        found: ProviderId,
    },
}

/// Mutable, order-preserving container merging entries from multiple
/// providers into one sequence.
#[derive(Debug, Default)]
pub struct ResultList {
    rows: Vec<ResultEntry>,
}

impl ResultList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a batch of entries for one provider at its single contiguous
    /// insertion point.
    ///
    /// An existing run keeps growing at its end (before a trailing marker);
    /// a new run lands before the first group of strictly greater priority,
    /// after all existing groups of equal priority. Entries equal to an
    /// item already present in the run are dropped. Returns the fired
    /// range-added event, or `None` when nothing was inserted.
    pub fn insert(&mut self, entries: Vec<ResultEntry>) -> Result<Option<ListEvent>, ListError> {
        let Some(first) = entries.first() else {
            return Ok(None);
        };
        let provider = first.provider_id();
        let priority = first.priority();
        if let Some(mixed) = entries.iter().find(|entry| entry.provider_id() != provider) {
            return Err(ListError::MixedProviders {
                expected: provider,
                found: mixed.provider_id(),
            });
        }

        let run = self.run_bounds(provider)?;
        let mut seen: HashSet<Item> = match &run {
            Some(range) => self.rows[range.clone()]
                .iter()
                .filter_map(|row| row.item().cloned())
                .collect(),
            None => HashSet::new(),
        };

        let mut fresh = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(item) = entry.item() else {
                // markers are created by set_has_more, never inserted
                continue;
            };
            if seen.contains(item) {
                continue;
            }
            seen.insert(item.clone());
            fresh.push(entry);
        }
        if fresh.is_empty() {
            return Ok(None);
        }

        let start = match run {
            Some(range) => {
                if self.rows[range.end - 1].is_more() {
                    range.end - 1
                } else {
                    range.end
                }
            }
            None => self.insertion_point(priority),
        };
        let len = fresh.len();
        self.rows.splice(start..start, fresh);
        Ok(Some(ListEvent::Added {
            start,
            len,
            provider,
        }))
    }

    /// Remove the first entry in `provider`'s run whose payload equals
    /// `item`. No-op when the provider has no run or no entry matches.
    pub fn remove(
        &mut self,
        item: &Item,
        provider: ProviderId,
    ) -> Result<Option<ListEvent>, ListError> {
        let Some(range) = self.run_bounds(provider)? else {
            return Ok(None);
        };
        let Some(offset) = self.rows[range.clone()]
            .iter()
            .position(|row| row.item() == Some(item))
        else {
            return Ok(None);
        };
        let start = range.start + offset;
        self.rows.remove(start);
        Ok(Some(ListEvent::Removed {
            start,
            len: 1,
            provider: Some(provider),
        }))
    }

    /// Idempotent toggle of the trailing "more" marker on `provider`'s run.
    /// No-op (and no event) when the marker is already in the requested
    /// state or the provider has no run to attach it to.
    pub fn set_has_more(
        &mut self,
        provider: ProviderId,
        present: bool,
    ) -> Result<Option<ListEvent>, ListError> {
        let Some(range) = self.run_bounds(provider)? else {
            return Ok(None);
        };
        let last = range.end - 1;
        if self.rows[last].is_more() == present {
            return Ok(None);
        }
        if present {
            let marker = ResultEntry::more(Arc::clone(self.rows[last].provider()));
            let start = last + 1;
            self.rows.insert(start, marker);
            Ok(Some(ListEvent::Added {
                start,
                len: 1,
                provider,
            }))
        } else {
            self.rows.remove(last);
            Ok(Some(ListEvent::Removed {
                start: last,
                len: 1,
                provider: Some(provider),
            }))
        }
    }

    /// Remove all entries, reporting the previous full extent. No-op when
    /// already empty.
    pub fn clear(&mut self) -> Option<ListEvent> {
        if self.rows.is_empty() {
            return None;
        }
        let len = self.rows.len();
        self.rows.clear();
        Some(ListEvent::Removed {
            start: 0,
            len,
            provider: None,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&ResultEntry> {
        self.rows.get(index)
    }

    /// The item at `index`; `None` for a more-marker or out of bounds.
    #[must_use]
    pub fn item(&self, index: usize) -> Option<&Item> {
        self.rows.get(index).and_then(ResultEntry::item)
    }

    #[must_use]
    pub fn provider(&self, index: usize) -> Option<&Arc<dyn SearchProvider>> {
        self.rows.get(index).map(ResultEntry::provider)
    }

    #[must_use]
    pub fn is_more_index(&self, index: usize) -> bool {
        self.rows.get(index).is_some_and(ResultEntry::is_more)
    }

    /// Whether `index` starts its provider's group. Presentation layers use
    /// this adjacency predicate to draw group headers.
    #[must_use]
    pub fn is_group_first(&self, index: usize) -> bool {
        match index {
            0 => !self.rows.is_empty(),
            _ => self
                .rows
                .get(index)
                .zip(self.rows.get(index - 1))
                .is_some_and(|(row, prev)| row.provider_id() != prev.provider_id()),
        }
    }

    /// Items found so far for `provider`, excluding the more-marker.
    #[must_use]
    pub fn found_items(&self, provider: &str) -> Vec<Item> {
        self.rows
            .iter()
            .filter(|row| row.provider_id() == provider)
            .filter_map(|row| row.item().cloned())
            .collect()
    }

    /// Whether `provider` currently carries a more-marker.
    #[must_use]
    pub fn has_more(&self, provider: &str) -> bool {
        self.rows
            .iter()
            .any(|row| row.is_more() && row.provider_id() == provider)
    }

    /// Count of real (non-marker) items contributed by `provider`.
    #[must_use]
    pub fn item_count(&self, provider: &str) -> usize {
        self.rows
            .iter()
            .filter(|row| row.provider_id() == provider && !row.is_more())
            .count()
    }

    /// Bounds of `provider`'s run, verifying contiguity.
    fn run_bounds(&self, provider: ProviderId) -> Result<Option<Range<usize>>, ListError> {
        let Some(first) = self
            .rows
            .iter()
            .position(|row| row.provider_id() == provider)
        else {
            return Ok(None);
        };
        let last = self
            .rows
            .iter()
            .rposition(|row| row.provider_id() == provider)
            .unwrap_or(first);
        if self.rows[first..=last]
            .iter()
            .any(|row| row.provider_id() != provider)
        {
            return Err(ListError::BrokenContiguity { provider });
        }
        Ok(Some(first..last + 1))
    }

    /// Position for a provider seen for the first time: before the first
    /// group whose priority strictly exceeds `priority`, so equal-priority
    /// groups keep their existing order.
    fn insertion_point(&self, priority: i32) -> usize {
        self.rows
            .iter()
            .position(|row| row.priority() > priority)
            .unwrap_or(self.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medley_provider_api::{
        CancellationToken, ItemFilter, ProviderDescriptor, ProviderError, SearchQuery,
    };

    struct NullProvider(&'static ProviderDescriptor);

    impl SearchProvider for NullProvider {
        fn descriptor(&self) -> &'static ProviderDescriptor {
            self.0
        }

        fn fetch(
            &self,
            _query: &SearchQuery,
            _filter: Option<&ItemFilter>,
            _token: &CancellationToken,
            _emit: &mut dyn FnMut(Item) -> bool,
        ) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    static ALPHA: ProviderDescriptor = ProviderDescriptor {
        id: "alpha",
        priority: 10,
        supports_multi_select: false,
        available_while_indexing: true,
    };

    static BETA: ProviderDescriptor = ProviderDescriptor {
        id: "beta",
        priority: 5,
        supports_multi_select: false,
        available_while_indexing: true,
    };

    static GAMMA: ProviderDescriptor = ProviderDescriptor {
        id: "gamma",
        priority: 10,
        supports_multi_select: false,
        available_while_indexing: true,
    };

    fn provider(descriptor: &'static ProviderDescriptor) -> Arc<dyn SearchProvider> {
        Arc::new(NullProvider(descriptor))
    }

    fn entries(provider: &Arc<dyn SearchProvider>, texts: &[&str]) -> Vec<ResultEntry> {
        texts
            .iter()
            .map(|text| ResultEntry::new(Item::new(*text, *text), Arc::clone(provider)))
            .collect()
    }

    fn texts(list: &ResultList) -> Vec<String> {
        (0..list.len())
            .map(|index| match list.item(index) {
                Some(item) => item.text.clone(),
                None => "...".into(),
            })
            .collect()
    }

    #[test]
    fn lower_priority_groups_come_first() {
        let alpha = provider(&ALPHA);
        let beta = provider(&BETA);
        let mut list = ResultList::new();

        list.insert(entries(&alpha, &["a1"])).unwrap();
        list.insert(entries(&beta, &["b1"])).unwrap();
        list.insert(entries(&alpha, &["a2"])).unwrap();

        assert_eq!(texts(&list), ["b1", "a1", "a2"]);
        assert!(list.is_group_first(0));
        assert!(list.is_group_first(1));
        assert!(!list.is_group_first(2));
    }

    #[test]
    fn equal_priority_appends_after_existing_groups() {
        let alpha = provider(&ALPHA);
        let gamma = provider(&GAMMA);
        let mut list = ResultList::new();

        list.insert(entries(&alpha, &["a1"])).unwrap();
        list.insert(entries(&gamma, &["g1"])).unwrap();
        list.insert(entries(&alpha, &["a2"])).unwrap();

        assert_eq!(texts(&list), ["a1", "a2", "g1"]);
    }

    #[test]
    fn insert_reports_the_added_range() {
        let alpha = provider(&ALPHA);
        let beta = provider(&BETA);
        let mut list = ResultList::new();

        list.insert(entries(&alpha, &["a1", "a2"])).unwrap();
        let event = list.insert(entries(&beta, &["b1", "b2"])).unwrap();
        assert_eq!(
            event,
            Some(ListEvent::Added {
                start: 0,
                len: 2,
                provider: "beta",
            })
        );
    }

    #[test]
    fn empty_and_duplicate_inserts_are_silent() {
        let alpha = provider(&ALPHA);
        let mut list = ResultList::new();

        assert_eq!(list.insert(Vec::new()).unwrap(), None);

        list.insert(entries(&alpha, &["a1"])).unwrap();
        assert_eq!(list.insert(entries(&alpha, &["a1"])).unwrap(), None);
        assert_eq!(list.item_count("alpha"), 1);
    }

    #[test]
    fn mixed_provider_batches_are_rejected() {
        let alpha = provider(&ALPHA);
        let beta = provider(&BETA);
        let mut list = ResultList::new();

        let mut batch = entries(&alpha, &["a1"]);
        batch.extend(entries(&beta, &["b1"]));
        let err = list.insert(batch).unwrap_err();
        assert_eq!(
            err,
            ListError::MixedProviders {
                expected: "alpha",
                found: "beta",
            }
        );
        assert!(list.is_empty());
    }

    #[test]
    fn more_marker_is_idempotent_and_trails_the_run() {
        let alpha = provider(&ALPHA);
        let beta = provider(&BETA);
        let mut list = ResultList::new();

        list.insert(entries(&alpha, &["a1"])).unwrap();
        assert!(list.set_has_more("alpha", true).unwrap().is_some());
        assert!(list.set_has_more("alpha", true).unwrap().is_none());
        assert!(list.has_more("alpha"));
        assert!(list.is_more_index(1));
        assert_eq!(list.item_count("alpha"), 1);

        // growth lands before the marker
        list.insert(entries(&alpha, &["a2"])).unwrap();
        assert_eq!(texts(&list), ["a1", "a2", "..."]);

        // a later group still follows the marker
        list.insert(entries(&beta, &["b1"])).unwrap();
        assert_eq!(texts(&list), ["b1", "a1", "a2", "..."]);

        assert!(list.set_has_more("alpha", false).unwrap().is_some());
        assert!(list.set_has_more("alpha", false).unwrap().is_none());
        assert!(!list.has_more("alpha"));
    }

    #[test]
    fn marker_without_a_run_is_a_no_op() {
        let mut list = ResultList::new();
        assert_eq!(list.set_has_more("alpha", true).unwrap(), None);
    }

    #[test]
    fn remove_matches_by_equality_within_the_run() {
        let alpha = provider(&ALPHA);
        let beta = provider(&BETA);
        let mut list = ResultList::new();

        list.insert(entries(&beta, &["b1"])).unwrap();
        list.insert(entries(&alpha, &["a1", "a2"])).unwrap();

        let event = list.remove(&Item::new("a2", "a2"), "alpha").unwrap();
        assert_eq!(
            event,
            Some(ListEvent::Removed {
                start: 2,
                len: 1,
                provider: Some("alpha"),
            })
        );
        assert_eq!(texts(&list), ["b1", "a1"]);

        // absent item and absent provider are no-ops
        assert_eq!(list.remove(&Item::new("a2", "a2"), "alpha").unwrap(), None);
        assert_eq!(list.remove(&Item::new("x", "x"), "gamma").unwrap(), None);
    }

    #[test]
    fn clear_reports_the_full_extent_once() {
        let alpha = provider(&ALPHA);
        let mut list = ResultList::new();

        list.insert(entries(&alpha, &["a1", "a2"])).unwrap();
        assert_eq!(
            list.clear(),
            Some(ListEvent::Removed {
                start: 0,
                len: 2,
                provider: None,
            })
        );
        assert_eq!(list.clear(), None);
    }

    #[test]
    fn runs_stay_contiguous_under_interleaved_inserts() {
        let alpha = provider(&ALPHA);
        let beta = provider(&BETA);
        let gamma = provider(&GAMMA);
        let mut list = ResultList::new();

        list.insert(entries(&gamma, &["g1"])).unwrap();
        list.insert(entries(&alpha, &["a1"])).unwrap();
        list.insert(entries(&beta, &["b1"])).unwrap();
        list.insert(entries(&gamma, &["g2"])).unwrap();
        list.insert(entries(&beta, &["b2"])).unwrap();
        list.insert(entries(&alpha, &["a2"])).unwrap();

        assert_eq!(texts(&list), ["b1", "b2", "g1", "g2", "a1", "a2"]);
        for id in ["alpha", "beta", "gamma"] {
            let positions: Vec<usize> = (0..list.len())
                .filter(|&index| list.entry(index).map(ResultEntry::provider_id) == Some(id))
                .collect();
            let contiguous: Vec<usize> = (positions[0]..=positions[positions.len() - 1]).collect();
            assert_eq!(positions, contiguous, "run for {id} is not contiguous");
        }
    }
}
