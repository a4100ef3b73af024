use std::sync::Arc;

use frizbee::{Config, iter::FuzzyMatchExt};

use crate::item::Item;

/// Per-provider result predicate supplied by the embedder.
///
/// Filters are applied by the provider itself during `fetch`; the engine
/// only forwards them.
pub type ItemFilter = Arc<dyn Fn(&Item) -> bool + Send + Sync>;

/// One issued query: the typed pattern, the scope flag, and the match
/// predicate derived from the pattern.
#[derive(Clone, Debug)]
pub struct SearchQuery {
    pattern: String,
    include_out_of_scope: bool,
    matcher: Matcher,
}

impl SearchQuery {
    #[must_use]
    pub fn new(pattern: impl Into<String>, include_out_of_scope: bool) -> Self {
        let pattern = pattern.into();
        let matcher = Matcher::new(&pattern);
        Self {
            pattern,
            include_out_of_scope,
            matcher,
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether providers should look beyond their default scope.
    #[must_use]
    pub fn include_out_of_scope(&self) -> bool {
        self.include_out_of_scope
    }

    #[must_use]
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }
}

/// Case-insensitive contains-in-order predicate over candidate text.
///
/// The needle is lowercased once at construction; matching runs with a zero
/// typo budget so a candidate matches exactly when the pattern's characters
/// occur in it, in order. An empty pattern matches everything.
#[derive(Clone, Debug)]
pub struct Matcher {
    needle: String,
}

impl Matcher {
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        Self {
            needle: pattern.trim().to_lowercase(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    #[must_use]
    pub fn matches(&self, haystack: &str) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        [haystack]
            .iter()
            .fuzzy_match(&self.needle, &options_for_pattern())
            .any(|entry| entry.score > 0)
    }
}

/// Matching options for subsequence semantics: no typo allowance, scoring
/// order left to the caller.
fn options_for_pattern() -> Config {
    Config {
        max_typos: Some(0),
        ..Config::default()
    }
}
