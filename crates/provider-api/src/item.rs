use serde::{Deserialize, Serialize};

/// A single result produced by a provider.
///
/// Equality (and hashing) over the whole item is the aggregator's
/// de-duplication notion: two emissions comparing equal within one
/// provider's run collapse to the first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    /// Provider-scoped identifier, stable across repeated fetches.
    pub id: String,
    /// Text the item was matched against and is displayed as.
    pub text: String,
}

impl Item {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}
