// Fatal craft errors.
//
// Every condition that aborts crafting a segment maps to one `CraftError`
// variant. Meme constraint failures are not errors: inadmissible candidates
// are dropped from the selection bag and only surface as
// `SelectionExhausted` once nothing is left to draw. A malformed taxonomy
// degrades to an empty taxonomy and never reaches this type.
//
// See also: `store.rs` for `StoreError`, which a forced put wraps into
// `CraftError::Persistence`.

use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CraftError {
    /// A referenced record is absent from the content repository or the
    /// segment store.
    #[error("lookup miss: {what}")]
    LookupMiss { what: String },

    /// No admissible candidate remained in any phase of a selection bag.
    #[error("selection exhausted: {what}")]
    SelectionExhausted { what: String },

    /// Content resolved but cannot be crafted as authored.
    #[error("invalid content: {what}")]
    InvalidContent { what: String },

    /// A forced put into the segment store failed.
    #[error("failed to persist {entity}: {source}")]
    Persistence {
        entity: String,
        #[source]
        source: StoreError,
    },
}

impl CraftError {
    pub fn lookup_miss(what: impl Into<String>) -> Self {
        Self::LookupMiss { what: what.into() }
    }

    pub fn exhausted(what: impl Into<String>) -> Self {
        Self::SelectionExhausted { what: what.into() }
    }

    pub fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidContent { what: what.into() }
    }
}
