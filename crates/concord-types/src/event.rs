use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event type used when a writer does not specify one.
pub const EVENT_KIND_DEFAULT: &str = "event";
/// Event type that may omit `prev_content_hash` at the head of a ledger
/// with no prior committed revision.
pub const EVENT_KIND_GENESIS: &str = "genesis";
/// Event type for notes produced by a hello merge.
pub const EVENT_KIND_SYNC_ANCHOR: &str = "sync-anchor";

/// A single entry in the ledger.
///
/// Events are immutable once committed. `ts` and `prev_content_hash` are
/// optional at the type level so that a ledger missing them still parses and
/// the append-only guard can report the gap as an integrity failure instead
/// of a parse error.
///
/// Keys this version does not know about are kept in `extra`. They take part
/// in equality, so editing them inside the committed prefix is caught like
/// any other mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    pub by: String,
    pub note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_content_hash: Option<String>,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_kind() -> String {
    EVENT_KIND_DEFAULT.to_string()
}

impl LedgerEvent {
    /// Build a new event pinned to the given tip hash.
    pub fn new(
        ts: impl Into<String>,
        by: impl Into<String>,
        note: impl Into<String>,
        prev_content_hash: impl Into<String>,
    ) -> Self {
        Self {
            ts: Some(ts.into()),
            by: by.into(),
            note: note.into(),
            prev_content_hash: Some(prev_content_hash.into()),
            kind: default_kind(),
            extra: BTreeMap::new(),
        }
    }

    /// Set the event type.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Returns `true` if this event is a genesis marker.
    pub fn is_genesis(&self) -> bool {
        self.kind == EVENT_KIND_GENESIS
    }
}
