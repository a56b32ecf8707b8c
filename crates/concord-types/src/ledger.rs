use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::LedgerEvent;

/// Current ledger document version.
pub const LEDGER_VERSION: u64 = 1;
/// The only policy a ledger may declare.
pub const APPEND_ONLY_POLICY: &str = "append-only";

/// The ledger document: metadata plus the ordered event sequence.
///
/// Only `events` is mandatory when parsing; the other keys fall back to the
/// values a freshly seeded ledger carries. Unrecognized top-level keys are
/// kept in `extra` and written back unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default = "default_version")]
    pub version: u64,
    #[serde(default = "default_policy")]
    pub policy: String,
    pub events: Vec<LedgerEvent>,
    #[serde(default)]
    pub immutable_scope: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_version() -> u64 {
    LEDGER_VERSION
}

fn default_policy() -> String {
    APPEND_ONLY_POLICY.to_string()
}

impl Ledger {
    /// The minimal valid ledger: no events, empty scope.
    ///
    /// Contains no timestamps, so seeding is reproducible byte for byte.
    pub fn seed() -> Self {
        Self {
            version: LEDGER_VERSION,
            policy: default_policy(),
            events: Vec::new(),
            immutable_scope: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if the ledger has no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The most recent event.
    pub fn last(&self) -> Option<&LedgerEvent> {
        self.events.last()
    }

    /// Timestamp of the most recent event that carries one.
    pub fn last_ts(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|e| e.ts.as_deref())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::seed()
    }
}
