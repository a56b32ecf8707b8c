//! Event-level diff: line deltas between a committed event and its
//! rewritten counterpart.
//!
//! Both events are rendered as canonical pretty JSON and compared with the
//! `similar` crate, so the output points at the exact fields that changed.

use std::fmt;

use concord_types::LedgerEvent;
use similar::{ChangeTag, TextDiff};

/// A single line of an event delta.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeltaLine {
    Same(String),
    Removed(String),
    Added(String),
}

impl fmt::Display for DeltaLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Same(line) => write!(f, "  {line}"),
            Self::Removed(line) => write!(f, "- {line}"),
            Self::Added(line) => write!(f, "+ {line}"),
        }
    }
}

/// Line diff between two renderings of a ledger event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventDelta {
    pub lines: Vec<DeltaLine>,
}

impl EventDelta {
    /// Returns `true` if the events render identically.
    pub fn is_empty(&self) -> bool {
        self.lines
            .iter()
            .all(|l| matches!(l, DeltaLine::Same(_)))
    }

    /// Only the lines that changed.
    pub fn changes(&self) -> impl Iterator<Item = &DeltaLine> {
        self.lines
            .iter()
            .filter(|l| !matches!(l, DeltaLine::Same(_)))
    }
}

/// Diff `committed` against `current`.
pub fn diff_events(committed: &LedgerEvent, current: &LedgerEvent) -> EventDelta {
    let old = render(committed);
    let new = render(current);
    let text_diff = TextDiff::from_lines(&old, &new);

    let lines = text_diff
        .iter_all_changes()
        .map(|change| {
            let text = change.value().trim_end_matches('\n').to_string();
            match change.tag() {
                ChangeTag::Equal => DeltaLine::Same(text),
                ChangeTag::Delete => DeltaLine::Removed(text),
                ChangeTag::Insert => DeltaLine::Added(text),
            }
        })
        .collect();
    EventDelta { lines }
}

fn render(event: &LedgerEvent) -> String {
    // Only string and JSON fields; serialization does not fail in practice.
    let mut text = serde_json::to_value(event)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or_else(|_| format!("{event:?}"));
    text.push('\n');
    text
}
