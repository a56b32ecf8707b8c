//! The append-only guard.
//!
//! The guard compares the last committed ledger snapshot (`head`) with a
//! working copy (`current`). It only has these two snapshots, so instead of
//! re-deriving every historical link it requires the committed prefix to be
//! unchanged event for event and pins the first new event to the exact hash
//! of the committed bytes. Any rewrite of history breaks one of the two.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use concord_crypto::ContentHasher;
use concord_types::{timestamp, Digest, ErrorClass, Ledger, LedgerEvent};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::LedgerError;
use crate::prior::PriorRevisionProvider;
use crate::store;

/// Guard configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuardPolicy {
    /// Treat more than one appended event as a failure instead of a warning.
    pub strict_single_append: bool,
}

impl GuardPolicy {
    pub fn strict() -> Self {
        Self {
            strict_single_append: true,
        }
    }
}

/// Non-fatal findings attached to a successful verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyWarning {
    MultipleAppends { count: usize },
}

impl fmt::Display for PolicyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleAppends { count } => write!(
                f,
                "{count} events appended in one change; prefer one event per change"
            ),
        }
    }
}

/// Successful verification result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardOutcome {
    /// No prior commit; the working copy is structurally sound.
    Bootstrap { events: usize },
    /// Nothing was appended.
    Unchanged { events: usize },
    /// One or more events were appended to an intact prefix.
    AppendOnly {
        added: usize,
        tip: Digest,
        warnings: Vec<PolicyWarning>,
    },
}

impl GuardOutcome {
    /// The success line printed by the CLI.
    pub fn signal(&self) -> &'static str {
        match self {
            Self::Bootstrap { .. } => "OK: bootstrap",
            Self::Unchanged { .. } => "OK: unchanged",
            Self::AppendOnly { .. } => "OK: append-only; tip hash valid; monotonic ts",
        }
    }

    pub fn warnings(&self) -> &[PolicyWarning] {
        match self {
            Self::AppendOnly { warnings, .. } => warnings,
            _ => &[],
        }
    }
}

impl fmt::Display for GuardOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.signal())
    }
}

/// Which of the two inputs an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Snapshot {
    Head,
    Current,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => f.write_str("committed head"),
            Self::Current => f.write_str("working copy"),
        }
    }
}

/// Verification failures. Everything except `Structural` and `Ledger` is an
/// integrity violation.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("{snapshot} is not a valid ledger: {source}")]
    Structural {
        snapshot: Snapshot,
        #[source]
        source: LedgerError,
    },

    #[error("truncation: committed head has {head} events, working copy has {current}")]
    Truncation { head: usize, current: usize },

    #[error("prefix mutation: committed event {index} was altered")]
    PrefixMutation { index: usize },

    #[error("event {index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("event {index} has unparseable ts {value:?}")]
    InvalidTimestamp { index: usize, value: String },

    #[error("non-monotonic ts at event {index}: {current} is before {previous}")]
    NonMonotonicTimestamp {
        index: usize,
        previous: String,
        current: String,
    },

    #[error("tip hash mismatch: first appended event pins {found}, head hashes to {expected}")]
    TipHashMismatch { expected: Digest, found: String },

    #[error("{count} events appended in one change; strict policy allows one")]
    MultipleAppends { count: usize },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl GuardError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Structural { .. } => ErrorClass::Structural,
            Self::Ledger(e) => e.class(),
            _ => ErrorClass::Integrity,
        }
    }

    /// Short machine-greppable kind name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Structural { .. } => "StructuralError",
            Self::Truncation { .. } => "TruncationError",
            Self::PrefixMutation { .. } => "PrefixMutationError",
            Self::MissingField { .. } => "MissingFieldError",
            Self::InvalidTimestamp { .. } => "InvalidTimestampError",
            Self::NonMonotonicTimestamp { .. } => "NonMonotonicTimestampError",
            Self::TipHashMismatch { .. } => "TipHashMismatchError",
            Self::MultipleAppends { .. } => "MultipleAppendsError",
            Self::Ledger(_) => "LedgerError",
        }
    }
}

/// Verify that `current` is a valid append-only successor of `head`.
///
/// `head` is `None` (or empty) when there is no prior committed revision.
pub fn verify(
    head: Option<&[u8]>,
    current: &[u8],
    policy: &GuardPolicy,
) -> Result<GuardOutcome, GuardError> {
    let current_ledger = parse_snapshot(current, Snapshot::Current)?;

    let head_bytes = match head {
        Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => bytes,
        _ => return bootstrap(&current_ledger),
    };
    let head_ledger = parse_snapshot(head_bytes, Snapshot::Head)?;

    let committed = head_ledger.len();
    if current_ledger.len() < committed {
        return Err(GuardError::Truncation {
            head: committed,
            current: current_ledger.len(),
        });
    }

    // Compare raw values so that adding a key equal to its default still
    // counts as an edit.
    let head_raw = raw_events(head_bytes, Snapshot::Head)?;
    let current_raw = raw_events(current, Snapshot::Current)?;
    if let Some(index) = head_raw.iter().zip(&current_raw).position(|(h, c)| h != c) {
        return Err(GuardError::PrefixMutation { index });
    }

    if current_ledger.len() == committed {
        debug!(events = committed, "ledger unchanged");
        return Ok(GuardOutcome::Unchanged { events: committed });
    }

    let added = &current_ledger.events[committed..];

    let mut last_seen = match head_ledger.last().and_then(|e| e.ts.as_deref()) {
        Some(ts) => Some((ts.to_string(), parse_ts(ts, committed - 1)?)),
        None => None,
    };
    for (offset, event) in added.iter().enumerate() {
        let index = committed + offset;
        let ts = require_ts(event, index)?;
        require_prev(event, index)?;
        let instant = parse_ts(ts, index)?;
        if let Some((previous, previous_instant)) = &last_seen {
            if instant < *previous_instant {
                return Err(GuardError::NonMonotonicTimestamp {
                    index,
                    previous: previous.clone(),
                    current: ts.to_string(),
                });
            }
        }
        last_seen = Some((ts.to_string(), instant));
    }

    let expected = ContentHasher::hash_bytes(head_bytes);
    let found = added[0].prev_content_hash.as_deref().unwrap_or_default();
    if expected != *found {
        return Err(GuardError::TipHashMismatch {
            expected,
            found: found.to_string(),
        });
    }

    let mut warnings = Vec::new();
    if added.len() > 1 {
        if policy.strict_single_append {
            return Err(GuardError::MultipleAppends { count: added.len() });
        }
        let warning = PolicyWarning::MultipleAppends { count: added.len() };
        warn!(%warning, "ledger policy warning");
        warnings.push(warning);
    }

    debug!(added = added.len(), tip = %expected, "append-only check passed");
    Ok(GuardOutcome::AppendOnly {
        added: added.len(),
        tip: expected,
        warnings,
    })
}

/// Read the working copy at `path`, fetch its prior revision from
/// `provider`, and run [`verify`].
pub fn verify_with<P: PriorRevisionProvider + ?Sized>(
    provider: &P,
    path: &Path,
    policy: &GuardPolicy,
) -> Result<GuardOutcome, GuardError> {
    let current = std::fs::read(path).map_err(|e| LedgerError::io(path, e))?;
    let head = provider.prior(path)?;
    debug!(
        path = %path.display(),
        provider = %provider.describe(),
        has_prior = head.is_some(),
        "verifying ledger"
    );
    verify(head.as_deref(), &current, policy)
}

fn bootstrap(ledger: &Ledger) -> Result<GuardOutcome, GuardError> {
    for (index, event) in ledger.events.iter().enumerate() {
        require_ts(event, index)?;
        let genesis_exempt = index == 0 && event.is_genesis();
        if !genesis_exempt {
            require_prev(event, index)?;
        }
    }
    debug!(events = ledger.len(), "bootstrap check passed");
    Ok(GuardOutcome::Bootstrap {
        events: ledger.len(),
    })
}

fn parse_snapshot(bytes: &[u8], snapshot: Snapshot) -> Result<Ledger, GuardError> {
    store::parse(bytes, &snapshot.to_string())
        .map_err(|source| GuardError::Structural { snapshot, source })
}

/// The `events` array as untyped JSON values.
fn raw_events(bytes: &[u8], snapshot: Snapshot) -> Result<Vec<Value>, GuardError> {
    let structural = |reason: String| GuardError::Structural {
        snapshot,
        source: LedgerError::InvalidJson {
            origin: snapshot.to_string(),
            reason,
        },
    };
    let mut value: Value = serde_json::from_slice(bytes).map_err(|e| structural(e.to_string()))?;
    match value.get_mut("events").map(Value::take) {
        Some(Value::Array(events)) => Ok(events),
        _ => Err(structural("`events` is not an array".to_string())),
    }
}

fn require_ts(event: &LedgerEvent, index: usize) -> Result<&str, GuardError> {
    event
        .ts
        .as_deref()
        .ok_or(GuardError::MissingField { index, field: "ts" })
}

fn require_prev(event: &LedgerEvent, index: usize) -> Result<&str, GuardError> {
    event
        .prev_content_hash
        .as_deref()
        .ok_or(GuardError::MissingField {
            index,
            field: "prev_content_hash",
        })
}

fn parse_ts(value: &str, index: usize) -> Result<DateTime<Utc>, GuardError> {
    timestamp::parse(value).map_err(|_| GuardError::InvalidTimestamp {
        index,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use concord_types::EVENT_KIND_GENESIS;
    use proptest::prelude::*;
    use serde_json::Map;

    use super::*;
    use crate::store::serialize;

    fn ledger_bytes(events: Vec<LedgerEvent>) -> Vec<u8> {
        let mut ledger = Ledger::seed();
        ledger.events = events;
        serialize(&ledger).unwrap()
    }

    fn ts(second: u32) -> String {
        format!("2026-03-01T12:00:{second:02}Z")
    }

    /// A committed head with `n` chained events.
    fn chained_head(n: u32) -> (Vec<LedgerEvent>, Vec<u8>) {
        let mut events = Vec::new();
        let mut bytes = ledger_bytes(events.clone());
        for i in 0..n {
            let prev = ContentHasher::hash_bytes(&bytes);
            events.push(LedgerEvent::new(ts(i), "ops", format!("e{i}"), prev.as_str()));
            bytes = ledger_bytes(events.clone());
        }
        (events, bytes)
    }

    fn append_valid(head: &[u8], second: u32) -> LedgerEvent {
        let prev = ContentHasher::hash_bytes(head);
        LedgerEvent::new(ts(second), "ops", "next", prev.as_str())
    }

    #[test]
    fn accepts_single_well_formed_append() {
        let (mut events, head) = chained_head(3);
        events.push(append_valid(&head, 10));
        let current = ledger_bytes(events);

        let outcome = verify(Some(&head[..]), &current, &GuardPolicy::default()).unwrap();
        assert_eq!(outcome.signal(), "OK: append-only; tip hash valid; monotonic ts");
        assert!(outcome.warnings().is_empty());
        match outcome {
            GuardOutcome::AppendOnly { added, tip, .. } => {
                assert_eq!(added, 1);
                assert_eq!(tip, ContentHasher::hash_bytes(&head));
            }
            other => panic!("expected AppendOnly, got {other:?}"),
        }
    }

    #[test]
    fn equal_timestamps_are_monotonic() {
        let (mut events, head) = chained_head(2);
        events.push(append_valid(&head, 1));
        let current = ledger_bytes(events);
        assert!(verify(Some(&head[..]), &current, &GuardPolicy::default()).is_ok());
    }

    #[test]
    fn unchanged_ledger() {
        let (_, head) = chained_head(2);
        let outcome = verify(Some(&head[..]), &head, &GuardPolicy::default()).unwrap();
        assert_eq!(outcome, GuardOutcome::Unchanged { events: 2 });
        assert_eq!(outcome.to_string(), "OK: unchanged");
    }

    #[test]
    fn reformatting_without_new_events_is_unchanged() {
        let (events, head) = chained_head(2);
        let mut ledger = Ledger::seed();
        ledger.events = events;
        let compact = serde_json::to_vec(&ledger).unwrap();
        assert!(matches!(
            verify(Some(&head[..]), &compact, &GuardPolicy::default()),
            Ok(GuardOutcome::Unchanged { .. })
        ));
    }

    #[test]
    fn rejects_missing_prev_hash() {
        let (mut events, head) = chained_head(1);
        let mut next = append_valid(&head, 5);
        next.prev_content_hash = None;
        events.push(next);
        let err =
            verify(Some(&head[..]), &ledger_bytes(events), &GuardPolicy::default()).unwrap_err();
        assert!(matches!(
            err,
            GuardError::MissingField {
                index: 1,
                field: "prev_content_hash"
            }
        ));
        assert_eq!(err.class(), ErrorClass::Integrity);
    }

    #[test]
    fn rejects_missing_ts() {
        let (mut events, head) = chained_head(1);
        let mut next = append_valid(&head, 5);
        next.ts = None;
        events.push(next);
        let err =
            verify(Some(&head[..]), &ledger_bytes(events), &GuardPolicy::default()).unwrap_err();
        assert!(matches!(err, GuardError::MissingField { field: "ts", .. }));
    }

    #[test]
    fn rejects_truncation() {
        let (mut events, head) = chained_head(3);
        events.pop();
        let err =
            verify(Some(&head[..]), &ledger_bytes(events), &GuardPolicy::default()).unwrap_err();
        assert!(matches!(err, GuardError::Truncation { head: 3, current: 2 }));
        assert_eq!(err.kind(), "TruncationError");
    }

    #[test]
    fn rejects_mid_file_edit_even_with_valid_tip() {
        let (mut events, head) = chained_head(3);
        events.push(append_valid(&head, 10));
        events[1].note = "rewritten".into();
        let err =
            verify(Some(&head[..]), &ledger_bytes(events), &GuardPolicy::default()).unwrap_err();
        assert!(matches!(err, GuardError::PrefixMutation { index: 1 }));
    }

    /// Rewrites the first event of `bytes` as raw JSON.
    fn edit_first_event(bytes: &[u8], edit: impl FnOnce(&mut Map<String, Value>)) -> Vec<u8> {
        let mut value: Value = serde_json::from_slice(bytes).unwrap();
        edit(value["events"][0].as_object_mut().unwrap());
        serde_json::to_vec_pretty(&value).unwrap()
    }

    #[test]
    fn adding_a_defaulted_key_to_a_committed_event_is_a_mutation() {
        let (_, bytes) = chained_head(2);
        let head = edit_first_event(&bytes, |event| {
            event.remove("type");
        });
        // Typed, the two are equal: a missing `type` defaults to "event".
        assert_eq!(
            store::parse(&head, "head").unwrap().events,
            store::parse(&bytes, "current").unwrap().events
        );
        let err = verify(Some(&head[..]), &bytes, &GuardPolicy::default()).unwrap_err();
        assert!(matches!(err, GuardError::PrefixMutation { index: 0 }));
    }

    #[test]
    fn adding_a_null_prev_hash_to_a_committed_genesis_is_a_mutation() {
        let mut genesis =
            LedgerEvent::new(ts(0), "ops", "genesis", "00").with_kind(EVENT_KIND_GENESIS);
        genesis.prev_content_hash = None;
        let head = ledger_bytes(vec![genesis]);
        let current = edit_first_event(&head, |event| {
            event.insert("prev_content_hash".into(), Value::Null);
        });
        let err = verify(Some(&head[..]), &current, &GuardPolicy::default()).unwrap_err();
        assert!(matches!(err, GuardError::PrefixMutation { index: 0 }));
    }

    #[test]
    fn rejects_reordering() {
        let (mut events, head) = chained_head(3);
        events.swap(0, 2);
        let err =
            verify(Some(&head[..]), &ledger_bytes(events), &GuardPolicy::default()).unwrap_err();
        assert!(matches!(err, GuardError::PrefixMutation { index: 0 }));
    }

    #[test]
    fn rejects_non_monotonic_append() {
        let (mut events, head) = chained_head(3);
        events.push(append_valid(&head, 0));
        let err =
            verify(Some(&head[..]), &ledger_bytes(events), &GuardPolicy::default()).unwrap_err();
        assert!(matches!(
            err,
            GuardError::NonMonotonicTimestamp { index: 3, .. }
        ));
    }

    #[test]
    fn monotonic_check_uses_instants_not_strings() {
        let (mut events, head) = chained_head(1);
        let prev = ContentHasher::hash_bytes(&head);
        // 13:30+02:00 is 11:30Z, before the head's 12:00:00Z.
        events.push(LedgerEvent::new(
            "2026-03-01T13:30:00+02:00",
            "ops",
            "tz",
            prev.as_str(),
        ));
        let err =
            verify(Some(&head[..]), &ledger_bytes(events), &GuardPolicy::default()).unwrap_err();
        assert!(matches!(err, GuardError::NonMonotonicTimestamp { .. }));
    }

    #[test]
    fn rejects_unparseable_ts() {
        let (mut events, head) = chained_head(1);
        let mut next = append_valid(&head, 5);
        next.ts = Some("soon".into());
        events.push(next);
        let err =
            verify(Some(&head[..]), &ledger_bytes(events), &GuardPolicy::default()).unwrap_err();
        assert!(matches!(err, GuardError::InvalidTimestamp { index: 1, .. }));
    }

    #[test]
    fn rejects_stale_tip_hash() {
        let (events, head) = chained_head(2);
        // Pinned to the revision before the head, as a racing writer would.
        let (_, older) = chained_head(1);
        let mut current = events;
        current.push(LedgerEvent::new(
            ts(30),
            "ops",
            "racer",
            ContentHasher::hash_bytes(&older).as_str(),
        ));
        let err =
            verify(Some(&head[..]), &ledger_bytes(current), &GuardPolicy::default()).unwrap_err();
        match err {
            GuardError::TipHashMismatch { expected, .. } => {
                assert_eq!(expected, ContentHasher::hash_bytes(&head));
            }
            other => panic!("expected TipHashMismatch, got {other:?}"),
        }
    }

    #[test]
    fn multiple_appends_warn_by_default() {
        let (mut events, head) = chained_head(1);
        let first = append_valid(&head, 5);
        events.push(first);
        let mid = ledger_bytes(events.clone());
        events.push(LedgerEvent::new(
            ts(6),
            "ops",
            "second",
            ContentHasher::hash_bytes(&mid).as_str(),
        ));
        let current = ledger_bytes(events);

        let outcome = verify(Some(&head[..]), &current, &GuardPolicy::default()).unwrap();
        assert_eq!(
            outcome.warnings(),
            &[PolicyWarning::MultipleAppends { count: 2 }]
        );

        let err = verify(Some(&head[..]), &current, &GuardPolicy::strict()).unwrap_err();
        assert!(matches!(err, GuardError::MultipleAppends { count: 2 }));
    }

    #[test]
    fn bootstrap_requires_fields() {
        let good = ledger_bytes(vec![LedgerEvent::new(ts(0), "ops", "a", "00")]);
        assert_eq!(
            verify(None, &good, &GuardPolicy::default()).unwrap(),
            GuardOutcome::Bootstrap { events: 1 }
        );

        let mut event = LedgerEvent::new(ts(0), "ops", "a", "00");
        event.prev_content_hash = None;
        let bad = ledger_bytes(vec![event]);
        assert!(matches!(
            verify(Some(&b""[..]), &bad, &GuardPolicy::default()),
            Err(GuardError::MissingField { index: 0, .. })
        ));
    }

    #[test]
    fn bootstrap_permits_leading_genesis_without_prev() {
        let mut genesis =
            LedgerEvent::new(ts(0), "ops", "genesis", "00").with_kind(EVENT_KIND_GENESIS);
        genesis.prev_content_hash = None;
        let bytes = ledger_bytes(vec![genesis.clone()]);
        assert!(verify(None, &bytes, &GuardPolicy::default()).is_ok());

        // Only in first position.
        let first = LedgerEvent::new(ts(0), "ops", "a", "00");
        let bytes = ledger_bytes(vec![first, genesis]);
        assert!(verify(None, &bytes, &GuardPolicy::default()).is_err());
    }

    #[test]
    fn structural_errors_name_the_snapshot() {
        let policy = GuardPolicy::default();
        let err = verify(Some(&b"{}"[..]), b"{\"events\": []}", &policy).unwrap_err();
        assert!(matches!(
            err,
            GuardError::Structural {
                snapshot: Snapshot::Head,
                ..
            }
        ));
        assert_eq!(err.class(), ErrorClass::Structural);

        let err = verify(None, b"[", &policy).unwrap_err();
        assert!(matches!(
            err,
            GuardError::Structural {
                snapshot: Snapshot::Current,
                ..
            }
        ));
    }

    proptest! {
        #[test]
        fn any_prefix_edit_is_rejected(
            n in 1u32..6,
            pick in 0usize..6,
            note in "[a-z]{1,12}",
        ) {
            let (mut events, head) = chained_head(n);
            let k = pick % events.len();
            prop_assume!(events[k].note != note);
            events.push(append_valid(&head, 59));
            events[k].note = note;
            let policy = GuardPolicy::default();
            let err = verify(Some(&head[..]), &ledger_bytes(events), &policy).unwrap_err();
            let rejected = matches!(err, GuardError::PrefixMutation { index } if index == k);
            prop_assert!(rejected);
        }
    }
}
