//! Ledger file storage.
//!
//! The canonical serialization is pretty JSON with two-space indentation,
//! keys sorted at every level, and a trailing newline. Tip hashes are taken
//! over these exact bytes, so every writer must go through [`serialize`].

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use concord_crypto::ContentHasher;
use concord_types::{timestamp, Ledger, LedgerEvent, APPEND_ONLY_POLICY};
use serde_json::error::Category;
use tracing::{debug, info};

use crate::error::{LedgerError, LedgerResult};

/// Parse ledger bytes into a typed [`Ledger`].
///
/// `origin` names the source (usually a path) in error messages.
pub fn parse(bytes: &[u8], origin: &str) -> LedgerResult<Ledger> {
    let ledger: Ledger = serde_json::from_slice(bytes).map_err(|e| match e.classify() {
        Category::Data => LedgerError::InvalidSchema {
            origin: origin.to_string(),
            reason: e.to_string(),
        },
        Category::Syntax | Category::Eof | Category::Io => LedgerError::InvalidJson {
            origin: origin.to_string(),
            reason: e.to_string(),
        },
    })?;

    if ledger.policy != APPEND_ONLY_POLICY {
        return Err(LedgerError::InvalidSchema {
            origin: origin.to_string(),
            reason: format!(
                "policy must be {APPEND_ONLY_POLICY:?}, found {:?}",
                ledger.policy
            ),
        });
    }
    Ok(ledger)
}

/// Serialize a ledger in canonical form.
pub fn serialize(ledger: &Ledger) -> LedgerResult<Vec<u8>> {
    // Round-trip through `Value` so object keys come out sorted; serde_json
    // maps are ordered by key.
    let value =
        serde_json::to_value(ledger).map_err(|e| LedgerError::Serialization(e.to_string()))?;
    let mut bytes = serde_json::to_vec_pretty(&value)
        .map_err(|e| LedgerError::Serialization(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Load and parse the ledger at `path`.
pub fn load(path: &Path) -> LedgerResult<Ledger> {
    let bytes = fs::read(path).map_err(|e| LedgerError::io(path, e))?;
    parse(&bytes, &path.display().to_string())
}

/// Result of [`LedgerStore::seed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedOutcome {
    Created,
    AlreadyPresent,
}

/// Handle to a ledger file on disk.
///
/// [`LedgerStore::append`] is the only mutator. It computes the new event's
/// `prev_content_hash` over the bytes it read, then replaces the file
/// atomically, so a concurrent writer that raced it produces a ledger the
/// append-only guard rejects rather than a torn file.
#[derive(Clone, Debug)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file bytes, exactly as stored.
    pub fn read_bytes(&self) -> LedgerResult<Vec<u8>> {
        fs::read(&self.path).map_err(|e| LedgerError::io(&self.path, e))
    }

    pub fn load(&self) -> LedgerResult<Ledger> {
        load(&self.path)
    }

    /// Create the minimal ledger if the file does not exist.
    ///
    /// An existing file is validated and left untouched; an existing file
    /// that does not parse is an error, never overwritten.
    pub fn seed(&self) -> LedgerResult<SeedOutcome> {
        if self.path.exists() {
            self.load()?;
            debug!(path = %self.path.display(), "ledger already present");
            return Ok(SeedOutcome::AlreadyPresent);
        }
        let bytes = serialize(&Ledger::seed())?;
        write_atomic(&self.path, &bytes)?;
        info!(path = %self.path.display(), "seeded ledger");
        Ok(SeedOutcome::Created)
    }

    /// Append one event stamped with the current UTC time.
    pub fn append(&self, note: &str, actor: &str, kind: &str) -> LedgerResult<LedgerEvent> {
        self.append_at(note, actor, kind, timestamp::now())
    }

    /// Append one event with an explicit timestamp.
    pub fn append_at(
        &self,
        note: &str,
        actor: &str,
        kind: &str,
        ts: String,
    ) -> LedgerResult<LedgerEvent> {
        let current = self.read_bytes()?;
        let origin = self.path.display().to_string();
        let mut ledger = parse(&current, &origin)?;

        let event = next_event(&ledger, &current, &origin, note, actor, kind, ts)?;
        ledger.events.push(event.clone());

        let bytes = serialize(&ledger)?;
        write_atomic(&self.path, &bytes)?;
        info!(
            path = %self.path.display(),
            events = ledger.len(),
            prev = event.prev_content_hash.as_deref().unwrap_or_default(),
            "appended ledger event"
        );
        Ok(event)
    }
}

/// Build the next event for `ledger`, pinned to the hash of `current`.
fn next_event(
    ledger: &Ledger,
    current: &[u8],
    origin: &str,
    note: &str,
    actor: &str,
    kind: &str,
    ts: String,
) -> LedgerResult<LedgerEvent> {
    if note.trim().is_empty() {
        return Err(LedgerError::EmptyNote);
    }

    if let Some(last) = ledger.last_ts() {
        let schema_err = |e: concord_types::TypeError| LedgerError::InvalidSchema {
            origin: origin.to_string(),
            reason: e.to_string(),
        };
        let last_instant = timestamp::parse(last).map_err(schema_err)?;
        let now_instant = timestamp::parse(&ts).map_err(schema_err)?;
        if now_instant < last_instant {
            return Err(LedgerError::ClockBehind {
                last: last.to_string(),
                now: ts,
            });
        }
    }

    let prev = ContentHasher::hash_bytes(current);
    Ok(LedgerEvent::new(ts, actor, note, prev.as_str()).with_kind(kind))
}

/// Replace `path` with `bytes` via a temp file in the same directory.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> LedgerResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| LedgerError::io(&dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| LedgerError::io(&dir, e))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| LedgerError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| LedgerError::io(path, io::Error::from(e)))?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote file atomically");
    Ok(())
}

#[cfg(test)]
mod tests {
    use concord_types::{EVENT_KIND_DEFAULT, EVENT_KIND_SYNC_ANCHOR};

    use super::*;

    fn store() -> (tempfile::TempDir, LedgerStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("anchors.json"));
        (dir, store)
    }

    #[test]
    fn seed_is_idempotent() {
        let (_dir, store) = store();
        assert_eq!(store.seed().unwrap(), SeedOutcome::Created);
        let first = store.read_bytes().unwrap();
        assert_eq!(store.seed().unwrap(), SeedOutcome::AlreadyPresent);
        assert_eq!(store.read_bytes().unwrap(), first);
    }

    #[test]
    fn seed_never_overwrites_invalid_file() {
        let (_dir, store) = store();
        fs::write(store.path(), b"{ not json").unwrap();
        let err = store.seed().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidJson { .. }));
        assert_eq!(fs::read(store.path()).unwrap(), b"{ not json");
    }

    #[test]
    fn seed_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("gov/anchors.json"));
        store.seed().unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn serialization_is_canonical() {
        let bytes = serialize(&Ledger::seed()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            concat!(
                "{\n",
                "  \"events\": [],\n",
                "  \"immutable_scope\": [],\n",
                "  \"policy\": \"append-only\",\n",
                "  \"version\": 1\n",
                "}\n",
            )
        );
    }

    #[test]
    fn event_keys_are_sorted() {
        let mut ledger = Ledger::seed();
        ledger
            .events
            .push(LedgerEvent::new("2026-01-01T00:00:00Z", "ops", "hi", "ab"));
        let text = String::from_utf8(serialize(&ledger).unwrap()).unwrap();
        let by = text.find("\"by\"").unwrap();
        let note = text.find("\"note\"").unwrap();
        let prev = text.find("\"prev_content_hash\"").unwrap();
        let ts = text.find("\"ts\"").unwrap();
        let kind = text.find("\"type\"").unwrap();
        assert!(by < note && note < prev && prev < ts && ts < kind);
    }

    #[test]
    fn parse_distinguishes_syntax_from_schema() {
        assert!(matches!(
            parse(b"{", "x"),
            Err(LedgerError::InvalidJson { .. })
        ));
        assert!(matches!(
            parse(br#"{"version": 1}"#, "x"),
            Err(LedgerError::InvalidSchema { .. })
        ));
        assert!(matches!(
            parse(br#"{"events": {}}"#, "x"),
            Err(LedgerError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn parse_rejects_other_policies() {
        let err = parse(br#"{"events": [], "policy": "mutable"}"#, "x").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidSchema { .. }));
        assert_eq!(err.class(), concord_types::ErrorClass::Structural);
    }

    #[test]
    fn append_pins_hash_of_prior_bytes() {
        let (_dir, store) = store();
        store.seed().unwrap();
        let before = store.read_bytes().unwrap();

        let event = store
            .append_at("first", "ops", EVENT_KIND_DEFAULT, "2026-01-01T00:00:00Z".into())
            .unwrap();
        assert_eq!(
            event.prev_content_hash.as_deref(),
            Some(ContentHasher::hash_bytes(&before).as_str())
        );

        let mid = store.read_bytes().unwrap();
        let second = store
            .append_at(
                "second",
                "ops",
                EVENT_KIND_SYNC_ANCHOR,
                "2026-01-01T00:00:01Z".into(),
            )
            .unwrap();
        assert_eq!(
            second.prev_content_hash.as_deref(),
            Some(ContentHasher::hash_bytes(&mid).as_str())
        );

        let ledger = store.load().unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.events[1].kind, EVENT_KIND_SYNC_ANCHOR);
    }

    #[test]
    fn append_refuses_clock_behind_tip() {
        let (_dir, store) = store();
        store.seed().unwrap();
        store
            .append_at("later", "ops", "event", "2026-06-01T00:00:00Z".into())
            .unwrap();
        let before = store.read_bytes().unwrap();

        let err = store
            .append_at("earlier", "ops", "event", "2026-01-01T00:00:00Z".into())
            .unwrap_err();
        assert!(matches!(err, LedgerError::ClockBehind { .. }));
        assert_eq!(store.read_bytes().unwrap(), before);
    }

    #[test]
    fn append_refuses_empty_note() {
        let (_dir, store) = store();
        store.seed().unwrap();
        assert!(matches!(
            store.append("   ", "ops", "event"),
            Err(LedgerError::EmptyNote)
        ));
    }

    #[test]
    fn append_to_missing_ledger_is_resource_error() {
        let (_dir, store) = store();
        let err = store.append("note", "ops", "event").unwrap_err();
        assert_eq!(err.class(), concord_types::ErrorClass::Resource);
    }

    #[test]
    fn append_preserves_unknown_keys() {
        let (_dir, store) = store();
        let genesis = r#"{"by":"a","note":"n","ts":"2026-01-01T00:00:00Z","ticket":"T-9"}"#;
        fs::write(store.path(), format!(r#"{{"events":[{genesis}]}}"#)).unwrap();
        store
            .append_at("next", "ops", "event", "2026-01-02T00:00:00Z".into())
            .unwrap();
        let ledger = store.load().unwrap();
        assert_eq!(ledger.events[0].extra["ticket"], "T-9");
    }

    #[test]
    fn append_preserves_unknown_top_level_keys() {
        let (_dir, store) = store();
        fs::write(
            store.path(),
            r#"{"description":"governance anchors","events":[],"version":1}"#,
        )
        .unwrap();
        store
            .append_at("first", "ops", "event", "2026-01-01T00:00:00Z".into())
            .unwrap();

        let ledger = store.load().unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.extra["description"], "governance anchors");
        let text = String::from_utf8(store.read_bytes().unwrap()).unwrap();
        assert!(text.starts_with("{\n  \"description\": \"governance anchors\",\n"));
    }
}
