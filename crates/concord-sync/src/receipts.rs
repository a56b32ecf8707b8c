use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use concord_crypto::ContentHasher;
use concord_types::{ReceiptDigest, ReceiptDigestSet};
use tracing::debug;

use crate::error::{SyncError, SyncResult};

/// Compute digests over a declared list of receipt files.
///
/// Paths are deduplicated and sorted before hashing. Every path that does
/// not resolve to a file is collected, so a caller gets the full list of
/// missing receipts in one pass.
pub fn build_digest_set<S: AsRef<str>>(root: &Path, paths: &[S]) -> SyncResult<ReceiptDigestSet> {
    let declared: BTreeSet<String> = paths
        .iter()
        .map(|p| normalize_declared(p.as_ref()))
        .collect();

    let mut items = Vec::with_capacity(declared.len());
    let mut missing = Vec::new();
    for path in declared {
        let resolved = resolve(root, &path);
        if !resolved.is_file() {
            missing.push(path);
            continue;
        }
        let sha256 = ContentHasher::hash_file(&resolved)?;
        items.push(ReceiptDigest { path, sha256 });
    }

    if !missing.is_empty() {
        return Err(SyncError::MissingReceipts(missing));
    }

    let aggregate = if items.is_empty() {
        None
    } else {
        Some(ContentHasher::hash_concat(items.iter().map(|i| &i.sha256)))
    };
    debug!(receipts = items.len(), "built receipt digest set");
    Ok(ReceiptDigestSet { items, aggregate })
}

/// Resolve a declared path against `root` unless it is absolute.
pub(crate) fn resolve(root: &Path, declared: &str) -> PathBuf {
    let path = Path::new(declared);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// `./receipts/a.json` and `receipts/a.json` name the same receipt.
fn normalize_declared(path: &str) -> String {
    let mut p = path.trim();
    while let Some(rest) = p.strip_prefix("./") {
        p = rest;
    }
    p.to_string()
}
