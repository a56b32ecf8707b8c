use std::fs;
use std::path::{Component, Path};

use concord_crypto::ContentHasher;
use concord_types::HelloPacket;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

/// Outcome of gathering the receipts a peer packet references.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Receipts copied into the destination.
    pub copied: Vec<String>,
    /// Receipts that could not be resolved locally.
    pub missing: Vec<String>,
    /// Receipts copied whose local content differs from the peer's digest.
    pub mismatched: Vec<String>,
}

impl FetchReport {
    /// `true` when every referenced receipt was resolved.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Copy every receipt referenced by `peer` that exists under `local_root`
/// into `dest`, keeping its relative path.
///
/// Paths that are absolute or climb out with `..` are never resolved; they
/// are reported as missing.
pub fn fetch_receipts(
    peer: &HelloPacket,
    local_root: &Path,
    dest: &Path,
) -> SyncResult<FetchReport> {
    let mut report = FetchReport::default();

    for item in &peer.receipts.items {
        if !is_contained(&item.path) {
            warn!(
                path = %item.path,
                peer = %peer.instance_id,
                "refusing receipt path outside root"
            );
            report.missing.push(item.path.clone());
            continue;
        }

        let source = local_root.join(&item.path);
        if !source.is_file() {
            debug!(path = %item.path, "receipt not present locally");
            report.missing.push(item.path.clone());
            continue;
        }

        let local = ContentHasher::hash_file(&source)?;
        if local != item.sha256 {
            warn!(
                path = %item.path,
                local = %local.short(),
                peer = %item.sha256.short(),
                "local receipt differs from peer digest"
            );
            report.mismatched.push(item.path.clone());
        }

        let target = dest.join(&item.path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
        }
        fs::copy(&source, &target).map_err(|e| SyncError::io(&target, e))?;
        report.copied.push(item.path.clone());
    }

    info!(
        peer = %peer.instance_id,
        copied = report.copied.len(),
        missing = report.missing.len(),
        mismatched = report.mismatched.len(),
        "fetched peer receipts"
    );
    Ok(report)
}

fn is_contained(path: &str) -> bool {
    let path = Path::new(path);
    path.components().next().is_some()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
