use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use concord_crypto::ContentHasher;
use concord_types::{timestamp, HelloPacket, ReceiptDigestSet};
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::receipts::{build_digest_set, resolve};

/// Inputs for building a [`HelloPacket`].
///
/// Relative paths are resolved against `root`. The commandments document
/// and the anchors ledger are mandatory; receipts are optional, but each one
/// declared must exist.
#[derive(Clone, Debug)]
pub struct HelloRequest {
    pub root: PathBuf,
    pub instance_id: String,
    pub commandments_path: String,
    pub anchors_path: String,
    pub receipt_paths: Vec<String>,
    pub capabilities: Vec<String>,
}

/// Snapshot the instance described by `request`.
pub fn build_packet(request: &HelloRequest) -> SyncResult<HelloPacket> {
    let instance_id = request.instance_id.trim();
    if instance_id.is_empty() {
        return Err(SyncError::EmptyInstanceId);
    }

    let commandments = resolve(&request.root, &request.commandments_path);
    let anchors = resolve(&request.root, &request.anchors_path);

    let mut missing: Vec<String> = [
        (&request.commandments_path, &commandments),
        (&request.anchors_path, &anchors),
    ]
    .into_iter()
    .filter(|(_, resolved)| !resolved.is_file())
    .map(|(declared, _)| declared.clone())
    .collect();

    let receipts = match build_digest_set(&request.root, &request.receipt_paths) {
        Ok(set) => set,
        Err(SyncError::MissingReceipts(absent)) if !missing.is_empty() => {
            missing.extend(absent);
            ReceiptDigestSet::empty()
        }
        Err(e) => return Err(e),
    };
    if !missing.is_empty() {
        return Err(SyncError::MissingFiles(missing));
    }

    let capabilities: BTreeSet<String> = request
        .capabilities
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();

    let packet = HelloPacket {
        instance_id: instance_id.to_string(),
        generated: timestamp::now(),
        commandments_hash: ContentHasher::hash_file(&commandments)?,
        commandments_path: request.commandments_path.clone(),
        anchors_hash: ContentHasher::hash_file(&anchors)?,
        anchors_path: request.anchors_path.clone(),
        receipts,
        capabilities,
    };
    info!(
        instance = %packet.instance_id,
        receipts = packet.receipts.len(),
        capabilities = packet.capabilities.len(),
        "built hello packet"
    );
    Ok(packet)
}

/// Canonical JSON bytes for a packet (pretty, trailing newline).
pub fn encode_packet(packet: &HelloPacket) -> SyncResult<Vec<u8>> {
    let mut bytes =
        serde_json::to_vec_pretty(packet).map_err(|e| SyncError::Serialization(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Write a packet to `path`, creating parent directories.
pub fn write_packet(packet: &HelloPacket, path: &Path) -> SyncResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
    }
    fs::write(path, encode_packet(packet)?).map_err(|e| SyncError::io(path, e))?;
    debug!(path = %path.display(), "wrote hello packet");
    Ok(())
}

/// Read and validate a packet file.
pub fn read_packet(path: &Path) -> SyncResult<HelloPacket> {
    let bytes = fs::read(path).map_err(|e| SyncError::io(path, e))?;
    let packet: HelloPacket =
        serde_json::from_slice(&bytes).map_err(|e| SyncError::InvalidPacket {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    if packet.instance_id.trim().is_empty() {
        return Err(SyncError::InvalidPacket {
            path: path.to_path_buf(),
            reason: "empty instance_id".into(),
        });
    }
    Ok(packet)
}
