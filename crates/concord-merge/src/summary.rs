use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use concord_diff::compare;
use concord_types::{timestamp, Digest, HelloPacket};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MergeError, MergeResult};

/// The identity half of a hello packet, as recorded in a merge summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketSide {
    pub instance_id: String,
    pub commandments_hash: Digest,
    pub anchors_hash: Digest,
    pub capabilities: BTreeSet<String>,
}

impl From<&HelloPacket> for PacketSide {
    fn from(packet: &HelloPacket) -> Self {
        Self {
            instance_id: packet.instance_id.clone(),
            commandments_hash: packet.commandments_hash.clone(),
            anchors_hash: packet.anchors_hash.clone(),
            capabilities: packet.capabilities.clone(),
        }
    }
}

/// Outcome of reconciling two hello packets.
///
/// `anchor_note` is the text meant to be appended to the local ledger as a
/// synchronization anchor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSummary {
    pub generated: String,
    pub left: PacketSide,
    pub right: PacketSide,
    pub matches: bool,
    pub differences: Vec<String>,
    pub anchor_note: String,
}

impl MergeSummary {
    /// Persist the summary as a pretty JSON receipt.
    pub fn write(&self, path: &Path) -> MergeResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| MergeError::io(parent, e))?;
        }
        let mut bytes =
            serde_json::to_vec_pretty(self).map_err(|e| MergeError::Serialization(e.to_string()))?;
        bytes.push(b'\n');
        fs::write(path, bytes).map_err(|e| MergeError::io(path, e))?;
        debug!(path = %path.display(), "wrote merge summary");
        Ok(())
    }
}

/// Compare `left` and `right` and draft the anchor note.
pub fn summarize(left: &HelloPacket, right: &HelloPacket) -> MergeSummary {
    let differences = compare(left, right);
    let matches = differences.is_empty();
    let anchor_note = anchor_note(&left.instance_id, &right.instance_id, &differences);

    info!(
        left = %left.instance_id,
        right = %right.instance_id,
        matches,
        differences = differences.len(),
        "summarized hello packets"
    );

    MergeSummary {
        generated: timestamp::now(),
        left: PacketSide::from(left),
        right: PacketSide::from(right),
        matches,
        differences,
        anchor_note,
    }
}

fn anchor_note(left: &str, right: &str, differences: &[String]) -> String {
    if differences.is_empty() {
        return format!(
            "Hello sync {left} <-> {right}: commandments, anchors and receipt hashes aligned; \
             safe to append a synchronization anchor."
        );
    }
    let mut note = format!(
        "Hello sync {left} <-> {right}: {} difference(s) found; do not anchor until resolved:",
        differences.len()
    );
    for diff in differences {
        note.push_str("\n- ");
        note.push_str(diff);
    }
    note
}
