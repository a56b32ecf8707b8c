use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::receipt::ReceiptDigestSet;

/// Hash snapshot of one instance's canonical state.
///
/// Exchanged out of band to start a reconciliation. Capabilities are a
/// sorted set so packet equality does not depend on the order tags were
/// declared in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPacket {
    pub instance_id: String,
    pub generated: String,
    pub commandments_hash: Digest,
    pub commandments_path: String,
    pub anchors_hash: Digest,
    pub anchors_path: String,
    pub receipts: ReceiptDigestSet,
    pub capabilities: BTreeSet<String>,
}
