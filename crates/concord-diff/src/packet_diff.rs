//! Packet-level diff: compare two hello packets.
//!
//! Divergences are emitted in a fixed order (identity hashes, capabilities,
//! per-receipt differences, then the receipt aggregate) so the same pair of
//! packets always renders the same report.

use std::fmt;

use concord_types::{Digest, HelloPacket};

/// A single difference between a left and a right packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Divergence {
    CommandmentsHash { left: Digest, right: Digest },
    AnchorsHash { left: Digest, right: Digest },
    CapabilitiesOnlyInLeft(Vec<String>),
    CapabilitiesOnlyInRight(Vec<String>),
    ReceiptMissingInRight(String),
    ReceiptMissingInLeft(String),
    ReceiptHash {
        path: String,
        left: Digest,
        right: Digest,
    },
    ReceiptsAggregate {
        left: Option<Digest>,
        right: Option<Digest>,
    },
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandmentsHash { left, right } => {
                write!(f, "commandments_hash mismatch: {left} != {right}")
            }
            Self::AnchorsHash { left, right } => {
                write!(f, "anchors_hash mismatch: {left} != {right}")
            }
            Self::CapabilitiesOnlyInLeft(caps) => {
                write!(f, "capabilities only in left: {}", caps.join(", "))
            }
            Self::CapabilitiesOnlyInRight(caps) => {
                write!(f, "capabilities only in right: {}", caps.join(", "))
            }
            Self::ReceiptMissingInRight(path) => write!(f, "receipt missing in right: {path}"),
            Self::ReceiptMissingInLeft(path) => write!(f, "receipt missing in left: {path}"),
            Self::ReceiptHash { path, left, right } => {
                write!(f, "receipt hash mismatch for {path}: {left} != {right}")
            }
            Self::ReceiptsAggregate { left, right } => write!(
                f,
                "receipts aggregate mismatch: {} != {}",
                or_none(left),
                or_none(right)
            ),
        }
    }
}

fn or_none(digest: &Option<Digest>) -> &str {
    digest.as_ref().map_or("none", Digest::as_str)
}

/// Compute every divergence between `left` and `right`.
///
/// Instance ids and generation times are not compared; two instances with the
/// same canonical state match.
pub fn diff_packets(left: &HelloPacket, right: &HelloPacket) -> Vec<Divergence> {
    let mut out = Vec::new();

    if left.commandments_hash != right.commandments_hash {
        out.push(Divergence::CommandmentsHash {
            left: left.commandments_hash.clone(),
            right: right.commandments_hash.clone(),
        });
    }
    if left.anchors_hash != right.anchors_hash {
        out.push(Divergence::AnchorsHash {
            left: left.anchors_hash.clone(),
            right: right.anchors_hash.clone(),
        });
    }

    let only_left: Vec<String> = left
        .capabilities
        .difference(&right.capabilities)
        .cloned()
        .collect();
    if !only_left.is_empty() {
        out.push(Divergence::CapabilitiesOnlyInLeft(only_left));
    }
    let only_right: Vec<String> = right
        .capabilities
        .difference(&left.capabilities)
        .cloned()
        .collect();
    if !only_right.is_empty() {
        out.push(Divergence::CapabilitiesOnlyInRight(only_right));
    }

    let lr = left.receipts.by_path();
    let rr = right.receipts.by_path();

    // Group by kind; each group is in path order because the maps are sorted.
    for path in lr.keys().filter(|p| !rr.contains_key(*p)) {
        out.push(Divergence::ReceiptMissingInRight(path.to_string()));
    }
    for path in rr.keys().filter(|p| !lr.contains_key(*p)) {
        out.push(Divergence::ReceiptMissingInLeft(path.to_string()));
    }
    for (path, l) in &lr {
        if let Some(r) = rr.get(path) {
            if l != r {
                out.push(Divergence::ReceiptHash {
                    path: path.to_string(),
                    left: (*l).clone(),
                    right: (*r).clone(),
                });
            }
        }
    }

    if left.receipts.aggregate != right.receipts.aggregate {
        out.push(Divergence::ReceiptsAggregate {
            left: left.receipts.aggregate.clone(),
            right: right.receipts.aggregate.clone(),
        });
    }

    out
}

/// Rendered divergences; an empty list means the packets match.
pub fn compare(left: &HelloPacket, right: &HelloPacket) -> Vec<String> {
    diff_packets(left, right)
        .iter()
        .map(ToString::to_string)
        .collect()
}
