use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::digest::Digest;

/// Content digest of one declared evidence file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptDigest {
    /// The path as declared by the instance, relative to its root.
    pub path: String,
    pub sha256: Digest,
}

/// Digests over a declared set of receipts, sorted by path.
///
/// `aggregate` is the hash of the concatenated item digests, or `None` when
/// there are no items. A set is always recomputed from the files on disk and
/// never trusted as stored state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptDigestSet {
    pub items: Vec<ReceiptDigest>,
    pub aggregate: Option<Digest>,
}

impl ReceiptDigestSet {
    /// An empty set (no receipts, null aggregate).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of receipts.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if no receipts are declared.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Digest for a declared path.
    pub fn get(&self, path: &str) -> Option<&Digest> {
        self.items
            .iter()
            .find(|item| item.path == path)
            .map(|item| &item.sha256)
    }

    /// Path-to-digest view, ordered by path.
    pub fn by_path(&self) -> BTreeMap<&str, &Digest> {
        self.items
            .iter()
            .map(|item| (item.path.as_str(), &item.sha256))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(path: &str, seed: u8) -> ReceiptDigest {
        ReceiptDigest {
            path: path.into(),
            sha256: Digest::from_hash([seed; 32]),
        }
    }

    #[test]
    fn empty_set_serializes_null_aggregate() {
        let json = serde_json::to_value(ReceiptDigestSet::empty()).unwrap();
        assert!(json["aggregate"].is_null());
        assert_eq!(json["items"], serde_json::json!([]));
    }

    #[test]
    fn lookup_by_path() {
        let set = ReceiptDigestSet {
            items: vec![item("a.json", 1), item("b.json", 2)],
            aggregate: Some(Digest::from_hash([9; 32])),
        };
        assert_eq!(set.get("b.json"), Some(&Digest::from_hash([2; 32])));
        assert!(set.get("c.json").is_none());
        assert_eq!(set.by_path().len(), 2);
    }
}
