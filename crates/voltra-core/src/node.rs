//! Node identity and the node→row index produced by preprocessing.

use std::fmt;

use indexmap::IndexMap;

/// An opaque, string-keyed circuit node.
///
/// Two spellings are recognized as the distinguished ground node: the
/// literal `"0"` and the case-insensitive `"gnd"`. Ground never receives an
/// MNA row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(String);

impl NodeKey {
    /// Wrap a node name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The node name as written by the caller.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key spells the ground node (`"0"` or `"gnd"`, any case).
    pub fn is_ground(&self) -> bool {
        self.0 == "0" || self.0.eq_ignore_ascii_case("gnd")
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodeKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Node name → MNA row index, assigned in first-seen order.
///
/// Ground is never inserted. Row indices are dense and start at 0, so a
/// node's row index also serves as its position in the `G` block of the MNA
/// matrix (invariant tested in `voltra_core::tests`).
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    rows: IndexMap<NodeKey, usize>,
}

impl NodeIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a node key to its row, assigning a fresh row on first sight.
    /// Ground resolves to `None` unconditionally.
    pub fn resolve(&mut self, key: &NodeKey) -> Option<usize> {
        if key.is_ground() {
            return None;
        }
        if let Some(&row) = self.rows.get(key) {
            return Some(row);
        }
        let row = self.rows.len();
        self.rows.insert(key.clone(), row);
        Some(row)
    }

    /// Look up a previously-resolved node without assigning a new row.
    pub fn get(&self, key: &NodeKey) -> Option<usize> {
        if key.is_ground() {
            return None;
        }
        self.rows.get(key).copied()
    }

    /// Number of non-ground nodes seen so far.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Node keys in row order (index `i` of the returned slice is row `i`).
    pub fn keys_in_order(&self) -> Vec<&NodeKey> {
        let mut pairs: Vec<_> = self.rows.iter().collect();
        pairs.sort_by_key(|(_, &row)| row);
        pairs.into_iter().map(|(k, _)| k).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_spellings_recognized() {
        assert!(NodeKey::new("0").is_ground());
        assert!(NodeKey::new("gnd").is_ground());
        assert!(NodeKey::new("GND").is_ground());
        assert!(!NodeKey::new("1").is_ground());
        assert!(!NodeKey::new("vout").is_ground());
    }

    #[test]
    fn first_seen_order_is_deterministic() {
        let mut idx = NodeIndex::new();
        assert_eq!(idx.resolve(&NodeKey::new("in")), Some(0));
        assert_eq!(idx.resolve(&NodeKey::new("mid")), Some(1));
        assert_eq!(idx.resolve(&NodeKey::new("in")), Some(0));
        assert_eq!(idx.resolve(&NodeKey::new("0")), None);
        assert_eq!(idx.resolve(&NodeKey::new("out")), Some(2));
        assert_eq!(idx.len(), 3);

        let order: Vec<&str> = idx.keys_in_order().iter().map(|k| k.as_str()).collect();
        assert_eq!(order, vec!["in", "mid", "out"]);
    }

    #[test]
    fn ground_never_gets_a_row() {
        let mut idx = NodeIndex::new();
        idx.resolve(&NodeKey::new("gnd"));
        idx.resolve(&NodeKey::new("0"));
        assert_eq!(idx.len(), 0);
    }
}
