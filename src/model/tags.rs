//! Symbolic metadata attached to nodes.

use std::collections::BTreeMap;
use super::Value;

/// A map of tag names to values. Ordered so snapshots are stable.
pub type Tags = BTreeMap<String, Value>;

/// Build a tag map from (key, value) pairs.
pub fn tags<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Tags
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}
