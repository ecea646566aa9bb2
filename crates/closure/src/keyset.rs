//! The growing set of keys an expansion searches with.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crossref_storage::{Key, KeyKind, KeyValue};

/// Keys deduplicated by `(kind, value)`, iterated by kind then value.
///
/// Each key is either searched or on the frontier. A key enters the
/// frontier when first inserted and leaves it when a pass takes it; it never
/// returns, so every value is searched at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: BTreeMap<KeyKind, BTreeSet<KeyValue>>,
    frontier: BTreeMap<KeyKind, BTreeSet<KeyValue>>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key. Returns `true` if it was not already known.
    pub fn insert(&mut self, key: Key) -> bool {
        let added = self
            .keys
            .entry(key.kind)
            .or_default()
            .insert(key.value.clone());
        if added {
            self.frontier.entry(key.kind).or_default().insert(key.value);
        }
        added
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.keys
            .get(&key.kind)
            .is_some_and(|values| values.contains(&key.value))
    }

    pub fn len(&self) -> usize {
        self.keys.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values known for one kind.
    pub fn values(&self, kind: KeyKind) -> impl Iterator<Item = &KeyValue> {
        self.keys.get(&kind).into_iter().flatten()
    }

    pub fn kinds(&self) -> impl Iterator<Item = KeyKind> + '_ {
        self.keys
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(kind, _)| *kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = Key> + '_ {
        self.keys.iter().flat_map(|(kind, values)| {
            values.iter().map(move |value| Key {
                kind: *kind,
                value: value.clone(),
            })
        })
    }

    /// Number of keys not yet searched.
    pub fn frontier_len(&self) -> usize {
        self.frontier.values().map(BTreeSet::len).sum()
    }

    /// Remove and return the unsearched values, grouped by kind.
    pub fn take_frontier(&mut self) -> BTreeMap<KeyKind, Vec<KeyValue>> {
        std::mem::take(&mut self.frontier)
            .into_iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(kind, values)| (kind, values.into_iter().collect()))
            .collect()
    }

    /// `{"Kind": [values...]}` in kind order.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        for (kind, values) in &self.keys {
            if values.is_empty() {
                continue;
            }
            out.insert(
                kind.to_string(),
                Value::Array(values.iter().map(KeyValue::to_json).collect()),
            );
        }
        Value::Object(out)
    }
}

impl FromIterator<Key> for KeySet {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        let mut set = KeySet::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

impl Extend<Key> for KeySet {
    fn extend<I: IntoIterator<Item = Key>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl fmt::Display for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.iter().map(|k| k.to_string()).collect();
        f.write_str(&keys.join(", "))
    }
}
