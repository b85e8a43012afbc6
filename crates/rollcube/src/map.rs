use core::hash::Hash;

use hashbrown::HashMap;
use rollcube_stats::Stats;

use crate::aggregator::Accumulator;

/// Exact aggregation from a key to an owned accumulator
///
/// Each distinct key owns exactly one accumulator, created on first use.
/// Entries are only ever removed through [TupleStatsMap::prune] or [TupleStatsMap::clear].
#[derive(Debug, Clone)]
pub struct TupleStatsMap<K, A = Stats> {
    data: HashMap<K, A>,
}

impl<K, A> Default for TupleStatsMap<K, A> {
    fn default() -> Self {
        Self {
            data: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq, A: Accumulator> TupleStatsMap<K, A> {
    /// Creates an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `input` into the accumulator of `key`
    #[inline]
    pub fn add(&mut self, key: K, input: A::Input) {
        self.entry(key).add(input);
    }

    /// Returns the accumulator of `key`, creating an empty one if absent
    #[inline]
    pub fn entry(&mut self, key: K) -> &mut A {
        self.data.entry(key).or_default()
    }

    /// Returns the accumulator of `key` if present
    #[inline]
    pub fn get(&self, key: &K) -> Option<&A> {
        self.data.get(key)
    }

    /// Visits all entries in unspecified order
    pub fn walk(&self, mut f: impl FnMut(&K, &A)) {
        for (k, v) in self.data.iter() {
            f(k, v);
        }
    }

    /// Visits all entries mutably in unspecified order
    pub fn walk_mut(&mut self, mut f: impl FnMut(&K, &mut A)) {
        for (k, v) in self.data.iter_mut() {
            f(k, v);
        }
    }

    /// Iterates all entries in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &A)> {
        self.data.iter()
    }

    /// Removes every entry whose key matches `predicate` and returns how many were removed
    pub fn prune(&mut self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let before = self.data.len();
        self.data.retain(|k, _| !predicate(k));
        before - self.data.len()
    }

    /// Number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the map holds no entries
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drops every entry
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl<K: Hash + Eq + Ord, A: Accumulator> TupleStatsMap<K, A> {
    /// Returns all entries sorted by the natural key order
    pub fn iter_ordered(&self) -> Vec<(&K, &A)> {
        let mut sorted: Vec<_> = self.data.iter().collect();
        sorted.sort_unstable_by(|a, b| a.0.cmp(b.0));
        sorted
    }

    /// Visits all entries sorted by the natural key order
    pub fn walk_ordered(&self, mut f: impl FnMut(&K, &A)) {
        for (k, v) in self.iter_ordered() {
            f(k, v);
        }
    }
}
