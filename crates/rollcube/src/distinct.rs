use std::collections::BTreeSet;

use crate::{
    aggregator::Accumulator,
    key::{Key, Value},
    map::TupleStatsMap,
};

/// Per-dimension sets of the values seen since the last reset
///
/// Values are kept sorted so that [DistinctValues::for_each_key] walks the
/// Cartesian product in the natural [Key] order.
#[derive(Debug, Clone)]
pub struct DistinctValues<const D: usize> {
    dims: [BTreeSet<Value>; D],
}

impl<const D: usize> Default for DistinctValues<D> {
    fn default() -> Self {
        Self {
            dims: core::array::from_fn(|_| BTreeSet::new()),
        }
    }
}

impl<const D: usize> DistinctValues<D> {
    /// Creates an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every value of `key`
    pub fn insert(&mut self, key: &Key<D>) {
        for (set, value) in self.dims.iter_mut().zip(key.values()) {
            set.insert(*value);
        }
    }

    /// Records every key held by `map`
    pub fn fill_from<A: Accumulator>(&mut self, map: &TupleStatsMap<Key<D>, A>) {
        map.walk(|key, _| self.insert(key));
    }

    /// Forgets all values of dimension `dim`
    pub fn clear_dim(&mut self, dim: usize) {
        self.dims[dim].clear();
    }

    /// Sorted values of dimension `dim`
    pub fn values(&self, dim: usize) -> &BTreeSet<Value> {
        &self.dims[dim]
    }

    /// Number of distinct values of dimension `dim`
    pub fn len(&self, dim: usize) -> usize {
        self.dims[dim].len()
    }

    /// Returns `true` if no dimension holds any value
    pub fn is_empty(&self) -> bool {
        self.dims.iter().all(BTreeSet::is_empty)
    }

    /// Number of keys in the Cartesian product of all dimensions
    pub fn product_size(&self) -> f64 {
        self.dims.iter().map(|s| s.len() as f64).product()
    }

    /// Visits every key of the Cartesian product in lexicographic order
    ///
    /// Visits nothing if any dimension is empty.
    pub fn for_each_key(&self, mut f: impl FnMut(&Key<D>)) {
        if D == 0 || self.dims.iter().any(BTreeSet::is_empty) {
            return;
        }
        let values: Vec<Vec<Value>> = (0..D)
            .map(|dim| self.values(dim).iter().copied().collect())
            .collect();
        let mut cursor = [0usize; D];
        let mut key = Key::new(core::array::from_fn(|i| values[i][0]));

        loop {
            f(&key);

            // odometer: bump the last dimension, carrying leftwards
            let mut dim = D;
            loop {
                if dim == 0 {
                    return;
                }
                dim -= 1;
                cursor[dim] += 1;
                if cursor[dim] < values[dim].len() {
                    key.set(dim, values[dim][cursor[dim]]);
                    break;
                }
                cursor[dim] = 0;
                key.set(dim, values[dim][0]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(a: u32, b: bool) -> Key<2> {
        Key::new([Value::U32(a), Value::Bool(b)])
    }

    #[test]
    fn product_order_test() {
        let mut distinct = DistinctValues::<2>::new();
        distinct.insert(&key(2, true));
        distinct.insert(&key(1, false));
        assert_eq!(distinct.product_size(), 4.0);

        let mut keys = Vec::new();
        distinct.for_each_key(|k| keys.push(*k));
        assert_eq!(
            keys,
            vec![key(1, false), key(1, true), key(2, false), key(2, true)]
        );
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn empty_dimension_visits_nothing_test() {
        let mut distinct = DistinctValues::<2>::new();
        distinct.insert(&key(1, true));
        distinct.clear_dim(1);
        let mut visited = 0;
        distinct.for_each_key(|_| visited += 1);
        assert_eq!(visited, 0);
        assert!(!distinct.is_empty());
        distinct.clear_dim(0);
        assert!(distinct.is_empty());
    }

    #[test]
    fn fill_test() {
        let mut map: TupleStatsMap<Key<2>> = TupleStatsMap::new();
        map.add(key(1, true), 1.0);
        map.add(key(3, true), 1.0);
        let mut distinct = DistinctValues::new();
        distinct.fill_from(&map);
        assert_eq!(distinct.len(0), 2);
        assert_eq!(distinct.len(1), 1);
        assert_eq!(
            distinct.values(0).iter().copied().collect::<Vec<_>>(),
            vec![Value::U32(1), Value::U32(3)]
        );
    }
}
