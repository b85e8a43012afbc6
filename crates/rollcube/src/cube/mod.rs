use rollcube_stats::Stats;

use crate::{
    diagnostics::Diagnostics,
    distinct::DistinctValues,
    key::{Key, Mask, PartialKey},
    map::TupleStatsMap,
};

mod policy;

pub use policy::{CubeGate, CubeMerge};

/// Base data for one or more windows, keyed by full keys
pub type BaseMap<const D: usize> = TupleStatsMap<Key<D>, Stats>;

/// A persistent OLAP cube over `D`-dimensional keys
///
/// Every base entry added to the cube is merged into the entry of each of its
/// `2^D` projections, filtered through a [CubeGate] and merged using a [CubeMerge].
///
/// # Example
///
/// ```
/// use rollcube::{BaseMap, CubeGate, CubeMerge, Diagnostics, Key, PartialKey, StatsCube, Value};
///
/// let mut base = BaseMap::<2>::new();
/// base.add(Key::new([Value::U32(1), Value::Bool(true)]), 10.0);
/// base.add(Key::new([Value::U32(2), Value::Bool(true)]), 30.0);
///
/// let mut cube = StatsCube::new(CubeGate::All, CubeMerge::Full);
/// cube.add(&base, &mut Diagnostics::default());
///
/// let total = cube.get(&PartialKey::new(Key::new([Value::U32(0), Value::Bool(false)]))).unwrap();
/// assert_eq!(total.count(), 2);
/// assert_eq!(total.mean(), 20.0);
/// ```
#[derive(Debug, Clone)]
pub struct StatsCube<const D: usize> {
    gate: CubeGate,
    merge: CubeMerge,
    data: TupleStatsMap<PartialKey<D>, Stats>,
}

impl<const D: usize> Default for StatsCube<D> {
    fn default() -> Self {
        Self::new(CubeGate::default(), CubeMerge::default())
    }
}

impl<const D: usize> StatsCube<D> {
    /// Creates an empty cube with the given policies
    pub fn new(gate: CubeGate, merge: CubeMerge) -> Self {
        Self {
            gate,
            merge,
            data: TupleStatsMap::new(),
        }
    }

    /// Cubes every entry of `base`, walking it in natural key order
    pub fn add(&mut self, base: &BaseMap<D>, diagnostics: &mut Diagnostics) {
        for (key, value) in base.iter_ordered() {
            self.add_one(key, value, diagnostics);
        }
        diagnostics.peak_cube_len = diagnostics.peak_cube_len.max(self.len());
    }

    /// Cubes the Cartesian product of `distinct`, looking each key up in `base`
    ///
    /// Keys absent from `base` stand for an empty accumulator. Produces the same
    /// entries as [StatsCube::add] as long as `distinct` covers every base key.
    pub fn add_sparse(
        &mut self,
        base: &BaseMap<D>,
        distinct: &DistinctValues<D>,
        diagnostics: &mut Diagnostics,
    ) {
        if distinct.is_empty() {
            return;
        }
        let expected = distinct.product_size();
        let cardinalities: Vec<usize> = (0..D).map(|dim| distinct.len(dim)).collect();
        tracing::debug!(
            "expecting to cube {:?} = {:.6} * 2^{} = {:.0} subsets",
            cardinalities,
            expected,
            D,
            expected * 2f64.powi(D as i32)
        );

        let empty = Stats::default();
        distinct.for_each_key(|key| {
            let value = base.get(key).unwrap_or(&empty);
            self.add_one(key, value, diagnostics);
        });
        diagnostics.peak_cube_len = diagnostics.peak_cube_len.max(self.len());
    }

    /// Merges `value` into every admitted projection of `key`
    pub fn add_one(&mut self, key: &Key<D>, value: &Stats, diagnostics: &mut Diagnostics) {
        let full = Mask::full(D);
        for wildcards in 0..(1u32 << D) {
            let used = Mask::from_bits(full.bits() & !wildcards);
            if !self.gate.admits(used, D) {
                continue;
            }
            if value.is_empty() {
                diagnostics.empty_skips += 1;
                continue;
            }
            let entry = self.data.entry(PartialKey::with_mask(*key, used));
            self.merge.merge(entry, value);
            diagnostics.cube_merges += 1;
        }
    }

    /// Returns the entry of `key` if it has been materialised
    #[inline]
    pub fn get(&self, key: &PartialKey<D>) -> Option<&Stats> {
        self.data.get(key)
    }

    /// Returns the entry of `key`, creating an empty one if absent
    #[inline]
    pub fn entry(&mut self, key: PartialKey<D>) -> &mut Stats {
        self.data.entry(key)
    }

    /// Visits all entries in unspecified order
    pub fn walk(&self, f: impl FnMut(&PartialKey<D>, &Stats)) {
        self.data.walk(f)
    }

    /// Visits all entries in natural partial-key order
    pub fn walk_ordered(&self, f: impl FnMut(&PartialKey<D>, &Stats)) {
        self.data.walk_ordered(f)
    }

    /// Iterates all entries in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&PartialKey<D>, &Stats)> {
        self.data.iter()
    }

    /// Returns all entries in natural partial-key order
    pub fn iter_ordered(&self) -> Vec<(&PartialKey<D>, &Stats)> {
        self.data.iter_ordered()
    }

    /// Removes every entry whose key matches `predicate` and returns how many were removed
    pub fn prune(&mut self, predicate: impl FnMut(&PartialKey<D>) -> bool) -> usize {
        self.data.prune(predicate)
    }

    /// Number of materialised entries
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if no entry has been materialised
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Value;

    fn key(host: u32, send: bool, time: i32) -> Key<3> {
        Key::new([Value::U32(host), Value::Bool(send), Value::I32(time)])
    }

    fn base() -> BaseMap<3> {
        let mut base = BaseMap::new();
        base.add(key(1, true, 10), 100.0);
        base.add(key(1, false, 10), 50.0);
        base.add(key(2, true, 10), 10.0);
        base.add(key(2, true, 20), 30.0);
        base.add(key(2, true, 20), 30.0);
        base
    }

    #[test]
    fn all_gate_materialises_every_subset_test() {
        let mut cube = StatsCube::new(CubeGate::All, CubeMerge::Full);
        let mut diag = Diagnostics::default();
        let mut single = BaseMap::new();
        single.add(key(1, true, 10), 1.0);
        cube.add(&single, &mut diag);
        assert_eq!(cube.len(), 8);
        assert_eq!(diag.cube_merges, 8);
    }

    #[test]
    fn had_wildcard_skips_base_test() {
        let mut cube = StatsCube::<3>::default();
        let mut diag = Diagnostics::default();
        cube.add(&base(), &mut diag);
        assert!(cube.iter().all(|(k, _)| k.had_wildcard()));
        assert!(cube.get(&PartialKey::full(key(1, true, 10))).is_none());
    }

    #[test]
    fn marginals_test() {
        let mut cube = StatsCube::new(CubeGate::All, CubeMerge::Full);
        cube.add(&base(), &mut Diagnostics::default());

        let total = cube.get(&PartialKey::new(key(0, false, 0))).unwrap();
        assert_eq!(total.count(), 5);
        assert_eq!(total.sum(), 220.0);

        let host2 = PartialKey::with_mask(key(2, false, 0), Mask::single(0));
        assert_eq!(cube.get(&host2).unwrap().count(), 3);

        let send_at_20 = PartialKey::with_mask(key(0, true, 20), Mask::from_bits(0b110));
        let stats = cube.get(&send_at_20).unwrap();
        assert_eq!(stats.count(), 2);
        assert_eq!(stats.mean(), 30.0);
    }

    #[test]
    fn sparse_matches_base_test() {
        let base = base();
        let mut distinct = DistinctValues::new();
        distinct.fill_from(&base);

        let mut dense = StatsCube::new(CubeGate::All, CubeMerge::Full);
        let mut dense_diag = Diagnostics::default();
        dense.add(&base, &mut dense_diag);

        let mut sparse = StatsCube::new(CubeGate::All, CubeMerge::Full);
        let mut sparse_diag = Diagnostics::default();
        sparse.add_sparse(&base, &distinct, &mut sparse_diag);

        assert_eq!(dense.len(), sparse.len());
        for (k, v) in dense.iter() {
            assert_eq!(sparse.get(k), Some(v));
        }
        assert_eq!(dense_diag.cube_merges, sparse_diag.cube_merges);
        // 2 hosts * 2 directions * 2 times = 8 product keys, 4 of them absent
        assert_eq!(sparse_diag.empty_skips, 4 * 8);
    }

    #[test]
    fn prune_time_test() {
        let mut cube = StatsCube::new(CubeGate::All, CubeMerge::Full);
        cube.add(&base(), &mut Diagnostics::default());
        let removed = cube.prune(|k| k.is_used(2));
        assert!(removed > 0);
        assert!(cube.iter().all(|(k, _)| !k.is_used(2)));
        // (host, dir) 3 + host 2 + dir 2 + all 1
        assert_eq!(cube.len(), 8);
    }
}
