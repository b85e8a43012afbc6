use rollcube_stats::Stats;

use crate::key::{Mask, PartialKey};

/// Decides which dimension subsets a cube materialises
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CubeGate {
    /// Materialise every subset, including the fully-used one
    All,
    /// Skip the fully-used subset since it duplicates the base data
    #[default]
    HadWildcard,
    /// Like [CubeGate::HadWildcard] but only subsets that keep every dimension of the mask used
    Retain(Mask),
}

impl CubeGate {
    /// Returns `true` if a subset with the given used-mask should be materialised
    #[inline]
    pub fn admits(&self, used: Mask, dims: usize) -> bool {
        match self {
            CubeGate::All => true,
            CubeGate::HadWildcard => !used.is_full(dims),
            CubeGate::Retain(keep) => !used.is_full(dims) && used.contains(*keep),
        }
    }

    /// Convenience for [CubeGate::admits] on a partial key
    #[inline]
    pub fn admits_key<const D: usize>(&self, key: &PartialKey<D>) -> bool {
        self.admits(key.used(), D)
    }
}

/// How a base accumulator is merged into a cube entry
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CubeMerge {
    /// Full statistical merge of the two accumulators
    #[default]
    Full,
    /// Adds only the mean of the source as a single observation
    ///
    /// Used when the base values are already derived rates.
    MeanOnly,
}

impl CubeMerge {
    /// Merges `value` into `into`
    #[inline]
    pub fn merge(&self, into: &mut Stats, value: &Stats) {
        match self {
            CubeMerge::Full => into.merge(value),
            CubeMerge::MeanOnly => into.add(value.mean()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_test() {
        let full = Mask::full(3);
        let no_time = full.with(2, false);
        let no_host = full.with(0, false);

        assert!(CubeGate::All.admits(full, 3));
        assert!(!CubeGate::HadWildcard.admits(full, 3));
        assert!(CubeGate::HadWildcard.admits(Mask::EMPTY, 3));

        let retain_time = CubeGate::Retain(Mask::single(2));
        assert!(!retain_time.admits(full, 3));
        assert!(retain_time.admits(no_host, 3));
        assert!(!retain_time.admits(no_time, 3));
    }

    #[test]
    fn merge_test() {
        let mut value = Stats::default();
        value.add(2.0);
        value.add(4.0);

        let mut full = Stats::default();
        CubeMerge::Full.merge(&mut full, &value);
        assert_eq!(full.count(), 2);
        assert_eq!(full.mean(), 3.0);

        let mut mean_only = Stats::default();
        CubeMerge::MeanOnly.merge(&mut mean_only, &value);
        CubeMerge::MeanOnly.merge(&mut mean_only, &Stats::new(5.0));
        assert_eq!(mean_only.count(), 2);
        assert_eq!(mean_only.mean(), 4.0);
    }
}
