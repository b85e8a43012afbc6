/// Relative tolerance used by [approx_eq]
const EPSILON: f64 = 1e-9;

/// Returns `true` if `a` and `b` are equal within a small relative tolerance
///
/// Values close to zero are compared with an absolute tolerance instead.
#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    let scale = f64::max(1.0, f64::max(a.abs(), b.abs()));
    (a - b).abs() <= EPSILON * scale
}

/// Running statistics over a stream of `f64` observations
///
/// Single observations are folded in with Welford's update and two accumulators
/// are combined with Chan's parallel update. Both are associative and commutative
/// up to floating point rounding, so accumulators may be built in pieces and merged.
///
/// # Example
///
/// ```
/// use rollcube_stats::Stats;
///
/// let mut left = Stats::default();
/// let mut right = Stats::default();
/// left.add(2.0);
/// left.add(4.0);
/// right.add(9.0);
///
/// left.merge(&right);
/// assert_eq!(left.count(), 3);
/// assert_eq!(left.mean(), 5.0);
/// assert_eq!(left.min(), Some(2.0));
/// assert_eq!(left.max(), Some(9.0));
/// ```
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    count: u64,
    mean: f64,
    /// Sum of squared distances from the mean
    m2: f64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl Stats {
    /// Creates an accumulator holding a single observation
    #[inline]
    pub fn new(value: f64) -> Self {
        let mut stats = Self::default();
        stats.add(value);
        stats
    }

    /// Adds a single observation
    #[inline]
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.sum += value;
        self.min = f64::min(self.min, value);
        self.max = f64::max(self.max, value);
    }

    /// Merges another accumulator into this one
    ///
    /// Merging into an empty accumulator copies `other` exactly and merging an
    /// empty accumulator leaves `self` untouched.
    #[inline]
    pub fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        let left = self.count as f64;
        let right = other.count as f64;
        let total = left + right;
        let delta = other.mean - self.mean;

        self.mean += delta * (right / total);
        self.m2 += other.m2 + delta * delta * (left * right / total);
        self.count += other.count;
        self.sum += other.sum;
        self.min = f64::min(self.min, other.min);
        self.max = f64::max(self.max, other.max);
    }

    /// Number of observations
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns `true` if nothing has been observed
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Arithmetic mean, `0.0` when empty
    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance, `0.0` with fewer than two observations
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            f64::max(0.0, self.m2 / self.count as f64)
        }
    }

    /// Population standard deviation
    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Sum of all observations
    #[inline]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Smallest observation
    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    /// Largest observation
    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }
}
