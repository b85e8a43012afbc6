use core::fmt::Debug;

use rollcube_stats::Stats;

/// A mutable per-key aggregate that can absorb inputs
///
/// Maps create accumulators through [Default] the first time a key is seen,
/// so every implementation must start out empty.
///
/// # Example
///
/// ```
/// use rollcube::Accumulator;
///
/// #[derive(Default, Debug)]
/// struct Counter(u64);
///
/// impl Accumulator for Counter {
///     type Input = u64;
///
///     fn add(&mut self, input: Self::Input) {
///         self.0 += input;
///     }
/// }
/// ```
pub trait Accumulator: Default + Debug + 'static {
    /// Input type absorbed by [Accumulator::add]
    type Input: Copy + Debug;

    /// Folds `input` into the accumulator
    fn add(&mut self, input: Self::Input);
}

impl Accumulator for Stats {
    type Input = f64;

    #[inline]
    fn add(&mut self, input: Self::Input) {
        Stats::add(self, input)
    }
}
