use core::fmt;

use rollcube_stats::Timer;

/// Cross-check counters for a single run
///
/// Owned by the [WindowController](crate::WindowController) and threaded into
/// cube operations, so counts never leak between runs.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    /// Accumulator merges performed into cube entries
    pub cube_merges: u64,
    /// Subset merges skipped because the source accumulator was empty
    pub empty_skips: u64,
    /// Rollups performed
    pub rollups: u64,
    /// Window boundaries where the rollup was deferred below the batch threshold
    pub rollups_skipped: u64,
    /// Largest base map observed
    pub peak_base_len: usize,
    /// Largest cube observed
    pub peak_cube_len: usize,
    /// Rollup durations
    pub rollup_time: Timer,
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rollups={} skipped={} merges={} empty_skips={} peak_base={} peak_cube={}",
            self.rollups,
            self.rollups_skipped,
            self.cube_merges,
            self.empty_skips,
            self.peak_base_len,
            self.peak_cube_len
        )
    }
}
