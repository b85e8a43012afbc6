//! Statistics primitives used by the rollcube engine.
//!
//! - [Stats]: numerically stable running moments with an exact parallel merge.
//! - [Sketch]: a DDSketch-backed quantile summary.
//! - [Timer] and [Measure]: scope timing that records into a shared sketch.
#![deny(missing_docs)]
#![forbid(unsafe_code)]

mod sketch;
mod stats;

pub use sketch::{Measure, Percentiles, Sketch, Timer};
pub use stats::{Stats, approx_eq};

/// Records the elapsed time of the enclosing scope into a [Timer]
///
/// # Example
///
/// ```
/// use rollcube_stats::{Timer, profile_scope};
///
/// let timer = Timer::default();
/// {
///     profile_scope!(&timer);
/// }
/// assert_eq!(timer.percentiles().count, 1);
/// ```
#[macro_export]
macro_rules! profile_scope {
    ($timer:expr) => {
        let _measure = $crate::Measure::new($timer);
    };
}
