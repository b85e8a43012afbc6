use core::cell::RefCell;
use minstant::Instant;
use sketches_ddsketch::{Config, DDSketch};
use std::rc::Rc;

/// Summary of a [Sketch] at a fixed set of quantiles
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Percentiles {
    /// Number of recorded values
    pub count: usize,
    /// Smallest recorded value
    pub min: f64,
    /// Median
    pub p50: f64,
    /// 90th percentile
    pub p90: f64,
    /// 99th percentile
    pub p99: f64,
    /// 99.9th percentile
    pub p99_9: f64,
    /// Largest recorded value
    pub max: f64,
}

/// A DDSketch quantile summary with 1% relative accuracy
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone)]
pub struct Sketch {
    inner: DDSketch,
}

impl Default for Sketch {
    fn default() -> Self {
        Self {
            inner: DDSketch::new(Config::new(0.01, 2048, 1.0e-9)),
        }
    }
}

impl Sketch {
    /// Records a value
    #[inline]
    pub fn add(&mut self, value: f64) {
        self.inner.add(value)
    }

    /// Number of recorded values
    pub fn count(&self) -> usize {
        self.inner.count()
    }

    /// Estimates the value at quantile `q` in `[0, 1]`
    ///
    /// Returns `None` if the sketch is empty or `q` is out of range.
    pub fn quantile(&self, q: f64) -> Option<f64> {
        self.inner.quantile(q).ok().flatten()
    }

    /// Summarises the sketch
    pub fn percentiles(&self) -> Percentiles {
        let at = |q: f64| self.quantile(q).unwrap_or(0.0);
        Percentiles {
            count: self.count(),
            min: self.inner.min().unwrap_or(0.0),
            p50: at(0.5),
            p90: at(0.9),
            p99: at(0.99),
            p99_9: at(0.999),
            max: self.inner.max().unwrap_or(0.0),
        }
    }
}

impl core::fmt::Debug for Sketch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sketch")
            .field("percentiles", &self.percentiles())
            .finish()
    }
}

/// A shared sketch of elapsed nanoseconds
///
/// Cloning a timer yields a handle to the same sketch.
#[derive(Clone, Default)]
pub struct Timer {
    inner: Rc<RefCell<Sketch>>,
}

impl Timer {
    /// Records a duration in nanoseconds
    #[inline]
    pub fn record(&self, nanos: f64) {
        self.inner.borrow_mut().add(nanos)
    }

    /// Summarises the recorded durations
    pub fn percentiles(&self) -> Percentiles {
        self.inner.borrow().percentiles()
    }
}

impl core::fmt::Debug for Timer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let p = self.percentiles();
        f.debug_struct("Timer")
            .field("count", &p.count)
            .field("min", &format_args!("{:.2}ns", p.min))
            .field("p50", &format_args!("{:.2}ns", p.p50))
            .field("p99", &format_args!("{:.2}ns", p.p99))
            .field("max", &format_args!("{:.2}ns", p.max))
            .finish()
    }
}

// Inspired by https://github.com/spacejam/sled/blob/main/src/metrics.rs
/// Records the time between its creation and drop into a [Timer]
pub struct Measure {
    start: Instant,
    timer: Timer,
}

impl Measure {
    /// Starts measuring
    #[inline]
    pub fn new(timer: &Timer) -> Measure {
        Measure {
            timer: timer.clone(), // clones Rc
            start: Instant::now(),
        }
    }
}

impl Drop for Measure {
    #[inline]
    fn drop(&mut self) {
        self.timer.record(self.start.elapsed().as_nanos() as f64);
    }
}
