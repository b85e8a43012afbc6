use rollcube_stats::{Sketch, Stats};

use crate::{
    aggregator::Accumulator,
    cube::StatsCube,
    error::{Error, Result},
    key::PartialKey,
    map::TupleStatsMap,
};

/// Per-window rate observations of a single entity
#[derive(Debug, Clone, Default)]
pub struct Rates {
    /// Operations per second, one observation per completed window
    pub ops: Stats,
    /// Bytes per second, one observation per completed window
    pub bytes: Stats,
    /// Quantile summary of [Rates::ops]
    pub ops_sketch: Sketch,
    /// Quantile summary of [Rates::bytes]
    pub bytes_sketch: Sketch,
}

impl Rates {
    /// Number of windows observed
    #[inline]
    pub fn windows(&self) -> u64 {
        self.ops.count()
    }
}

impl Accumulator for Rates {
    /// `(ops_per_sec, bytes_per_sec)`
    type Input = (f64, f64);

    #[inline]
    fn add(&mut self, (ops, bytes): Self::Input) {
        self.ops.add(ops);
        self.bytes.add(bytes);
        self.ops_sketch.add(ops);
        self.bytes_sketch.add(bytes);
    }
}

/// Turns time-sliced cube entries into per-entity rate distributions
///
/// Rate keys keep arity `D` with the time dimension always wildcarded.
#[derive(Debug)]
pub struct RateNormalizer<const D: usize> {
    time_dim: usize,
    group_seconds: i32,
    table: TupleStatsMap<PartialKey<D>, Rates>,
}

impl<const D: usize> RateNormalizer<D> {
    /// Creates an empty normalizer for windows of `group_seconds` keyed on `time_dim`
    pub fn new(time_dim: usize, group_seconds: i32) -> Self {
        debug_assert!(time_dim < D);
        Self {
            time_dim,
            group_seconds,
            table: TupleStatsMap::new(),
        }
    }

    /// Records one rate observation for every time-sliced cube entry strictly inside `]min, max[`
    ///
    /// Entries at the partial edge windows `min` and `max` are skipped. Returns the
    /// number of observations made.
    pub fn observe(&mut self, cube: &StatsCube<D>, min: i32, max: i32) -> Result<usize> {
        let mut observed = 0;
        for (key, stats) in cube.iter_ordered() {
            let Some(value) = key.get(self.time_dim) else {
                continue;
            };
            let time = value.as_i32().ok_or_else(|| Error::InvalidTimeDimension {
                dim: self.time_dim,
                found: value.to_string(),
            })?;
            if time == min || time == max {
                continue;
            }
            if time <= min || time >= max {
                return Err(Error::Invariant(format!(
                    "cube entry {key} has time {time} outside ]{min}, {max}["
                )));
            }
            let count = stats.count() as f64;
            let seconds = f64::from(self.group_seconds);
            let ops = count / seconds;
            let bytes = (count * stats.mean()) / seconds;
            self.table.add(key.project_out(self.time_dim), (ops, bytes));
            observed += 1;
        }
        Ok(observed)
    }

    /// Pads every entity with zero observations until it has `completed` windows
    ///
    /// Returns the number of entities that had to be padded.
    pub fn backfill(&mut self, completed: i64) -> Result<usize> {
        let mut padded = 0;
        let mut result = Ok(());
        self.table.walk_mut(|key, rates| {
            if result.is_err() {
                return;
            }
            let seen = rates.windows() as i64;
            if seen > completed {
                result = Err(Error::Invariant(format!(
                    "rate entry {key} has {seen} observations, {completed} windows completed"
                )));
                return;
            }
            if seen < completed {
                tracing::debug!(
                    "rate entry {} started late, padding {} of {} windows with zeros",
                    key,
                    completed - seen,
                    completed
                );
                for _ in seen..completed {
                    rates.add((0.0, 0.0));
                }
                padded += 1;
            }
            if rates.ops.count() != rates.bytes.count() {
                result = Err(Error::Invariant(format!(
                    "rate entry {key} has mismatched ops and bytes observation counts"
                )));
            }
        });
        result?;
        if padded > 0 {
            tracing::warn!(
                "padded {} of {} rate entries with zeros for windows before their first event",
                padded,
                self.table.len()
            );
        }
        Ok(padded)
    }

    /// Returns the rates of `key`, whose time dimension must be wildcarded
    #[inline]
    pub fn get(&self, key: &PartialKey<D>) -> Option<&Rates> {
        self.table.get(key)
    }

    /// Returns all rate entries in natural partial-key order
    pub fn iter_ordered(&self) -> Vec<(&PartialKey<D>, &Rates)> {
        self.table.iter_ordered()
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if nothing has been observed
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
