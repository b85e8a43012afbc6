use rollcube_stats::{Stats, profile_scope};

use crate::{
    cube::{BaseMap, CubeGate, CubeMerge, StatsCube},
    diagnostics::Diagnostics,
    distinct::DistinctValues,
    error::{Error, Result},
    key::{Key, PartialKey},
    rates::RateNormalizer,
};

mod state;

pub use state::{Phase, WindowState, bucket};

/// Default number of base entries buffered before a window boundary forces a rollup
pub const DEFAULT_INCREMENTAL_BATCH_SIZE: usize = 100_000;

/// Configuration of a [WindowController]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowConf {
    group_seconds: i32,
    time_dim: usize,
    incremental_batch_size: usize,
    sparse: bool,
    collect_base: bool,
    collect_cube: bool,
    report_gate: CubeGate,
}

impl WindowConf {
    /// Creates a configuration for `group_seconds` wide windows keyed on dimension `time_dim`
    pub fn new(group_seconds: i32, time_dim: usize) -> Self {
        Self {
            group_seconds,
            time_dim,
            incremental_batch_size: DEFAULT_INCREMENTAL_BATCH_SIZE,
            sparse: false,
            collect_base: false,
            collect_cube: false,
            report_gate: CubeGate::HadWildcard,
        }
    }
    /// Sets the number of base entries that forces a rollup at the next window boundary
    ///
    /// This only trades memory for throughput, results do not depend on it.
    pub fn with_incremental_batch_size(mut self, size: usize) -> Self {
        self.incremental_batch_size = size;
        self
    }
    /// Cube through the Cartesian product of distinct values instead of the base entries
    pub fn with_sparse(mut self, sparse: bool) -> Self {
        self.sparse = sparse;
        self
    }
    /// Collect ordered base rows in each [Rollup]
    pub fn with_collect_base(mut self, collect: bool) -> Self {
        self.collect_base = collect;
        self
    }
    /// Collect ordered cube rows in each [Rollup]
    pub fn with_collect_cube(mut self, collect: bool) -> Self {
        self.collect_cube = collect;
        self
    }
    /// Sets the gate that decides which cube rows are collected
    pub fn with_report_gate(mut self, gate: CubeGate) -> Self {
        self.report_gate = gate;
        self
    }

    /// Window width in seconds
    pub fn group_seconds(&self) -> i32 {
        self.group_seconds
    }
    /// Position of the time dimension
    pub fn time_dim(&self) -> usize {
        self.time_dim
    }
    /// Rollup batch threshold
    pub fn incremental_batch_size(&self) -> usize {
        self.incremental_batch_size
    }
    /// Whether the sparse cubing path is used
    pub fn sparse(&self) -> bool {
        self.sparse
    }
    /// Whether base rows are collected
    pub fn collect_base(&self) -> bool {
        self.collect_base
    }
    /// Whether cube rows are collected
    pub fn collect_cube(&self) -> bool {
        self.collect_cube
    }
    /// Gate used for collected cube rows
    pub fn report_gate(&self) -> CubeGate {
        self.report_gate
    }
}

/// Output of a single rollup
#[derive(Debug, Clone)]
pub struct Rollup<const D: usize> {
    /// First bucket of the stream
    pub min_time: i32,
    /// Latest window boundary when the rollup ran
    pub max_time: i32,
    /// Whether this is the end-of-stream rollup
    pub is_final: bool,
    /// Base entries in natural key order
    pub base: Vec<(Key<D>, Stats)>,
    /// Time-sliced cube entries admitted by the report gate, in natural order
    pub time_cube: Vec<(PartialKey<D>, Stats)>,
    /// Non-time cube entries admitted by the report gate, only on the final rollup
    pub non_time_cube: Vec<(PartialKey<D>, Stats)>,
}

/// Drives a time-ordered stream through base aggregation, cubing and rate derivation
///
/// Keys are added to a base map until a window boundary is crossed. At a boundary
/// with enough buffered entries the base map is rolled into the cube, rates are
/// derived for every closed interior window and all time-sliced cube entries are
/// pruned. The non-time part of the cube lives for the whole run.
///
/// # Example
///
/// ```
/// use rollcube::{Key, Value, WindowConf, WindowController};
///
/// let conf = WindowConf::new(10, 1).with_incremental_batch_size(1);
/// let mut controller = WindowController::<2>::new(conf).unwrap();
/// for t in [100, 105, 110, 120] {
///     let key = Key::new([Value::U32(7), Value::I32(rollcube::bucket(t, 10).unwrap())]);
///     controller.insert(key, 64.0).unwrap();
/// }
/// controller.finish().unwrap();
/// assert_eq!(controller.state().completed(), 1);
/// ```
#[derive(Debug)]
pub struct WindowController<const D: usize> {
    conf: WindowConf,
    phase: Phase,
    state: WindowState,
    base: BaseMap<D>,
    cube: StatsCube<D>,
    distinct: Option<DistinctValues<D>>,
    rates: RateNormalizer<D>,
    diagnostics: Diagnostics,
}

impl<const D: usize> WindowController<D> {
    /// Creates a controller, validating `conf`
    pub fn new(conf: WindowConf) -> Result<Self> {
        if conf.group_seconds <= 0 {
            return Err(Error::InvalidOption {
                name: "group_seconds".to_string(),
                value: conf.group_seconds.to_string(),
            });
        }
        if conf.time_dim >= D {
            return Err(Error::InvalidOption {
                name: "time_dim".to_string(),
                value: conf.time_dim.to_string(),
            });
        }
        Ok(Self {
            conf,
            phase: Phase::Open,
            state: WindowState::new(conf.group_seconds),
            base: BaseMap::new(),
            cube: StatsCube::new(CubeGate::All, CubeMerge::Full),
            distinct: conf.sparse.then(DistinctValues::new),
            rates: RateNormalizer::new(conf.time_dim, conf.group_seconds),
            diagnostics: Diagnostics::default(),
        })
    }

    /// Adds `value` under `key`, rolling up first if `key` opens a new window
    pub fn insert(&mut self, key: Key<D>, value: f64) -> Result<Option<Rollup<D>>> {
        if self.phase == Phase::Closed {
            return Err(Error::StreamClosed);
        }
        let bucket = self.time_of(&key)?;
        let rollup = match self.phase {
            Phase::Open => {
                self.state.start(bucket);
                self.phase = Phase::Accumulating;
                None
            }
            _ if Some(bucket) == self.state.max_time_closed() => None,
            _ => self.next_group(bucket)?,
        };
        self.base.add(key, value);
        self.diagnostics.peak_base_len = self.diagnostics.peak_base_len.max(self.base.len());
        Ok(rollup)
    }

    /// Closes the stream and rolls up everything that is left
    ///
    /// Returns `None` if no event was ever inserted.
    pub fn finish(&mut self) -> Result<Option<Rollup<D>>> {
        match self.phase {
            Phase::Closed => Err(Error::StreamClosed),
            Phase::Open => {
                self.phase = Phase::Closed;
                tracing::info!("stream closed without events");
                Ok(None)
            }
            Phase::Accumulating => {
                self.state.close()?;
                let rollup = self.rollup(true)?;
                let completed = self.state.completed();
                if completed > 0 {
                    self.rates.backfill(completed)?;
                }
                self.phase = Phase::Closed;
                tracing::info!(
                    "processed {} complete groups of {}s over [{}..{}], {}",
                    completed,
                    self.conf.group_seconds,
                    rollup.min_time,
                    rollup.max_time,
                    self.diagnostics
                );
                Ok(Some(rollup))
            }
        }
    }

    fn time_of(&self, key: &Key<D>) -> Result<i32> {
        let value = key[self.conf.time_dim];
        let time = value.as_i32().ok_or_else(|| Error::InvalidTimeDimension {
            dim: self.conf.time_dim,
            found: format!("{value:?}"),
        })?;
        if time.rem_euclid(self.conf.group_seconds) != 0 {
            return Err(Error::UnalignedBucket {
                bucket: i64::from(time),
                group_seconds: self.conf.group_seconds,
            });
        }
        Ok(time)
    }

    fn next_group(&mut self, bucket: i32) -> Result<Option<Rollup<D>>> {
        self.state.advance(bucket)?;
        self.process_group()
    }

    fn process_group(&mut self) -> Result<Option<Rollup<D>>> {
        if self.base.len() >= self.conf.incremental_batch_size {
            let (min, max) = self.state.bounds();
            tracing::debug!(
                "incremental rollup ]{}, {}[ base={} cube={} rates={}",
                min,
                max,
                self.base.len(),
                self.cube.len(),
                self.rates.len()
            );
            self.rollup(false).map(Some)
        } else {
            tracing::debug!(
                "skip incremental rollup {} < {}",
                self.base.len(),
                self.conf.incremental_batch_size
            );
            self.diagnostics.rollups_skipped += 1;
            Ok(None)
        }
    }

    fn rollup(&mut self, is_final: bool) -> Result<Rollup<D>> {
        profile_scope!(&self.diagnostics.rollup_time);
        let (min, max) = self.state.bounds();
        let time_dim = self.conf.time_dim;

        match &mut self.distinct {
            Some(distinct) => {
                distinct.fill_from(&self.base);
                self.cube
                    .add_sparse(&self.base, distinct, &mut self.diagnostics);
            }
            None => self.cube.add(&self.base, &mut self.diagnostics),
        }

        let base = if self.conf.collect_base {
            self.base
                .iter_ordered()
                .into_iter()
                .map(|(k, v)| (*k, *v))
                .collect()
        } else {
            Vec::new()
        };
        self.base.clear();

        let observed = self.rates.observe(&self.cube, min, max)?;
        let time_cube = self.collect_cube(|k| k.is_used(time_dim));

        let mut beyond = None;
        let pruned = self.cube.prune(|k| match k.get(time_dim).and_then(|v| v.as_i32()) {
            Some(time) => {
                if time > max {
                    beyond = Some(*k);
                }
                true
            }
            None => false,
        });
        if let Some(key) = beyond {
            return Err(Error::Invariant(format!(
                "cube entry {key} lies beyond the closed watermark {max}"
            )));
        }
        if !self.base.is_empty() {
            return Err(Error::Invariant(format!(
                "base data holds {} entries after rollup",
                self.base.len()
            )));
        }
        // the closed last bucket leaves the tracker along with the rest of the time values
        if let Some(distinct) = &mut self.distinct {
            distinct.clear_dim(time_dim);
        }

        let non_time_cube = if is_final {
            self.collect_cube(|k| !k.is_used(time_dim))
        } else {
            Vec::new()
        };

        self.diagnostics.rollups += 1;
        tracing::debug!(
            "rollup ]{}, {}[ final={} observed={} pruned={} cube={} rates={}",
            min,
            max,
            is_final,
            observed,
            pruned,
            self.cube.len(),
            self.rates.len()
        );

        Ok(Rollup {
            min_time: min,
            max_time: max,
            is_final,
            base,
            time_cube,
            non_time_cube,
        })
    }

    fn collect_cube(
        &self,
        filter: impl Fn(&PartialKey<D>) -> bool,
    ) -> Vec<(PartialKey<D>, Stats)> {
        if !self.conf.collect_cube {
            return Vec::new();
        }
        self.cube
            .iter_ordered()
            .into_iter()
            .filter(|(k, _)| filter(*k) && self.conf.report_gate.admits_key(*k))
            .map(|(k, v)| (*k, *v))
            .collect()
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        self.phase
    }
    /// Window bounds and completed count
    pub fn state(&self) -> &WindowState {
        &self.state
    }
    /// The configuration in use
    pub fn conf(&self) -> &WindowConf {
        &self.conf
    }
    /// Buffered base entries not yet rolled up
    pub fn base(&self) -> &BaseMap<D> {
        &self.base
    }
    /// The rolled-up cube
    pub fn cube(&self) -> &StatsCube<D> {
        &self.cube
    }
    /// Per-entity rate table
    pub fn rates(&self) -> &RateNormalizer<D> {
        &self.rates
    }
    /// Cross-check counters of this run
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{Mask, Value};

    fn key(host: u32, time: i32) -> Key<2> {
        Key::new([Value::U32(host), Value::I32(time)])
    }

    fn controller(batch: usize) -> WindowController<2> {
        let conf = WindowConf::new(10, 1)
            .with_incremental_batch_size(batch)
            .with_collect_base(true)
            .with_collect_cube(true);
        WindowController::new(conf).unwrap()
    }

    #[test]
    fn invalid_conf_test() {
        assert!(matches!(
            WindowController::<2>::new(WindowConf::new(0, 1)),
            Err(Error::InvalidOption { .. })
        ));
        assert!(matches!(
            WindowController::<2>::new(WindowConf::new(10, 2)),
            Err(Error::InvalidOption { .. })
        ));
    }

    #[test]
    fn phases_test() {
        let mut c = controller(1);
        assert_eq!(c.phase(), Phase::Open);
        assert!(c.insert(key(1, 100), 1.0).unwrap().is_none());
        assert_eq!(c.phase(), Phase::Accumulating);
        let rollup = c.insert(key(1, 110), 1.0).unwrap().unwrap();
        assert!(!rollup.is_final);
        assert_eq!(rollup.base, vec![(key(1, 100), Stats::new(1.0))]);
        assert!(c.finish().unwrap().unwrap().is_final);
        assert_eq!(c.phase(), Phase::Closed);
        assert_eq!(c.insert(key(1, 120), 1.0).unwrap_err(), Error::StreamClosed);
        assert_eq!(c.finish().unwrap_err(), Error::StreamClosed);
    }

    #[test]
    fn empty_stream_test() {
        let mut c = controller(1);
        assert!(c.finish().unwrap().is_none());
        assert_eq!(c.phase(), Phase::Closed);
    }

    #[test]
    fn protocol_violations_test() {
        let mut c = controller(1);
        c.insert(key(1, 100), 1.0).unwrap();
        assert_eq!(
            c.insert(key(1, 105), 1.0).unwrap_err(),
            Error::UnalignedBucket {
                bucket: 105,
                group_seconds: 10
            }
        );
        assert!(matches!(
            c.insert(key(1, 90), 1.0),
            Err(Error::TimeRegression { .. })
        ));
        assert!(matches!(
            c.insert(key(1, 120), 1.0),
            Err(Error::MissingWindow { .. })
        ));
        let bad = Key::new([Value::U32(1), Value::U32(100)]);
        assert!(matches!(
            c.insert(bad, 1.0),
            Err(Error::InvalidTimeDimension { dim: 1, .. })
        ));
    }

    #[test]
    fn base_is_empty_after_rollup_test() {
        let mut c = controller(1);
        for t in [100, 110, 120, 130] {
            c.insert(key(1, t), 2.0).unwrap();
            c.insert(key(2, t), 3.0).unwrap();
        }
        c.finish().unwrap();
        assert!(c.base().is_empty());
        assert!(c.cube().iter().all(|(k, _)| !k.is_used(1)));
        assert_eq!(c.state().completed(), 2);
        assert_eq!(c.diagnostics().rollups, 4);
    }

    #[test]
    fn deferred_rollup_test() {
        let mut c = controller(usize::MAX);
        for t in [100, 110, 120] {
            assert!(c.insert(key(1, t), 1.0).unwrap().is_none());
        }
        assert_eq!(c.base().len(), 3);
        assert_eq!(c.diagnostics().rollups_skipped, 2);
        let rollup = c.finish().unwrap().unwrap();
        assert_eq!(rollup.base.len(), 3);
        assert_eq!(c.diagnostics().rollups, 1);

        let host = PartialKey::with_mask(key(1, 0), Mask::single(0));
        assert_eq!(c.rates().get(&host).unwrap().windows(), 1);
    }

    #[test]
    fn report_gate_filters_rows_test() {
        let mut c = controller(1);
        for t in [100, 110, 120] {
            c.insert(key(1, t), 1.0).unwrap();
        }
        let rollup = c.finish().unwrap().unwrap();
        // HadWildcard drops the fully-used (host, time) rows
        assert!(rollup.time_cube.iter().all(|(k, _)| !k.is_used(0)));
        assert_eq!(rollup.time_cube.len(), 1);
        assert_eq!(
            rollup
                .non_time_cube
                .iter()
                .map(|(k, _)| k.to_string())
                .collect::<Vec<_>>(),
            vec!["1 *", "* *"]
        );
    }
}
