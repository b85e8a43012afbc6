//! Per-host traffic rollups over a stream of request/response events
//!
//! Every event is counted twice: once as `send` at its source host and once as
//! `recv` at its destination host. Keys have five dimensions, see [HOST],
//! [IS_SEND], [TIME], [OPERATION] and [IS_REQUEST].

use rollcube_stats::{Stats, approx_eq};

use crate::{
    diagnostics::Diagnostics,
    error::{Error, Result},
    key::{Key, Mask, PartialKey, Value},
    rates::Rates,
    window::{Rollup, WindowController, bucket},
};

mod options;

pub use options::{CubeAxes, Options};

/// Number of dimensions of a [HostKey]
pub const DIMS: usize = 5;
/// Host id dimension
pub const HOST: usize = 0;
/// Direction dimension, `true` for send
pub const IS_SEND: usize = 1;
/// Time bucket dimension
pub const TIME: usize = 2;
/// Operation id dimension
pub const OPERATION: usize = 3;
/// Request/response dimension, `true` for request
pub const IS_REQUEST: usize = 4;

/// Full key of the host rollups
pub type HostKey = Key<DIMS>;

/// Builds a [HostKey]
#[inline]
pub fn host_key(host: u32, is_send: bool, time: i32, operation: u8, is_request: bool) -> HostKey {
    Key::new([
        Value::U32(host),
        Value::Bool(is_send),
        Value::I32(time),
        Value::U8(operation),
        Value::Bool(is_request),
    ])
}

/// A decoded request or response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// Seconds since the epoch
    pub timestamp: i64,
    /// Sending host
    pub source: u32,
    /// Receiving host
    pub dest: u32,
    /// Operation id
    pub operation: u8,
    /// Whether this is a request rather than a response
    pub is_request: bool,
    /// Payload size in bytes
    pub payload: u32,
}

/// Everything a finished [HostInfo] run produced
#[derive(Debug, Clone)]
pub struct HostReport {
    /// The end-of-stream rollup, `None` for an empty stream
    pub final_rollup: Option<Rollup<DIMS>>,
    /// Rate table in natural key order; the time dimension is always wildcarded
    pub rates: Vec<(PartialKey<DIMS>, Rates)>,
    /// Number of complete windows, excluding the partial first and last ones
    pub completed_windows: i64,
    /// Window width in seconds
    pub group_seconds: i32,
    /// First bucket seen
    pub min_time: Option<i32>,
    /// Last bucket seen
    pub max_time: Option<i32>,
    /// Whether the sanity checks ran and passed
    pub checked: bool,
    /// Run counters
    pub diagnostics: Diagnostics,
}

/// Host rollup pipeline
///
/// # Example
///
/// ```
/// use rollcube::hostinfo::{Event, HostInfo, Options};
///
/// let mut info = HostInfo::new(Options::new(10).with_test(true)).unwrap();
/// for timestamp in [100, 101, 110, 111, 120, 121] {
///     let event = Event {
///         timestamp,
///         source: 1,
///         dest: 2,
///         operation: 3,
///         is_request: true,
///         payload: 50,
///     };
///     info.process(&event).unwrap();
/// }
/// let report = info.finish().unwrap();
/// assert!(report.checked);
/// assert_eq!(report.completed_windows, 1);
/// ```
#[derive(Debug)]
pub struct HostInfo {
    options: Options,
    controller: WindowController<DIMS>,
    payload: Stats,
    last_timestamp: Option<i64>,
}

impl HostInfo {
    /// Creates a pipeline, validating `options`
    pub fn new(options: Options) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            controller: WindowController::new(options.window_conf())?,
            payload: Stats::default(),
            last_timestamp: None,
        })
    }

    /// Absorbs one event, returning the rollup it triggered, if any
    pub fn process(&mut self, event: &Event) -> Result<Option<Rollup<DIMS>>> {
        if let Some(previous) = self.last_timestamp {
            if event.timestamp < previous {
                return Err(Error::TimeRegression {
                    previous,
                    found: event.timestamp,
                });
            }
        }
        let time = bucket(event.timestamp, self.options.group_seconds())?;
        let payload = f64::from(event.payload);

        let send = host_key(event.source, true, time, event.operation, event.is_request);
        let rollup = self.controller.insert(send, payload)?;
        let recv = host_key(event.dest, false, time, event.operation, event.is_request);
        let second = self.controller.insert(recv, payload)?;

        self.payload.add(payload);
        self.last_timestamp = Some(event.timestamp);
        Ok(rollup.or(second))
    }

    /// Runs the final rollup and, in test mode, the sanity checks
    pub fn finish(&mut self) -> Result<HostReport> {
        let final_rollup = self.controller.finish()?;
        if self.options.test() {
            self.sanity_check()?;
        }
        let state = self.controller.state();
        Ok(HostReport {
            final_rollup,
            rates: self
                .controller
                .rates()
                .iter_ordered()
                .into_iter()
                .map(|(k, v)| (*k, v.clone()))
                .collect(),
            completed_windows: state.completed(),
            group_seconds: state.group_seconds(),
            min_time: state.min_time_seen(),
            max_time: state.max_time_closed(),
            checked: self.options.test(),
            diagnostics: self.controller.diagnostics().clone(),
        })
    }

    /// Cross-checks the cube and rate table against independently kept totals
    ///
    /// Only meaningful after [HostInfo::finish].
    pub fn sanity_check(&self) -> Result<()> {
        let empty = Stats::default();
        let cube = self.controller.cube();
        let probe = host_key(0, true, 0, 0, true);

        let send = PartialKey::with_mask(probe, Mask::single(IS_SEND));
        let sent = cube.get(&send).unwrap_or(&empty);
        check_stats(&send, sent, &self.payload, 1)?;

        let all = PartialKey::new(probe);
        let total = cube.get(&all).unwrap_or(&empty);
        check_stats(&all, total, &self.payload, 2)?;

        let expected = self.controller.state().completed().max(0);
        let rates = self.controller.rates();
        let recv = PartialKey::with_mask(host_key(0, false, 0, 0, true), Mask::single(IS_SEND));
        for key in [all, send, recv] {
            let windows = rates.get(&key).map_or(0, |r| r.windows()) as i64;
            if windows != expected {
                return Err(Error::Invariant(format!(
                    "rate entry {key} has {windows} observations, expected {expected}"
                )));
            }
        }
        Ok(())
    }

    /// The options in use
    pub fn options(&self) -> &Options {
        &self.options
    }
    /// The underlying controller
    pub fn controller(&self) -> &WindowController<DIMS> {
        &self.controller
    }
    /// Statistics of every payload processed, counted once
    pub fn payload(&self) -> &Stats {
        &self.payload
    }
}

fn check_stats(key: &PartialKey<DIMS>, found: &Stats, payload: &Stats, factor: u64) -> Result<()> {
    let expected = payload.count() * factor;
    if found.count() != expected {
        return Err(Error::Invariant(format!(
            "{key} counted {} events, expected {expected}",
            found.count()
        )));
    }
    if !approx_eq(found.mean(), payload.mean()) || !approx_eq(found.stddev(), payload.stddev()) {
        return Err(Error::Invariant(format!(
            "{key} has mean {:.20} stddev {:.20}, expected mean {:.20} stddev {:.20}",
            found.mean(),
            found.stddev(),
            payload.mean(),
            payload.stddev()
        )));
    }
    Ok(())
}
