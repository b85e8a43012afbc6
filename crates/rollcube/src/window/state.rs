use crate::error::{Error, Result};

/// Lifecycle of a [WindowController](super::WindowController)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No event has been seen yet
    #[default]
    Open,
    /// Events are being grouped into windows
    Accumulating,
    /// The final window has been rolled up
    Closed,
}

/// Returns the start of the `group_seconds` wide bucket holding `timestamp`
///
/// Negative timestamps round down, so buckets always start at a multiple of `group_seconds`.
///
/// # Example
///
/// ```
/// assert_eq!(rollcube::bucket(117, 10).unwrap(), 110);
/// assert_eq!(rollcube::bucket(-3, 10).unwrap(), -10);
/// ```
pub fn bucket(timestamp: i64, group_seconds: i32) -> Result<i32> {
    if group_seconds <= 0 {
        return Err(Error::InvalidOption {
            name: "group_seconds".to_string(),
            value: group_seconds.to_string(),
        });
    }
    let start = timestamp
        .checked_sub(timestamp.rem_euclid(i64::from(group_seconds)))
        .ok_or(Error::TimestampOutOfRange(timestamp))?;
    i32::try_from(start).map_err(|_| Error::TimestampOutOfRange(timestamp))
}

/// Time bounds and the completed-window count of a stream
///
/// `max_time_closed` only grows, in steps of exactly `group_seconds`. The first and
/// last windows are partial and never count as completed, so once the stream is
/// closed `completed == (max_time_closed - min_time_seen) / group_seconds - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    group_seconds: i32,
    min_time_seen: i32,
    max_time_closed: i32,
    completed: i64,
}

impl WindowState {
    pub(crate) fn new(group_seconds: i32) -> Self {
        Self {
            group_seconds,
            min_time_seen: i32::MAX,
            max_time_closed: i32::MIN,
            completed: 0,
        }
    }

    /// Returns `true` once the first event has been seen
    #[inline]
    pub fn is_started(&self) -> bool {
        self.max_time_closed >= self.min_time_seen
    }
    /// Window width in seconds
    #[inline]
    pub fn group_seconds(&self) -> i32 {
        self.group_seconds
    }
    /// Bucket of the first event
    #[inline]
    pub fn min_time_seen(&self) -> Option<i32> {
        self.is_started().then_some(self.min_time_seen)
    }
    /// Bucket of the latest window boundary
    #[inline]
    pub fn max_time_closed(&self) -> Option<i32> {
        self.is_started().then_some(self.max_time_closed)
    }
    /// Number of complete windows
    ///
    /// While accumulating this includes the current window; it becomes final once
    /// the stream is closed and is `-1` for a single-window stream.
    #[inline]
    pub fn completed(&self) -> i64 {
        self.completed
    }
    /// Seconds between the first and latest bucket
    #[inline]
    pub fn elapsed(&self) -> i64 {
        if self.is_started() {
            i64::from(self.max_time_closed) - i64::from(self.min_time_seen)
        } else {
            0
        }
    }

    #[inline]
    pub(crate) fn bounds(&self) -> (i32, i32) {
        (self.min_time_seen, self.max_time_closed)
    }

    pub(crate) fn start(&mut self, bucket: i32) {
        self.min_time_seen = bucket;
        self.max_time_closed = bucket;
    }

    /// Moves the watermark to `bucket`, which must be the next window
    pub(crate) fn advance(&mut self, bucket: i32) -> Result<()> {
        let previous = i64::from(self.max_time_closed);
        let found = i64::from(bucket);
        if found < previous {
            return Err(Error::TimeRegression { previous, found });
        }
        let expected = previous + i64::from(self.group_seconds);
        if found != expected {
            return Err(Error::MissingWindow { expected, found });
        }
        self.max_time_closed = bucket;
        if bucket > self.min_time_seen {
            self.completed += 1;
        }
        Ok(())
    }

    /// Drops the trailing partial window from the count and verifies it
    pub(crate) fn close(&mut self) -> Result<()> {
        self.completed -= 1;
        let elapsed = self.elapsed();
        let group_seconds = i64::from(self.group_seconds);
        if elapsed % group_seconds != 0 || elapsed / group_seconds - 1 != self.completed {
            return Err(Error::WindowCount {
                elapsed,
                group_seconds: self.group_seconds,
                completed: self.completed,
            });
        }
        Ok(())
    }
}
