use thiserror::Error;

/// Errors raised while building rollups
///
/// All variants are fatal for the run. Protocol violations mean the upstream
/// event source broke its contract, while [Error::Invariant] means the
/// aggregation logic itself is wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An event arrived with a timestamp or bucket earlier than one already seen
    #[error("time went backwards: {found} arrived after {previous}")]
    TimeRegression {
        /// Latest time seen so far
        previous: i64,
        /// Offending time
        found: i64,
    },

    /// A bucket was skipped between two consecutive events
    #[error("missing window: expected bucket {expected}, found {found}")]
    MissingWindow {
        /// The bucket that should have followed
        expected: i64,
        /// The bucket that arrived instead
        found: i64,
    },

    /// A key carried a time value that is not a multiple of the group width
    #[error("time bucket {bucket} is not aligned to {group_seconds}s groups")]
    UnalignedBucket {
        /// Offending time value
        bucket: i64,
        /// Configured group width
        group_seconds: i32,
    },

    /// A timestamp does not fit into a 32-bit time bucket
    #[error("timestamp {0} does not fit a 32-bit time bucket")]
    TimestampOutOfRange(i64),

    /// The configured time dimension does not hold an `I32` value
    #[error("dimension {dim} does not hold a 32-bit time bucket, found {found}")]
    InvalidTimeDimension {
        /// Configured time dimension
        dim: usize,
        /// What was found at that position
        found: String,
    },

    /// Events or a second `finish` arrived after end-of-stream
    #[error("stream already closed")]
    StreamClosed,

    /// An option name is not recognised
    #[error("unknown option '{0}'")]
    UnknownOption(String),

    /// An option value could not be accepted
    #[error("invalid value '{value}' for option '{name}'")]
    InvalidOption {
        /// Option name
        name: String,
        /// Rejected value
        value: String,
    },

    /// The number of completed windows disagrees with the observed time range
    #[error("window count mismatch: {completed} windows in {elapsed}s of {group_seconds}s groups")]
    WindowCount {
        /// `max_time_closed - min_time_seen`
        elapsed: i64,
        /// Configured group width
        group_seconds: i32,
        /// Counted complete windows
        completed: i64,
    },

    /// An internal aggregation invariant does not hold
    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// Result alias used throughout the crate
pub type Result<T, E = Error> = core::result::Result<T, E>;
