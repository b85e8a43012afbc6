use core::str::FromStr;

use crate::{
    cube::CubeGate,
    error::{Error, Result},
    key::Mask,
    window::{DEFAULT_INCREMENTAL_BATCH_SIZE, WindowConf},
};

use super::{HOST, TIME};

/// Which of the host and time dimensions may be wildcarded in reported cube rows
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CubeAxes {
    /// Both dimensions take part in wildcarding
    #[default]
    All,
    /// The host dimension is always kept
    ExceptHost,
    /// The time dimension is always kept
    ExceptTime,
    /// Neither host nor time is ever wildcarded
    ExceptBoth,
}

impl CubeAxes {
    /// Maps the `cube_time` and `cube_host` toggles onto axes
    pub fn from_toggles(cube_time: bool, cube_host: bool) -> Self {
        match (cube_time, cube_host) {
            (true, true) => CubeAxes::All,
            (true, false) => CubeAxes::ExceptHost,
            (false, true) => CubeAxes::ExceptTime,
            (false, false) => CubeAxes::ExceptBoth,
        }
    }

    /// The cube gate selecting the reported subsets
    pub fn gate(&self) -> CubeGate {
        match self {
            CubeAxes::All => CubeGate::HadWildcard,
            CubeAxes::ExceptHost => CubeGate::Retain(Mask::single(HOST)),
            CubeAxes::ExceptTime => CubeGate::Retain(Mask::single(TIME)),
            CubeAxes::ExceptBoth => CubeGate::Retain(Mask::single(HOST).with(TIME, true)),
        }
    }
}

/// Options of a [HostInfo](super::HostInfo) run
///
/// Parsed from strings of the form `<group_seconds>[,opt]*`, where `opt` is one of
/// `cube_time`, `cube_host`, `print_base`, `print_cube`, `test` or `zero_cube`,
/// optionally prefixed with `no_`, or `incremental=<n>`.
///
/// # Example
///
/// ```
/// use rollcube::hostinfo::Options;
///
/// let options: Options = "60,no_cube_host,incremental=1000,test".parse().unwrap();
/// assert_eq!(options.group_seconds(), 60);
/// assert!(!options.cube_host());
/// assert!(options.test());
/// assert_eq!(options.incremental_batch_size(), 1000);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    group_seconds: i32,
    cube_time: bool,
    cube_host: bool,
    print_base: bool,
    print_cube: bool,
    test: bool,
    zero_cube: bool,
    incremental_batch_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            group_seconds: 1,
            cube_time: true,
            cube_host: true,
            print_base: true,
            print_cube: true,
            test: false,
            zero_cube: false,
            incremental_batch_size: DEFAULT_INCREMENTAL_BATCH_SIZE,
        }
    }
}

impl Options {
    /// Default options for windows of `group_seconds`
    pub fn new(group_seconds: i32) -> Self {
        Self {
            group_seconds,
            ..Default::default()
        }
    }

    /// Sets the window width
    pub fn with_group_seconds(mut self, group_seconds: i32) -> Self {
        self.group_seconds = group_seconds;
        self
    }
    /// Whether the time dimension is wildcarded in reported cube rows
    pub fn with_cube_time(mut self, cube_time: bool) -> Self {
        self.cube_time = cube_time;
        self
    }
    /// Whether the host dimension is wildcarded in reported cube rows
    pub fn with_cube_host(mut self, cube_host: bool) -> Self {
        self.cube_host = cube_host;
        self
    }
    /// Report the exact per-window rollups
    pub fn with_print_base(mut self, print_base: bool) -> Self {
        self.print_base = print_base;
        self
    }
    /// Report the cubed rollups
    pub fn with_print_cube(mut self, print_cube: bool) -> Self {
        self.print_cube = print_cube;
        self
    }
    /// Run the sanity checks instead of producing the report
    pub fn with_test(mut self, test: bool) -> Self {
        self.test = test;
        self
    }
    /// Use the distinct-value cubing path
    pub fn with_zero_cube(mut self, zero_cube: bool) -> Self {
        self.zero_cube = zero_cube;
        self
    }
    /// Base entries buffered before a window boundary forces a rollup
    pub fn with_incremental_batch_size(mut self, size: usize) -> Self {
        self.incremental_batch_size = size;
        self
    }

    /// Window width in seconds
    pub fn group_seconds(&self) -> i32 {
        self.group_seconds
    }
    /// See [Options::with_cube_time]
    pub fn cube_time(&self) -> bool {
        self.cube_time
    }
    /// See [Options::with_cube_host]
    pub fn cube_host(&self) -> bool {
        self.cube_host
    }
    /// See [Options::with_print_base]
    pub fn print_base(&self) -> bool {
        self.print_base
    }
    /// See [Options::with_print_cube]
    pub fn print_cube(&self) -> bool {
        self.print_cube
    }
    /// See [Options::with_test]
    pub fn test(&self) -> bool {
        self.test
    }
    /// See [Options::with_zero_cube]
    pub fn zero_cube(&self) -> bool {
        self.zero_cube
    }
    /// See [Options::with_incremental_batch_size]
    pub fn incremental_batch_size(&self) -> usize {
        self.incremental_batch_size
    }
    /// Axes derived from the `cube_time` and `cube_host` toggles
    pub fn axes(&self) -> CubeAxes {
        CubeAxes::from_toggles(self.cube_time, self.cube_host)
    }

    /// Checks that the window width is positive
    pub fn validate(&self) -> Result<()> {
        if self.group_seconds <= 0 {
            return Err(Error::InvalidOption {
                name: "group_seconds".to_string(),
                value: self.group_seconds.to_string(),
            });
        }
        Ok(())
    }

    /// Engine configuration for these options
    pub fn window_conf(&self) -> WindowConf {
        WindowConf::new(self.group_seconds, TIME)
            .with_incremental_batch_size(self.incremental_batch_size)
            .with_sparse(self.zero_cube)
            .with_collect_base(self.print_base && !self.test)
            .with_collect_cube(self.print_cube && !self.test)
            .with_report_gate(self.axes().gate())
    }

    fn toggle(&mut self, name: &str, value: bool) -> bool {
        let flag = match name {
            "cube_time" => &mut self.cube_time,
            "cube_host" => &mut self.cube_host,
            "print_base" => &mut self.print_base,
            "print_cube" => &mut self.print_cube,
            "test" => &mut self.test,
            "zero_cube" => &mut self.zero_cube,
            _ => return false,
        };
        *flag = value;
        true
    }
}

impl FromStr for Options {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut args = s.split(',').map(str::trim);
        let first = args.next().unwrap_or_default();
        let group_seconds = first.parse::<i32>().map_err(|_| Error::InvalidOption {
            name: "group_seconds".to_string(),
            value: first.to_string(),
        })?;
        let mut options = Options::new(group_seconds);
        options.validate()?;

        for arg in args {
            if let Some(size) = arg.strip_prefix("incremental=") {
                options.incremental_batch_size =
                    size.parse().map_err(|_| Error::InvalidOption {
                        name: "incremental".to_string(),
                        value: size.to_string(),
                    })?;
                tracing::debug!("incremental batch size {}", options.incremental_batch_size);
            } else if let Some(name) = arg.strip_prefix("no_") {
                if !options.toggle(name, false) {
                    return Err(Error::UnknownOption(arg.to_string()));
                }
            } else if !options.toggle(arg, true) {
                return Err(Error::UnknownOption(arg.to_string()));
            }
        }
        Ok(options)
    }
}
