use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use rollcube::{
    Rollup,
    hostinfo::{DIMS, Event, HostInfo, HostReport, Options},
};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod input;
mod report;

use input::{EventReader, InputError};

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "Per-host OLAP rollups over request/response events",
    long_about = None
)]
struct Cli {
    /// Event file, one `timestamp source dest operation is_request payload` per line
    ///
    /// Reads stdin if omitted.
    input: Option<PathBuf>,

    /// Compact option string, e.g. `60,no_cube_host,incremental=1000`
    #[clap(short, long)]
    options: Option<String>,

    /// Window width in seconds
    #[clap(short, long, required_unless_present = "options")]
    group_seconds: Option<i32>,

    /// Never wildcard the time dimension in reported cube rows
    #[clap(long)]
    no_cube_time: bool,

    /// Never wildcard the host dimension in reported cube rows
    #[clap(long)]
    no_cube_host: bool,

    /// Skip the exact per-window tables
    #[clap(long)]
    no_print_base: bool,

    /// Skip the cube tables
    #[clap(long)]
    no_print_cube: bool,

    /// Run the sanity checks instead of printing the report
    #[clap(long)]
    test: bool,

    /// Cube through the distinct values of each dimension
    #[clap(long)]
    zero_cube: bool,

    /// Base entries buffered before a window boundary forces a rollup
    #[clap(long)]
    incremental: Option<usize>,

    /// Log filter used when RUST_LOG is unset
    #[clap(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn options(&self) -> Result<Options, CliError> {
        let mut options = match &self.options {
            Some(s) => s.parse::<Options>()?,
            None => Options::default(),
        };
        if let Some(group_seconds) = self.group_seconds {
            options = options.with_group_seconds(group_seconds);
        }
        if self.no_cube_time {
            options = options.with_cube_time(false);
        }
        if self.no_cube_host {
            options = options.with_cube_host(false);
        }
        if self.no_print_base {
            options = options.with_print_base(false);
        }
        if self.no_print_cube {
            options = options.with_print_cube(false);
        }
        if self.test {
            options = options.with_test(true);
        }
        if self.zero_cube {
            options = options.with_zero_cube(true);
        }
        if let Some(size) = self.incremental {
            options = options.with_incremental_batch_size(size);
        }
        options.validate()?;
        Ok(options)
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Engine(#[from] rollcube::Error),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("failed to open input: {0}")]
    Open(#[from] io::Error),
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let options = cli.options()?;
    tracing::debug!("running with {:?}", options);
    let mut info = HostInfo::new(options)?;

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };

    let group_seconds = options.group_seconds();
    let summary = drive(&mut info, EventReader::new(reader), |rollup| {
        report::print_rollup(rollup, group_seconds)
    })?;

    if summary.checked {
        for line in report::trailer(&summary) {
            println!("{line}");
        }
        println!("# sanity checks passed");
        return Ok(());
    }
    if let Some(rollup) = &summary.final_rollup {
        report::print_rollup(rollup, group_seconds);
    }
    report::print_report(&summary);
    Ok(())
}

/// Feeds `events` through `info`, handing every incremental rollup to `emit` as it completes
fn drive(
    info: &mut HostInfo,
    events: impl IntoIterator<Item = Result<Event, InputError>>,
    mut emit: impl FnMut(&Rollup<DIMS>),
) -> Result<HostReport, CliError> {
    for event in events {
        if let Some(rollup) = info.process(&event?)? {
            emit(&rollup);
        }
    }
    Ok(info.finish()?)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("aborted, report above is incomplete: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_option_string_test() {
        let cli = Cli::parse_from([
            "rollcube",
            "--options",
            "60,no_cube_host,incremental=10",
            "--incremental",
            "5",
            "--test",
        ]);
        let options = cli.options().unwrap();
        assert_eq!(options.group_seconds(), 60);
        assert!(!options.cube_host());
        assert!(options.test());
        assert_eq!(options.incremental_batch_size(), 5);
    }

    #[test]
    fn discrete_flags_test() {
        let cli = Cli::parse_from(["rollcube", "-g", "30", "--no-print-base", "events.txt"]);
        let options = cli.options().unwrap();
        assert_eq!(options.group_seconds(), 30);
        assert!(!options.print_base());
        assert_eq!(cli.input, Some(PathBuf::from("events.txt")));
    }

    #[test]
    fn rollups_are_emitted_while_streaming_test() {
        let input = "100 1 2 6 1 50\n110 1 2 6 1 50\n120 1 2 6 1 50\n130 1 2 6 bogus 50\n";
        let mut info = HostInfo::new("10,incremental=1".parse().unwrap()).unwrap();
        let mut seen = Vec::new();
        let result = drive(&mut info, EventReader::new(input.as_bytes()), |rollup| {
            seen.push((rollup.max_time, rollup.base.len()));
        });
        // both boundaries were handed out before the bad line stopped the run
        assert!(matches!(result, Err(CliError::Input(InputError::Parse { line: 4, .. }))));
        assert_eq!(seen, vec![(110, 2), (120, 2)]);
    }

    #[test]
    fn drive_returns_final_report_test() {
        let input = "100 1 2 6 1 50\n110 1 2 6 1 50\n120 1 2 6 1 50\n";
        let mut info = HostInfo::new("10,incremental=1,test".parse().unwrap()).unwrap();
        let mut emitted = 0;
        let report =
            drive(&mut info, EventReader::new(input.as_bytes()), |_| emitted += 1).unwrap();
        assert_eq!(emitted, 2);
        assert!(report.checked);
        assert_eq!(report.completed_windows, 1);
        assert!(report.final_rollup.unwrap().is_final);
    }

    #[test]
    fn group_seconds_required_test() {
        assert!(Cli::try_parse_from(["rollcube"]).is_err());
        let cli = Cli::parse_from(["rollcube", "-g", "0"]);
        assert!(matches!(
            cli.options(),
            Err(CliError::Engine(rollcube::Error::InvalidOption { .. }))
        ));
    }
}
