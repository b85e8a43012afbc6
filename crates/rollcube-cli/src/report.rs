use prettytable::{Table, row};
use rollcube::{
    PartialKey, Rollup,
    hostinfo::{DIMS, HOST, HostReport, IS_REQUEST, IS_SEND, OPERATION, TIME},
    stats::Stats,
};

const MIB: f64 = 1024.0 * 1024.0;

const DOUBLE_COUNT_NOTE: &str = "# Note that the all * rollup double counts operations \
    since we count both the send and the receive";

fn field(key: &PartialKey<DIMS>, dim: usize, f: impl FnOnce(&rollcube::Value) -> String) -> String {
    key.get(dim).map_or_else(|| "*".to_string(), f)
}

fn host(key: &PartialKey<DIMS>) -> String {
    field(key, HOST, |v| match v.as_u32() {
        Some(host) => format!("{host:08x}"),
        None => v.to_string(),
    })
}

fn time(key: &PartialKey<DIMS>) -> String {
    field(key, TIME, |v| v.to_string())
}

fn direction(key: &PartialKey<DIMS>) -> String {
    field(key, IS_SEND, |v| match v.as_bool() {
        Some(true) => "send".to_string(),
        _ => "recv".to_string(),
    })
}

fn operation(key: &PartialKey<DIMS>) -> String {
    field(key, OPERATION, |v| v.to_string())
}

fn op_direction(key: &PartialKey<DIMS>) -> String {
    field(key, IS_REQUEST, |v| match v.as_bool() {
        Some(true) => "request".to_string(),
        _ => "response".to_string(),
    })
}

fn stats_table<'a>(rows: impl IntoIterator<Item = (PartialKey<DIMS>, &'a Stats)>) -> Table {
    let mut table = Table::new();
    table.set_titles(row!["host", "time", "dir", "op", "op-dir", "count", "mean"]);
    for (key, stats) in rows {
        table.add_row(row![
            host(&key),
            r->time(&key),
            direction(&key),
            r->operation(&key),
            op_direction(&key),
            r->stats.count(),
            r->format!("{:.2}", stats.mean()),
        ]);
    }
    table
}

/// Exact per-window rows of a rollup
pub fn base_table(rollup: &Rollup<DIMS>) -> Table {
    stats_table(rollup.base.iter().map(|(k, v)| (PartialKey::full(*k), v)))
}

/// Time-sliced cube rows of a rollup
pub fn time_cube_table(rollup: &Rollup<DIMS>) -> Table {
    stats_table(rollup.time_cube.iter().map(|(k, v)| (*k, v)))
}

/// Cube rows with the time dimension wildcarded
pub fn non_time_cube_table(rollup: &Rollup<DIMS>) -> Table {
    stats_table(rollup.non_time_cube.iter().map(|(k, v)| (*k, v)))
}

/// Per-entity rate distributions
pub fn rate_table(report: &HostReport) -> Table {
    let mut table = Table::new();
    table.set_titles(row![
        "host", "dir", "op", "op-dir", "windows", "ops/s", "p50", "p99", "MiB/s"
    ]);
    for (key, rates) in &report.rates {
        let ops = rates.ops_sketch.percentiles();
        table.add_row(row![
            host(key),
            direction(key),
            r->operation(key),
            op_direction(key),
            r->rates.windows(),
            r->format!("{:.2}", rates.ops.mean()),
            r->format!("{:.2}", ops.p50),
            r->format!("{:.2}", ops.p99),
            r->format!("{:.3}", rates.bytes.mean() / MIB),
        ]);
    }
    table
}

/// Closing notes on the processed range
pub fn trailer(report: &HostReport) -> Vec<String> {
    let mut lines = Vec::new();
    if report.completed_windows > 0 {
        lines.push(DOUBLE_COUNT_NOTE.to_string());
    }
    lines.push(format!(
        "# Processed {} complete groups of size {}s (ignored the partial first and last groups)",
        report.completed_windows.max(0),
        report.group_seconds
    ));
    if let (Some(min), Some(max)) = (report.min_time, report.max_time) {
        lines.push(format!("# Total time range was [{min}..{max}]"));
    }
    lines
}

fn print_section(title: &str, table: &Table) {
    if table.is_empty() {
        return;
    }
    println!("{title}");
    table.printstd();
}

/// Prints every non-empty table of a rollup
pub fn print_rollup(rollup: &Rollup<DIMS>, group_seconds: i32) {
    let window = format!("]{}, {}[", rollup.min_time, rollup.max_time);
    print_section(&format!("HostInfo {group_seconds}s base {window}"), &base_table(rollup));
    print_section(&format!("HostInfo {group_seconds}s cube {window}"), &time_cube_table(rollup));
    print_section(
        &format!("HostInfo {group_seconds}s cube, all time"),
        &non_time_cube_table(rollup),
    );
}

/// Prints the rate table and trailer
pub fn print_report(report: &HostReport) {
    print_section(&format!("HostInfo {}s rates", report.group_seconds), &rate_table(report));
    for line in trailer(report) {
        println!("{line}");
    }
}
