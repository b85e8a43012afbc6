use rollcube::{
    BaseMap, CubeGate, CubeMerge, Diagnostics, Mask, PartialKey, Rollup, StatsCube,
    hostinfo::{DIMS, Event, HOST, HostInfo, IS_SEND, Options, TIME, host_key},
};

const HOST_ID: u32 = 0x0a00_0001;

fn event(timestamp: i64) -> Event {
    Event {
        timestamp,
        source: HOST_ID,
        dest: HOST_ID,
        operation: 6,
        is_request: true,
        payload: 50,
    }
}

fn run(options: Options) -> (HostInfo, Vec<Rollup<DIMS>>) {
    let mut info = HostInfo::new(options).unwrap();
    let mut rollups = Vec::new();
    for t in [100, 104, 110, 114, 120, 124] {
        if let Some(rollup) = info.process(&event(t)).unwrap() {
            rollups.push(rollup);
        }
    }
    (info, rollups)
}

#[test]
fn three_window_scenario_test() {
    let (mut info, rollups) = run("10,incremental=1".parse().unwrap());
    assert_eq!(rollups.len(), 2);

    // closing t=110 when t=120 arrives
    let second = &rollups[1];
    assert_eq!(second.max_time, 120);
    assert_eq!(second.base.len(), 2);
    for (key, stats) in &second.base {
        assert_eq!(key[TIME].as_i32(), Some(110));
        assert_eq!(stats.count(), 2);
        assert_eq!(stats.mean(), 50.0);
    }

    let mut window = BaseMap::new();
    for (key, stats) in &second.base {
        window.entry(*key).merge(stats);
    }
    let mut cube = StatsCube::new(CubeGate::All, CubeMerge::Full);
    cube.add(&window, &mut Diagnostics::default());
    let all = cube.get(&PartialKey::new(host_key(0, true, 0, 0, true))).unwrap();
    assert_eq!(all.count(), 4);
    assert_eq!(all.mean(), 50.0);

    let sliced = second
        .time_cube
        .iter()
        .find(|(k, _)| k.used() == Mask::single(TIME))
        .unwrap();
    assert_eq!(sliced.1.count(), 4);

    let report = info.finish().unwrap();
    assert_eq!(report.completed_windows, 1);
    assert_eq!(report.min_time, Some(100));
    assert_eq!(report.max_time, Some(120));

    let host_send = PartialKey::with_mask(
        host_key(HOST_ID, true, 0, 0, true),
        Mask::single(HOST).with(IS_SEND, true),
    );
    let (_, rates) = report.rates.iter().find(|(k, _)| *k == host_send).unwrap();
    assert_eq!(rates.windows(), 1);
    assert_eq!(rates.ops.mean(), 0.2);
    assert_eq!(rates.bytes.mean(), 10.0);

    let total = info
        .controller()
        .cube()
        .get(&PartialKey::new(host_key(0, true, 0, 0, true)))
        .unwrap();
    assert_eq!(total.count(), 12);
}

#[test]
fn scenario_passes_sanity_checks_test() {
    for options in ["10,test", "10,test,incremental=1", "10,test,zero_cube,incremental=1"] {
        let (mut info, _) = run(options.parse().unwrap());
        let report = info.finish().unwrap();
        assert!(report.checked);
        assert_eq!(report.completed_windows, 1);
        assert!(report.rates.iter().all(|(_, r)| r.windows() == 1));
    }
}

#[test]
fn test_mode_collects_no_rows_test() {
    let (mut info, rollups) = run("10,test,incremental=1".parse().unwrap());
    assert!(rollups.iter().all(|r| r.base.is_empty() && r.time_cube.is_empty()));
    let report = info.finish().unwrap();
    let last = report.final_rollup.unwrap();
    assert!(last.is_final);
    assert!(last.non_time_cube.is_empty());
}

#[test]
fn single_window_has_no_rates_test() {
    let mut info = HostInfo::new(Options::new(60).with_test(true)).unwrap();
    for t in [600, 610, 620] {
        info.process(&event(t)).unwrap();
    }
    let report = info.finish().unwrap();
    assert_eq!(report.completed_windows, -1);
    assert!(report.rates.is_empty());
}
