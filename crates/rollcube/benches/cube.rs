use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rollcube::{
    BaseMap, CubeGate, CubeMerge, Diagnostics, DistinctValues, StatsCube, WindowController,
    hostinfo::{DIMS, HostKey, Options, host_key},
};

const GROUP_SECONDS: i32 = 60;

fn random_key(hosts: u32, time: i32) -> HostKey {
    host_key(
        fastrand::u32(0..hosts),
        fastrand::bool(),
        time,
        fastrand::u8(0..20),
        fastrand::bool(),
    )
}

fn random_base(entries: usize, hosts: u32) -> BaseMap<DIMS> {
    let mut base = BaseMap::new();
    for _ in 0..entries {
        base.add(random_key(hosts, 600), f64::from(fastrand::u32(0..65536)));
    }
    base
}

fn rollup(c: &mut Criterion) {
    let mut group = c.benchmark_group("rollup");
    for hosts in [4, 32] {
        let base = random_base(10_000, hosts);
        let mut distinct = DistinctValues::new();
        distinct.fill_from(&base);
        group.throughput(Throughput::Elements(base.len() as u64));

        group.bench_with_input(BenchmarkId::new("base", hosts), &base, |b, base| {
            b.iter(|| {
                let mut cube = StatsCube::new(CubeGate::All, CubeMerge::Full);
                cube.add(black_box(base), &mut Diagnostics::default());
                cube
            })
        });
        group.bench_with_input(BenchmarkId::new("zero_cube", hosts), &base, |b, base| {
            b.iter(|| {
                let mut cube = StatsCube::new(CubeGate::All, CubeMerge::Full);
                cube.add_sparse(black_box(base), &distinct, &mut Diagnostics::default());
                cube
            })
        });
    }
    group.finish();
}

fn stream(c: &mut Criterion) {
    let windows = 20;
    let events: Vec<HostKey> = (0..windows)
        .flat_map(|w| (0..1000).map(move |_| random_key(16, 600 + w * GROUP_SECONDS)))
        .collect();

    let mut group = c.benchmark_group("stream");
    group.throughput(Throughput::Elements(events.len() as u64));
    for batch in [1, 100_000] {
        group.bench_with_input(BenchmarkId::new("incremental", batch), &events, |b, events| {
            b.iter(|| {
                let conf = Options::new(GROUP_SECONDS)
                    .with_incremental_batch_size(batch)
                    .with_test(true)
                    .window_conf();
                let mut controller = WindowController::<DIMS>::new(conf).unwrap();
                for key in events {
                    controller.insert(*key, 512.0).unwrap();
                }
                controller.finish().unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, rollup, stream);
criterion_main!(benches);
