use proptest::prelude::*;
use rollcube_stats::{Stats, approx_eq};

fn stats_of(values: &[f64]) -> Stats {
    let mut stats = Stats::default();
    values.iter().for_each(|v| stats.add(*v));
    stats
}

fn assert_close(a: &Stats, b: &Stats) {
    assert_eq!(a.count(), b.count());
    assert!(approx_eq(a.mean(), b.mean()), "{} != {}", a.mean(), b.mean());
    // variance is a difference of large terms; allow a looser bound
    assert!(
        (a.variance() - b.variance()).abs() <= 1e-6 * f64::max(1.0, a.variance()),
        "{} != {}",
        a.variance(),
        b.variance()
    );
    assert_eq!(a.min(), b.min());
    assert_eq!(a.max(), b.max());
}

proptest! {
    #[test]
    fn merge_equals_sequential(
        values in prop::collection::vec(0.0f64..1e6, 0..200),
        split in 0usize..200,
    ) {
        let split = split.min(values.len());
        let mut merged = stats_of(&values[..split]);
        merged.merge(&stats_of(&values[split..]));
        assert_close(&merged, &stats_of(&values));
    }

    #[test]
    fn merge_is_associative(
        a in prop::collection::vec(0.0f64..1e4, 0..50),
        b in prop::collection::vec(0.0f64..1e4, 0..50),
        c in prop::collection::vec(0.0f64..1e4, 0..50),
    ) {
        let (sa, sb, sc) = (stats_of(&a), stats_of(&b), stats_of(&c));

        let mut left = sa;
        left.merge(&sb);
        left.merge(&sc);

        let mut bc = sb;
        bc.merge(&sc);
        let mut right = sa;
        right.merge(&bc);

        assert_close(&left, &right);
    }

    #[test]
    fn merge_is_commutative(
        a in prop::collection::vec(-1e4f64..1e4, 0..50),
        b in prop::collection::vec(-1e4f64..1e4, 0..50),
    ) {
        let mut ab = stats_of(&a);
        ab.merge(&stats_of(&b));
        let mut ba = stats_of(&b);
        ba.merge(&stats_of(&a));
        assert_close(&ab, &ba);
    }
}
