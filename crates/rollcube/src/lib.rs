//! rollcube maintains OLAP cubes over windowed event streams.
//!
//! Events are aggregated exactly per key into a base map. At window boundaries
//! the base map is rolled into a [StatsCube] holding every `2^D` wildcard
//! projection of each key, per-window rates are derived by a [RateNormalizer]
//! and time-sliced cube entries are pruned, keeping memory bounded.
//!
//! # Example
//!
//! ```
//! use rollcube::{Key, Mask, PartialKey, Value, WindowConf, WindowController, bucket};
//!
//! // (host, time)
//! let conf = WindowConf::new(10, 1);
//! let mut controller = WindowController::<2>::new(conf).unwrap();
//!
//! let events = [(100, 1, 10.0), (112, 1, 20.0), (115, 2, 30.0), (121, 1, 5.0)];
//! for (timestamp, host, bytes) in events {
//!     let key = Key::new([Value::U32(host), Value::I32(bucket(timestamp, 10).unwrap())]);
//!     controller.insert(key, bytes).unwrap();
//! }
//! controller.finish().unwrap();
//!
//! let totals = PartialKey::with_mask(Key::new([Value::U32(1), Value::I32(0)]), Mask::single(0));
//! assert_eq!(controller.cube().get(&totals).unwrap().count(), 3);
//!
//! // only the window at t=110 is complete
//! let rates = controller.rates().get(&totals).unwrap();
//! assert_eq!(rates.windows(), 1);
//! ```
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

mod aggregator;
mod cube;
mod diagnostics;
mod distinct;
mod error;
mod key;
mod map;
mod rates;
mod window;

pub mod hostinfo;

pub use aggregator::Accumulator;
pub use cube::{BaseMap, CubeGate, CubeMerge, StatsCube};
pub use diagnostics::Diagnostics;
pub use distinct::DistinctValues;
pub use error::{Error, Result};
pub use key::{Key, MAX_DIMS, Mask, PartialKey, Value};
pub use map::TupleStatsMap;
pub use rates::{RateNormalizer, Rates};
pub use window::{
    DEFAULT_INCREMENTAL_BATCH_SIZE, Phase, Rollup, WindowConf, WindowController, WindowState,
    bucket,
};

pub use rollcube_stats as stats;
