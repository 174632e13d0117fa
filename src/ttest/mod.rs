//! Higher-order Welch t-test for leakage assessment
//!
//! [`TtestAcc`] accumulates two populations of traces (fixed-key vs random,
//! or any other split) and reports per sample position whether their
//! distributions differ. The order-D test compares:
//!
//! - D = 1: means
//! - D = 2: variances
//! - D ≥ 3: standardized D-th central moments
//!
//! which detects leakage of implementations masked at order D − 1.
//!
//! # Example
//!
//! ```
//! use leakstats::ttest::{TtestAcc, TVLA_THRESHOLD};
//! use ndarray::{Array1, Array2};
//!
//! let mut acc = TtestAcc::new(4, 2).unwrap();
//!
//! let traces = Array2::from_shape_fn((100, 4), |(i, j)| ((i * 7 + j) % 13) as i16);
//! let labels = Array1::from_shape_fn(100, |i| (i % 2) as u16);
//! acc.update_batch(traces.view(), labels.view(), 4).unwrap();
//!
//! let stat = acc.finalize();
//! println!("leaking samples: {:?}", stat.leaking_positions(TVLA_THRESHOLD));
//! ```

mod accumulator;
mod config;
mod partition;
mod statistic;

pub use accumulator::TtestAcc;
pub use config::{Partition, TtestConfig, DEFAULT_CHUNKS, MAX_ORDER};
pub use statistic::{Statistic, TVLA_THRESHOLD};
