//! # Leakstats
//!
//! Streaming leakage-assessment statistics for side-channel analysis.
//!
//! Leakstats accumulates large volumes of side-channel traces split into two
//! populations and computes, per sample position, a Welch t-statistic of
//! arbitrary order. State is updated incrementally, batch by batch, and every
//! accumulator can be merged with another one without loss of numerical
//! fidelity.
//!
//! ## Features
//!
//! - **Higher-order t-test**: mean, variance and standardized-moment tests of any order D
//! - **Numerically stable**: online central-moment recurrences, no raw power sums
//! - **Chunk-parallel**: batches are folded in independent chunks and merged
//! - **Full Mergeability**: accumulators combine across threads or machines
//! - **Templates**: Gaussian template classifier with LDA profiling
//!
//! ## Quick Start
//!
//! ```rust
//! use leakstats::prelude::*;
//! use ndarray::array;
//!
//! let mut ttest = TtestAcc::new(3, 1).unwrap();
//!
//! let traces = array![[1i16, 1, 1], [3, 3, 3], [1, 1, 1], [1, 1, 1]];
//! let labels = array![0u16, 0, 1, 1];
//! ttest.update(traces.view(), labels.view()).unwrap();
//!
//! println!("t = {}", ttest.finalize().t);
//! ```
//!
//! ## Distributed Computing
//!
//! All accumulators implement the [`Accumulator`](traits::Accumulator) trait,
//! which includes a `merge` operation:
//!
//! ```rust
//! use leakstats::ttest::TtestAcc;
//! use leakstats::traits::Accumulator;
//! use ndarray::array;
//!
//! let mut worker1 = TtestAcc::new(2, 2).unwrap();
//! let mut worker2 = TtestAcc::new(2, 2).unwrap();
//!
//! // Each worker processes its share of the campaign
//! worker1.update(array![[1i16, 2], [3, 4]].view(), array![0u16, 1].view()).unwrap();
//! worker2.update(array![[5i16, 6], [7, 8]].view(), array![0u16, 1].view()).unwrap();
//!
//! // Merge results
//! worker1.merge(&worker2).unwrap();
//! assert_eq!(worker1.count(), 4);
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel` (default): fold batch chunks on the rayon thread pool
//! - `templates` (default): Gaussian templates and LDA profiling
//! - `serde`: Enable serialization
//! - `full`: Enable everything

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod statistics;
pub mod traits;
pub mod ttest;

#[cfg(feature = "templates")]
#[cfg_attr(docsrs, doc(cfg(feature = "templates")))]
pub mod templates;

pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::traits::*;
    pub use crate::ttest::{Partition, Statistic, TtestAcc, TtestConfig, TVLA_THRESHOLD};

    #[cfg(feature = "templates")]
    pub use crate::templates::{GaussianTemplates, LdaClassifier, LdaConfig};
}

pub use error::{Error, Result};
pub use ttest::{Statistic, TtestAcc};
