//! Streaming moment state
//!
//! This module provides the per-population state behind the t-test: running
//! means and central sums of arbitrary order, folded in one trace at a time
//! and mergeable across workers.
//!
//! # Example
//!
//! ```
//! use leakstats::statistics::MomentState;
//! use ndarray::array;
//!
//! let mut state = MomentState::new(3, 2);
//!
//! for trace in [array![1i16, 2, 3], array![3, 2, 1]] {
//!     state.push(trace.view()).unwrap();
//! }
//!
//! println!("Mean: {}", state.mean());
//! println!("Variance: {}", state.central_moment(2));
//! ```

mod moments;

pub use moments::MomentState;
