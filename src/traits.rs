//! Core traits for mergeable accumulators
//!
//! Every accumulator in this crate implements [`Accumulator`], so partial
//! states built on different workers (threads, processes, machines) can be
//! combined into one. [`TraceSample`] describes the integer sample types a
//! trace may be supplied in.

use core::fmt::Debug;

use crate::error::Result;

/// Core trait for all mergeable accumulators
pub trait Accumulator: Clone + Debug {
    /// Merge another accumulator into this one
    ///
    /// Returns an error if the accumulators are incompatible. On error `self`
    /// is left unchanged.
    fn merge(&mut self, other: &Self) -> Result<()>;

    /// Reset to the zero state
    fn clear(&mut self);

    /// Memory usage in bytes
    fn size_bytes(&self) -> usize;

    /// Number of traces folded in
    fn count(&self) -> u64;

    /// Check if nothing has been accumulated
    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Integer sample type a trace can be supplied in.
///
/// Traces live in the 16-bit signed domain. Narrower types always fit; wider
/// types are accepted but every sample is checked with [`in_domain`](Self::in_domain)
/// before it reaches an accumulator.
pub trait TraceSample: Copy + Send + Sync + Debug {
    /// Whether the value fits the i16 trace domain
    fn in_domain(self) -> bool;

    /// Widen to f64
    fn to_f64(self) -> f64;
}

macro_rules! narrow_sample {
    ($($t:ty),*) => {
        $(
            impl TraceSample for $t {
                #[inline(always)]
                fn in_domain(self) -> bool {
                    true
                }

                #[inline(always)]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

macro_rules! wide_sample {
    ($($t:ty),*) => {
        $(
            impl TraceSample for $t {
                #[inline(always)]
                fn in_domain(self) -> bool {
                    i16::try_from(self).is_ok()
                }

                #[inline(always)]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

narrow_sample!(i8, u8, i16);
wide_sample!(u16, i32, i64);
