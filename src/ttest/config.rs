use validator::Validate;

use crate::error::Result;

/// Chunk count used by [`TtestAcc::update`](super::TtestAcc::update) unless configured otherwise.
pub const DEFAULT_CHUNKS: usize = 12;

/// Highest supported test order; a full-scale i16 delta raised to `2 * MAX_ORDER` stays finite.
pub const MAX_ORDER: usize = 16;

/// How a batch is split into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Partition {
    /// Consecutive slices of `ceil(len / chunks)` traces
    #[default]
    Contiguous,
    /// Round-robin: chunk `i` takes traces `i, i + chunks, i + 2 * chunks, ...`
    Interleaved,
}

impl TryFrom<&str> for Partition {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "contiguous" => Ok(Self::Contiguous),
            "interleaved" => Ok(Self::Interleaved),
            _ => Err(format!(
                "unknown partition '{s}', expected 'contiguous' or 'interleaved'"
            )),
        }
    }
}

/// Geometry and scheduling of a [`TtestAcc`](super::TtestAcc).
#[derive(Debug, Clone, PartialEq, Validate)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TtestConfig {
    /// Samples per trace
    #[validate(range(min = 1, message = "ns must be >= 1"))]
    pub ns: usize,
    /// Test order D, at most `MAX_ORDER`
    #[validate(range(min = 1, max = 16, message = "order must be in 1..=16"))]
    pub order: usize,
    /// Default chunk count for batch updates
    #[validate(range(min = 1, message = "chunks must be >= 1"))]
    pub chunks: usize,
    pub partition: Partition,
    /// Fold chunks on the calling thread instead of the rayon pool
    pub sequential: bool,
}

impl TtestConfig {
    pub fn new(ns: usize, order: usize) -> Self {
        Self {
            ns,
            order,
            chunks: DEFAULT_CHUNKS,
            partition: Partition::default(),
            sequential: false,
        }
    }

    pub fn with_chunks(mut self, chunks: usize) -> Self {
        self.chunks = chunks;
        self
    }

    pub fn with_partition(mut self, partition: Partition) -> Self {
        self.partition = partition;
        self
    }

    pub fn sequential(mut self, sequential: bool) -> Self {
        self.sequential = sequential;
        self
    }

    /// Check the configuration, mapping failures to
    /// [`Error::InvalidConfiguration`](crate::Error::InvalidConfiguration).
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        Ok(())
    }
}
