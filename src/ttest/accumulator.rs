use ndarray::{ArrayView1, ArrayView2};
use tracing::{debug, instrument, trace};

use super::config::TtestConfig;
use super::partition;
use super::statistic::Statistic;
use crate::error::{Error, Result};
use crate::statistics::MomentState;
use crate::traits::{Accumulator, TraceSample};

/// Streaming two-population t-test of arbitrary order.
///
/// Holds one [`MomentState`] per class. Batches are validated as a whole
/// before anything is mutated, folded chunk by chunk into fresh partial
/// states (in parallel with the `parallel` feature), and merged into the
/// long-lived state in chunk order.
///
/// All mutation goes through `&mut self`: one update is in flight per
/// accumulator, while independent accumulators can run concurrently.
///
/// # Example
///
/// ```
/// use leakstats::ttest::TtestAcc;
/// use ndarray::array;
///
/// let mut acc = TtestAcc::new(3, 1).unwrap();
/// let traces = array![[1i16, 1, 1], [3, 3, 3], [1, 1, 1], [1, 1, 1]];
/// let labels = array![0u16, 0, 1, 1];
///
/// acc.update_batch(traces.view(), labels.view(), 2).unwrap();
///
/// let stat = acc.finalize();
/// assert!((stat.t[0] - 2f64.sqrt()).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TtestAcc {
    config: TtestConfig,
    classes: [MomentState; 2],
}

impl TtestAcc {
    /// Zero accumulator for traces of `ns` samples and a test of order `order`.
    pub fn new(ns: usize, order: usize) -> Result<Self> {
        Self::with_config(TtestConfig::new(ns, order))
    }

    pub fn with_config(config: TtestConfig) -> Result<Self> {
        config.check()?;
        let classes = [
            MomentState::new(config.ns, config.order),
            MomentState::new(config.ns, config.order),
        ];
        Ok(Self { config, classes })
    }

    pub fn ns(&self) -> usize {
        self.config.ns
    }

    pub fn order(&self) -> usize {
        self.config.order
    }

    pub fn config(&self) -> &TtestConfig {
        &self.config
    }

    /// Moment state of one class.
    ///
    /// # Panics
    ///
    /// Panics if `label` is not 0 or 1.
    pub fn class(&self, label: usize) -> &MomentState {
        &self.classes[label]
    }

    /// Fold a batch using the configured chunk count and partition.
    pub fn update<S: TraceSample>(
        &mut self,
        traces: ArrayView2<'_, S>,
        labels: ArrayView1<'_, u16>,
    ) -> Result<()> {
        self.update_batch(traces, labels, self.config.chunks)
    }

    /// Fold a batch split into `chunks` independently processed partitions.
    ///
    /// `traces` has one trace per row and `labels` one class label (0 or 1)
    /// per trace. The whole batch is checked first; on error the accumulator
    /// is unchanged. The result does not depend on `chunks` beyond
    /// floating-point rounding.
    #[instrument(
        level = "debug",
        skip(self, traces, labels),
        fields(n_traces = traces.nrows(), partition = ?self.config.partition)
    )]
    pub fn update_batch<S: TraceSample>(
        &mut self,
        traces: ArrayView2<'_, S>,
        labels: ArrayView1<'_, u16>,
        chunks: usize,
    ) -> Result<()> {
        if chunks < 1 {
            return Err(Error::InvalidConfiguration(
                "chunks must be >= 1".to_string(),
            ));
        }
        self.validate(traces, labels)?;
        if traces.nrows() == 0 {
            return Ok(());
        }

        let split = partition::split(traces.nrows(), chunks, self.config.partition);
        let partials = partition::fold_chunks(
            traces,
            labels,
            &split,
            self.config.order,
            self.config.sequential,
        );

        for (i, partial) in partials.iter().enumerate() {
            trace!(
                chunk = i,
                n0 = partial[0].n(),
                n1 = partial[1].n(),
                "merging chunk"
            );
            for (class, local) in self.classes.iter_mut().zip(partial.iter()) {
                class.merge_validated(local);
            }
        }

        debug!(
            n0 = self.classes[0].n(),
            n1 = self.classes[1].n(),
            "batch folded"
        );
        Ok(())
    }

    /// Fold a batch trace by trace on the calling thread, without chunking.
    ///
    /// Same validation and semantics as [`update_batch`](Self::update_batch).
    pub fn update_reference<S: TraceSample>(
        &mut self,
        traces: ArrayView2<'_, S>,
        labels: ArrayView1<'_, u16>,
    ) -> Result<()> {
        self.validate(traces, labels)?;
        for (trace, &label) in traces.rows().into_iter().zip(labels.iter()) {
            self.classes[label as usize].push_validated(trace);
        }
        Ok(())
    }

    /// Current t-statistic.
    pub fn finalize(&self) -> Statistic {
        Statistic::from_states(&self.classes, self.config.order)
    }

    /// Reject the batch if any trace, label or sample is malformed.
    fn validate<S: TraceSample>(
        &self,
        traces: ArrayView2<'_, S>,
        labels: ArrayView1<'_, u16>,
    ) -> Result<()> {
        if traces.nrows() != labels.len() {
            return Err(Error::shape("label count", traces.nrows(), labels.len()));
        }
        if traces.ncols() != self.ns() {
            return Err(Error::shape("trace length", self.ns(), traces.ncols()));
        }
        if let Some((index, &label)) = labels.iter().enumerate().find(|(_, &l)| l > 1) {
            return Err(Error::InvalidLabel { index, label });
        }
        if let Some(((trace, position), _)) = traces.indexed_iter().find(|(_, s)| !s.in_domain())
        {
            return Err(Error::UnsupportedType { trace, position });
        }
        Ok(())
    }
}

impl Accumulator for TtestAcc {
    fn merge(&mut self, other: &Self) -> Result<()> {
        if self.ns() != other.ns() || self.order() != other.order() {
            return Err(Error::IncompatibleMerge {
                expected: format!("ns={} order={}", self.ns(), self.order()),
                found: format!("ns={} order={}", other.ns(), other.order()),
            });
        }
        for (class, theirs) in self.classes.iter_mut().zip(other.classes.iter()) {
            class.merge_validated(theirs);
        }
        Ok(())
    }

    fn clear(&mut self) {
        for class in self.classes.iter_mut() {
            class.clear();
        }
    }

    fn size_bytes(&self) -> usize {
        core::mem::size_of::<TtestConfig>()
            + self.classes.iter().map(|c| c.size_bytes()).sum::<usize>()
    }

    fn count(&self) -> u64 {
        self.classes.iter().map(|c| c.count()).sum()
    }
}
