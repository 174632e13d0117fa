use std::iter::StepBy;
use std::ops::Range;

use ndarray::{ArrayView1, ArrayView2};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::config::Partition;
use crate::statistics::MomentState;
use crate::traits::TraceSample;

/// Trace indices of one chunk.
pub(crate) type Chunk = StepBy<Range<usize>>;

/// Split `len` traces into `chunks` index sets.
///
/// Always returns exactly `chunks` sets; when there are fewer traces than
/// chunks the trailing sets are empty.
pub(crate) fn split(len: usize, chunks: usize, partition: Partition) -> Vec<Chunk> {
    debug_assert!(chunks >= 1);
    match partition {
        Partition::Contiguous => {
            let size = len.div_ceil(chunks).max(1);
            (0..chunks)
                .map(|i| {
                    let start = (i * size).min(len);
                    let end = ((i + 1) * size).min(len);
                    (start..end).step_by(1)
                })
                .collect()
        }
        Partition::Interleaved => (0..chunks)
            .map(|i| (i.min(len)..len).step_by(chunks))
            .collect(),
    }
}

/// Fold every chunk into its own fresh pair of class states.
///
/// Inputs are already validated. Each worker only reads the batch and writes
/// its private partial state.
///
/// When `sequential` is true (or the `parallel` feature is off) chunks are
/// processed on the current thread.
pub(crate) fn fold_chunks<S: TraceSample>(
    traces: ArrayView2<'_, S>,
    labels: ArrayView1<'_, u16>,
    chunks: &[Chunk],
    order: usize,
    sequential: bool,
) -> Vec<[MomentState; 2]> {
    let ns = traces.ncols();
    let work = |rows: &Chunk| {
        let mut local = [MomentState::new(ns, order), MomentState::new(ns, order)];
        for i in rows.clone() {
            local[labels[i] as usize].push_validated(traces.row(i));
        }
        local
    };
    par_over_chunks(chunks, sequential, work)
}

/// Dispatch a per-chunk closure over chunks, optionally in parallel.
///
/// Results come back in chunk order either way.
#[cfg(feature = "parallel")]
fn par_over_chunks<T, F>(chunks: &[Chunk], sequential: bool, body: F) -> Vec<T>
where
    T: Send,
    F: Fn(&Chunk) -> T + Send + Sync,
{
    if sequential {
        chunks.iter().map(body).collect()
    } else {
        chunks.par_iter().map(body).collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn par_over_chunks<T, F>(chunks: &[Chunk], _sequential: bool, body: F) -> Vec<T>
where
    F: Fn(&Chunk) -> T,
{
    chunks.iter().map(body).collect()
}
