//! Streaming higher-order central moments
//!
//! Per sample position, keeps the mean and the central sums
//! `S[p] = Σ (x_i − mean)^p` for `p = 2..=2D`, updated one trace at a time
//! with a numerically stable online recurrence and combinable across
//! partitions with the pairwise rule of Pébay (2008).

use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, Zip};

use crate::error::{Error, Result};
use crate::traits::{Accumulator, TraceSample};

/// Running central moments of one population
///
/// `sums` has shape `(ns, 2 * order)`. Column `p - 1` of a sample position
/// holds the central sum of order `p`; column 0 holds the running mean.
/// Sums are never normalized by the count between updates.
///
/// # Example
///
/// ```
/// use leakstats::statistics::MomentState;
/// use leakstats::traits::Accumulator;
/// use ndarray::array;
///
/// let mut a = MomentState::new(2, 1);
/// let mut b = MomentState::new(2, 1);
///
/// a.push(array![1i16, 4].view()).unwrap();
/// b.push(array![3i16, 4].view()).unwrap();
///
/// a.merge(&b).unwrap();
/// assert_eq!(a.count(), 2);
/// assert_eq!(a.mean()[0], 2.0);
/// assert_eq!(a.central_moment(2)[0], 1.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MomentState {
    /// Test order D; moments are tracked up to 2D
    order: usize,
    /// Number of traces seen
    n: f64,
    /// Mean and central sums, shape (ns, 2 * order)
    sums: Array2<f64>,
}

impl MomentState {
    /// Zero state for traces of `ns` samples tracking moments up to `2 * order`
    pub fn new(ns: usize, order: usize) -> Self {
        Self {
            order,
            n: 0.0,
            sums: Array2::zeros((ns, 2 * order)),
        }
    }

    /// Number of samples per trace
    pub fn ns(&self) -> usize {
        self.sums.nrows()
    }

    /// Test order D
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of traces, as the real used by the recurrence
    pub fn n(&self) -> f64 {
        self.n
    }

    /// Running mean per sample position
    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.sums.column(0)
    }

    /// Central sum `Σ (x − mean)^p` per sample position.
    ///
    /// `p = 1` returns the mean slot.
    ///
    /// # Panics
    ///
    /// Panics if `p` is 0 or greater than `2 * order`.
    pub fn central_sum(&self, p: usize) -> ArrayView1<'_, f64> {
        assert!(
            (1..=2 * self.order).contains(&p),
            "moment order must be in 1..={}",
            2 * self.order
        );
        self.sums.column(p - 1)
    }

    /// Central moment `S[p] / n`. NaN everywhere when the state is empty.
    pub fn central_moment(&self, p: usize) -> Array1<f64> {
        let n = self.n;
        self.central_sum(p).mapv(|s| s / n)
    }

    /// Fold one trace into the state.
    ///
    /// Fails without touching the state if the trace length differs from
    /// [`ns`](Self::ns) or a sample is outside the i16 domain.
    pub fn push<S: TraceSample>(&mut self, trace: ArrayView1<'_, S>) -> Result<()> {
        if trace.len() != self.ns() {
            return Err(Error::shape("trace length", self.ns(), trace.len()));
        }
        if let Some(position) = trace.iter().position(|s| !s.in_domain()) {
            return Err(Error::UnsupportedType { trace: 0, position });
        }
        self.push_validated(trace);
        Ok(())
    }

    /// [`push`](Self::push) for a trace already checked by the caller.
    pub(crate) fn push_validated<S: TraceSample>(&mut self, trace: ArrayView1<'_, S>) {
        debug_assert_eq!(trace.len(), self.ns());
        self.n += 1.0;
        let n = self.n;
        Zip::from(self.sums.rows_mut())
            .and(&trace)
            .for_each(|mut m, &x| push_sample(&mut m, x.to_f64(), n));
    }

    /// Combine `other` into `self` as if its traces had been pushed here.
    pub(crate) fn merge_validated(&mut self, other: &Self) {
        debug_assert_eq!(self.sums.dim(), other.sums.dim());
        if other.n == 0.0 {
            return;
        }
        if self.n == 0.0 {
            self.n = other.n;
            self.sums.assign(&other.sums);
            return;
        }

        let (na, nb) = (self.n, other.n);
        Zip::from(self.sums.rows_mut())
            .and(other.sums.rows())
            .for_each(|mut a, b| merge_sample(&mut a, &b, na, nb));
        self.n = na + nb;
    }

    fn geometry(&self) -> String {
        format!("ns={} order={}", self.ns(), self.order)
    }
}

/// Online update of one sample position; `n` is the count including `x`.
///
/// Orders are visited from highest to lowest: the update of `S[p]` reads
/// `S[p-k]` values that must still hold the pre-update sums.
#[inline]
fn push_sample(m: &mut ArrayViewMut1<'_, f64>, x: f64, n: f64) {
    let delta = x - m[0];
    let neg = -delta / n;
    for p in (2..=m.len()).rev() {
        let mut acc = m[p - 1];
        if n > 1.0 {
            let prior = n - 1.0;
            acc += (prior * delta / n).powi(p as i32)
                * (1.0 - (-1.0 / prior).powi(p as i32 - 1));
        }
        let mut binom = 1.0;
        let mut pow = 1.0;
        for k in 1..=p - 2 {
            binom = binom * (p - k + 1) as f64 / k as f64;
            pow *= neg;
            acc += binom * m[p - k - 1] * pow;
        }
        m[p - 1] = acc;
    }
    m[0] += delta / n;
}

/// Pairwise combination of one sample position of two non-empty states.
///
/// With `δ = mean_b − mean_a`, `r_a = −n_b δ / n` and `r_b = n_a δ / n`:
///
/// `S[p] = S_a[p] + S_b[p] + Σ_{k=1}^{p-2} C(p,k) (r_a^k S_a[p-k] + r_b^k S_b[p-k])
///        + n_a r_a^p + n_b r_b^p`
///
/// The last two terms are the `k = p` summands with `S[0] = n`; the `k = p-1`
/// summands vanish because first central sums are zero.
#[inline]
fn merge_sample(a: &mut ArrayViewMut1<'_, f64>, b: &ArrayView1<'_, f64>, na: f64, nb: f64) {
    let n = na + nb;
    let delta = b[0] - a[0];
    let ra = -nb * delta / n;
    let rb = na * delta / n;
    for p in (2..=a.len()).rev() {
        let mut acc = a[p - 1] + b[p - 1];
        let mut binom = 1.0;
        let mut pa = 1.0;
        let mut pb = 1.0;
        for k in 1..=p - 2 {
            binom = binom * (p - k + 1) as f64 / k as f64;
            pa *= ra;
            pb *= rb;
            acc += binom * (pa * a[p - k - 1] + pb * b[p - k - 1]);
        }
        acc += na * ra.powi(p as i32) + nb * rb.powi(p as i32);
        a[p - 1] = acc;
    }
    a[0] += nb * delta / n;
}

impl Accumulator for MomentState {
    fn merge(&mut self, other: &Self) -> Result<()> {
        if self.sums.dim() != other.sums.dim() {
            return Err(Error::IncompatibleMerge {
                expected: self.geometry(),
                found: other.geometry(),
            });
        }
        self.merge_validated(other);
        Ok(())
    }

    fn clear(&mut self) {
        self.n = 0.0;
        self.sums.fill(0.0);
    }

    fn size_bytes(&self) -> usize {
        core::mem::size_of::<Self>() + self.sums.len() * core::mem::size_of::<f64>()
    }

    fn count(&self) -> u64 {
        self.n as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    fn state_of(values: &[i16], order: usize) -> MomentState {
        let mut s = MomentState::new(1, order);
        for &v in values {
            s.push(array![v].view()).unwrap();
        }
        s
    }

    fn two_pass(values: &[i16], p: i32) -> f64 {
        let n = values.len() as f64;
        let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
        values.iter().map(|&v| (v as f64 - mean).powi(p)).sum()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_empty() {
        let s = MomentState::new(3, 2);
        assert!(s.is_empty());
        assert_eq!(s.ns(), 3);
        assert!(s.central_moment(2).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_push_matches_two_pass() {
        let values = [2i16, 4, 4, 4, 5, 5, 7, 9, -3, 12, 0];
        let s = state_of(&values, 3);

        let mean = values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64;
        assert!(close(s.mean()[0], mean));
        for p in 2..=6 {
            assert!(
                close(s.central_sum(p)[0], two_pass(&values, p as i32)),
                "order {}: {} vs {}",
                p,
                s.central_sum(p)[0],
                two_pass(&values, p as i32)
            );
        }
    }

    #[test]
    fn test_variance() {
        let s = state_of(&[2, 4, 4, 4, 5, 5, 7, 9], 1);
        assert!((s.mean()[0] - 5.0).abs() < 1e-12);
        assert!((s.central_moment(2)[0] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_value() {
        let s = state_of(&[42], 2);
        assert_eq!(s.mean()[0], 42.0);
        for p in 2..=4 {
            assert_eq!(s.central_sum(p)[0], 0.0);
        }
    }

    #[test]
    fn test_merge_matches_sequential() {
        let left = [1i16, -7, 3, 15, 2];
        let right = [6i16, 6, 0, -11, 5, 9, 30];
        let all: Vec<i16> = left.iter().chain(right.iter()).copied().collect();

        let sequential = state_of(&all, 3);
        let mut merged = state_of(&left, 3);
        merged.merge(&state_of(&right, 3)).unwrap();

        assert_eq!(merged.count(), sequential.count());
        for p in 1..=6 {
            assert!(
                close(merged.central_sum(p)[0], sequential.central_sum(p)[0]),
                "order {}",
                p
            );
        }
    }

    #[test]
    fn test_merge_singleton_equals_push() {
        let mut pushed = state_of(&[3, 8, -1, 4], 3);
        let mut merged = pushed.clone();

        pushed.push(array![17i16].view()).unwrap();
        merged.merge(&state_of(&[17], 3)).unwrap();

        for p in 1..=6 {
            assert!(close(pushed.central_sum(p)[0], merged.central_sum(p)[0]));
        }
    }

    #[test]
    fn test_merge_empty() {
        let mut a = state_of(&[1, 2], 2);
        let before = a.clone();
        a.merge(&MomentState::new(1, 2)).unwrap();
        assert_eq!(a, before);

        let mut empty = MomentState::new(1, 2);
        empty.merge(&before).unwrap();
        assert_eq!(empty, before);
    }

    #[test]
    fn test_merge_incompatible() {
        let mut a = MomentState::new(4, 2);
        let b = MomentState::new(4, 3);
        assert!(matches!(
            a.merge(&b),
            Err(Error::IncompatibleMerge { .. })
        ));
    }

    #[test]
    fn test_push_rejects_bad_trace() {
        let mut s = MomentState::new(3, 1);
        assert_eq!(
            s.push(array![1i16, 2].view()),
            Err(Error::shape("trace length", 3, 2))
        );
        assert_eq!(
            s.push(array![1i32, 70_000, 2].view()),
            Err(Error::UnsupportedType {
                trace: 0,
                position: 1
            })
        );
        assert!(s.is_empty());
    }

    #[test]
    fn test_numerical_stability() {
        // A large common offset must not leak into the central sums
        let mut s = MomentState::new(1, 2);
        for i in 0..1000 {
            let v: i16 = 32000 + (i % 2) as i16;
            s.push(Array1::from(vec![v]).view()).unwrap();
        }
        assert!((s.mean()[0] - 32000.5).abs() < 1e-9);
        assert!((s.central_moment(2)[0] - 0.25).abs() < 1e-9);
        assert!((s.central_moment(4)[0] - 0.0625).abs() < 1e-9);
    }

    #[test]
    fn test_clear() {
        let mut s = state_of(&[1, 2, 3], 2);
        s.clear();
        assert!(s.is_empty());
        assert_eq!(s, MomentState::new(1, 2));
    }
}
