use ndarray::{Array1, Zip};

use crate::statistics::MomentState;

/// Customary |t| threshold above which a sample position is reported as leaking.
pub const TVLA_THRESHOLD: f64 = 4.5;

/// Order-D Welch t-statistic per sample position.
///
/// Derived from the moment state on every call to
/// [`TtestAcc::finalize`](super::TtestAcc::finalize); never stored by the
/// accumulator. Positions where a class is empty or a denominator is zero
/// follow IEEE-754 and typically hold NaN, which callers should read as
/// "undetermined" rather than as an error.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Statistic {
    /// t-value per sample position
    pub t: Array1<f64>,
    /// Per-class estimator (mean, variance or standardized moment)
    pub u: [Array1<f64>; 2],
    /// Per-class variance of the estimator
    pub v: [Array1<f64>; 2],
    /// Per-class trace count
    pub n: [f64; 2],
}

impl Statistic {
    /// Compute the statistic of order `order` from both class states.
    pub(crate) fn from_states(classes: &[MomentState; 2], order: usize) -> Self {
        let [(u0, v0), (u1, v1)] = [0, 1].map(|x| estimators(&classes[x], order));
        let n = [classes[0].n(), classes[1].n()];

        let mut t = Array1::zeros(u0.len());
        Zip::from(&mut t)
            .and(&u0)
            .and(&u1)
            .and(&v0)
            .and(&v1)
            .for_each(|t, &u0, &u1, &v0, &v1| {
                *t = (u0 - u1) / (v0 / n[0] + v1 / n[1]).sqrt();
            });

        Self {
            t,
            u: [u0, u1],
            v: [v0, v1],
            n,
        }
    }

    /// Number of sample positions
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Largest |t| over the positions that are not NaN
    pub fn max_abs_t(&self) -> Option<f64> {
        self.t
            .iter()
            .filter(|t| !t.is_nan())
            .map(|t| t.abs())
            .fold(None, |acc, t| Some(acc.map_or(t, |m: f64| m.max(t))))
    }

    /// Sample positions with |t| strictly above `threshold`.
    ///
    /// NaN positions are never reported.
    pub fn leaking_positions(&self, threshold: f64) -> Vec<usize> {
        self.t
            .iter()
            .enumerate()
            .filter(|(_, t)| t.abs() > threshold)
            .map(|(i, _)| i)
            .collect()
    }
}

/// `(u, v)` of one class for a test of order `order`.
fn estimators(state: &MomentState, order: usize) -> (Array1<f64>, Array1<f64>) {
    let cm2 = state.central_moment(2);
    match order {
        1 => (state.mean().to_owned(), cm2),
        2 => {
            let cm4 = state.central_moment(4);
            let v = &cm4 - &cm2.mapv(|m| m * m);
            (cm2, v)
        }
        d => {
            let cmd = state.central_moment(d);
            let cm2d = state.central_moment(2 * d);
            let half = d as f64 / 2.0;
            let u = Zip::from(&cmd)
                .and(&cm2)
                .map_collect(|&md, &m2| md / m2.powf(half));
            let v = Zip::from(&cm2d)
                .and(&cmd)
                .and(&cm2)
                .map_collect(|&m2d, &md, &m2| (m2d - md * md) / m2.powi(d as i32));
            (u, v)
        }
    }
}
