//! Multivariate Gaussian templates
//!
//! Scores leakage vectors against one normal distribution per class and
//! turns the likelihoods into class probabilities with Bayes' rule.

use nalgebra::{Cholesky, DMatrix};
use ndarray::{Array1, Array2, Array3, ArrayView2};

use crate::error::{Error, Result};

/// Per-class Gaussian models of the leakage
///
/// # Example
///
/// ```
/// use leakstats::templates::GaussianTemplates;
/// use ndarray::{array, Array3};
///
/// let means = array![[0.0], [10.0]];
/// let covs = Array3::from_elem((2, 1, 1), 1.0);
/// let templates = GaussianTemplates::new(means, covs, None).unwrap();
///
/// let probs = templates.predict_proba(array![[0.5], [9.0]].view(), None).unwrap();
/// assert!(probs[[0, 0]] > 0.99);
/// assert!(probs[[1, 1]] > 0.99);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaussianTemplates {
    /// Class means, shape (nc, dim)
    means: Array2<f64>,
    /// Class covariances, shape (nc, dim, dim)
    covs: Array3<f64>,
    /// Normalized class priors, shape (nc)
    priors: Array1<f64>,
}

impl GaussianTemplates {
    /// Build templates from `means` (nc, dim), `covs` (nc, dim, dim) and
    /// optional unnormalized `priors` (nc); priors default to uniform.
    pub fn new(
        means: Array2<f64>,
        covs: Array3<f64>,
        priors: Option<Array1<f64>>,
    ) -> Result<Self> {
        let (nc, dim) = means.dim();
        let (cx, cy, cz) = covs.dim();
        if cy != cz {
            return Err(Error::shape("covariance columns", cy, cz));
        }
        if cy != dim {
            return Err(Error::shape("covariance size", dim, cy));
        }
        if cx != nc {
            return Err(Error::shape("covariance count", nc, cx));
        }
        if nc == 0 || dim == 0 {
            return Err(Error::InvalidConfiguration(
                "templates need at least one class and one dimension".to_string(),
            ));
        }

        let priors = priors.unwrap_or_else(|| Array1::ones(nc));
        if priors.len() != nc {
            return Err(Error::shape("prior count", nc, priors.len()));
        }
        let total = priors.sum();
        if priors.iter().any(|p| !p.is_finite() || *p < 0.0) || total <= 0.0 {
            return Err(Error::InvalidConfiguration(
                "priors must be finite, non-negative and not all zero".to_string(),
            ));
        }

        Ok(Self {
            means,
            covs,
            priors: priors / total,
        })
    }

    pub fn n_classes(&self) -> usize {
        self.means.nrows()
    }

    /// Dimension of the modelled leakage vectors
    pub fn dim(&self) -> usize {
        self.means.ncols()
    }

    pub fn means(&self) -> &Array2<f64> {
        &self.means
    }

    pub fn covs(&self) -> &Array3<f64> {
        &self.covs
    }

    pub fn priors(&self) -> &Array1<f64> {
        &self.priors
    }

    /// Class probabilities for each row of `traces` (n, dim), shape (n, nc).
    ///
    /// With `n_components = Some(k)` only the first `k` dimensions of the
    /// traces and templates are used. Rows for which no class has a finite
    /// likelihood get uniform probabilities.
    pub fn predict_proba(
        &self,
        traces: ArrayView2<'_, f64>,
        n_components: Option<usize>,
    ) -> Result<Array2<f64>> {
        let k = n_components.unwrap_or(self.dim());
        if k == 0 || k > self.dim() {
            return Err(Error::InvalidConfiguration(format!(
                "n_components must be in 1..={}, got {k}",
                self.dim()
            )));
        }
        if traces.ncols() != self.dim() {
            return Err(Error::shape("trace dimension", self.dim(), traces.ncols()));
        }

        let n = traces.nrows();
        let nc = self.n_classes();
        let log_2pi = (2.0 * std::f64::consts::PI).ln();
        let mut scores = Array2::<f64>::zeros((n, nc));

        for c in 0..nc {
            let singular = || Error::SingularCovariance {
                what: format!("covariance of class {c}"),
            };
            let cov = DMatrix::from_fn(k, k, |r, s| self.covs[[c, r, s]]);
            let l = Cholesky::new(cov).ok_or_else(singular)?.l();
            let log_det = 2.0 * l.diagonal().iter().map(|d| d.ln()).sum::<f64>();

            let centered = DMatrix::from_fn(k, n, |r, i| traces[[i, r]] - self.means[[c, r]]);
            let z = l.solve_lower_triangular(&centered).ok_or_else(singular)?;

            let offset = self.priors[c].ln() - 0.5 * (k as f64 * log_2pi + log_det);
            for (i, col) in z.column_iter().enumerate() {
                scores[[i, c]] = offset - 0.5 * col.norm_squared();
            }
        }

        for mut row in scores.rows_mut() {
            let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            if !max.is_finite() {
                row.fill(1.0 / nc as f64);
                continue;
            }
            row.mapv_inplace(|v| (v - max).exp());
            let total = row.sum();
            row /= total;
        }
        Ok(scores)
    }
}
