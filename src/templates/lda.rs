//! LDA profiling
//!
//! Fits a Fisher linear discriminant projection on labelled profiling
//! traces, then builds Gaussian templates in the projected space with one
//! pooled covariance shared by all classes.

use nalgebra::{Cholesky, DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};
use validator::Validate;

use super::gaussian::GaussianTemplates;
use crate::error::{Error, Result};

/// Profiling parameters.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct LdaConfig {
    /// Requested projection dimension, capped at `n_classes - 1`
    #[validate(range(min = 1, message = "n_components must be >= 1"))]
    pub n_components: usize,
    /// Shrinkage of the within-class scatter towards a scaled identity
    #[validate(range(min = 0.0, max = 1.0, message = "shrinkage must be in [0, 1]"))]
    pub shrinkage: f64,
    /// Number of classes; defaults to the largest label plus one
    pub n_classes: Option<usize>,
    /// Class priors handed to the templates
    pub priors: Option<Array1<f64>>,
}

impl Default for LdaConfig {
    fn default() -> Self {
        Self {
            n_components: 4,
            shrinkage: 0.0,
            n_classes: None,
            priors: None,
        }
    }
}

/// Fitted linear projection `y = (x - mean) · W`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Lda {
    /// Global mean of the profiling traces, shape (ns)
    mean: Array1<f64>,
    /// Discriminant directions, shape (ns, k), strongest first
    projection: Array2<f64>,
}

impl Lda {
    pub fn n_components(&self) -> usize {
        self.projection.ncols()
    }

    pub fn projection(&self) -> &Array2<f64> {
        &self.projection
    }

    /// Project traces (n, ns) onto the discriminant space (n, k).
    pub fn transform(&self, traces: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if traces.ncols() != self.mean.len() {
            return Err(Error::shape("trace length", self.mean.len(), traces.ncols()));
        }
        Ok((&traces - &self.mean).dot(&self.projection))
    }

    /// Solve `Sb w = λ Sw w` and keep the `k` leading directions.
    fn fit(mean: Array1<f64>, sw: &Array2<f64>, sb: &Array2<f64>, k: usize) -> Result<Self> {
        let ns = mean.len();
        let singular = || Error::SingularCovariance {
            what: "within-class scatter".to_string(),
        };

        let sw = DMatrix::from_fn(ns, ns, |i, j| sw[[i, j]]);
        let sb = DMatrix::from_fn(ns, ns, |i, j| sb[[i, j]]);
        let l = Cholesky::new(sw).ok_or_else(singular)?.l();

        // Whitened between-class scatter L⁻¹ Sb L⁻ᵀ
        let a = l.solve_lower_triangular(&sb).ok_or_else(singular)?;
        let m = l
            .solve_lower_triangular(&a.transpose())
            .ok_or_else(singular)?;
        let m = (&m + m.transpose()) * 0.5;
        let eig = SymmetricEigen::new(m);

        let mut by_value: Vec<usize> = (0..ns).collect();
        by_value.sort_by(|&i, &j| eig.eigenvalues[j].total_cmp(&eig.eigenvalues[i]));
        let v = DMatrix::from_fn(ns, k, |r, c| eig.eigenvectors[(r, by_value[c])]);
        let w = l.transpose().solve_upper_triangular(&v).ok_or_else(singular)?;

        Ok(Self {
            mean,
            projection: Array2::from_shape_fn((ns, k), |(r, c)| w[(r, c)]),
        })
    }
}

/// LDA projection followed by pooled-covariance Gaussian templates
///
/// # Example
///
/// ```
/// use leakstats::templates::{LdaClassifier, LdaConfig};
/// use ndarray::{Array1, Array2};
///
/// // Two classes separated along the first sample, with a little spread
/// let traces = Array2::from_shape_fn((40, 3), |(i, j)| {
///     let class = (i % 2) as f64;
///     let jitter = ((i * 7 + j * 3) % 5) as f64 - 2.0;
///     if j == 0 { 10.0 * class + jitter } else { jitter }
/// });
/// let labels = Array1::from_shape_fn(40, |i| (i % 2) as u16);
///
/// let clf = LdaClassifier::fit(traces.view(), labels.view(), &LdaConfig::default()).unwrap();
/// let probs = clf.predict_proba(traces.view(), None).unwrap();
/// assert_eq!(probs.dim(), (40, 2));
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LdaClassifier {
    lda: Lda,
    templates: GaussianTemplates,
    trained_on: usize,
}

impl LdaClassifier {
    /// Profile `traces` (n, ns) with class `labels` (n).
    pub fn fit(
        traces: ArrayView2<'_, f64>,
        labels: ArrayView1<'_, u16>,
        config: &LdaConfig,
    ) -> Result<Self> {
        config.validate()?;
        let (n, ns) = traces.dim();
        if labels.len() != n {
            return Err(Error::shape("label count", n, labels.len()));
        }

        let nc = config
            .n_classes
            .unwrap_or_else(|| labels.iter().max().map_or(0, |&m| m as usize + 1));
        if nc < 2 {
            return Err(Error::InvalidConfiguration(
                "profiling needs at least two classes".to_string(),
            ));
        }
        if let Some((index, &label)) = labels
            .iter()
            .enumerate()
            .find(|(_, &l)| l as usize >= nc)
        {
            return Err(Error::InvalidLabel { index, label });
        }
        if n <= nc {
            return Err(Error::InvalidConfiguration(format!(
                "profiling needs more than {nc} traces, got {n}"
            )));
        }

        let mut counts = vec![0usize; nc];
        let mut class_means = Array2::<f64>::zeros((nc, ns));
        for (row, &label) in traces.rows().into_iter().zip(labels.iter()) {
            counts[label as usize] += 1;
            let mut acc = class_means.row_mut(label as usize);
            acc += &row;
        }
        if let Some(class) = counts.iter().position(|&c| c == 0) {
            return Err(Error::EmptyClass { class });
        }
        for (mut row, &count) in class_means.rows_mut().into_iter().zip(counts.iter()) {
            row /= count as f64;
        }
        let mean = traces.sum_axis(Axis(0)) / n as f64;

        let within = Array2::from_shape_fn((n, ns), |(i, j)| {
            traces[[i, j]] - class_means[[labels[i] as usize, j]]
        });
        let mut sw = within.t().dot(&within) / (n - nc) as f64;
        if config.shrinkage > 0.0 {
            let scale = sw.diag().sum() / ns as f64;
            sw *= 1.0 - config.shrinkage;
            for i in 0..ns {
                sw[[i, i]] += config.shrinkage * scale;
            }
        }

        let between = Array2::from_shape_fn((nc, ns), |(c, j)| {
            (class_means[[c, j]] - mean[j]) * (counts[c] as f64 / n as f64).sqrt()
        });
        let sb = between.t().dot(&between);

        let k = config.n_components.min(nc - 1);
        let lda = Lda::fit(mean, &sw, &sb, k)?;
        let projected = lda.transform(traces)?;

        let mut means = Array2::<f64>::zeros((nc, k));
        for (row, &label) in projected.rows().into_iter().zip(labels.iter()) {
            let mut acc = means.row_mut(label as usize);
            acc += &row;
        }
        for (mut row, &count) in means.rows_mut().into_iter().zip(counts.iter()) {
            row /= count as f64;
        }

        let mut noise = Array2::from_shape_fn((n, k), |(i, j)| {
            projected[[i, j]] - means[[labels[i] as usize, j]]
        });
        let noise_mean = noise.sum_axis(Axis(0)) / n as f64;
        noise -= &noise_mean;
        let cov = noise.t().dot(&noise) / (n - 1) as f64;
        let covs = Array3::from_shape_fn((nc, k, k), |(_, i, j)| cov[[i, j]]);

        let templates = GaussianTemplates::new(means, covs, config.priors.clone())?;
        Ok(Self {
            lda,
            templates,
            trained_on: n,
        })
    }

    /// Class probabilities for raw traces (n, ns), shape (n, nc).
    pub fn predict_proba(
        &self,
        traces: ArrayView2<'_, f64>,
        n_components: Option<usize>,
    ) -> Result<Array2<f64>> {
        let projected = self.lda.transform(traces)?;
        self.templates.predict_proba(projected.view(), n_components)
    }

    /// Project raw traces (n, ns) onto the discriminant space.
    pub fn transform(&self, traces: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.lda.transform(traces)
    }

    pub fn lda(&self) -> &Lda {
        &self.lda
    }

    pub fn templates(&self) -> &GaussianTemplates {
        &self.templates
    }

    /// Number of profiling traces
    pub fn trained_on(&self) -> usize {
        self.trained_on
    }
}
