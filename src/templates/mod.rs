//! Template attacks
//!
//! Profiled classifiers that map leakage traces to probabilities over the
//! values of a targeted intermediate variable:
//!
//! - [`GaussianTemplates`]: one multivariate normal per class, combined with
//!   class priors through Bayes' rule
//! - [`LdaClassifier`]: a Fisher discriminant projection learned from
//!   labelled traces, followed by pooled-covariance Gaussian templates

mod gaussian;
mod lda;

pub use gaussian::GaussianTemplates;
pub use lda::{Lda, LdaClassifier, LdaConfig};
