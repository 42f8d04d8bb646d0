//! Classifier abstraction, the on-disk artifact, and the store that serves it.

pub mod artifact;
pub mod store;
pub mod tree;

use ndarray::{arr2, Array2};

use crate::error::InferenceError;
use crate::metrics;
use crate::request::{PredictionRequest, FEATURE_NAMES};

pub use artifact::{Ensemble, ModelArtifact, ModelSummary};
pub use store::{ModelMode, ModelStore};

/// Probability column reported to callers (the high-risk class).
pub const POSITIVE_CLASS_INDEX: usize = 1;

/// A fitted classifier.
pub trait Classifier: Send + Sync {
    /// Class labels in probability-column order.
    fn classes(&self) -> &[String];

    /// Number of input columns.
    fn n_features(&self) -> usize;

    /// Reject inputs whose column names differ from those seen at fit time.
    fn check_feature_names(&self, names: &[&str]) -> Result<(), InferenceError>;

    /// Per-row class probabilities, one column per class.
    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>, InferenceError>;

    /// Per-row class labels.
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<String>, InferenceError> {
        let proba = self.predict_proba(features)?;
        let classes = self.classes();

        Ok(proba
            .rows()
            .into_iter()
            .map(|row| {
                let best = row
                    .iter()
                    .enumerate()
                    .fold(0, |best, (i, p)| if *p > row[best] { i } else { best });
                classes[best].clone()
            })
            .collect())
    }
}

/// Outcome of scoring one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Predicted class label.
    pub label: String,
    /// Probability of the positive class.
    pub probability: f64,
}

/// Score a single request.
pub fn score(
    classifier: &dyn Classifier,
    request: &PredictionRequest,
) -> Result<Prediction, InferenceError> {
    let _timer = metrics::timer_inference();

    classifier.check_feature_names(&FEATURE_NAMES)?;
    let x = arr2(&[request.features()]);

    let label = classifier
        .predict(&x)?
        .into_iter()
        .next()
        .ok_or(InferenceError::EmptyInput)?;
    let proba = classifier.predict_proba(&x)?;
    let probability = proba
        .get((0, POSITIVE_CLASS_INDEX))
        .copied()
        .ok_or(InferenceError::ClassIndex {
            index: POSITIVE_CLASS_INDEX,
            n_classes: proba.ncols(),
        })?;

    Ok(Prediction { label, probability })
}
