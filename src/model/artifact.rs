//! Serialized classifier artifact: loading, validation, inference.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use super::tree::Tree;
use super::Classifier;
use crate::error::{InferenceError, ModelError};
use crate::metrics;

/// Tree ensemble kinds an artifact can describe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "estimator", rename_all = "snake_case")]
pub enum Ensemble {
    /// Probabilities averaged over many trees.
    RandomForest {
        /// Member trees.
        trees: Vec<Tree>,
    },
    /// A single tree.
    DecisionTree {
        /// The tree.
        tree: Tree,
    },
}

impl Ensemble {
    /// Estimator name as written in the artifact.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RandomForest { .. } => "random_forest",
            Self::DecisionTree { .. } => "decision_tree",
        }
    }

    /// Member trees.
    pub fn trees(&self) -> &[Tree] {
        match self {
            Self::RandomForest { trees } => trees,
            Self::DecisionTree { tree } => std::slice::from_ref(tree),
        }
    }
}

/// A fitted classifier read from disk.
///
/// Construct through [`ModelArtifact::load`] or [`ModelArtifact::from_slice`],
/// both of which validate the structure before returning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    n_features: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_names: Option<Vec<String>>,
    #[serde(deserialize_with = "class_labels")]
    classes: Vec<String>,
    #[serde(flatten)]
    ensemble: Ensemble,
}

impl ModelArtifact {
    /// Read, parse and validate the artifact at `path`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let start = Instant::now();

        let bytes = tokio::fs::read(path).await.map_err(|source| ModelError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact = Self::from_slice(&bytes).map_err(|e| match e {
            ModelError::Parse { source, .. } => ModelError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        metrics::record_model_load_latency(start);
        debug!(
            path = %path.display(),
            estimator = artifact.ensemble.name(),
            trees = artifact.ensemble.trees().len(),
            "model artifact loaded"
        );
        Ok(artifact)
    }

    /// Parse and validate an artifact document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        let artifact: Self = serde_json::from_slice(bytes).map_err(|source| ModelError::Parse {
            path: Default::default(),
            source,
        })?;
        artifact.validate()?;
        Ok(artifact)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.n_features == 0 {
            return Err(ModelError::Invalid("n_features must be positive".into()));
        }
        if self.classes.is_empty() {
            return Err(ModelError::Invalid("artifact declares no classes".into()));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.n_features {
                return Err(ModelError::Invalid(format!(
                    "{} feature names for {} features",
                    names.len(),
                    self.n_features
                )));
            }
        }

        let trees = self.ensemble.trees();
        if trees.is_empty() {
            return Err(ModelError::Invalid("ensemble has no trees".into()));
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|reason| ModelError::Invalid(format!("tree {i}: {reason}")))?;
        }

        Ok(())
    }

    /// The ensemble backing this artifact.
    pub fn ensemble(&self) -> &Ensemble {
        &self.ensemble
    }

    /// Column names recorded at fit time, if any.
    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Structural summary for diagnostics.
    pub fn summary(&self) -> ModelSummary {
        let trees = self.ensemble.trees();
        ModelSummary {
            estimator: self.ensemble.name(),
            n_trees: trees.len(),
            n_nodes: trees.iter().map(|t| t.nodes.len()).sum(),
            max_depth: trees.iter().map(Tree::depth).max().unwrap_or(0),
            n_features: self.n_features,
            classes: self.classes.clone(),
        }
    }

    fn check_shape(&self, features: &ArrayView2<'_, f64>) -> Result<(), InferenceError> {
        let (rows, cols) = features.dim();
        if cols != self.n_features() {
            return Err(InferenceError::FeatureCount {
                expected: self.n_features(),
                actual: cols,
            });
        }
        if rows == 0 {
            return Err(InferenceError::EmptyInput);
        }
        Ok(())
    }
}

impl Classifier for ModelArtifact {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn check_feature_names(&self, names: &[&str]) -> Result<(), InferenceError> {
        match &self.feature_names {
            Some(expected) if expected.iter().map(String::as_str).ne(names.iter().copied()) => {
                Err(InferenceError::FeatureNames {
                    expected: expected.clone(),
                    actual: names.iter().map(|s| s.to_string()).collect(),
                })
            }
            _ => Ok(()),
        }
    }

    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>, InferenceError> {
        self.check_shape(&features.view())?;

        let trees = self.ensemble.trees();
        let mut proba = Array2::<f64>::zeros((features.nrows(), self.classes.len()));
        let mut row32 = vec![0f32; self.n_features];

        for (x, mut out) in features.rows().into_iter().zip(proba.rows_mut()) {
            // Trees compare in single precision.
            for (dst, &src) in row32.iter_mut().zip(x.iter()) {
                *dst = src as f32;
                if !dst.is_finite() {
                    return Err(InferenceError::NonFinite);
                }
            }

            for tree in trees {
                let value = tree.leaf_value(&row32);
                let total: f64 = value.iter().sum();
                for (p, w) in out.iter_mut().zip(value) {
                    *p += w / total;
                }
            }
            out.mapv_inplace(|p| p / trees.len() as f64);
        }

        Ok(proba)
    }
}

/// Structural summary of a loaded artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    /// Estimator kind.
    pub estimator: &'static str,
    /// Number of trees.
    pub n_trees: usize,
    /// Total node count across trees.
    pub n_nodes: usize,
    /// Deepest tree.
    pub max_depth: usize,
    /// Expected input columns.
    pub n_features: usize,
    /// Class labels in column order.
    pub classes: Vec<String>,
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Estimator:  {}", self.estimator)?;
        writeln!(f, "  Trees:      {}", self.n_trees)?;
        writeln!(f, "  Nodes:      {}", self.n_nodes)?;
        writeln!(f, "  Max depth:  {}", self.max_depth)?;
        writeln!(f, "  Features:   {}", self.n_features)?;
        write!(f, "  Classes:    {}", self.classes.join(", "))
    }
}

/// Accept class labels as strings, numbers or booleans and keep their text form.
fn class_labels<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|v| match v {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(serde::de::Error::custom(format!(
                "class label must be a string, number or boolean, got {other}"
            ))),
        })
        .collect()
}
