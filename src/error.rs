//! Unified error types for the risk service.

use std::path::PathBuf;

use axum::http::StatusCode;
use strum::IntoStaticStr;
use thiserror::Error;

/// Message returned to callers whenever the model artifact cannot be obtained.
pub const MODEL_UNAVAILABLE_MESSAGE: &str = "Model not available";

/// Unified error type for the service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Model artifact error.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Prediction error outside the HTTP path (CLI).
    #[error("prediction error: {0}")]
    Predict(#[from] PredictError),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while turning a request body into a [`PredictionRequest`].
///
/// [`PredictionRequest`]: crate::request::PredictionRequest
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    /// The request did not declare a JSON body.
    #[error("unsupported content type {0:?}: expected application/json")]
    UnsupportedContentType(Option<String>),

    /// The body was not valid JSON.
    #[error("invalid JSON body: {0}")]
    MalformedBody(String),

    /// The body was valid JSON but not an object.
    #[error("request body must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// A required key is absent.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A value could not be coerced to a float.
    #[error("could not convert field '{field}' to float: {reason}")]
    InvalidValue {
        /// The offending key.
        field: &'static str,
        /// Why coercion failed.
        reason: String,
    },
}

/// Errors raised while loading or validating the model artifact.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The artifact file could not be read.
    #[error("failed to read model artifact {path}: {source}")]
    Read {
        /// Artifact path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The artifact file is not a valid artifact document.
    #[error("failed to parse model artifact {path}: {source}")]
    Parse {
        /// Artifact path.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The artifact parsed but is structurally unusable.
    #[error("invalid model artifact: {0}")]
    Invalid(String),

    /// Preloading failed at startup, so there is nothing to serve.
    #[error("model artifact {path} was not loaded at startup")]
    NotLoaded {
        /// Artifact path.
        path: PathBuf,
    },
}

/// Errors raised by a classifier at inference time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// Column count does not match what the model was fitted on.
    #[error("X has {actual} features, but the model is expecting {expected} features as input")]
    FeatureCount {
        /// Features the model expects.
        expected: usize,
        /// Features supplied.
        actual: usize,
    },

    /// Column names do not match what the model was fitted on.
    #[error("feature names must match those passed during fit: expected {expected:?}, got {actual:?}")]
    FeatureNames {
        /// Names recorded in the artifact.
        expected: Vec<String>,
        /// Names supplied with the input.
        actual: Vec<String>,
    },

    /// The input contains NaN or infinity.
    #[error("input contains NaN, infinity or a value too large for dtype('float32')")]
    NonFinite,

    /// The input has no rows.
    #[error("found array with 0 samples while a minimum of 1 is required")]
    EmptyInput,

    /// A requested class column does not exist.
    #[error("index {index} is out of bounds for class probabilities with {n_classes} classes")]
    ClassIndex {
        /// Requested column.
        index: usize,
        /// Available classes.
        n_classes: usize,
    },
}

/// Everything that can go wrong while serving a single prediction.
#[derive(Error, Debug, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum PredictError {
    /// Bad input from the caller.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The model artifact could not be obtained.
    #[error(transparent)]
    ModelUnavailable(#[from] ModelError),

    /// The classifier rejected the input.
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PredictError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Request(_) | Self::Inference(_) => StatusCode::BAD_REQUEST,
            Self::ModelUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller.
    ///
    /// Infrastructure details stay in the server log.
    pub fn public_message(&self) -> String {
        match self {
            Self::ModelUnavailable(_) => MODEL_UNAVAILABLE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ServiceError>;
