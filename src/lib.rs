//! Cardiovascular disease risk scoring service.
//!
//! A single `POST /predict` endpoint accepts twelve clinical measurements and
//! returns a binary risk label plus the probability of the high-risk class,
//! computed by a pre-trained tree ensemble read from disk.
//!
//! ```text
//! {"age":55,"gender":1,"chestpain":2,...,"noofmajorvessels":0}
//!   -> presence check -> f64 coercion -> model load -> inference
//!   -> {"prediction":"1","probability":0.82}
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`request`]: Payload validation and the feature vector
//! - [`model`]: Classifier trait, artifact format and model store
//! - [`service`]: The prediction pipeline
//! - [`api`]: HTTP routes, probes, metrics and OpenAPI docs
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod request;
pub mod service;
pub mod utils;

pub use config::Config;
pub use error::{PredictError, Result, ServiceError};
pub use model::{Classifier, ModelArtifact, ModelMode, ModelStore, Prediction};
pub use request::PredictionRequest;
pub use service::PredictionService;
