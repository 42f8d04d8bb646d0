//! Request-to-prediction pipeline shared by the HTTP handler and the CLI.

use tracing::{debug, error, info, warn};

use crate::error::PredictError;
use crate::metrics;
use crate::model::{self, ModelStore, Prediction};
use crate::request::{self, PredictionRequest};

/// Validates a body, obtains the model, and scores the request.
#[derive(Debug, Clone)]
pub struct PredictionService {
    store: ModelStore,
}

impl PredictionService {
    /// Create a service over `store`.
    pub fn new(store: ModelStore) -> Self {
        Self { store }
    }

    /// The backing model store.
    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Score a raw JSON body.
    ///
    /// Checks run in order: presence, coercion, model load, inference. Every
    /// failure is logged here with full detail.
    pub async fn predict(&self, body: &[u8]) -> Result<Prediction, PredictError> {
        let result = self.run(body).await;
        self.finish(result)
    }

    /// Score an HTTP body, rejecting anything not declared as JSON.
    pub async fn predict_json(
        &self,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<Prediction, PredictError> {
        let result = match request::check_content_type(content_type) {
            Ok(()) => self.run(body).await,
            Err(e) => Err(e.into()),
        };
        self.finish(result)
    }

    fn finish(
        &self,
        result: Result<Prediction, PredictError>,
    ) -> Result<Prediction, PredictError> {
        match &result {
            Ok(prediction) => metrics::inc_predictions(&prediction.label),
            Err(e) => {
                metrics::inc_prediction_errors(e.kind());
                match e {
                    PredictError::ModelUnavailable(source) => error!(
                        path = %self.store.path().display(),
                        error = %source,
                        "model unavailable"
                    ),
                    other => warn!(error = %other, "rejected prediction request"),
                }
            }
        }
        result
    }

    async fn run(&self, body: &[u8]) -> Result<Prediction, PredictError> {
        debug!(raw = %String::from_utf8_lossy(body), "raw request body");

        let request = PredictionRequest::from_slice(body)?;
        info!(?request, "parsed prediction request");
        info!(features = ?request.features(), "feature vector");

        let classifier = self.store.get().await?;
        let prediction = model::score(classifier.as_ref(), &request)?;

        info!(
            label = %prediction.label,
            probability = prediction.probability,
            "prediction result"
        );
        Ok(prediction)
    }
}
