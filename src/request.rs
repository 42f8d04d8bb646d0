//! Prediction request parsing and feature vector construction.
//!
//! The payload is checked in one pass: every key must be present (in column
//! order, first missing key wins), then every value is coerced to `f64`.

use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::RequestError;

/// Number of model inputs.
pub const N_FEATURES: usize = 12;

/// JSON keys in the column order the model was fitted with.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "age",
    "gender",
    "chestpain",
    "restingBP",
    "serumcholestrol",
    "fastingbloodsugar",
    "restingrelectro",
    "maxheartrate",
    "exerciseangia",
    "oldpeak",
    "slope",
    "noofmajorvessels",
];

/// Clinical measurements for a single patient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[schema(example = json!({
    "age": 55, "gender": 1, "chestpain": 2, "restingBP": 130,
    "serumcholestrol": 250, "fastingbloodsugar": 0, "restingrelectro": 1,
    "maxheartrate": 150, "exerciseangia": 0, "oldpeak": 1.5, "slope": 2,
    "noofmajorvessels": 0
}))]
pub struct PredictionRequest {
    /// Age in years.
    pub age: f64,
    /// Gender code.
    pub gender: f64,
    /// Chest-pain type code.
    #[serde(rename = "chestpain")]
    pub chest_pain: f64,
    /// Resting blood pressure.
    #[serde(rename = "restingBP")]
    pub resting_bp: f64,
    /// Serum cholesterol.
    #[serde(rename = "serumcholestrol")]
    pub serum_cholesterol: f64,
    /// Fasting blood sugar flag.
    #[serde(rename = "fastingbloodsugar")]
    pub fasting_blood_sugar: f64,
    /// Resting electrocardiogram code.
    #[serde(rename = "restingrelectro")]
    pub resting_electro: f64,
    /// Maximum heart rate achieved.
    #[serde(rename = "maxheartrate")]
    pub max_heart_rate: f64,
    /// Exercise-induced angina flag.
    #[serde(rename = "exerciseangia")]
    pub exercise_angina: f64,
    /// ST depression.
    pub oldpeak: f64,
    /// Slope code.
    pub slope: f64,
    /// Number of major vessels.
    #[serde(rename = "noofmajorvessels")]
    pub major_vessels: f64,
}

impl PredictionRequest {
    /// Parse a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, RequestError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| RequestError::MalformedBody(e.to_string()))?;
        Self::from_json(&value)
    }

    /// Validate and coerce an already-parsed JSON payload.
    pub fn from_json(value: &Value) -> Result<Self, RequestError> {
        let map = value
            .as_object()
            .ok_or_else(|| RequestError::NotAnObject(json_type_name(value)))?;

        if let Some(missing) = FEATURE_NAMES.iter().find(|key| !map.contains_key(**key)) {
            return Err(RequestError::MissingField(*missing));
        }

        let mut features = [0.0; N_FEATURES];
        for (slot, key) in features.iter_mut().zip(FEATURE_NAMES) {
            *slot = coerce_field(map, key)?;
        }

        Ok(Self::from_features(features))
    }

    /// Build from a feature vector in column order.
    pub fn from_features(f: [f64; N_FEATURES]) -> Self {
        Self {
            age: f[0],
            gender: f[1],
            chest_pain: f[2],
            resting_bp: f[3],
            serum_cholesterol: f[4],
            fasting_blood_sugar: f[5],
            resting_electro: f[6],
            max_heart_rate: f[7],
            exercise_angina: f[8],
            oldpeak: f[9],
            slope: f[10],
            major_vessels: f[11],
        }
    }

    /// Feature vector in column order.
    pub fn features(&self) -> [f64; N_FEATURES] {
        [
            self.age,
            self.gender,
            self.chest_pain,
            self.resting_bp,
            self.serum_cholesterol,
            self.fasting_blood_sugar,
            self.resting_electro,
            self.max_heart_rate,
            self.exercise_angina,
            self.oldpeak,
            self.slope,
            self.major_vessels,
        ]
    }
}

/// Accept `application/json` and `application/*+json`, with or without parameters.
pub fn check_content_type(content_type: Option<&str>) -> Result<(), RequestError> {
    let reject = || RequestError::UnsupportedContentType(content_type.map(str::to_string));

    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .ok_or_else(reject)?;

    match essence.split_once('/') {
        Some(("application", "json")) => Ok(()),
        Some(("application", sub)) if sub.ends_with("+json") => Ok(()),
        _ => Err(reject()),
    }
}

fn coerce_field(map: &Map<String, Value>, key: &'static str) -> Result<f64, RequestError> {
    let invalid = |reason: String| RequestError::InvalidValue { field: key, reason };

    match &map[key] {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid(format!("number {n} is not representable as f64"))),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(format!("could not convert string to float: '{s}'"))),
        other => Err(invalid(format!(
            "expected a number or numeric string, got {}",
            json_type_name(other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
