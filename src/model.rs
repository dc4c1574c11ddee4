use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::features::{FEATURE_COUNT, FEATURE_NAMES};
use crate::types::CLASS_COUNT;

// Multinomial linear classifier plus the scaler statistics it was trained
// with, serialized as a single JSON artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceModel {
    pub model_id: String,
    pub version: String,
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
    pub scaler_mean: Vec<f64>,
    pub scaler_scale: Vec<f64>,
}

#[derive(Debug)]
pub enum ModelError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    DimensionMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    NonFinite {
        field: &'static str,
    },
    NonPositiveScale {
        index: usize,
    },
    FeatureNameMismatch {
        index: usize,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Io(error) => write!(f, "model read error: {}", error),
            ModelError::Parse(error) => write!(f, "model parse error: {}", error),
            ModelError::DimensionMismatch {
                field,
                expected,
                got,
            } => write!(f, "model {} has length {}, expected {}", field, got, expected),
            ModelError::NonFinite { field } => {
                write!(f, "model {} contains a non-finite value", field)
            }
            ModelError::NonPositiveScale { index } => {
                write!(f, "model scaler_scale[{}] must be positive", index)
            }
            ModelError::FeatureNameMismatch { index } => {
                write!(f, "model feature name at index {} does not match the schema", index)
            }
        }
    }
}

impl std::error::Error for ModelError {}

impl From<std::io::Error> for ModelError {
    fn from(error: std::io::Error) -> Self {
        ModelError::Io(error)
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(error: serde_json::Error) -> Self {
        ModelError::Parse(error)
    }
}

impl PriceModel {
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &[u8]) -> Result<Self, ModelError> {
        let model: PriceModel = serde_json::from_slice(data)?;
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        check_len("coefficients", self.coefficients.len(), CLASS_COUNT)?;
        for row in &self.coefficients {
            check_len("coefficient row", row.len(), FEATURE_COUNT)?;
        }
        check_len("intercepts", self.intercepts.len(), CLASS_COUNT)?;
        check_len("scaler_mean", self.scaler_mean.len(), FEATURE_COUNT)?;
        check_len("scaler_scale", self.scaler_scale.len(), FEATURE_COUNT)?;

        if !self.feature_names.is_empty() {
            check_len("feature_names", self.feature_names.len(), FEATURE_COUNT)?;
            for (index, name) in self.feature_names.iter().enumerate() {
                if name != FEATURE_NAMES[index] {
                    return Err(ModelError::FeatureNameMismatch { index });
                }
            }
        }

        check_finite("coefficients", self.coefficients.iter().flatten())?;
        check_finite("intercepts", self.intercepts.iter())?;
        check_finite("scaler_mean", self.scaler_mean.iter())?;
        check_finite("scaler_scale", self.scaler_scale.iter())?;

        for (index, scale) in self.scaler_scale.iter().enumerate() {
            if *scale <= 0.0 {
                return Err(ModelError::NonPositiveScale { index });
            }
        }

        Ok(())
    }

    // Train-time statistics; never derived from the request.
    pub fn scale(&self, raw: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut scaled = [0.0; FEATURE_COUNT];
        for (index, value) in raw.iter().enumerate() {
            scaled[index] = (value - self.scaler_mean[index]) / self.scaler_scale[index];
        }
        scaled
    }

    pub fn predict(&self, scaled: &[f64; FEATURE_COUNT]) -> usize {
        argmax(&self.decision(scaled))
    }

    pub fn predict_probabilities(&self, scaled: &[f64; FEATURE_COUNT]) -> [f64; CLASS_COUNT] {
        softmax(self.decision(scaled))
    }

    fn decision(&self, scaled: &[f64; FEATURE_COUNT]) -> [f64; CLASS_COUNT] {
        let mut logits = [0.0; CLASS_COUNT];
        for (class, row) in self.coefficients.iter().enumerate() {
            logits[class] = dot(row, scaled) + self.intercepts[class];
        }
        logits
    }
}

fn check_len(field: &'static str, got: usize, expected: usize) -> Result<(), ModelError> {
    if got == expected {
        Ok(())
    } else {
        Err(ModelError::DimensionMismatch {
            field,
            expected,
            got,
        })
    }
}

fn check_finite<'a>(
    field: &'static str,
    values: impl Iterator<Item = &'a f64>,
) -> Result<(), ModelError> {
    for value in values {
        if !value.is_finite() {
            return Err(ModelError::NonFinite { field });
        }
    }
    Ok(())
}

fn dot(weights: &[f64], values: &[f64; FEATURE_COUNT]) -> f64 {
    weights
        .iter()
        .zip(values.iter())
        .map(|(weight, value)| weight * value)
        .sum()
}

// Ties resolve to the lowest class index.
fn argmax(logits: &[f64; CLASS_COUNT]) -> usize {
    let mut best = 0;
    for (index, logit) in logits.iter().enumerate() {
        if *logit > logits[best] {
            best = index;
        }
    }
    best
}

// The largest logit is subtracted before exponentiation so exp() stays in range.
fn softmax(mut logits: [f64; CLASS_COUNT]) -> [f64; CLASS_COUNT] {
    let max = logits
        .iter()
        .fold(f64::NEG_INFINITY, |acc, &logit| acc.max(logit));
    let mut sum = 0.0;
    for logit in logits.iter_mut() {
        *logit = (*logit - max).exp();
        sum += *logit;
    }
    for value in logits.iter_mut() {
        *value /= sum;
    }
    logits
}
