use std::sync::Arc;

use serde_json::{Map, Value};

use crate::features::{MobileFeatures, FEATURE_NAMES};
use crate::model::PriceModel;
use crate::schema;
use crate::types::{category_label, PredictError, Prediction};

// The model is injected once at startup and shared read-only; a failed load
// leaves the engine running and every request answers ModelUnavailable.
#[derive(Clone)]
pub struct InferenceEngine {
    model: Option<Arc<PriceModel>>,
}

impl InferenceEngine {
    pub fn new(model: Option<Arc<PriceModel>>) -> Self {
        Self { model }
    }

    pub fn model_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&PriceModel> {
        self.model.as_deref()
    }

    pub fn predict_one(&self, item: &Map<String, Value>) -> Result<Prediction, PredictError> {
        let model = self.model.as_ref().ok_or(PredictError::ModelUnavailable)?;
        schema::validate_item(item)?;
        let features = MobileFeatures::from_map(item)?;
        Ok(classify(model, &features))
    }

    pub fn predict_batch(&self, items: &[Value]) -> Result<Vec<Prediction>, PredictError> {
        let model = self.model.as_ref().ok_or(PredictError::ModelUnavailable)?;
        schema::validate_batch(items)?;

        // Decode every item before classifying any of them, so a bad value
        // never yields a partial result array.
        let mut decoded = Vec::with_capacity(items.len());
        for item in items {
            let map = match item.as_object() {
                Some(map) => map,
                // Unreachable once validate_batch has passed.
                None => {
                    return Err(PredictError::MissingField {
                        field: FEATURE_NAMES[0],
                        in_batch: true,
                    })
                }
            };
            decoded.push(MobileFeatures::from_map(map)?);
        }

        Ok(decoded
            .iter()
            .map(|features| classify(model, features))
            .collect())
    }
}

fn classify(model: &PriceModel, features: &MobileFeatures) -> Prediction {
    let scaled = model.scale(&features.to_vector());
    let class_index = model.predict(&scaled);
    Prediction {
        class_index,
        label: category_label(class_index),
        probabilities: model.predict_probabilities(&scaled),
    }
}
