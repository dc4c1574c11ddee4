use std::fmt;

// ============================================================================
// CATEGORIAS DE PRECIO
// ============================================================================

pub const CLASS_COUNT: usize = 4;

pub fn category_label(class: usize) -> &'static str {
    match class {
        0 => "Low Cost",
        1 => "Medium Cost",
        2 => "High Cost",
        3 => "Very High Cost",
        _ => "Unknown",
    }
}

// ============================================================================
// PREDICCIONES Y ERRORES
// ============================================================================

#[derive(Debug, Clone)]
pub struct Prediction {
    pub class_index: usize,
    pub label: &'static str,
    pub probabilities: [f64; CLASS_COUNT],
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredictError {
    ModelUnavailable,
    MissingField { field: &'static str, in_batch: bool },
    Inference(String),
}

impl fmt::Display for PredictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictError::ModelUnavailable => write!(f, "Model not loaded"),
            PredictError::MissingField {
                field,
                in_batch: false,
            } => write!(f, "Missing required field: {}", field),
            PredictError::MissingField {
                field,
                in_batch: true,
            } => write!(f, "Missing required field: {} in one of the items", field),
            PredictError::Inference(detail) => write!(f, "{}", detail),
        }
    }
}

impl std::error::Error for PredictError {}
