use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::ServiceConfig;
use crate::engine::InferenceEngine;
use crate::telemetry::{StatsSnapshot, SystemHealth, TelemetryStore};
use crate::types::{PredictError, Prediction};

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<InferenceEngine>,
    pub telemetry: Arc<TelemetryStore>,
    pub config: Arc<ServiceConfig>,
}

#[derive(Debug, Serialize)]
struct PredictionResponse {
    price_category: usize,
    category_name: String,
    probabilities: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    model_loaded: bool,
}

#[derive(Debug, Serialize)]
struct ModelStatus {
    loaded: bool,
    model_id: Option<String>,
    version: Option<String>,
    path: String,
}

#[derive(Debug, Serialize)]
struct ApiStats {
    stats: StatsSnapshot,
    health: SystemHealth,
    model: ModelStatus,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/predict_batch", post(predict_batch))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .with_state(state)
        .layer(cors_layer())
}

pub async fn serve(addr: String, state: ApiState) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(state);
    let addr: SocketAddr = addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn predict(
    State(state): State<ApiState>,
    Json(payload): Json<Value>,
) -> Result<Json<PredictionResponse>, (StatusCode, Json<ErrorResponse>)> {
    state.telemetry.record_single_request().await;

    let Some(item) = payload.as_object() else {
        return Err(bad_request("Request body must be a JSON object"));
    };

    match state.engine.predict_one(item) {
        Ok(prediction) => {
            state.telemetry.record_prediction(&prediction).await;
            Ok(Json(prediction_response(&prediction)))
        }
        Err(error) => {
            state.telemetry.record_failure(&error).await;
            Err(error_response(&error, false))
        }
    }
}

async fn predict_batch(
    State(state): State<ApiState>,
    Json(payload): Json<Value>,
) -> Result<Json<Vec<PredictionResponse>>, (StatusCode, Json<ErrorResponse>)> {
    state.telemetry.record_batch_request().await;

    let Some(items) = payload.as_array() else {
        return Err(bad_request("Request body must be a JSON array"));
    };

    match state.engine.predict_batch(items) {
        Ok(predictions) => {
            state.telemetry.record_predictions(&predictions).await;
            Ok(Json(predictions.iter().map(prediction_response).collect()))
        }
        Err(error) => {
            state.telemetry.record_failure(&error).await;
            Err(error_response(&error, true))
        }
    }
}

async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model_loaded: state.engine.model_loaded(),
    })
}

async fn stats(State(state): State<ApiState>) -> Json<ApiStats> {
    let stats = state.telemetry.snapshot_stats().await;
    let health = state.telemetry.health_snapshot().await;
    let model = ModelStatus {
        loaded: state.engine.model_loaded(),
        model_id: state.engine.model().map(|model| model.model_id.clone()),
        version: state.engine.model().map(|model| model.version.clone()),
        path: state.config.model_path.clone(),
    };

    Json(ApiStats {
        stats,
        health,
        model,
    })
}

fn prediction_response(prediction: &Prediction) -> PredictionResponse {
    let probabilities = prediction
        .probabilities
        .iter()
        .enumerate()
        .map(|(class, value)| (class.to_string(), *value))
        .collect();

    PredictionResponse {
        price_category: prediction.class_index,
        category_name: prediction.label.to_string(),
        probabilities,
    }
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn error_response(error: &PredictError, batch: bool) -> (StatusCode, Json<ErrorResponse>) {
    let status = match error {
        PredictError::MissingField { .. } => StatusCode::BAD_REQUEST,
        PredictError::ModelUnavailable | PredictError::Inference(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let message = match error {
        PredictError::Inference(detail) if batch => format!("Batch prediction error: {}", detail),
        PredictError::Inference(detail) => format!("Prediction error: {}", detail),
        other => other.to_string(),
    };

    (status, Json(ErrorResponse { error: message }))
}

fn cors_layer() -> CorsLayer {
    let allowed = std::env::var("TARIFA_CORS_ORIGIN").unwrap_or_else(|_| "*".to_string());

    let mut cors = if allowed.trim() == "*" {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = allowed
            .split(',')
            .filter_map(|origin| origin.trim().parse::<HeaderValue>().ok())
            .collect::<Vec<_>>();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    };

    cors = cors.allow_methods([Method::GET, Method::POST]);
    cors.allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::model::PriceModel;

    fn artifact_model() -> PriceModel {
        let path = Path::new(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/models/price_model.json"
        ));
        PriceModel::from_file(path).unwrap()
    }

    fn test_state(model: Option<PriceModel>) -> ApiState {
        ApiState {
            engine: Arc::new(InferenceEngine::new(model.map(Arc::new))),
            telemetry: Arc::new(TelemetryStore::new()),
            config: Arc::new(ServiceConfig {
                model_path: "models/price_model.json".to_string(),
                host: "127.0.0.1".to_string(),
                port: 8000,
            }),
        }
    }

    fn phone(ram: i64, battery_power: i64) -> Value {
        json!({
            "battery_power": battery_power, "blue": 1, "clock_speed": 2.0,
            "dual_sim": 1, "fc": 5, "four_g": 1, "int_memory": 32, "m_dep": 0.5,
            "mobile_wt": 150, "n_cores": 4, "pc": 10, "px_height": 800,
            "px_width": 1200, "ram": ram, "sc_h": 12, "sc_w": 6, "talk_time": 10,
            "three_g": 1, "touch_screen": 1, "wifi": 1
        })
    }

    async fn call(app: Router, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = match body {
            Some(value) => Request::builder()
                .method(method)
                .uri(path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(path)
                .body(Body::empty())
                .unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn predict_returns_the_documented_shape() {
        let app = router(test_state(Some(artifact_model())));
        let (status, body) = call(app, Method::POST, "/predict", Some(phone(2000, 1000))).await;

        assert_eq!(status, StatusCode::OK);
        let class = body["price_category"].as_u64().unwrap();
        assert!(class < 4);
        let labels = ["Low Cost", "Medium Cost", "High Cost", "Very High Cost"];
        assert!(labels.contains(&body["category_name"].as_str().unwrap()));

        let probabilities = body["probabilities"].as_object().unwrap();
        let keys: Vec<&String> = probabilities.keys().collect();
        assert_eq!(keys, vec!["0", "1", "2", "3"]);
        for value in probabilities.values() {
            let probability = value.as_f64().unwrap();
            assert!((0.0..=1.0).contains(&probability));
        }
    }

    #[tokio::test]
    async fn predict_missing_ram_is_a_400_naming_the_field() {
        let mut item = phone(2000, 1000);
        item.as_object_mut().unwrap().remove("ram");

        let app = router(test_state(Some(artifact_model())));
        let (status, body) = call(app, Method::POST, "/predict", Some(item)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required field: ram");
    }

    #[tokio::test]
    async fn predict_without_a_model_is_a_500() {
        let app = router(test_state(None));
        let (status, body) = call(app, Method::POST, "/predict", Some(phone(2000, 1000))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Model not loaded");
    }

    #[tokio::test]
    async fn predict_rejects_non_object_bodies() {
        let app = router(test_state(Some(artifact_model())));
        let (status, body) = call(app, Method::POST, "/predict", Some(json!([1, 2, 3]))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Request body must be a JSON object");
    }

    #[tokio::test]
    async fn predict_reports_bad_values_as_prediction_errors() {
        let mut item = phone(2000, 1000);
        item.as_object_mut()
            .unwrap()
            .insert("ram".to_string(), json!("lots"));

        let app = router(test_state(Some(artifact_model())));
        let (status, body) = call(app, Method::POST, "/predict", Some(item)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("Prediction error: "));
    }

    #[tokio::test]
    async fn batch_rejects_non_array_bodies() {
        let app = router(test_state(Some(artifact_model())));
        let (status, body) = call(app, Method::POST, "/predict_batch", Some(json!({}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Request body must be a JSON array");
    }

    #[tokio::test]
    async fn batch_missing_field_aborts_with_a_single_error() {
        let mut second = phone(2000, 1000);
        second.as_object_mut().unwrap().remove("ram");
        let items = json!([phone(2000, 1000), second, phone(2000, 1000)]);

        let app = router(test_state(Some(artifact_model())));
        let (status, body) = call(app, Method::POST, "/predict_batch", Some(items)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required field: ram in one of the items");
    }

    #[tokio::test]
    async fn batch_preserves_item_order() {
        let items = json!([phone(256, 500), phone(3900, 1998), phone(256, 500)]);

        let app = router(test_state(Some(artifact_model())));
        let (status, body) = call(app, Method::POST, "/predict_batch", Some(items)).await;

        assert_eq!(status, StatusCode::OK);
        let results = body.as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["category_name"], "Low Cost");
        assert_eq!(results[1]["category_name"], "Very High Cost");
        assert_eq!(results[2]["category_name"], "Low Cost");
    }

    #[tokio::test]
    async fn batch_errors_use_the_batch_prefix() {
        let mut item = phone(2000, 1000);
        item.as_object_mut()
            .unwrap()
            .insert("ram".to_string(), json!("lots"));

        let app = router(test_state(Some(artifact_model())));
        let (status, body) =
            call(app, Method::POST, "/predict_batch", Some(json!([item]))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("Batch prediction error: "));
    }

    #[tokio::test]
    async fn health_reports_model_state() {
        let app = router(test_state(Some(artifact_model())));
        let (status, body) = call(app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model_loaded"], true);

        let app = router(test_state(None));
        let (_, body) = call(app, Method::GET, "/health", None).await;
        assert_eq!(body["model_loaded"], false);
    }

    #[tokio::test]
    async fn stats_exposes_counters_and_model_identity() {
        let state = test_state(Some(artifact_model()));

        let (status, _) = call(
            router(state.clone()),
            Method::POST,
            "/predict",
            Some(phone(2000, 1000)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(router(state), Method::GET, "/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"]["single_requests"], 1);
        assert_eq!(body["stats"]["items_classified"], 1);
        assert_eq!(body["model"]["loaded"], true);
        assert!(body["model"]["model_id"].is_string());
    }
}
