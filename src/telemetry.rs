use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use sysinfo::System;
use tokio::sync::Mutex;

use crate::types::{PredictError, Prediction};

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub single_requests: u64,
    pub batch_requests: u64,
    pub items_classified: u64,
    pub validation_failures: u64,
    pub prediction_failures: u64,
    pub model_unavailable: u64,
    pub predictions_by_category: BTreeMap<String, u64>,
    pub uptime: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub cpu_percent: f32,
    pub memory_mb: u64,
    pub memory_percent: f32,
}

#[derive(Debug, Default)]
struct StatsCounters {
    single_requests: u64,
    batch_requests: u64,
    items_classified: u64,
    validation_failures: u64,
    prediction_failures: u64,
    model_unavailable: u64,
    by_category: BTreeMap<String, u64>,
}

pub struct TelemetryStore {
    start_time: SystemTime,
    stats: Mutex<StatsCounters>,
    system: Mutex<System>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        let mut system = System::new_all();
        system.refresh_all();

        TelemetryStore {
            start_time: SystemTime::now(),
            stats: Mutex::new(StatsCounters::default()),
            system: Mutex::new(system),
        }
    }

    pub async fn snapshot_stats(&self) -> StatsSnapshot {
        let stats = self.stats.lock().await;
        StatsSnapshot {
            single_requests: stats.single_requests,
            batch_requests: stats.batch_requests,
            items_classified: stats.items_classified,
            validation_failures: stats.validation_failures,
            prediction_failures: stats.prediction_failures,
            model_unavailable: stats.model_unavailable,
            predictions_by_category: stats.by_category.clone(),
            uptime: format_uptime(
                SystemTime::now()
                    .duration_since(self.start_time)
                    .unwrap_or(Duration::from_secs(0)),
            ),
        }
    }

    pub async fn health_snapshot(&self) -> SystemHealth {
        let mut system = self.system.lock().await;
        system.refresh_cpu();
        system.refresh_memory();
        let cpu_percent = system.global_cpu_info().cpu_usage();
        let total_mem = system.total_memory();
        let used_mem = system.used_memory();
        let memory_percent = if total_mem > 0 {
            (used_mem as f32 / total_mem as f32) * 100.0
        } else {
            0.0
        };

        SystemHealth {
            cpu_percent,
            memory_mb: used_mem / (1024 * 1024),
            memory_percent,
        }
    }

    pub async fn record_single_request(&self) {
        let mut stats = self.stats.lock().await;
        stats.single_requests = stats.single_requests.saturating_add(1);
    }

    pub async fn record_batch_request(&self) {
        let mut stats = self.stats.lock().await;
        stats.batch_requests = stats.batch_requests.saturating_add(1);
    }

    pub async fn record_prediction(&self, prediction: &Prediction) {
        let mut stats = self.stats.lock().await;
        count_prediction(&mut stats, prediction);
    }

    pub async fn record_predictions(&self, predictions: &[Prediction]) {
        let mut stats = self.stats.lock().await;
        for prediction in predictions {
            count_prediction(&mut stats, prediction);
        }
    }

    pub async fn record_failure(&self, error: &PredictError) {
        let mut stats = self.stats.lock().await;
        match error {
            PredictError::MissingField { .. } => {
                stats.validation_failures = stats.validation_failures.saturating_add(1);
            }
            PredictError::ModelUnavailable => {
                stats.model_unavailable = stats.model_unavailable.saturating_add(1);
            }
            PredictError::Inference(_) => {
                stats.prediction_failures = stats.prediction_failures.saturating_add(1);
            }
        }
    }
}

fn count_prediction(stats: &mut StatsCounters, prediction: &Prediction) {
    stats.items_classified = stats.items_classified.saturating_add(1);
    let count = stats
        .by_category
        .entry(prediction.label.to_string())
        .or_insert(0);
    *count = count.saturating_add(1);
}

fn format_uptime(duration: Duration) -> String {
    let total_minutes = duration.as_secs() / 60;
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;
    format!("{}d {}h {}m", days, hours, minutes)
}
