// TARIFA - Mobile Price Category Service
// Servicio de inferencia para categorias de precio

mod config;
mod engine;
mod features;
mod http;
mod model;
mod schema;
mod telemetry;
mod types;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::config::ServiceConfig;
use crate::engine::InferenceEngine;
use crate::http::ApiState;
use crate::model::PriceModel;
use crate::telemetry::TelemetryStore;

// ============================================================================
// EJECUCION
// ============================================================================

fn main() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return;
    }

    if let Err(error) = run_console() {
        eprintln!("[TARIFA] {}", error);
        std::process::exit(1);
    }
}

fn run_console() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            if let Err(error) = tokio::signal::ctrl_c().await {
                eprintln!("[TARIFA] Failed to listen for shutdown: {}", error);
            }
            let _ = shutdown_tx.send(());
        });

        run_until_shutdown(shutdown_rx).await;
    });

    Ok(())
}

async fn run_until_shutdown(shutdown_rx: oneshot::Receiver<()>) {
    let config = ServiceConfig::from_env();
    let model = load_model(&config.model_path);
    let engine = Arc::new(InferenceEngine::new(model));
    let telemetry = Arc::new(TelemetryStore::new());

    let api_addr = config.bind_addr();
    let api_state = ApiState {
        engine,
        telemetry,
        config: Arc::new(config),
    };

    log::info!("Serving on {}", api_addr);
    let api_handle = tokio::spawn(async move {
        if let Err(error) = crate::http::serve(api_addr, api_state).await {
            eprintln!("[API] Server error: {}", error);
        }
    });

    let _ = shutdown_rx.await;
    log::info!("Shutting down");
    api_handle.abort();
}

fn load_model(path: &str) -> Option<Arc<PriceModel>> {
    log::info!("Loading model from {}", path);
    match PriceModel::from_file(Path::new(path)) {
        Ok(model) => {
            log::info!("Model loaded successfully");
            Some(Arc::new(model))
        }
        Err(error) => {
            log::error!("Failed to load model: {}", error);
            None
        }
    }
}

fn print_usage() {
    println!("tarifa - mobile price category inference service");
    println!();
    println!("USAGE:");
    println!("  tarifa [--help]");
    println!();
    println!("ENVIRONMENT:");
    println!("  TARIFA_MODEL_PATH   model artifact (default: models/price_model.json)");
    println!("  TARIFA_HOST         bind host (default: 0.0.0.0)");
    println!("  TARIFA_PORT         bind port (default: 8000)");
    println!("  TARIFA_CORS_ORIGIN  allowed origin list, or * (default: *)");
    println!("  RUST_LOG            log filter (default: info)");
}
