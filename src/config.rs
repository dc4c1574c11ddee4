use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub model_path: String,
    pub host: String,
    pub port: u16,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let model_path = std::env::var("TARIFA_MODEL_PATH")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| default_model_path().to_string_lossy().to_string());

        let host = std::env::var("TARIFA_HOST")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "0.0.0.0".to_string());

        let port = std::env::var("TARIFA_PORT")
            .ok()
            .and_then(|value| value.trim().parse::<u16>().ok())
            .unwrap_or(8000);

        ServiceConfig {
            model_path,
            host,
            port,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_model_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("models")
        .join("price_model.json")
}
