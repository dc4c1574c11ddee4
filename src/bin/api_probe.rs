// Manual probe for a running tarifa instance: checks /health, then sends
// randomized single or batch prediction requests and prints the results.

use std::time::Duration;

use rand::Rng;
use serde_json::{json, Value};

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return;
    }

    let base_url =
        flag_value(&args, "--url").unwrap_or_else(|| "http://127.0.0.1:8000".to_string());
    let batch = args.iter().any(|arg| arg == "--batch");
    let batch_size = flag_value(&args, "--batch-size")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(5);

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(error) => {
            eprintln!("[PROBE] Failed to build client: {}", error);
            std::process::exit(1);
        }
    };

    if let Err(error) = check_health(&client, &base_url).await {
        eprintln!("[PROBE] Health check failed: {}", error);
        std::process::exit(1);
    }

    let result = if batch {
        run_batch(&client, &base_url, batch_size).await
    } else {
        run_single(&client, &base_url).await
    };

    if let Err(error) = result {
        eprintln!("[PROBE] {}", error);
        std::process::exit(1);
    }
}

async fn check_health(client: &reqwest::Client, base_url: &str) -> Result<(), String> {
    let url = format!("{}/health", base_url.trim_end_matches('/'));
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|error| error.to_string())?;
    let status = response.status();
    let body: Value = response.json().await.map_err(|error| error.to_string())?;

    println!("[PROBE] Health: {} {}", status, body);
    if !status.is_success() {
        return Err(format!("health endpoint returned {}", status));
    }
    Ok(())
}

async fn run_single(client: &reqwest::Client, base_url: &str) -> Result<(), String> {
    let payload = {
        let mut rng = rand::thread_rng();
        random_phone(&mut rng)
    };

    let url = format!("{}/predict", base_url.trim_end_matches('/'));
    let response = client
        .post(&url)
        .json(&payload)
        .send()
        .await
        .map_err(|error| error.to_string())?;

    let status = response.status();
    let body: Value = response.json().await.map_err(|error| error.to_string())?;
    if !status.is_success() {
        return Err(format!("predict returned {}: {}", status, body));
    }

    print_prediction(&payload, &body);
    Ok(())
}

async fn run_batch(
    client: &reqwest::Client,
    base_url: &str,
    batch_size: usize,
) -> Result<(), String> {
    let payload: Vec<Value> = {
        let mut rng = rand::thread_rng();
        (0..batch_size.max(1))
            .map(|_| random_phone(&mut rng))
            .collect()
    };

    let url = format!("{}/predict_batch", base_url.trim_end_matches('/'));
    let response = client
        .post(&url)
        .json(&payload)
        .send()
        .await
        .map_err(|error| error.to_string())?;

    let status = response.status();
    let body: Value = response.json().await.map_err(|error| error.to_string())?;
    if !status.is_success() {
        return Err(format!("predict_batch returned {}: {}", status, body));
    }

    let Some(results) = body.as_array() else {
        return Err(format!("unexpected batch response: {}", body));
    };

    println!("[PROBE] {} item(s):", results.len());
    for (item, result) in payload.iter().zip(results) {
        print_prediction(item, result);
    }
    Ok(())
}

fn print_prediction(payload: &Value, body: &Value) {
    let ram = payload.get("ram").and_then(Value::as_f64).unwrap_or(0.0);
    let battery = payload
        .get("battery_power")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let category = body
        .get("category_name")
        .and_then(Value::as_str)
        .unwrap_or("?");

    println!("[PROBE] ram={} battery={} -> {}", ram, battery, category);
    if let Some(probabilities) = body.get("probabilities").and_then(Value::as_object) {
        for (class, value) in probabilities {
            println!(
                "[PROBE]   class {}: {:.4}",
                class,
                value.as_f64().unwrap_or(0.0)
            );
        }
    }
}

fn random_phone(rng: &mut impl Rng) -> Value {
    json!({
        "battery_power": rng.gen_range(500..=2000),
        "blue": rng.gen_range(0..=1),
        "clock_speed": round1(rng.gen_range(0.5..=3.0)),
        "dual_sim": rng.gen_range(0..=1),
        "fc": rng.gen_range(0..=20),
        "four_g": rng.gen_range(0..=1),
        "int_memory": rng.gen_range(2..=64),
        "m_dep": round1(rng.gen_range(0.1..=1.0)),
        "mobile_wt": rng.gen_range(80..=200),
        "n_cores": rng.gen_range(1..=8),
        "pc": rng.gen_range(0..=20),
        "px_height": rng.gen_range(0..=1960),
        "px_width": rng.gen_range(500..=2000),
        "ram": rng.gen_range(256..=4000),
        "sc_h": rng.gen_range(5..=19),
        "sc_w": rng.gen_range(0..=18),
        "talk_time": rng.gen_range(2..=24),
        "three_g": rng.gen_range(0..=1),
        "touch_screen": rng.gen_range(0..=1),
        "wifi": rng.gen_range(0..=1)
    })
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|index| args.get(index + 1))
        .cloned()
}

fn print_usage() {
    println!("api_probe - manual test client for the tarifa service");
    println!();
    println!("USAGE:");
    println!("  api_probe [--url <base>] [--batch] [--batch-size <n>]");
    println!();
    println!("OPTIONS:");
    println!("  --url <base>      service base URL (default: http://127.0.0.1:8000)");
    println!("  --batch           send one batch request instead of a single item");
    println!("  --batch-size <n>  items per batch request (default: 5)");
}
