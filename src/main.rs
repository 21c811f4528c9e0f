use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::task::JoinSet;
use tracing::{error, info};

use pv_forecast::config::Config;
use pv_forecast::services::power_service::{forecast_production, forecast_window};
use pv_forecast::telemetry::init_tracing;
use pv_forecast::{ClearSkyProvider, OpenMeteoProvider, ProductionModelChain, WeatherProvider};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    // 1. Load configuration
    let path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config = match Config::load(&path) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };
    info!("Configuration loaded: {} plants", config.plants.len());

    // 2. Model chain and weather source
    let chain = match ProductionModelChain::new(config.model) {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid model configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let provider: Arc<dyn WeatherProvider> = if config.offline_mode {
        info!("Offline mode: using clear-sky weather");
        Arc::new(ClearSkyProvider)
    } else {
        match OpenMeteoProvider::new(&config.weather.base_url, Duration::from_secs(config.weather.timeout_secs)) {
            Ok(p) => Arc::new(p),
            Err(e) => {
                error!("Failed to create weather client: {}", e);
                return ExitCode::FAILURE;
            }
        }
    };

    let (start, end) = match forecast_window(Utc::now(), config.weather.forecast_days) {
        Ok(w) => w,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // 3. One independent run per plant
    let mut runs = JoinSet::new();
    for plant_config in &config.plants {
        let (location, plant) = match plant_config.build() {
            Ok(built) => built,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        };
        let provider = provider.clone();
        let id = plant_config.id.clone();
        let name = plant_config.display_name().to_string();

        runs.spawn(async move {
            let result = forecast_production(provider.as_ref(), chain, location, plant, start, end).await;
            (id, name, result)
        });
    }

    // 4. Report
    let mut failed = false;
    while let Some(joined) = runs.join_next().await {
        let (id, name, result) = match joined {
            Ok(r) => r,
            Err(e) => {
                error!("Forecast task panicked: {}", e);
                failed = true;
                continue;
            }
        };

        match result {
            Ok(series) => {
                let summary = series.summary();
                info!(
                    "[PRODUCTION] Plant: {} | now {:.1} kW | next hour {:.1} kW | next 3h {:.1} kWh | total {:.1} kWh",
                    name,
                    summary.production_actual_w.unwrap_or(0.0) / 1000.0,
                    summary.production_next_hour_w.unwrap_or(0.0) / 1000.0,
                    summary.production_next_3hours_wh.unwrap_or(0.0) / 1000.0,
                    summary.total_energy_wh / 1000.0
                );
                let hourly: Vec<_> = series
                    .points()
                    .map(|(ts, w)| json!({ "timestamp": ts, "power_w": w }))
                    .collect();
                println!(
                    "{}",
                    json!({ "plant_id": id, "name": name, "summary": summary, "hourly_production": hourly })
                );
            }
            Err(e) => {
                error!("Forecast failed for plant {}: {}", id, e);
                failed = true;
            }
        }
    }

    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}
