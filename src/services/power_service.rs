use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use tracing::{info, warn};

use crate::errors::ProductionError;
use crate::models::plant::PlantSystem;
use crate::models::production::ProductionSeries;
use crate::models::site::SiteLocation;
use crate::services::model_chain::{PipelineRun, ProductionModelChain};
use crate::services::weather_service::WeatherProvider;

// Longest horizon the forecast providers serve
pub const MAX_FORECAST_DAYS: u32 = 16;

/// Forecast window for `days` days from the hour containing `now`.
///
/// The window holds `24 × days + 1` hours so the curve closes at the same
/// clock hour it opened on. `days` must be within 1..=MAX_FORECAST_DAYS.
pub fn forecast_window(
    now: DateTime<Utc>,
    days: u32,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ProductionError> {
    if days == 0 || days > MAX_FORECAST_DAYS {
        return Err(ProductionError::InvalidParameter(format!(
            "forecast_days {} outside 1..={}",
            days, MAX_FORECAST_DAYS
        )));
    }
    let start = now
        .duration_trunc(TimeDelta::hours(1))
        .map_err(|e| ProductionError::InvalidParameter(format!("cannot floor {} to the hour: {}", now, e)))?;
    let end = start
        .checked_add_signed(TimeDelta::days(days as i64) + TimeDelta::hours(1))
        .ok_or_else(|| {
            ProductionError::InvalidParameter(format!("forecast window from {} overflows", start))
        })?;
    Ok((start, end))
}

/// One weather fetch followed by one model-chain run.
///
/// # Arguments
///
/// * 'provider' - weather source
/// * 'chain' - configured model chain
/// * 'location' - plant site
/// * 'plant' - plant arrays and inverter
/// * 'start', 'end' - hour aligned forecast window `[start, end)`
pub async fn forecast_production(
    provider: &dyn WeatherProvider,
    chain: ProductionModelChain,
    location: SiteLocation,
    plant: PlantSystem,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<ProductionSeries, ProductionError> {
    let mut run = PipelineRun::new();
    run.set_location(location)?;
    run.use_system(plant)?;
    run.prepare_model(chain)?;

    let weather = match provider
        .fetch(location.latitude(), location.longitude(), start, end)
        .await
    {
        Ok(w) => w,
        Err(e) => {
            warn!("Weather fetch failed for ({}, {}): {}", location.latitude(), location.longitude(), e);
            return Err(e);
        }
    };

    run.load_weather(weather)?;
    let series = run.compute()?;
    info!(
        "[FORECAST] ({:.3}, {:.3}) | {} h | total {:.1} kWh",
        location.latitude(),
        location.longitude(),
        series.len(),
        series.total_energy_wh() / 1000.0
    );
    Ok(series)
}
