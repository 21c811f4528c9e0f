use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Timelike, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::errors::ProductionError;
use crate::models::weather::{WeatherRecord, WeatherSeries};
use crate::services::solar_algorithm;

const OPEN_METEO_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";
const HOURLY_VARIABLES: &str =
    "temperature_2m,wind_speed_10m,shortwave_radiation,diffuse_radiation,direct_normal_irradiance";

/// Source of hourly forecast tables.
///
/// Implementations return every whole hour in `[start, end)`, ascending, or
/// an error. Timeouts and retries are theirs to handle.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<WeatherSeries, ProductionError>;
}

fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ProductionError> {
    let aligned = |t: DateTime<Utc>| t.minute() == 0 && t.second() == 0 && t.nanosecond() == 0;
    if !aligned(start) || !aligned(end) {
        return Err(ProductionError::InvalidParameter(format!(
            "forecast window [{}, {}) is not hour aligned",
            start, end
        )));
    }
    if end <= start {
        return Err(ProductionError::InvalidParameter(format!(
            "forecast window [{}, {}) is empty",
            start, end
        )));
    }
    Ok(())
}

// ─── Open-Meteo ──────────────────────────────────────────────────────────────

/// Hourly forecast from the Open-Meteo API.
pub struct OpenMeteoProvider {
    client: Client,
    base_url: String,
}

impl OpenMeteoProvider {
    /// Returns a new provider
    ///
    /// # Arguments
    ///
    /// * 'base_url' - API root, e.g. `https://api.open-meteo.com`
    /// * 'timeout' - per request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProductionError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<WeatherSeries, ProductionError> {
        check_window(start, end)?;

        // end_hour is inclusive upstream
        let last = end - TimeDelta::hours(1);
        let url = format!("{}/v1/forecast", self.base_url);
        debug!("Fetching forecast from {} for ({}, {})", url, latitude, longitude);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("hourly", HOURLY_VARIABLES.to_string()),
                ("wind_speed_unit", "ms".to_string()),
                ("start_hour", start.format(OPEN_METEO_TIME_FORMAT).to_string()),
                ("end_hour", last.format(OPEN_METEO_TIME_FORMAT).to_string()),
                ("timezone", "UTC".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("Open-Meteo returned error status: {}", status);
            return Err(ProductionError::UpstreamUnavailable(format!("HTTP {}", status)));
        }

        let body: ForecastResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                ProductionError::MalformedWeatherSeries(e.to_string())
            } else {
                ProductionError::from(e)
            }
        })?;

        let records = body.hourly.into_records()?;
        let series = WeatherSeries::covering(records, start, end)?;
        info!("Fetched {} hourly weather rows for ({}, {})", series.len(), latitude, longitude);
        Ok(series)
    }
}

// ─── Open-Meteo wire types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    hourly: HourlyColumns,
}

#[derive(Debug, Deserialize)]
struct HourlyColumns {
    time: Option<Vec<String>>,
    temperature_2m: Option<Vec<Option<f64>>>,
    wind_speed_10m: Option<Vec<Option<f64>>>,
    shortwave_radiation: Option<Vec<Option<f64>>>,
    diffuse_radiation: Option<Vec<Option<f64>>>,
    direct_normal_irradiance: Option<Vec<Option<f64>>>,
}

fn column(values: Option<Vec<Option<f64>>>, name: &str, len: usize) -> Result<Vec<f64>, ProductionError> {
    let values = values.ok_or_else(|| ProductionError::MalformedWeatherSeries(format!("missing column '{}'", name)))?;
    if values.len() != len {
        return Err(ProductionError::MalformedWeatherSeries(format!(
            "column '{}' has {} values, expected {}",
            name,
            values.len(),
            len
        )));
    }
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            v.ok_or_else(|| ProductionError::MalformedWeatherSeries(format!("column '{}' is null at row {}", name, i)))
        })
        .collect()
}

impl HourlyColumns {
    fn into_records(self) -> Result<Vec<WeatherRecord>, ProductionError> {
        let time = self
            .time
            .ok_or_else(|| ProductionError::MalformedWeatherSeries("missing column 'time'".to_string()))?;
        let n = time.len();
        let temp_air = column(self.temperature_2m, "temperature_2m", n)?;
        let wind = column(self.wind_speed_10m, "wind_speed_10m", n)?;
        let ghi = column(self.shortwave_radiation, "shortwave_radiation", n)?;
        let dhi = column(self.diffuse_radiation, "diffuse_radiation", n)?;
        let dni = column(self.direct_normal_irradiance, "direct_normal_irradiance", n)?;

        time.iter()
            .enumerate()
            .map(|(i, t)| {
                let timestamp = NaiveDateTime::parse_from_str(t, OPEN_METEO_TIME_FORMAT)
                    .map_err(|e| ProductionError::MalformedWeatherSeries(format!("bad timestamp '{}': {}", t, e)))?
                    .and_utc();
                Ok(WeatherRecord {
                    timestamp,
                    temp_air_c: temp_air[i],
                    wind_speed_m_s: wind[i],
                    ghi_w_m2: ghi[i],
                    dhi_w_m2: dhi[i],
                    dni_w_m2: dni[i],
                })
            })
            .collect()
    }
}

// ─── Offline clear-sky ───────────────────────────────────────────────────────

/// Deterministic clear-sky weather, no network calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearSkyProvider;

impl ClearSkyProvider {
    // Average wind speed assumed for offline estimates (m/s)
    const WIND_SPEED: f64 = 3.0;

    pub fn record(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> WeatherRecord {
        let sky = solar_algorithm::clear_sky(latitude, longitude, timestamp);
        WeatherRecord {
            timestamp,
            temp_air_c: solar_algorithm::ambient_temperature(latitude, longitude, timestamp),
            wind_speed_m_s: Self::WIND_SPEED,
            ghi_w_m2: sky.ghi,
            dhi_w_m2: sky.dhi,
            dni_w_m2: sky.dni,
        }
    }
}

#[async_trait]
impl WeatherProvider for ClearSkyProvider {
    async fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<WeatherSeries, ProductionError> {
        check_window(start, end)?;
        let hours = (end - start).num_hours();
        let records = (0..hours)
            .map(|h| Self::record(latitude, longitude, start + TimeDelta::hours(h)))
            .collect();
        WeatherSeries::covering(records, start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 21, 10, 0, 0).unwrap()
    }

    fn hourly(times: &[&str]) -> serde_json::Value {
        let n = times.len();
        json!({
            "latitude": 45.0,
            "longitude": 7.0,
            "hourly": {
                "time": times,
                "temperature_2m": vec![21.5; n],
                "wind_speed_10m": vec![3.2; n],
                "shortwave_radiation": vec![650.0; n],
                "diffuse_radiation": vec![120.0; n],
                "direct_normal_irradiance": vec![700.0; n],
            }
        })
    }

    async fn provider_for(body: serde_json::Value, status: u16) -> (MockServer, OpenMeteoProvider) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("timezone", "UTC"))
            .and(query_param("wind_speed_unit", "ms"))
            .and(query_param("start_hour", "2025-06-21T10:00"))
            .and(query_param("end_hour", "2025-06-21T12:00"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;
        let provider = OpenMeteoProvider::new(&server.uri(), Duration::from_secs(5)).unwrap();
        (server, provider)
    }

    #[tokio::test]
    async fn test_fetch_parses_hourly_table() {
        let body = hourly(&["2025-06-21T10:00", "2025-06-21T11:00", "2025-06-21T12:00"]);
        let (_server, provider) = provider_for(body, 200).await;
        let series = provider
            .fetch(45.0, 7.0, start(), start() + TimeDelta::hours(3))
            .await
            .unwrap();
        assert_eq!(series.len(), 3);
        let first = series.records()[0];
        assert_eq!(first.timestamp, start());
        assert_eq!(first.temp_air_c, 21.5);
        assert_eq!(first.ghi_w_m2, 650.0);
        assert_eq!(first.dni_w_m2, 700.0);
        assert_eq!(first.wind_speed_m_s, 3.2);
    }

    #[tokio::test]
    async fn test_fetch_rejects_missing_hour() {
        let body = hourly(&["2025-06-21T10:00", "2025-06-21T12:00"]);
        let (_server, provider) = provider_for(body, 200).await;
        let err = provider
            .fetch(45.0, 7.0, start(), start() + TimeDelta::hours(3))
            .await
            .unwrap_err();
        assert!(matches!(err, ProductionError::MalformedWeatherSeries(_)));
    }

    #[tokio::test]
    async fn test_fetch_rejects_missing_column() {
        let body = json!({
            "hourly": {
                "time": ["2025-06-21T10:00", "2025-06-21T11:00", "2025-06-21T12:00"],
                "temperature_2m": [20.0, 21.0, 22.0],
            }
        });
        let (_server, provider) = provider_for(body, 200).await;
        let err = provider
            .fetch(45.0, 7.0, start(), start() + TimeDelta::hours(3))
            .await
            .unwrap_err();
        assert!(matches!(err, ProductionError::MalformedWeatherSeries(_)));
    }

    #[tokio::test]
    async fn test_fetch_maps_server_error_to_unavailable() {
        let (_server, provider) = provider_for(json!({"error": true}), 503).await;
        let err = provider
            .fetch(45.0, 7.0, start(), start() + TimeDelta::hours(3))
            .await
            .unwrap_err();
        assert!(matches!(err, ProductionError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_unavailable() {
        let provider = OpenMeteoProvider::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = provider
            .fetch(45.0, 7.0, start(), start() + TimeDelta::hours(3))
            .await
            .unwrap_err();
        assert!(matches!(err, ProductionError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_clear_sky_covers_window() {
        let s = ClearSkyProvider
            .fetch(45.0, 7.0, start(), start() + TimeDelta::hours(25))
            .await
            .unwrap();
        assert_eq!(s.len(), 25);
        assert!(s.records()[1].ghi_w_m2 > 500.0);
        assert!(s.records().iter().all(|r| r.ghi_w_m2 >= 0.0 && r.wind_speed_m_s == 3.0));
    }

    #[tokio::test]
    async fn test_unaligned_window_rejected() {
        let err = ClearSkyProvider
            .fetch(45.0, 7.0, start() + TimeDelta::minutes(15), start() + TimeDelta::hours(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ProductionError::InvalidParameter(_)));
    }
}
