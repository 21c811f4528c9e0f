use chrono::{DateTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ProductionError;

/// One hourly row of the forecast table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub timestamp: DateTime<Utc>,
    /// Air temperature at 2 m (°C)
    pub temp_air_c: f64,
    /// Wind speed at 10 m (m/s)
    pub wind_speed_m_s: f64,
    /// Global horizontal irradiance (W/m²)
    pub ghi_w_m2: f64,
    /// Diffuse horizontal irradiance (W/m²)
    pub dhi_w_m2: f64,
    /// Direct normal irradiance (W/m²)
    pub dni_w_m2: f64,
}

/// Ordered, gap-free hourly weather table.
///
/// Construction checks the shape and never repairs it: rows must sit on whole
/// hours, ascend by exactly one hour and carry finite values. An empty table
/// is accepted here and rejected by the model chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherSeries {
    records: Vec<WeatherRecord>,
}

impl WeatherSeries {
    pub fn new(records: Vec<WeatherRecord>) -> Result<Self, ProductionError> {
        for (i, r) in records.iter().enumerate() {
            if r.timestamp.minute() != 0 || r.timestamp.second() != 0 || r.timestamp.nanosecond() != 0 {
                return Err(malformed(format!("row {} at {} is not hour aligned", i, r.timestamp)));
            }
            let values = [r.temp_air_c, r.wind_speed_m_s, r.ghi_w_m2, r.dhi_w_m2, r.dni_w_m2];
            if values.iter().any(|v| !v.is_finite()) {
                return Err(malformed(format!("row {} at {} has a non-finite value", i, r.timestamp)));
            }
        }

        for pair in records.windows(2) {
            let step = pair[1].timestamp - pair[0].timestamp;
            if step <= TimeDelta::zero() {
                return Err(malformed(format!(
                    "timestamps not ascending at {} -> {}",
                    pair[0].timestamp, pair[1].timestamp
                )));
            }
            if step != TimeDelta::hours(1) {
                return Err(malformed(format!(
                    "gap of {} minutes after {}",
                    step.num_minutes(),
                    pair[0].timestamp
                )));
            }
        }

        Ok(Self { records })
    }

    /// Same as `new`, and additionally requires the rows to cover every
    /// whole hour in `[start, end)`.
    pub fn covering(
        records: Vec<WeatherRecord>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, ProductionError> {
        let series = Self::new(records)?;
        let expected = (end - start).num_hours().max(0) as usize;
        if series.len() != expected {
            return Err(malformed(format!(
                "expected {} hourly rows for [{}, {}), got {}",
                expected,
                start,
                end,
                series.len()
            )));
        }
        if let Some(first) = series.records.first() {
            if first.timestamp != start {
                return Err(malformed(format!("series starts at {}, expected {}", first.timestamp, start)));
            }
        }
        Ok(series)
    }

    pub fn records(&self) -> &[WeatherRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn malformed(msg: String) -> ProductionError {
    ProductionError::MalformedWeatherSeries(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(t: DateTime<Utc>) -> WeatherRecord {
        WeatherRecord {
            timestamp: t,
            temp_air_c: 20.0,
            wind_speed_m_s: 2.0,
            ghi_w_m2: 500.0,
            dhi_w_m2: 100.0,
            dni_w_m2: 600.0,
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 21, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_contiguous_series_accepted() {
        let rows = (0..5).map(|h| row(start() + TimeDelta::hours(h))).collect();
        let s = WeatherSeries::covering(rows, start(), start() + TimeDelta::hours(5)).unwrap();
        assert_eq!(s.len(), 5);
    }

    #[test]
    fn test_gap_rejected() {
        let rows = [0, 1, 3, 4].iter().map(|h| row(start() + TimeDelta::hours(*h))).collect();
        assert!(matches!(WeatherSeries::new(rows), Err(ProductionError::MalformedWeatherSeries(_))));
    }

    #[test]
    fn test_duplicate_and_descending_rejected() {
        let dup = vec![row(start()), row(start())];
        assert!(matches!(WeatherSeries::new(dup), Err(ProductionError::MalformedWeatherSeries(_))));
        let desc = vec![row(start() + TimeDelta::hours(1)), row(start())];
        assert!(matches!(WeatherSeries::new(desc), Err(ProductionError::MalformedWeatherSeries(_))));
    }

    #[test]
    fn test_non_finite_and_misaligned_rejected() {
        let mut r = row(start());
        r.ghi_w_m2 = f64::NAN;
        assert!(WeatherSeries::new(vec![r]).is_err());
        let r = row(start() + TimeDelta::minutes(30));
        assert!(WeatherSeries::new(vec![r]).is_err());
    }

    #[test]
    fn test_short_coverage_rejected() {
        let rows = (0..4).map(|h| row(start() + TimeDelta::hours(h))).collect();
        let err = WeatherSeries::covering(rows, start(), start() + TimeDelta::hours(5)).unwrap_err();
        assert!(matches!(err, ProductionError::MalformedWeatherSeries(_)));
    }

    #[test]
    fn test_empty_series_is_shape_valid() {
        assert!(WeatherSeries::new(Vec::new()).unwrap().is_empty());
    }
}
