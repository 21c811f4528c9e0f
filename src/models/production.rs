use chrono::{DateTime, Utc};
use serde::Serialize;

/// AC output for one forecast hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProductionRecord {
    pub timestamp: DateTime<Utc>,
    /// Plant AC power after inverter clipping (W)
    pub power_w: f64,
    /// Plant DC power before clipping (W)
    pub dc_power_w: f64,
}

/// Hourly AC power curve, one entry per weather row, in weather order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionSeries {
    records: Vec<ProductionRecord>,
}

/// At-a-glance figures derived from a production curve.
///
/// Energy figures treat every hourly power value as the mean over its hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProductionSummary {
    pub total_energy_wh: f64,
    pub production_actual_w: Option<f64>,
    pub production_next_hour_w: Option<f64>,
    pub production_next_3hours_wh: Option<f64>,
}

impl ProductionSeries {
    pub(crate) fn new(records: Vec<ProductionRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ProductionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `(timestamp, power_watts)` pairs in series order
    pub fn points(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.records.iter().map(|r| (r.timestamp, r.power_w))
    }

    pub fn power_at(&self, index: usize) -> Option<f64> {
        self.records.get(index).map(|r| r.power_w)
    }

    pub fn total_energy_wh(&self) -> f64 {
        self.records.iter().map(|r| r.power_w).sum()
    }

    pub fn peak_power_w(&self) -> f64 {
        self.records.iter().map(|r| r.power_w).fold(0.0, f64::max)
    }

    pub fn summary(&self) -> ProductionSummary {
        let next_3hours = if self.records.len() >= 3 {
            Some(self.records[..3].iter().map(|r| r.power_w).sum())
        } else {
            None
        };

        ProductionSummary {
            total_energy_wh: self.total_energy_wh(),
            production_actual_w: self.power_at(0),
            production_next_hour_w: self.power_at(1),
            production_next_3hours_wh: next_3hours,
        }
    }
}
