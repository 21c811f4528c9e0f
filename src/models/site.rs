use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::ProductionError;
use crate::services::solar_algorithm;

/// Sun geometry for one instant at one site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolarPosition {
    /// Angle between the sun and the local vertical (deg)
    pub zenith_deg: f64,
    /// Clockwise from north (deg, 0..360)
    pub azimuth_deg: f64,
    /// Extraterrestrial normal irradiance (W/m²)
    pub extraterrestrial_w_m2: f64,
}

impl SolarPosition {
    pub fn is_below_horizon(&self) -> bool {
        self.zenith_deg >= 90.0
    }

    pub fn elevation_deg(&self) -> f64 {
        90.0 - self.zenith_deg
    }
}

/// Geographic location of a plant. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SiteLocation {
    latitude: f64,
    longitude: f64,
}

impl SiteLocation {
    /// Returns a new site
    ///
    /// # Arguments
    ///
    /// * 'latitude' - geographic latitude (−90 … +90)
    /// * 'longitude' - geographic longitude (−180 … +180)
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ProductionError> {
        let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let lon_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
        if !lat_ok || !lon_ok {
            return Err(ProductionError::InvalidCoordinate { latitude, longitude });
        }
        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Sun position at the given instant. Pure, so it can be evaluated for
    /// every timestamp of a series independently.
    pub fn solar_position(&self, timestamp: DateTime<Utc>) -> SolarPosition {
        solar_algorithm::solar_position(self.latitude, self.longitude, timestamp)
    }
}
