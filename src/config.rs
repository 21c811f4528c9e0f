use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::ProductionError;
use crate::models::array::ArrayConfiguration;
use crate::models::plant::{PlantSystem, PlantSystemBuilder};
use crate::models::site::SiteLocation;
use crate::services::model_chain::ModelChainConfig;

fn default_offline_mode() -> bool { false }
fn default_base_url() -> String { "https://api.open-meteo.com".to_string() }
fn default_timeout_secs() -> u64 { 30 }
fn default_forecast_days() -> u32 { 1 }

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid plant '{id}': {source}")]
    Plant {
        id: String,
        #[source]
        source: ProductionError,
    },
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_offline_mode")]
    pub offline_mode: bool,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub model: ModelChainConfig,
    pub plants: Vec<PlantConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            forecast_days: default_forecast_days(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlantConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub array_list: Vec<ArrayEntry>,
    #[serde(alias = "pdc0_inverter")]
    pub inverter_rated_dc_power: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ArrayEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(alias = "surface_tilt")]
    pub tilt: f64,
    #[serde(alias = "surface_azimuth")]
    pub azimuth: f64,
    pub module_type: String,
    #[serde(alias = "pdc0_module")]
    pub rated_dc_power_per_module: f64,
    #[serde(alias = "gamma_pdc_module")]
    pub temperature_coefficient: f64,
    #[serde(alias = "module_per_string")]
    pub modules_per_string: u32,
    pub strings: u32,
}

impl ArrayEntry {
    pub fn to_array(&self) -> Result<ArrayConfiguration, ProductionError> {
        let array = ArrayConfiguration::from_parts(
            self.tilt,
            self.azimuth,
            &self.module_type,
            self.rated_dc_power_per_module,
            self.temperature_coefficient,
            self.modules_per_string,
            self.strings,
        )?;
        Ok(match &self.name {
            Some(name) => array.with_name(name.clone()),
            None => array,
        })
    }
}

impl PlantConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Validated site and plant for this entry.
    pub fn build(&self) -> Result<(SiteLocation, PlantSystem), ConfigError> {
        self.try_build().map_err(|source| ConfigError::Plant { id: self.id.clone(), source })
    }

    fn try_build(&self) -> Result<(SiteLocation, PlantSystem), ProductionError> {
        let location = SiteLocation::new(self.latitude, self.longitude)?;
        let mut builder = PlantSystemBuilder::new();
        for entry in &self.array_list {
            builder.add_array(entry.to_array()?)?;
        }
        let plant = builder.finalize(self.inverter_rated_dc_power)?;
        Ok((location, plant))
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::solar_algorithm::{ThermalModel, Transposition};

    const LEGACY_KEYS: &str = r#"{
        "plants": [{
            "id": "home",
            "latitude": 45.0,
            "longitude": 7.0,
            "array_list": [{
                "surface_tilt": 30,
                "surface_azimuth": 180,
                "module_type": "glass_glass",
                "pdc0_module": 400,
                "gamma_pdc_module": -0.0035,
                "module_per_string": 20,
                "strings": 4
            }],
            "pdc0_inverter": 30000
        }]
    }"#;

    #[test]
    fn test_legacy_key_names_accepted() {
        let config = Config::from_json(LEGACY_KEYS).unwrap();
        assert!(!config.offline_mode);
        assert_eq!(config.weather.forecast_days, 1);
        assert_eq!(config.model, ModelChainConfig::default());

        let (site, plant) = config.plants[0].build().unwrap();
        assert_eq!(site.latitude(), 45.0);
        assert_eq!(plant.arrays()[0].name(), "array0");
        assert_eq!(plant.inverter_rated_dc_power_w(), 30_000.0);
        assert_eq!(config.plants[0].display_name(), "home");
    }

    #[test]
    fn test_model_selection_parsed() {
        let json = r#"{
            "model": { "transposition": "isotropic", "thermal_model": "pvsyst" },
            "plants": []
        }"#;
        let config = Config::from_json(json).unwrap();
        assert_eq!(config.model.transposition, Transposition::Isotropic);
        assert_eq!(config.model.thermal_model, ThermalModel::Pvsyst);
        assert_eq!(config.model.albedo, 0.25);
    }

    #[test]
    fn test_invalid_plant_reports_id() {
        let json = LEGACY_KEYS.replace("glass_glass", "thin_film");
        let config = Config::from_json(&json).unwrap();
        match config.plants[0].build() {
            Err(ConfigError::Plant { id, source: ProductionError::InvalidParameter(_) }) => assert_eq!(id, "home"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_plant_without_arrays_is_empty_plant() {
        let json = r#"{"plants": [{"id": "x", "latitude": 1, "longitude": 1, "array_list": [], "inverter_rated_dc_power": 1000}]}"#;
        let config = Config::from_json(json).unwrap();
        assert!(matches!(
            config.plants[0].build(),
            Err(ConfigError::Plant { source: ProductionError::EmptyPlant, .. })
        ));
    }
}
