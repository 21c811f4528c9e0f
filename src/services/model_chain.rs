use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ProductionError;
use crate::models::array::ArrayConfiguration;
use crate::models::plant::{PlantSystem, PlantSystemBuilder};
use crate::models::production::{ProductionRecord, ProductionSeries};
use crate::models::site::{SiteLocation, SolarPosition};
use crate::models::weather::{WeatherRecord, WeatherSeries};
use crate::services::solar_algorithm::{
    self, AoiModel, PoaIrradiance, ThermalModel, Transposition,
};

fn default_albedo() -> f64 { 0.25 }

/// Model selections for the chain. Defaults: Hay–Davies sky diffuse,
/// physical incidence-angle losses, SAPM open rack temperatures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelChainConfig {
    #[serde(default)]
    pub transposition: Transposition,
    #[serde(default)]
    pub aoi_model: AoiModel,
    #[serde(default)]
    pub thermal_model: ThermalModel,
    #[serde(default = "default_albedo")]
    pub albedo: f64,
}

impl Default for ModelChainConfig {
    fn default() -> Self {
        Self {
            transposition: Transposition::default(),
            aoi_model: AoiModel::default(),
            thermal_model: ThermalModel::default(),
            albedo: default_albedo(),
        }
    }
}

/// Per-array intermediate values for one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayStep {
    pub name: String,
    pub poa: PoaIrradiance,
    pub effective_irradiance_w_m2: f64,
    pub cell_temp_c: f64,
    pub dc_power_w: f64,
}

/// Everything the chain derives for one weather row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub solar_position: SolarPosition,
    pub arrays: Vec<ArrayStep>,
    pub dc_power_w: f64,
    pub ac_power_w: f64,
}

/// Turns location + plant + hourly weather into an AC power curve.
///
/// Holds only model selections; every run is a pure function of its inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProductionModelChain {
    config: ModelChainConfig,
}

impl ProductionModelChain {
    pub fn new(config: ModelChainConfig) -> Result<Self, ProductionError> {
        if !(config.albedo.is_finite() && (0.0..=1.0).contains(&config.albedo)) {
            return Err(ProductionError::InvalidParameter(format!(
                "albedo {} outside 0..=1",
                config.albedo
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &ModelChainConfig {
        &self.config
    }

    /// Runs the chain over the whole series. Either every row produces a
    /// record, or the run fails.
    pub fn run(
        &self,
        location: &SiteLocation,
        plant: &PlantSystem,
        weather: &WeatherSeries,
    ) -> Result<ProductionSeries, ProductionError> {
        if plant.arrays().is_empty() {
            return Err(ProductionError::EmptyPlant);
        }
        if weather.is_empty() {
            return Err(ProductionError::EmptyWeatherSeries);
        }

        let records: Vec<ProductionRecord> = weather
            .records()
            .iter()
            .map(|w| {
                let step = self.simulate_step(location, plant, w);
                ProductionRecord {
                    timestamp: w.timestamp,
                    power_w: step.ac_power_w,
                    dc_power_w: step.dc_power_w,
                }
            })
            .collect();

        let series = ProductionSeries::new(records);
        info!(
            "Production computed: {} rows, peak {:.0} W, total {:.0} Wh",
            series.len(),
            series.peak_power_w(),
            series.total_energy_wh()
        );
        Ok(series)
    }

    /// Solar position → POA → cell temperature → per-array DC → clipped AC
    /// for a single weather row.
    pub fn simulate_step(
        &self,
        location: &SiteLocation,
        plant: &PlantSystem,
        weather: &WeatherRecord,
    ) -> StepResult {
        let sun = location.solar_position(weather.timestamp);

        let arrays: Vec<ArrayStep> = plant
            .arrays()
            .iter()
            .map(|array| self.array_step(array, &sun, weather))
            .collect();

        let dc_power_w: f64 = arrays.iter().map(|a| a.dc_power_w).sum();
        let ac_power_w = dc_power_w.min(plant.inverter_rated_dc_power_w()).max(0.0);

        #[cfg(feature = "verbose_log")]
        for a in &arrays {
            debug!(
                "[STEP] {} {} | zenith {:.1}° | POA {:.0} W/m² | Tcell {:.1}°C | DC {:.0} W",
                weather.timestamp,
                a.name,
                sun.zenith_deg,
                a.poa.global(),
                a.cell_temp_c,
                a.dc_power_w
            );
        }

        StepResult {
            solar_position: sun,
            arrays,
            dc_power_w,
            ac_power_w,
        }
    }

    fn array_step(&self, array: &ArrayConfiguration, sun: &SolarPosition, w: &WeatherRecord) -> ArrayStep {
        let poa = solar_algorithm::poa_irradiance(
            self.config.transposition,
            sun,
            array.tilt_deg(),
            array.azimuth_deg(),
            w.ghi_w_m2,
            w.dhi_w_m2,
            w.dni_w_m2,
            self.config.albedo,
        );
        let effective = solar_algorithm::effective_irradiance(self.config.aoi_model, &poa);
        let cell_temp_c = solar_algorithm::cell_temperature(
            self.config.thermal_model,
            array.module_type(),
            poa.global(),
            w.temp_air_c,
            w.wind_speed_m_s,
        );
        let module_w = solar_algorithm::module_dc_power(
            array.rated_dc_power_per_module_w(),
            effective,
            array.temperature_coefficient(),
            cell_temp_c,
        );

        ArrayStep {
            name: array.name().to_string(),
            poa,
            effective_irradiance_w_m2: effective,
            cell_temp_c,
            dc_power_w: module_w * array.module_count() as f64,
        }
    }
}

/// Progress of a single pipeline execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Unconfigured,
    LocationSet,
    ArraysAdded,
    SystemFinalized,
    ModelReady,
    WeatherLoaded,
    ProductionComputed,
}

/// One pipeline execution, configured step by step.
///
/// Each step requires the previous one; calling a step out of order fails
/// with `IncompleteConfiguration`. `compute` consumes the run, so a retry
/// always starts from a fresh instance.
#[derive(Debug)]
pub struct PipelineRun {
    state: PipelineState,
    location: Option<SiteLocation>,
    builder: PlantSystemBuilder,
    plant: Option<PlantSystem>,
    chain: Option<ProductionModelChain>,
    weather: Option<WeatherSeries>,
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRun {
    pub fn new() -> Self {
        Self {
            state: PipelineState::Unconfigured,
            location: None,
            builder: PlantSystemBuilder::new(),
            plant: None,
            chain: None,
            weather: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn location(&self) -> Option<&SiteLocation> {
        self.location.as_ref()
    }

    pub fn plant(&self) -> Option<&PlantSystem> {
        self.plant.as_ref()
    }

    fn expect_state(&self, allowed: &[PipelineState], step: &str) -> Result<(), ProductionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ProductionError::IncompleteConfiguration(format!(
                "cannot {} in state {:?}",
                step, self.state
            )))
        }
    }

    pub fn set_location(&mut self, location: SiteLocation) -> Result<(), ProductionError> {
        self.expect_state(&[PipelineState::Unconfigured], "set location")?;
        self.location = Some(location);
        self.state = PipelineState::LocationSet;
        Ok(())
    }

    pub fn add_array(&mut self, array: ArrayConfiguration) -> Result<(), ProductionError> {
        self.expect_state(&[PipelineState::LocationSet, PipelineState::ArraysAdded], "add array")?;
        self.builder.add_array(array)?;
        self.state = PipelineState::ArraysAdded;
        Ok(())
    }

    pub fn finalize_system(&mut self, inverter_rated_dc_power_w: f64) -> Result<(), ProductionError> {
        if self.state == PipelineState::LocationSet {
            return Err(ProductionError::EmptyPlant);
        }
        self.expect_state(&[PipelineState::ArraysAdded], "finalize system")?;
        let builder = std::mem::take(&mut self.builder);
        self.plant = Some(builder.finalize(inverter_rated_dc_power_w)?);
        self.state = PipelineState::SystemFinalized;
        Ok(())
    }

    /// Installs an already built plant in place of `add_array` + `finalize_system`.
    pub fn use_system(&mut self, plant: PlantSystem) -> Result<(), ProductionError> {
        self.expect_state(&[PipelineState::LocationSet], "use system")?;
        if plant.arrays().is_empty() {
            return Err(ProductionError::EmptyPlant);
        }
        self.plant = Some(plant);
        self.state = PipelineState::SystemFinalized;
        Ok(())
    }

    pub fn prepare_model(&mut self, chain: ProductionModelChain) -> Result<(), ProductionError> {
        self.expect_state(&[PipelineState::SystemFinalized], "prepare model")?;
        self.chain = Some(chain);
        self.state = PipelineState::ModelReady;
        Ok(())
    }

    pub fn load_weather(&mut self, weather: WeatherSeries) -> Result<(), ProductionError> {
        self.expect_state(&[PipelineState::ModelReady], "load weather")?;
        debug!("Weather loaded: {} rows", weather.len());
        self.weather = Some(weather);
        self.state = PipelineState::WeatherLoaded;
        Ok(())
    }

    pub fn compute(self) -> Result<ProductionSeries, ProductionError> {
        self.expect_state(&[PipelineState::WeatherLoaded], "compute production")?;
        match (&self.location, &self.plant, &self.chain, &self.weather) {
            (Some(location), Some(plant), Some(chain), Some(weather)) => chain.run(location, plant, weather),
            _ => Err(ProductionError::IncompleteConfiguration(
                "location, plant, model or weather missing".to_string(),
            )),
        }
    }
}
