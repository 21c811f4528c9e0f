//! Short-horizon photovoltaic production forecasting.
//!
//! A plant is described once (site, arrays, inverter), an hourly weather
//! forecast is fetched for it, and the model chain turns both into an AC
//! power curve.

pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod telemetry;

pub use errors::ProductionError;
pub use models::array::{ArrayConfiguration, ModuleType};
pub use models::plant::{PlantSystem, PlantSystemBuilder};
pub use models::production::{ProductionRecord, ProductionSeries, ProductionSummary};
pub use models::site::{SiteLocation, SolarPosition};
pub use models::weather::{WeatherRecord, WeatherSeries};
pub use services::model_chain::{ModelChainConfig, PipelineRun, PipelineState, ProductionModelChain};
pub use services::weather_service::{ClearSkyProvider, OpenMeteoProvider, WeatherProvider};
