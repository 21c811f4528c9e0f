pub mod model_chain;
pub mod power_service;
pub mod solar_algorithm;
pub mod weather_service;
