use thiserror::Error;

/// Every failure the production pipeline can surface to its caller.
///
/// Construction errors (`InvalidCoordinate`, `InvalidParameter`, `EmptyPlant`)
/// are raised when the configuration is built; the rest abort a run as a whole.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProductionError {
    #[error("Invalid coordinate: latitude={latitude}, longitude={longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Plant has no arrays")]
    EmptyPlant,

    #[error("Incomplete configuration: {0}")]
    IncompleteConfiguration(String),

    #[error("Weather series is empty")]
    EmptyWeatherSeries,

    #[error("Malformed weather series: {0}")]
    MalformedWeatherSeries(String),

    #[error("Weather provider unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl From<reqwest::Error> for ProductionError {
    fn from(e: reqwest::Error) -> Self {
        ProductionError::UpstreamUnavailable(e.to_string())
    }
}
