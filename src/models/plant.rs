use serde::Serialize;

use crate::errors::ProductionError;
use crate::models::array::ArrayConfiguration;

/// Accumulates arrays in insertion order and produces an immutable
/// `PlantSystem` once the inverter is known.
#[derive(Debug, Default, Clone)]
pub struct PlantSystemBuilder {
    arrays: Vec<ArrayConfiguration>,
}

impl PlantSystemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an array, naming it `array{index}` when no name was given.
    pub fn add_array(&mut self, mut config: ArrayConfiguration) -> Result<&mut Self, ProductionError> {
        if config.name.is_empty() {
            config.name = format!("array{}", self.arrays.len());
        }
        if self.arrays.iter().any(|a| a.name == config.name) {
            return Err(ProductionError::InvalidParameter(format!(
                "duplicate array name '{}'",
                config.name
            )));
        }
        self.arrays.push(config);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Fixes the shared inverter rating and freezes the plant.
    pub fn finalize(self, inverter_rated_dc_power_w: f64) -> Result<PlantSystem, ProductionError> {
        if self.arrays.is_empty() {
            return Err(ProductionError::EmptyPlant);
        }
        if !(inverter_rated_dc_power_w.is_finite() && inverter_rated_dc_power_w > 0.0) {
            return Err(ProductionError::InvalidParameter(format!(
                "inverter_rated_dc_power {} must be positive",
                inverter_rated_dc_power_w
            )));
        }
        Ok(PlantSystem {
            arrays: self.arrays,
            inverter_rated_dc_power_w,
        })
    }
}

/// All arrays of a plant plus the single shared inverter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantSystem {
    arrays: Vec<ArrayConfiguration>,
    inverter_rated_dc_power_w: f64,
}

impl PlantSystem {
    pub fn builder() -> PlantSystemBuilder {
        PlantSystemBuilder::new()
    }

    pub fn arrays(&self) -> &[ArrayConfiguration] {
        &self.arrays
    }

    pub fn inverter_rated_dc_power_w(&self) -> f64 {
        self.inverter_rated_dc_power_w
    }

    /// Sum of array nameplate ratings (W)
    pub fn rated_dc_power_w(&self) -> f64 {
        self.arrays.iter().map(|a| a.rated_dc_power_w()).sum()
    }
}
