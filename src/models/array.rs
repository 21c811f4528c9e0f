use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ProductionError;

/// Material of the module sandwich. Selects the thermal loss coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleType {
    GlassGlass,
    PolymerGlass,
}

impl FromStr for ModuleType {
    type Err = ProductionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "glass_glass" => Ok(ModuleType::GlassGlass),
            "polymer_glass" => Ok(ModuleType::PolymerGlass),
            other => Err(ProductionError::InvalidParameter(format!(
                "unknown module_type '{}', expected 'glass_glass' or 'polymer_glass'",
                other
            ))),
        }
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleType::GlassGlass => write!(f, "glass_glass"),
            ModuleType::PolymerGlass => write!(f, "polymer_glass"),
        }
    }
}

/// A group of identical modules sharing mount geometry and wiring.
///
/// The name is left empty by `new` and assigned as `array{index}` by the
/// owning plant builder unless set explicitly with `with_name`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayConfiguration {
    pub(crate) name: String,
    tilt_deg: f64,
    azimuth_deg: f64,
    module_type: ModuleType,
    rated_dc_power_per_module_w: f64,
    temperature_coefficient: f64,
    modules_per_string: u32,
    strings: u32,
}

impl ArrayConfiguration {
    /// Returns a validated array configuration
    ///
    /// # Arguments
    ///
    /// * 'tilt_deg' - tilt of the modules from horizontal, 0..=90
    /// * 'azimuth_deg' - orientation, clockwise from north, 0..360
    /// * 'module_type' - backsheet material
    /// * 'rated_dc_power_per_module_w' - module power at 1000 W/m² and 25 °C
    /// * 'temperature_coefficient' - power change per °C, negative
    /// * 'modules_per_string' - modules wired in series
    /// * 'strings' - strings wired in parallel
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tilt_deg: f64,
        azimuth_deg: f64,
        module_type: ModuleType,
        rated_dc_power_per_module_w: f64,
        temperature_coefficient: f64,
        modules_per_string: u32,
        strings: u32,
    ) -> Result<Self, ProductionError> {
        if !(tilt_deg.is_finite() && (0.0..=90.0).contains(&tilt_deg)) {
            return Err(invalid(format!("tilt {} outside 0..=90", tilt_deg)));
        }
        if !(azimuth_deg.is_finite() && (0.0..360.0).contains(&azimuth_deg)) {
            return Err(invalid(format!("azimuth {} outside 0..360", azimuth_deg)));
        }
        if !(rated_dc_power_per_module_w.is_finite() && rated_dc_power_per_module_w > 0.0) {
            return Err(invalid(format!(
                "rated_dc_power_per_module {} must be positive",
                rated_dc_power_per_module_w
            )));
        }
        if !(temperature_coefficient.is_finite() && temperature_coefficient < 0.0) {
            return Err(invalid(format!(
                "temperature_coefficient {} must be negative",
                temperature_coefficient
            )));
        }
        if modules_per_string == 0 {
            return Err(invalid("modules_per_string must be at least 1".to_string()));
        }
        if strings == 0 {
            return Err(invalid("strings must be at least 1".to_string()));
        }
        if modules_per_string.checked_mul(strings).is_none() {
            return Err(invalid(format!(
                "{} modules per string × {} strings exceeds the supported module count",
                modules_per_string, strings
            )));
        }

        Ok(Self {
            name: String::new(),
            tilt_deg,
            azimuth_deg,
            module_type,
            rated_dc_power_per_module_w,
            temperature_coefficient,
            modules_per_string,
            strings,
        })
    }

    /// Same as `new` but with the module type given by its configuration name.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        tilt_deg: f64,
        azimuth_deg: f64,
        module_type: &str,
        rated_dc_power_per_module_w: f64,
        temperature_coefficient: f64,
        modules_per_string: u32,
        strings: u32,
    ) -> Result<Self, ProductionError> {
        Self::new(
            tilt_deg,
            azimuth_deg,
            module_type.parse()?,
            rated_dc_power_per_module_w,
            temperature_coefficient,
            modules_per_string,
            strings,
        )
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tilt_deg(&self) -> f64 {
        self.tilt_deg
    }

    pub fn azimuth_deg(&self) -> f64 {
        self.azimuth_deg
    }

    pub fn module_type(&self) -> ModuleType {
        self.module_type
    }

    pub fn rated_dc_power_per_module_w(&self) -> f64 {
        self.rated_dc_power_per_module_w
    }

    pub fn temperature_coefficient(&self) -> f64 {
        self.temperature_coefficient
    }

    pub fn modules_per_string(&self) -> u32 {
        self.modules_per_string
    }

    pub fn strings(&self) -> u32 {
        self.strings
    }

    pub fn module_count(&self) -> u32 {
        self.modules_per_string * self.strings
    }

    /// Nameplate DC power of the whole array (W)
    pub fn rated_dc_power_w(&self) -> f64 {
        self.rated_dc_power_per_module_w * self.module_count() as f64
    }
}

fn invalid(msg: String) -> ProductionError {
    ProductionError::InvalidParameter(msg)
}
