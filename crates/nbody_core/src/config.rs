//! JSON ingestion boundary.
//!
//! A run is described by a document like
//!
//! ```json
//! {
//!   "units": {"distance": "AU", "time": "yr", "mass": "Msun"},
//!   "duration_yr": 1.0,
//!   "steps": 1000,
//!   "G": 39.478,
//!   "softening": 0.0,
//!   "bodies": [
//!     {"name": "Sun", "m": 1.0, "r": [0, 0, 0], "v": [0, 0, 0]},
//!     {"name": "Earth", "m": 3e-6, "r": [1, 0, 0], "v": [0, 6.283, 0]}
//!   ]
//! }
//! ```
//!
//! `units`, `G`, `softening`, `rtol` and `atol` are optional. Everything is validated here, so
//! the integrators only ever see well-formed arrays.

use crate::adaptive::Tolerances;
use crate::error::{NBodyError, Result};
use crate::system::{Body, System, TimeGrid, DEFAULT_G};
use log::debug;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitsConfig {
    pub distance: String,
    pub time: String,
    pub mass: String,
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self {
            distance: "AU".into(),
            time: "yr".into(),
            mass: "Msun".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyConfig {
    pub name: String,
    pub m: f64,
    pub r: Vec<f64>,
    pub v: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub units: UnitsConfig,
    pub duration_yr: f64,
    pub steps: usize,
    #[serde(rename = "G", default)]
    pub g: Option<f64>,
    #[serde(default)]
    pub softening: Option<f64>,
    #[serde(default)]
    pub rtol: Option<f64>,
    #[serde(default)]
    pub atol: Option<f64>,
    pub bodies: Vec<BodyConfig>,
}

/// Validated output of the ingestion boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub system: System,
    pub grid: TimeGrid,
    pub tolerances: Tolerances,
}

pub fn load_config(path: impl AsRef<Path>) -> Result<LoadedConfig> {
    let path = path.as_ref();
    debug!("Loading simulation config from {}", path.display());
    let text = fs::read_to_string(path)?;
    parse_config(&text)
}

pub fn parse_config(text: &str) -> Result<LoadedConfig> {
    let config: SimulationConfig = serde_json::from_str(text)?;
    config.validate()
}

fn vector3(body: &str, field: &str, values: &[f64]) -> Result<Vector3<f64>> {
    if values.len() != 3 {
        return Err(NBodyError::Configuration(format!(
            "Body \"{body}\": {field} must have exactly 3 components [x, y, z], got {}.",
            values.len()
        )));
    }
    Ok(Vector3::from_column_slice(values))
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<LoadedConfig> {
        let units = &self.units;
        if units.distance != "AU" || units.time != "yr" || units.mass != "Msun" {
            return Err(NBodyError::Configuration(format!(
                "Only AU/yr/Msun units are supported, got {}/{}/{}.",
                units.distance, units.time, units.mass
            )));
        }
        if !self.duration_yr.is_finite() || self.duration_yr <= 0.0 {
            return Err(NBodyError::Configuration(format!(
                "duration_yr must be finite and positive, got {}.",
                self.duration_yr
            )));
        }
        if self.steps < 2 {
            return Err(NBodyError::Configuration(format!(
                "steps must be at least 2, got {}.",
                self.steps
            )));
        }

        let bodies = self
            .bodies
            .iter()
            .map(|b| {
                Ok(Body::new(
                    b.name.clone(),
                    b.m,
                    vector3(&b.name, "r", &b.r)?,
                    vector3(&b.name, "v", &b.v)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let system = System::new(
            bodies,
            self.g.unwrap_or(DEFAULT_G),
            self.softening.unwrap_or(0.0),
        )?;
        let grid = TimeGrid::linspace(0.0, self.duration_yr, self.steps)?;

        let defaults = Tolerances::default();
        let tolerances = Tolerances {
            rtol: self.rtol.unwrap_or(defaults.rtol),
            atol: self.atol.unwrap_or(defaults.atol),
        };
        tolerances.validate()?;

        Ok(LoadedConfig {
            system,
            grid,
            tolerances,
        })
    }
}
