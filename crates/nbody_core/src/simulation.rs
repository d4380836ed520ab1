//! Ingestion → integration → diagnostics in one call.

use crate::adaptive::Tolerances;
use crate::config::LoadedConfig;
use crate::diagnostics::{
    barycenter, barycenter_displacement, radial_velocity, relative_energy_error, total_energy,
    Axis,
};
use crate::error::{NBodyError, Result};
use crate::integrators::{integrate, IntegrationMethod, Trajectory};
use crate::system::{System, TimeGrid};
use nalgebra::Vector3;
use serde::Serialize;

/// A loaded system and the grid it will be sampled on.
#[derive(Debug, Clone)]
pub struct Simulation {
    system: System,
    grid: TimeGrid,
    tolerances: Tolerances,
}

/// Everything a plotting or export front end consumes.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub method: IntegrationMethod,
    pub names: Vec<String>,
    pub masses: Vec<f64>,
    pub trajectory: Trajectory,
    pub energy: Vec<f64>,
    pub energy_error: Vec<f64>,
    pub barycenter: Vec<Vector3<f64>>,
    pub barycenter_displacement: Vec<f64>,
}

impl Simulation {
    pub fn new(system: System, grid: TimeGrid) -> Self {
        Self {
            system,
            grid,
            tolerances: Tolerances::default(),
        }
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn tolerances(&self) -> Tolerances {
        self.tolerances
    }

    pub fn run(&self, method: IntegrationMethod) -> Result<SimulationReport> {
        let trajectory = integrate(&self.system, self.grid.times(), method, self.tolerances)?;
        let masses = self.system.masses();
        let energy = total_energy(&trajectory, &masses, self.system.g)?;
        let energy_error = relative_energy_error(&energy);
        let barycenter = barycenter(&trajectory, &masses)?;
        let barycenter_displacement = barycenter_displacement(&barycenter);

        Ok(SimulationReport {
            method,
            names: self.system.names(),
            masses,
            trajectory,
            energy,
            energy_error,
            barycenter,
            barycenter_displacement,
        })
    }
}

impl From<LoadedConfig> for Simulation {
    fn from(config: LoadedConfig) -> Self {
        Simulation::new(config.system, config.grid).with_tolerances(config.tolerances)
    }
}

impl SimulationReport {
    pub fn times(&self) -> &[f64] {
        self.trajectory.times()
    }

    /// Radial velocity of `body` along a coordinate axis.
    pub fn radial_velocity(&self, body: usize, axis: Axis) -> Result<Vec<f64>> {
        radial_velocity(&self.trajectory, body, axis.unit())
    }

    /// Looks a body up by name.
    pub fn body_index(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| NBodyError::Configuration(format!("No body named \"{name}\".")))
    }
}
