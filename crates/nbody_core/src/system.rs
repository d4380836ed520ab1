//! Validated in-memory model: bodies, the system they form, and the output time grid.
//!
//! Units are AU, yr and Msun throughout.

use crate::error::{NBodyError, Result};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Gravitational constant in AU^3 / (Msun yr^2).
pub const DEFAULT_G: f64 = 4.0 * PI * PI;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Used for labelling only.
    pub name: String,
    pub mass: f64,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

impl Body {
    pub fn new(
        name: impl Into<String>,
        mass: f64,
        position: Vector3<f64>,
        velocity: Vector3<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            mass,
            position,
            velocity,
        }
    }
}

/// An ordered set of bodies plus the physical constants they interact under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct System {
    pub bodies: Vec<Body>,
    pub g: f64,
    pub softening: f64,
}

impl System {
    pub fn new(bodies: Vec<Body>, g: f64, softening: f64) -> Result<Self> {
        if bodies.is_empty() {
            return Err(NBodyError::Configuration(
                "System must contain at least one body.".into(),
            ));
        }
        if !g.is_finite() || g <= 0.0 {
            return Err(NBodyError::Configuration(format!(
                "G must be finite and positive, got {g}."
            )));
        }
        if !softening.is_finite() || softening < 0.0 {
            return Err(NBodyError::Configuration(format!(
                "Softening must be finite and non-negative, got {softening}."
            )));
        }
        for body in &bodies {
            if !body.mass.is_finite() || body.mass <= 0.0 {
                return Err(NBodyError::Configuration(format!(
                    "Body \"{}\" must have a finite positive mass, got {}.",
                    body.name, body.mass
                )));
            }
            if body.position.iter().chain(body.velocity.iter()).any(|c| !c.is_finite()) {
                return Err(NBodyError::Configuration(format!(
                    "Body \"{}\" has a non-finite position or velocity.",
                    body.name
                )));
            }
        }
        Ok(Self {
            bodies,
            g,
            softening,
        })
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn masses(&self) -> Vec<f64> {
        self.bodies.iter().map(|b| b.mass).collect()
    }

    pub fn positions(&self) -> Vec<Vector3<f64>> {
        self.bodies.iter().map(|b| b.position).collect()
    }

    pub fn velocities(&self) -> Vec<Vector3<f64>> {
        self.bodies.iter().map(|b| b.velocity).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.bodies.iter().map(|b| b.name.clone()).collect()
    }
}

/// Output times for an integration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeGrid {
    times: Vec<f64>,
}

impl TimeGrid {
    /// `num` evenly spaced samples over `[start, stop]`, both endpoints exact.
    pub fn linspace(start: f64, stop: f64, num: usize) -> Result<Self> {
        if num < 2 {
            return Err(NBodyError::InvalidTimeGrid(format!(
                "At least 2 time points are required, got {num}."
            )));
        }
        if !start.is_finite() || !stop.is_finite() {
            return Err(NBodyError::InvalidTimeGrid(
                "Time grid bounds must be finite.".into(),
            ));
        }
        let step = (stop - start) / (num - 1) as f64;
        let mut times: Vec<f64> = (0..num).map(|k| start + k as f64 * step).collect();
        times[num - 1] = stop;
        Ok(Self { times })
    }

    /// Wraps explicit sample times. Spacing is validated by the integrators, not here.
    pub fn from_times(times: Vec<f64>) -> Result<Self> {
        if times.len() < 2 {
            return Err(NBodyError::InvalidTimeGrid(format!(
                "At least 2 time points are required, got {}.",
                times.len()
            )));
        }
        if times.iter().any(|t| !t.is_finite()) {
            return Err(NBodyError::InvalidTimeGrid(
                "Time points must be finite.".into(),
            ));
        }
        Ok(Self { times })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.times[self.times.len() - 1] - self.times[0]
    }
}

#[cfg(test)]
mod tests {
    use super::{Body, System, TimeGrid, DEFAULT_G};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn assert_err_contains<T: std::fmt::Debug>(result: crate::error::Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    fn sun() -> Body {
        Body::new("Sun", 1.0, Vector3::zeros(), Vector3::zeros())
    }

    #[test]
    fn default_g_is_four_pi_squared() {
        assert_relative_eq!(DEFAULT_G, 39.47841760435743, max_relative = 1e-15);
    }

    #[test]
    fn system_exposes_body_columns_in_order() {
        let earth = Body::new(
            "Earth",
            3e-6,
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 6.28, 0.0),
        );
        let system = System::new(vec![sun(), earth], DEFAULT_G, 0.0).expect("valid system");
        assert_eq!(system.len(), 2);
        assert_eq!(system.masses(), vec![1.0, 3e-6]);
        assert_eq!(system.positions()[1], Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(system.velocities()[1].y, 6.28);
        assert_eq!(system.names(), vec!["Sun".to_string(), "Earth".to_string()]);
    }

    #[test]
    fn system_rejects_invalid_inputs() {
        assert_err_contains(System::new(vec![], DEFAULT_G, 0.0), "at least one body");
        assert_err_contains(System::new(vec![sun()], 0.0, 0.0), "G must be");
        assert_err_contains(System::new(vec![sun()], DEFAULT_G, -1.0), "Softening");
        let massless = Body::new("Ghost", 0.0, Vector3::zeros(), Vector3::zeros());
        assert_err_contains(System::new(vec![massless], DEFAULT_G, 0.0), "\"Ghost\"");
        let broken = Body::new("NaN", 1.0, Vector3::new(f64::NAN, 0.0, 0.0), Vector3::zeros());
        assert_err_contains(System::new(vec![broken], DEFAULT_G, 0.0), "non-finite");
    }

    #[test]
    fn linspace_hits_both_endpoints() {
        let grid = TimeGrid::linspace(0.0, 1.0, 1000).expect("valid grid");
        assert_eq!(grid.len(), 1000);
        assert_eq!(grid.times()[0], 0.0);
        assert_eq!(grid.times()[999], 1.0);
        assert_relative_eq!(grid.times()[1], 1.0 / 999.0, max_relative = 1e-15);
        assert_eq!(grid.duration(), 1.0);
    }

    #[test]
    fn linspace_rejects_too_few_points() {
        assert_err_contains(TimeGrid::linspace(0.0, 1.0, 1), "At least 2");
        assert_err_contains(TimeGrid::from_times(vec![0.0]), "At least 2");
        assert_err_contains(TimeGrid::from_times(vec![0.0, f64::INFINITY]), "finite");
    }
}
