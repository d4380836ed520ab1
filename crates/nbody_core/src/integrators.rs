//! Trajectory drivers.
//!
//! Every method takes a [`System`] by reference and a uniform time grid, and returns a freshly
//! allocated [`Trajectory`] whose first sample is the initial condition.

use crate::adaptive::{default_solver, AdaptiveSolver, Tolerances};
use crate::error::{NBodyError, Result};
use crate::gravity::GravityField;
use crate::solvers::{SymplecticEuler, RK4};
use crate::state::{pack, state_len};
use crate::system::System;
use crate::traits::{DynamicalSystem, Steppable};
use log::{debug, info, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Relative spread allowed between consecutive grid spacings.
const GRID_UNIFORMITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMethod {
    /// Fixed-step semi-implicit Euler.
    Euler,
    /// Fixed-step classic Runge-Kutta.
    #[default]
    Rk4,
    /// Error-controlled external solver.
    Adaptive,
}

impl IntegrationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            IntegrationMethod::Euler => "euler",
            IntegrationMethod::Rk4 => "rk4",
            IntegrationMethod::Adaptive => "adaptive",
        }
    }
}

impl fmt::Display for IntegrationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntegrationMethod {
    type Err = NBodyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "euler" => Ok(IntegrationMethod::Euler),
            "rk4" => Ok(IntegrationMethod::Rk4),
            "adaptive" | "dop853" => Ok(IntegrationMethod::Adaptive),
            other => Err(NBodyError::Configuration(format!(
                "Unknown integration method \"{other}\" (expected euler, rk4 or adaptive)."
            ))),
        }
    }
}

/// Positions and velocities sampled on the time grid.
///
/// Both buffers are row-major `(steps, bodies, 3)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    times: Vec<f64>,
    n_bodies: usize,
    positions: Vec<f64>,
    velocities: Vec<f64>,
}

impl Trajectory {
    fn zeros(times: &[f64], n_bodies: usize) -> Self {
        let len = times.len() * n_bodies * 3;
        Self {
            times: times.to_vec(),
            n_bodies,
            positions: vec![0.0; len],
            velocities: vec![0.0; len],
        }
    }

    /// Copies a packed state into sample `k`.
    fn record(&mut self, k: usize, state: &[f64]) {
        let width = 3 * self.n_bodies;
        let (r, v) = state.split_at(width);
        self.positions[k * width..(k + 1) * width].copy_from_slice(r);
        self.velocities[k * width..(k + 1) * width].copy_from_slice(v);
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn n_steps(&self) -> usize {
        self.times.len()
    }

    pub fn n_bodies(&self) -> usize {
        self.n_bodies
    }

    /// Flat `(steps, bodies, 3)` positions.
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Flat `(steps, bodies, 3)` velocities.
    pub fn velocities(&self) -> &[f64] {
        &self.velocities
    }

    /// All body positions at sample `k`, flat.
    pub fn positions_at(&self, k: usize) -> &[f64] {
        let width = 3 * self.n_bodies;
        &self.positions[k * width..(k + 1) * width]
    }

    /// All body velocities at sample `k`, flat.
    pub fn velocities_at(&self, k: usize) -> &[f64] {
        let width = 3 * self.n_bodies;
        &self.velocities[k * width..(k + 1) * width]
    }

    pub fn position(&self, k: usize, body: usize) -> Vector3<f64> {
        let offset = (k * self.n_bodies + body) * 3;
        Vector3::from_column_slice(&self.positions[offset..offset + 3])
    }

    pub fn velocity(&self, k: usize, body: usize) -> Vector3<f64> {
        let offset = (k * self.n_bodies + body) * 3;
        Vector3::from_column_slice(&self.velocities[offset..offset + 3])
    }

    pub fn is_finite(&self) -> bool {
        self.positions
            .iter()
            .chain(self.velocities.iter())
            .all(|v| v.is_finite())
    }
}

/// Checks the grid contract shared by all methods and returns its step.
///
/// The fixed-step methods use `t[1] - t[0]` for every step, so any other spacing is rejected.
pub fn uniform_step(times: &[f64]) -> Result<f64> {
    if times.len() < 2 {
        return Err(NBodyError::InvalidTimeGrid(format!(
            "At least 2 time points are required, got {}.",
            times.len()
        )));
    }
    if let Some(k) = times.iter().position(|t| !t.is_finite()) {
        return Err(NBodyError::InvalidTimeGrid(format!(
            "Time point {k} is not finite ({}).",
            times[k]
        )));
    }
    let dt = times[1] - times[0];
    if !dt.is_finite() || dt < 0.0 {
        return Err(NBodyError::InvalidTimeGrid(format!(
            "Time step must be finite and non-negative, got {dt}."
        )));
    }
    let scale = times.iter().fold(0.0_f64, |acc, t| acc.max(t.abs()));
    let slack = GRID_UNIFORMITY_TOLERANCE * dt + 4.0 * f64::EPSILON * scale;
    for (k, window) in times.windows(2).enumerate() {
        let spacing = window[1] - window[0];
        if (spacing - dt).abs() > slack {
            return Err(NBodyError::InvalidTimeGrid(format!(
                "Time grid is not uniform: spacing {spacing} at index {k} differs from {dt}."
            )));
        }
    }
    if dt == 0.0 {
        warn!("Time grid has zero spacing; the trajectory will not advance.");
    }
    Ok(dt)
}

fn run_fixed_step<S>(
    system: &System,
    times: &[f64],
    mut stepper: S,
    method: IntegrationMethod,
) -> Result<Trajectory>
where
    S: Steppable<f64>,
{
    let dt = uniform_step(times)?;
    let masses = system.masses();
    let field = GravityField::new(&masses, system.g, system.softening);
    let mut state = pack(&system.positions(), &system.velocities())?;

    debug!(
        "Integrating {} bodies over {} samples with {} (dt = {dt})",
        system.len(),
        times.len(),
        method
    );

    let mut trajectory = Trajectory::zeros(times, system.len());
    trajectory.record(0, &state);
    let mut t = times[0];
    for k in 1..times.len() {
        stepper.step(&field, &mut t, &mut state, dt);
        trajectory.record(k, &state);
    }

    finish(trajectory, system, method)
}

fn finish(
    trajectory: Trajectory,
    system: &System,
    method: IntegrationMethod,
) -> Result<Trajectory> {
    if !trajectory.is_finite() {
        warn!(
            "{method} trajectory contains non-finite values (softening = {}); bodies likely collided.",
            system.softening
        );
    }
    info!(
        "{method} integration finished: {} samples of {} bodies",
        trajectory.n_steps(),
        trajectory.n_bodies()
    );
    Ok(trajectory)
}

/// Fixed-step semi-implicit Euler: `v += a(r) dt`, then `r += v dt`.
pub fn integrate_euler(system: &System, times: &[f64]) -> Result<Trajectory> {
    let stepper = SymplecticEuler::new(state_len(system.len()));
    run_fixed_step(system, times, stepper, IntegrationMethod::Euler)
}

/// Fixed-step classic fourth-order Runge-Kutta on the packed state.
pub fn integrate_rk4(system: &System, times: &[f64]) -> Result<Trajectory> {
    let stepper = RK4::new(state_len(system.len()));
    run_fixed_step(system, times, stepper, IntegrationMethod::Rk4)
}

/// Delegates to the adaptive backend compiled into this build.
pub fn integrate_adaptive(
    system: &System,
    times: &[f64],
    tolerances: Tolerances,
) -> Result<Trajectory> {
    let solver = default_solver()?;
    integrate_with_solver(system, times, tolerances, solver.as_ref())
}

/// Packs the initial state, hands the vector field to `solver`, and reshapes its rows.
pub fn integrate_with_solver(
    system: &System,
    times: &[f64],
    tolerances: Tolerances,
    solver: &dyn AdaptiveSolver,
) -> Result<Trajectory> {
    tolerances.validate()?;
    uniform_step(times)?;

    let masses = system.masses();
    let field = GravityField::new(&masses, system.g, system.softening);
    let y0 = pack(&system.positions(), &system.velocities())?;
    let dim = field.dimension();

    debug!(
        "Integrating {} bodies over {} samples with {} (rtol = {}, atol = {})",
        system.len(),
        times.len(),
        solver.name(),
        tolerances.rtol,
        tolerances.atol
    );

    let rows = solver.solve(&field, &y0, times, tolerances)?;
    if rows.len() != times.len() * dim {
        return Err(NBodyError::ShapeMismatch(format!(
            "Solver returned {} values, expected {} samples x {dim}.",
            rows.len(),
            times.len()
        )));
    }

    let mut trajectory = Trajectory::zeros(times, system.len());
    for (k, row) in rows.chunks_exact(dim).enumerate() {
        trajectory.record(k, row);
    }
    // The solver's first row is only required to be close to y0.
    trajectory.record(0, &y0);

    finish(trajectory, system, IntegrationMethod::Adaptive)
}

/// Dispatches on `method`. Tolerances only apply to the adaptive method.
pub fn integrate(
    system: &System,
    times: &[f64],
    method: IntegrationMethod,
    tolerances: Tolerances,
) -> Result<Trajectory> {
    match method {
        IntegrationMethod::Euler => integrate_euler(system, times),
        IntegrationMethod::Rk4 => integrate_rk4(system, times),
        IntegrationMethod::Adaptive => integrate_adaptive(system, times, tolerances),
    }
}
