pub mod adaptive;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod gravity;
pub mod integrators;
pub mod simulation;
pub mod solvers;
pub mod state;
pub mod system;
/// The `nbody_core` crate integrates the gravitational N-body problem in AU/yr/Msun units.
///
/// Key components:
/// - **Traits**: `Scalar`, `DynamicalSystem` (ODE vector fields), `Steppable` (fixed-step solvers).
/// - **State**: the packed `[positions, velocities]` buffer shared by every integrator.
/// - **Gravity**: direct-summation softened accelerations and the `GravityField` vector field.
/// - **Solvers**: `SymplecticEuler` and `RK4` steppers; `adaptive` wraps an external DOP853.
/// - **Integrators**: trajectory drivers over a uniform time grid.
/// - **Diagnostics**: energy, barycenter and radial velocity series.
/// - **Config**: JSON ingestion producing a validated `System` and `TimeGrid`.
pub mod traits;

pub use error::{NBodyError, Result};
