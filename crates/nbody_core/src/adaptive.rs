//! Narrow seam to an external error-controlled ODE solver.
//!
//! The core only builds the vector field and reshapes what comes back; step-size control is
//! the backend's business. The shipped backend is `ode_solvers`' DOP853, compiled in with the
//! `adaptive` feature.

use crate::error::{NBodyError, Result};
use crate::traits::DynamicalSystem;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            rtol: 1e-9,
            atol: 1e-12,
        }
    }
}

impl Tolerances {
    pub fn validate(&self) -> Result<()> {
        if !self.rtol.is_finite() || self.rtol <= 0.0 {
            return Err(NBodyError::Configuration(format!(
                "rtol must be finite and positive, got {}.",
                self.rtol
            )));
        }
        if !self.atol.is_finite() || self.atol <= 0.0 {
            return Err(NBodyError::Configuration(format!(
                "atol must be finite and positive, got {}.",
                self.atol
            )));
        }
        Ok(())
    }
}

/// An adaptive-step solver evaluated at caller-chosen output times.
pub trait AdaptiveSolver {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Integrates `system` from `times[0]` with state `y0` and returns the state at every entry
    /// of `times`, row-major (`times.len()` rows of `y0.len()` values). Row 0 is `y0`.
    fn solve(
        &self,
        system: &dyn DynamicalSystem<f64>,
        y0: &[f64],
        times: &[f64],
        tolerances: Tolerances,
    ) -> Result<Vec<f64>>;
}

/// The solver compiled into this build, if any.
pub fn compiled_solver() -> Option<Box<dyn AdaptiveSolver>> {
    #[cfg(feature = "adaptive")]
    {
        Some(Box::new(Dop853Solver::default()))
    }
    #[cfg(not(feature = "adaptive"))]
    {
        None
    }
}

/// Turns an absent backend into [`NBodyError::DependencyUnavailable`].
pub fn require_solver(
    solver: Option<Box<dyn AdaptiveSolver>>,
) -> Result<Box<dyn AdaptiveSolver>> {
    solver.ok_or_else(|| {
        NBodyError::DependencyUnavailable(
            "nbody_core was built without the `adaptive` feature".into(),
        )
    })
}

pub fn default_solver() -> Result<Box<dyn AdaptiveSolver>> {
    require_solver(compiled_solver())
}

#[cfg(feature = "adaptive")]
pub use dop853::Dop853Solver;

#[cfg(feature = "adaptive")]
mod dop853 {
    use super::{AdaptiveSolver, Tolerances};
    use crate::error::{NBodyError, Result};
    use crate::traits::DynamicalSystem;
    use ode_solvers::{DVector, Dop853};

    /// Bridges a [`DynamicalSystem`] to the `ode_solvers` right-hand-side trait.
    #[derive(Clone, Copy)]
    struct Rhs<'a> {
        system: &'a dyn DynamicalSystem<f64>,
    }

    impl ode_solvers::System<f64, DVector<f64>> for Rhs<'_> {
        fn system(&self, t: f64, y: &DVector<f64>, dy: &mut DVector<f64>) {
            self.system.apply(t, y.as_slice(), dy.as_mut_slice());
        }
    }

    /// Dormand-Prince 8(5,3).
    #[derive(Debug, Clone, Copy, Default)]
    pub struct Dop853Solver;

    impl AdaptiveSolver for Dop853Solver {
        fn name(&self) -> &'static str {
            "dop853"
        }

        fn solve(
            &self,
            system: &dyn DynamicalSystem<f64>,
            y0: &[f64],
            times: &[f64],
            tolerances: Tolerances,
        ) -> Result<Vec<f64>> {
            let dim = y0.len();
            let mut out = Vec::with_capacity(times.len() * dim);
            out.extend_from_slice(y0);
            let mut y = DVector::from_column_slice(y0);

            // One solver run per output interval so that every row lands exactly on the
            // requested time instead of on an accumulated dense-output abscissa.
            for window in times.windows(2) {
                let (t_start, t_end) = (window[0], window[1]);
                let span = t_end - t_start;
                if span != 0.0 {
                    let mut stepper = Dop853::new(
                        Rhs { system },
                        t_start,
                        t_end,
                        span,
                        y.clone(),
                        tolerances.rtol,
                        tolerances.atol,
                    );
                    stepper
                        .integrate()
                        .map_err(|err| NBodyError::SolverDivergence(err.to_string()))?;

                    let reached = stepper.x_out().last().copied().unwrap_or(t_start);
                    let slack = 1e-9 * span.abs().max(t_end.abs());
                    if (reached - t_end).abs() > slack {
                        return Err(NBodyError::SolverDivergence(format!(
                            "integration stopped at t = {reached} before reaching t = {t_end}"
                        )));
                    }
                    if let Some(last) = stepper.y_out().last() {
                        y = last.clone();
                    }
                }
                out.extend_from_slice(y.as_slice());
            }

            Ok(out)
        }
    }
}
