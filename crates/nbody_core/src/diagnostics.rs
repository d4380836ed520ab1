//! Read-only reductions over a computed trajectory.
//!
//! The potential energy here uses the true (unsoftened) separation, unlike the force kernel.
//! A run with softening therefore shows a small energy offset that is not integration error.

use crate::error::{NBodyError, Result};
use crate::integrators::Trajectory;
use log::warn;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Coordinate axes usable as a line of sight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

impl Axis {
    pub fn unit(self) -> Vector3<f64> {
        match self {
            Axis::X => Vector3::x(),
            Axis::Y => Vector3::y(),
            Axis::Z => Vector3::z(),
        }
    }
}

impl FromStr for Axis {
    type Err = NBodyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "x" | "X" => Ok(Axis::X),
            "y" | "Y" => Ok(Axis::Y),
            "z" | "Z" => Ok(Axis::Z),
            other => Err(NBodyError::Configuration(format!(
                "Unknown axis \"{other}\" (expected x, y or z)."
            ))),
        }
    }
}

fn check_masses(trajectory: &Trajectory, masses: &[f64]) -> Result<()> {
    if masses.len() != trajectory.n_bodies() {
        return Err(NBodyError::ShapeMismatch(format!(
            "{} masses for a trajectory of {} bodies.",
            masses.len(),
            trajectory.n_bodies()
        )));
    }
    Ok(())
}

/// `K(t) = 1/2 sum m_i |v_i|^2`
pub fn kinetic_energy(trajectory: &Trajectory, masses: &[f64]) -> Result<Vec<f64>> {
    check_masses(trajectory, masses)?;
    let mut out = Vec::with_capacity(trajectory.n_steps());
    for k in 0..trajectory.n_steps() {
        let v = trajectory.velocities_at(k);
        let kinetic: f64 = masses
            .iter()
            .zip(v.chunks_exact(3))
            .map(|(m, vi)| m * (vi[0] * vi[0] + vi[1] * vi[1] + vi[2] * vi[2]))
            .sum();
        out.push(0.5 * kinetic);
    }
    Ok(out)
}

/// `U(t) = -sum_{i<j} G m_i m_j / |r_i - r_j|`
pub fn potential_energy(trajectory: &Trajectory, masses: &[f64], g: f64) -> Result<Vec<f64>> {
    check_masses(trajectory, masses)?;
    let n = masses.len();
    let mut out = Vec::with_capacity(trajectory.n_steps());
    for k in 0..trajectory.n_steps() {
        let r = trajectory.positions_at(k);
        let mut u = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                let dx = r[3 * j] - r[3 * i];
                let dy = r[3 * j + 1] - r[3 * i + 1];
                let dz = r[3 * j + 2] - r[3 * i + 2];
                let dist = (dx * dx + dy * dy + dz * dz).sqrt();
                u -= g * masses[i] * masses[j] / dist;
            }
        }
        out.push(u);
    }
    Ok(out)
}

/// Total mechanical energy `E(t) = K(t) + U(t)` per sample.
pub fn total_energy(trajectory: &Trajectory, masses: &[f64], g: f64) -> Result<Vec<f64>> {
    let kinetic = kinetic_energy(trajectory, masses)?;
    let potential = potential_energy(trajectory, masses, g)?;
    Ok(kinetic
        .into_iter()
        .zip(potential)
        .map(|(k, u)| k + u)
        .collect())
}

/// `(E(t) - E(0)) / |E(0)|`. Empty input gives an empty series.
pub fn relative_energy_error(energy: &[f64]) -> Vec<f64> {
    let Some(&e0) = energy.first() else {
        return Vec::new();
    };
    if e0 == 0.0 {
        warn!("Initial energy is exactly zero; relative energy error is not finite.");
    }
    energy.iter().map(|e| (e - e0) / e0.abs()).collect()
}

/// Mass-weighted centroid per sample.
pub fn barycenter(trajectory: &Trajectory, masses: &[f64]) -> Result<Vec<Vector3<f64>>> {
    check_masses(trajectory, masses)?;
    let total: f64 = masses.iter().sum();
    let mut out = Vec::with_capacity(trajectory.n_steps());
    for k in 0..trajectory.n_steps() {
        let weighted = masses
            .iter()
            .zip(trajectory.positions_at(k).chunks_exact(3))
            .fold(Vector3::zeros(), |acc, (m, ri)| {
                acc + Vector3::new(ri[0], ri[1], ri[2]) * *m
            });
        out.push(weighted / total);
    }
    Ok(out)
}

/// `|R_cm(t) - R_cm(0)|` for a barycenter series.
pub fn barycenter_displacement(barycenter: &[Vector3<f64>]) -> Vec<f64> {
    let Some(origin) = barycenter.first() else {
        return Vec::new();
    };
    barycenter.iter().map(|r| (r - origin).norm()).collect()
}

/// Projection of one body's velocity on `direction / |direction|`.
///
/// A zero direction is not rejected; it yields NaN.
pub fn radial_velocity(
    trajectory: &Trajectory,
    body: usize,
    direction: Vector3<f64>,
) -> Result<Vec<f64>> {
    if body >= trajectory.n_bodies() {
        return Err(NBodyError::IndexOutOfRange {
            index: body,
            len: trajectory.n_bodies(),
        });
    }
    let norm = direction.norm();
    if norm == 0.0 {
        warn!("Radial velocity requested along the zero vector; result is NaN.");
    }
    let unit = direction / norm;
    Ok((0..trajectory.n_steps())
        .map(|k| trajectory.velocity(k, body).dot(&unit))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{
        barycenter, barycenter_displacement, kinetic_energy, potential_energy, radial_velocity,
        relative_energy_error, total_energy, Axis,
    };
    use crate::error::NBodyError;
    use crate::integrators::integrate_rk4;
    use crate::system::{Body, System, TimeGrid, DEFAULT_G};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn pair(softening: f64) -> System {
        System::new(
            vec![
                Body::new("A", 2.0, Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0)),
                Body::new(
                    "B",
                    1.0,
                    Vector3::new(0.0, 2.0, 0.0),
                    Vector3::new(3.0, 0.0, 0.0),
                ),
            ],
            1.0,
            softening,
        )
        .expect("valid system")
    }

    #[test]
    fn energy_at_first_sample_matches_hand_computation() {
        let system = pair(0.0);
        let traj = integrate_rk4(&system, &[0.0, 0.01]).expect("integration");
        let masses = system.masses();

        let kinetic = kinetic_energy(&traj, &masses).expect("kinetic");
        let potential = potential_energy(&traj, &masses, 1.0).expect("potential");
        let total = total_energy(&traj, &masses, 1.0).expect("total");

        // K = 1/2 (2 * 1 + 1 * 9), U = -1 * 2 * 1 / 2
        assert_relative_eq!(kinetic[0], 5.5);
        assert_relative_eq!(potential[0], -1.0);
        assert_relative_eq!(total[0], 4.5);
        assert_eq!(total.len(), 2);
    }

    #[test]
    fn potential_ignores_softening() {
        let soft = pair(0.5);
        let traj = integrate_rk4(&soft, &[0.0, 0.01]).expect("integration");
        let potential = potential_energy(&traj, &soft.masses(), soft.g).expect("potential");
        assert_relative_eq!(potential[0], -1.0);
    }

    #[test]
    fn diagnostics_reject_wrong_mass_count() {
        let system = pair(0.0);
        let traj = integrate_rk4(&system, &[0.0, 0.01]).expect("integration");
        assert!(matches!(
            total_energy(&traj, &[1.0], 1.0),
            Err(NBodyError::ShapeMismatch(_))
        ));
        assert!(barycenter(&traj, &[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn relative_energy_error_starts_at_zero() {
        let series = relative_energy_error(&[-2.0, -1.9, -2.2]);
        assert_eq!(series[0], 0.0);
        assert_relative_eq!(series[1], 0.05, max_relative = 1e-12);
        assert_relative_eq!(series[2], -0.1, max_relative = 1e-12);
        assert!(relative_energy_error(&[]).is_empty());
    }

    #[test]
    fn barycenter_is_mass_weighted_and_moves_with_total_momentum() {
        let system = pair(0.0);
        let grid = TimeGrid::linspace(0.0, 1.0, 101).expect("grid");
        let traj = integrate_rk4(&system, grid.times()).expect("integration");
        let cm = barycenter(&traj, &system.masses()).expect("barycenter");

        assert_relative_eq!(cm[0].y, 2.0 / 3.0, max_relative = 1e-15);
        // P = (3, 0, 2), M = 3.
        let expected = cm[0] + Vector3::new(1.0, 0.0, 2.0 / 3.0);
        assert!((cm[100] - expected).norm() < 1e-10);

        let displacement = barycenter_displacement(&cm);
        assert_eq!(displacement[0], 0.0);
        assert_relative_eq!(displacement[100], (1.0_f64 + 4.0 / 9.0).sqrt(), max_relative = 1e-9);
    }

    #[test]
    fn radial_velocity_projects_on_axis() {
        let system = System::new(
            vec![Body::new(
                "Star",
                1.0,
                Vector3::zeros(),
                Vector3::new(1.0, 0.0, 0.0),
            )],
            DEFAULT_G,
            0.0,
        )
        .expect("valid system");
        let grid = TimeGrid::linspace(0.0, 3.0, 31).expect("grid");
        let traj = integrate_rk4(&system, grid.times()).expect("integration");

        let along_x = radial_velocity(&traj, 0, Axis::X.unit()).expect("x");
        let along_y = radial_velocity(&traj, 0, "y".parse::<Axis>().expect("axis").unit())
            .expect("y");
        assert!(along_x.iter().all(|v| *v == 1.0));
        assert!(along_y.iter().all(|v| *v == 0.0));

        let diagonal = radial_velocity(&traj, 0, Vector3::new(2.0, 2.0, 0.0)).expect("diag");
        assert_relative_eq!(diagonal[5], std::f64::consts::FRAC_1_SQRT_2, max_relative = 1e-15);
    }

    #[test]
    fn radial_velocity_rejects_bad_body_index() {
        let system = pair(0.0);
        let traj = integrate_rk4(&system, &[0.0, 0.01]).expect("integration");
        let err = radial_velocity(&traj, 2, Axis::Z.unit()).expect_err("index 2 of 2");
        assert!(matches!(err, NBodyError::IndexOutOfRange { index: 2, len: 2 }));
        assert!(format!("{err}").contains("out of range"));
    }

    #[test]
    fn radial_velocity_along_zero_vector_is_nan() {
        let system = pair(0.0);
        let traj = integrate_rk4(&system, &[0.0, 0.01]).expect("integration");
        let series = radial_velocity(&traj, 0, Vector3::zeros()).expect("still returns");
        assert!(series.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn axis_parsing() {
        assert_eq!(Axis::default(), Axis::X);
        assert_eq!("Z".parse::<Axis>().ok(), Some(Axis::Z));
        assert!("w".parse::<Axis>().is_err());
    }
}
