//! Direct-summation Newtonian gravity and the packed-state vector field built on it.

use crate::error::{NBodyError, Result};
use crate::state::{state_len, to_vectors};
use crate::traits::DynamicalSystem;
use nalgebra::Vector3;

/// Pairwise softened gravitational accelerations.
///
/// `a_i = G * sum_{j != i} m_j (r_j - r_i) / (|r_j - r_i|^2 + eps^2)^{3/2}`
///
/// With `softening == 0` and two coincident bodies the result is non-finite. That is left
/// visible rather than masked.
pub fn acceleration(
    positions: &[Vector3<f64>],
    masses: &[f64],
    g: f64,
    softening: f64,
) -> Result<Vec<Vector3<f64>>> {
    if positions.len() != masses.len() {
        return Err(NBodyError::ShapeMismatch(format!(
            "{} positions but {} masses.",
            positions.len(),
            masses.len()
        )));
    }
    let flat: Vec<f64> = positions.iter().flat_map(|r| r.iter().copied()).collect();
    let mut out = vec![0.0; flat.len()];
    accumulate_accelerations(&flat, masses, g, softening, &mut out);
    Ok(to_vectors(&out))
}

/// Writes accelerations for flat row-major positions into `out` (same length).
///
/// Each unordered pair is visited once; the contribution is applied to both bodies with
/// opposite sign.
pub(crate) fn accumulate_accelerations(
    positions: &[f64],
    masses: &[f64],
    g: f64,
    softening: f64,
    out: &mut [f64],
) {
    let n = masses.len();
    let eps2 = softening * softening;
    out[..3 * n].fill(0.0);

    for i in 0..n {
        let ri = &positions[3 * i..3 * i + 3];
        for j in (i + 1)..n {
            let rj = &positions[3 * j..3 * j + 3];
            let dx = rj[0] - ri[0];
            let dy = rj[1] - ri[1];
            let dz = rj[2] - ri[2];
            let r2 = dx * dx + dy * dy + dz * dz + eps2;
            let inv_r3 = 1.0 / (r2 * r2.sqrt());

            let si = g * masses[j] * inv_r3;
            out[3 * i] += si * dx;
            out[3 * i + 1] += si * dy;
            out[3 * i + 2] += si * dz;

            let sj = g * masses[i] * inv_r3;
            out[3 * j] -= sj * dx;
            out[3 * j + 1] -= sj * dy;
            out[3 * j + 2] -= sj * dz;
        }
    }
}

/// The N-body vector field `dr/dt = v`, `dv/dt = a(r)` over a packed state.
///
/// Time is accepted for interface uniformity; the force law is autonomous.
#[derive(Debug, Clone, Copy)]
pub struct GravityField<'a> {
    masses: &'a [f64],
    g: f64,
    softening: f64,
}

impl<'a> GravityField<'a> {
    pub fn new(masses: &'a [f64], g: f64, softening: f64) -> Self {
        Self {
            masses,
            g,
            softening,
        }
    }

    pub fn n_bodies(&self) -> usize {
        self.masses.len()
    }
}

impl DynamicalSystem<f64> for GravityField<'_> {
    fn dimension(&self) -> usize {
        state_len(self.masses.len())
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        let half = 3 * self.masses.len();
        let (r, v) = x.split_at(half);
        let (dr, dv) = out.split_at_mut(half);
        dr.copy_from_slice(v);
        accumulate_accelerations(r, self.masses, self.g, self.softening, dv);
    }
}

/// Allocating form of the vector field: returns `pack(v, a)` for the given packed state.
pub fn derivative(t: f64, state: &[f64], masses: &[f64], g: f64, softening: f64) -> Result<Vec<f64>> {
    let field = GravityField::new(masses, g, softening);
    if state.len() != field.dimension() {
        return Err(NBodyError::ShapeMismatch(format!(
            "State length {} does not match 6 x {} bodies.",
            state.len(),
            masses.len()
        )));
    }
    let mut out = vec![0.0; state.len()];
    field.apply(t, state, &mut out);
    Ok(out)
}
