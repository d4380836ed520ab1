//! Packed state vector codec.
//!
//! A system of `n` bodies is flattened into a single buffer of length `6n`:
//! all positions (row-major, `x y z` per body) followed by all velocities.
//! Every stepper, the derivative function and the adaptive solver adapter share this layout.

use crate::error::{NBodyError, Result};
use nalgebra::Vector3;

/// Length of the packed state for `n` bodies.
pub fn state_len(n_bodies: usize) -> usize {
    6 * n_bodies
}

/// Concatenates flattened positions and velocities, in body order.
pub fn pack(positions: &[Vector3<f64>], velocities: &[Vector3<f64>]) -> Result<Vec<f64>> {
    if positions.len() != velocities.len() {
        return Err(NBodyError::ShapeMismatch(format!(
            "{} positions but {} velocities.",
            positions.len(),
            velocities.len()
        )));
    }
    let mut state = Vec::with_capacity(state_len(positions.len()));
    for r in positions {
        state.extend_from_slice(r.as_slice());
    }
    for v in velocities {
        state.extend_from_slice(v.as_slice());
    }
    Ok(state)
}

/// Inverse of [`pack`].
pub fn unpack(state: &[f64], n_bodies: usize) -> Result<(Vec<Vector3<f64>>, Vec<Vector3<f64>>)> {
    if state.len() != state_len(n_bodies) {
        return Err(NBodyError::ShapeMismatch(format!(
            "State length {} does not match 6 x {} bodies.",
            state.len(),
            n_bodies
        )));
    }
    let (r_flat, v_flat) = state.split_at(3 * n_bodies);
    Ok((to_vectors(r_flat), to_vectors(v_flat)))
}

/// Reads a flat `x y z x y z ...` slice as 3-vectors. The length must be a multiple of three.
pub(crate) fn to_vectors(flat: &[f64]) -> Vec<Vector3<f64>> {
    flat.chunks_exact(3).map(Vector3::from_column_slice).collect()
}

#[cfg(test)]
mod tests {
    use super::{pack, state_len, unpack};
    use nalgebra::Vector3;

    fn assert_err_contains<T: std::fmt::Debug>(result: crate::error::Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn pack_places_positions_before_velocities() {
        let r = vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0)];
        let v = vec![Vector3::new(7.0, 8.0, 9.0), Vector3::new(10.0, 11.0, 12.0)];
        let state = pack(&r, &v).expect("pack should succeed");
        assert_eq!(state.len(), state_len(2));
        assert_eq!(
            state,
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0]
        );
    }

    #[test]
    fn unpack_inverts_pack_exactly() {
        for n in 1..5 {
            let r: Vec<_> = (0..n)
                .map(|i| Vector3::new(0.1 * i as f64, -1.0 / 3.0, 1e-17 * i as f64))
                .collect();
            let v: Vec<_> = (0..n)
                .map(|i| Vector3::new(std::f64::consts::PI, i as f64, -2.5e8))
                .collect();
            let state = pack(&r, &v).expect("pack should succeed");
            let (r2, v2) = unpack(&state, n).expect("unpack should succeed");
            assert_eq!(r, r2);
            assert_eq!(v, v2);
        }
    }

    #[test]
    fn pack_rejects_mismatched_body_counts() {
        let r = vec![Vector3::zeros(); 2];
        let v = vec![Vector3::zeros(); 1];
        assert_err_contains(pack(&r, &v), "2 positions but 1 velocities");
    }

    #[test]
    fn unpack_rejects_wrong_length() {
        assert_err_contains(unpack(&[0.0; 7], 1), "State length 7");
        assert_err_contains(unpack(&[0.0; 6], 2), "6 x 2 bodies");
    }
}
