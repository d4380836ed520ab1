use crate::traits::{DynamicalSystem, Scalar, Steppable};

/// Semi-implicit (symplectic) Euler for second-order systems.
///
/// The state must be laid out as `[q, p]` with `dq/dt = p`, which is what the packed N-body
/// state provides. Velocities are kicked first with the derivative at the current state, then
/// positions drift with the updated velocities. First order.
pub struct SymplecticEuler<T: Scalar> {
    deriv: Vec<T>,
}

impl<T: Scalar> SymplecticEuler<T> {
    pub fn new(dim: usize) -> Self {
        debug_assert!(dim % 2 == 0, "SymplecticEuler needs an even-dimensional [q, p] state");
        Self {
            deriv: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for SymplecticEuler<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let half = state.len() / 2;

        system.apply(*t, state, &mut self.deriv);

        // v <- v + a*dt
        for i in half..state.len() {
            state[i] = state[i] + dt * self.deriv[i];
        }
        // r <- r + v_new*dt
        for i in 0..half {
            state[i] = state[i] + dt * state[half + i];
        }

        *t = *t + dt;
    }
}

/// Classic Runge-Kutta 4th Order Solver
pub struct RK4<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> RK4<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            k1: vec![T::zero(); dim],
            k2: vec![T::zero(); dim],
            k3: vec![T::zero(); dim],
            k4: vec![T::zero(); dim],
            tmp: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for RK4<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let two = T::one() + T::one();
        let half = T::one() / two;
        let sixth = T::one() / (two + two + two);

        let t0 = *t;
        let half_dt = dt * half;

        // k1 = f(t, y)
        system.apply(t0, state, &mut self.k1);

        // k2 = f(t + dt/2, y + dt*k1/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + half_dt * self.k1[i];
        }
        system.apply(t0 + half_dt, &self.tmp, &mut self.k2);

        // k3 = f(t + dt/2, y + dt*k2/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + half_dt * self.k2[i];
        }
        system.apply(t0 + half_dt, &self.tmp, &mut self.k3);

        // k4 = f(t + dt, y + dt*k3)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k3[i];
        }
        system.apply(t0 + dt, &self.tmp, &mut self.k4);

        // y_next = y + dt/6 * (k1 + 2k2 + 2k3 + k4)
        for i in 0..state.len() {
            state[i] = state[i]
                + dt * sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }

        *t = t0 + dt;
    }
}
