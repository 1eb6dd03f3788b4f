use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::math::ode::{Integrator, SolverConfig};

/// Per-day transition probabilities shared by every scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConstants {
    /// Natural death (human dies from anything but a zombie).
    pub d: f64,
    /// Infection (human becomes a zombie).
    pub b: f64,
    /// Resurrection (deceased becomes a zombie).
    pub g: f64,
    /// Zombie destruction (human kills a zombie).
    pub a: f64,
}

impl Default for RateConstants {
    fn default() -> Self {
        Self { d: 0.0077, b: 0.0095, g: 0.0005, a: 0.005 }
    }
}

impl RateConstants {
    /// No transitions at all.
    pub fn zero() -> Self {
        Self { d: 0.0, b: 0.0, g: 0.0, a: 0.0 }
    }
}

/// Humans (S), zombies (Z) and removed/deceased (R).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ZombieState {
    pub s: f64,
    pub z: f64,
    pub r: f64,
}

impl ZombieState {
    pub fn new(s: f64, z: f64, r: f64) -> Self {
        Self { s, z, r }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.s, self.z, self.r]
    }

    /// Reads `[S, Z, R]` from the front of `y`, which must hold at least three values.
    pub(crate) fn from_slice(y: &[f64]) -> Self {
        Self { s: y[0], z: y[1], r: y[2] }
    }

    pub fn total(&self) -> f64 {
        self.s + self.z + self.r
    }

    pub fn is_non_negative(&self) -> bool {
        self.s >= 0.0 && self.z >= 0.0 && self.r >= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZombieModel {
    pub rates: RateConstants,
    /// Daily births added to S.
    pub births: f64,
}

impl ZombieModel {
    pub fn new(rates: RateConstants, births: f64) -> Self {
        Self { rates, births }
    }

    /// Right-hand side of the system (Munz et al. 2009, basic model with
    /// births):
    ///
    /// ```text
    /// dS/dt = P - B*S*Z - d*S
    /// dZ/dt = B*S*Z + G*R - A*S*Z
    /// dR/dt = d*S + A*S*Z - G*R
    /// ```
    ///
    /// The system is autonomous; `t` is accepted for the stepper signature.
    /// Negative compartments from solver overshoot are used as-is.
    pub fn deriv(&self, _t: f64, y: &[f64], dy: &mut [f64]) {
        let RateConstants { d, b, g, a } = self.rates;
        let (s, z, r) = (y[0], y[1], y[2]);
        let sz = s * z;

        dy[0] = self.births - b * sz - d * s;
        dy[1] = b * sz + g * r - a * sz;
        dy[2] = d * s + a * sz - g * r;
    }

    pub fn derivative(&self, state: ZombieState) -> ZombieState {
        let mut dy = [0.0; 3];
        self.deriv(0.0, &state.to_array(), &mut dy);
        ZombieState::from_slice(&dy)
    }

    /// Integrate from `y0` at `timeline[0]` and sample every timeline point.
    ///
    /// A solver failure does not abort the run: the failure is logged and
    /// every sample from that point on is `NaN`.
    pub fn simulate(&self, y0: ZombieState, timeline: &[f64], solver: &SolverConfig) -> Trajectory {
        let mut traj = Trajectory::with_capacity(timeline.len());
        let Some((&t0, rest)) = timeline.split_first() else {
            return traj;
        };

        let mut integrator = Integrator::from_config(solver);
        let mut y = y0.to_array();
        traj.push(t0, &y);

        let mut t = t0;
        for (i, &t_next) in rest.iter().enumerate() {
            if let Err(e) = integrator.integrate_to(&mut y, t, t_next, |tt, y, dy| self.deriv(tt, y, dy)) {
                warn!(
                    "integration failed between t={t} and t={t_next}: {e}; {} samples left undefined",
                    rest.len() - i
                );
                for &t_undef in &rest[i..] {
                    traj.push(t_undef, &[f64::NAN; 3]);
                }
                break;
            }
            traj.push(t_next, &y);
            t = t_next;
        }

        let stats = integrator.stats();
        debug!(
            "{:?}: {} accepted, {} rejected, {} rhs evaluations, next step {:?}",
            solver.method,
            stats.accepted,
            stats.rejected,
            stats.evaluations,
            integrator.step_size()
        );
        traj
    }
}

/// Sampled compartment values, one entry per timeline point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    t: Vec<f64>,
    s: Vec<f64>,
    z: Vec<f64>,
    r: Vec<f64>,
}

impl Trajectory {
    fn with_capacity(n: usize) -> Self {
        Self {
            t: Vec::with_capacity(n),
            s: Vec::with_capacity(n),
            z: Vec::with_capacity(n),
            r: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, t: f64, y: &[f64]) {
        self.t.push(t);
        self.s.push(y[0]);
        self.z.push(y[1]);
        self.r.push(y[2]);
    }

    pub fn t(&self) -> &[f64] {
        &self.t
    }

    pub fn s(&self) -> &[f64] {
        &self.s
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    pub fn r(&self) -> &[f64] {
        &self.r
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn state_at(&self, i: usize) -> ZombieState {
        ZombieState::new(self.s[i], self.z[i], self.r[i])
    }

    pub fn last(&self) -> Option<ZombieState> {
        self.len().checked_sub(1).map(|i| self.state_at(i))
    }

    /// S + Z + R at every sample.
    pub fn totals(&self) -> Vec<f64> {
        self.s.iter().zip(&self.z).zip(&self.r).map(|((s, z), r)| s + z + r).collect()
    }

    pub fn has_undefined(&self) -> bool {
        self.s.iter().chain(&self.z).chain(&self.r).any(|v| v.is_nan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::grid::linspace;
    use crate::math::ode::Method;
    use approx::assert_relative_eq;

    #[test]
    fn derivative_matches_closed_form() {
        let model = ZombieModel::new(RateConstants::default(), 30.0);
        let dy = model.derivative(ZombieState::new(1000.0, 10.0, 20.0));

        let (d, b, g, a) = (0.0077, 0.0095, 0.0005, 0.005);
        assert_relative_eq!(dy.s, 30.0 - b * 1000.0 * 10.0 - d * 1000.0, max_relative = 1e-12);
        assert_relative_eq!(dy.z, b * 1000.0 * 10.0 + g * 20.0 - a * 1000.0 * 10.0, max_relative = 1e-12);
        assert_relative_eq!(dy.r, d * 1000.0 + a * 1000.0 * 10.0 - g * 20.0, max_relative = 1e-12);
    }

    #[test]
    fn derivative_sums_to_births() {
        let model = ZombieModel::new(RateConstants::default(), 12.5);
        for state in [
            ZombieState::new(1000.0, 0.0, 0.0),
            ZombieState::new(3.0, 700.0, 40.0),
            ZombieState::new(-1.0, 2.0, -0.5),
        ] {
            assert_relative_eq!(model.derivative(state).total(), 12.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn negative_values_are_not_clamped() {
        let model = ZombieModel::new(RateConstants::zero(), 0.0);
        let model = ZombieModel { rates: RateConstants { d: 1.0, ..model.rates }, ..model };
        let dy = model.derivative(ZombieState::new(-2.0, 0.0, 0.0));
        assert_eq!(dy.s, 2.0);
        assert_eq!(dy.r, -2.0);
    }

    #[test]
    fn no_rates_no_dynamics() {
        let model = ZombieModel::new(RateConstants::zero(), 0.0);
        let y0 = ZombieState::new(1000.0, 15.0, 20.0);
        let traj = model.simulate(y0, &linspace(0.0, 10.0, 1000), &SolverConfig::default());
        assert_eq!(traj.len(), 1000);
        for i in 0..traj.len() {
            assert_eq!(traj.state_at(i), y0);
        }
    }

    #[test]
    fn empty_timeline_gives_empty_trajectory() {
        let model = ZombieModel::new(RateConstants::default(), 0.0);
        let traj = model.simulate(ZombieState::new(1.0, 1.0, 1.0), &[], &SolverConfig::default());
        assert!(traj.is_empty());
        assert_eq!(traj.last(), None);
    }

    #[test]
    fn rk4_and_dopri5_agree() {
        let model = ZombieModel::new(RateConstants::default(), 0.0);
        let y0 = ZombieState::new(1000.0, 0.0, 20.0);
        let timeline = linspace(0.0, 5.0, 200);

        let adaptive = model.simulate(y0, &timeline, &SolverConfig::default());
        let fixed = model.simulate(
            y0,
            &timeline,
            &SolverConfig { method: Method::Rk4, rk4_dt: 0.001, ..SolverConfig::default() },
        );

        let (a, f) = (adaptive.last().unwrap(), fixed.last().unwrap());
        assert_relative_eq!(a.s, f.s, epsilon = 1e-3, max_relative = 1e-4);
        assert_relative_eq!(a.z, f.z, epsilon = 1e-3, max_relative = 1e-4);
        assert_relative_eq!(a.r, f.r, epsilon = 1e-3, max_relative = 1e-4);
    }

    #[test]
    fn solver_failure_fills_nan() {
        let model = ZombieModel::new(RateConstants::default(), 0.0);
        let timeline = linspace(0.0, 10.0, 50);
        // A one-step budget cannot cover the interval with this step length.
        let solver = SolverConfig { method: Method::Rk4, rk4_dt: 1e-4, max_steps: 1, ..SolverConfig::default() };
        let traj = model.simulate(ZombieState::new(1000.0, 1.0, 0.0), &timeline, &solver);

        assert_eq!(traj.len(), 50);
        assert_eq!(traj.state_at(0), ZombieState::new(1000.0, 1.0, 0.0));
        assert!(traj.has_undefined());
        assert!(traj.s()[1..].iter().all(|v| v.is_nan()));
        assert_eq!(traj.t(), timeline.as_slice());
    }
}
