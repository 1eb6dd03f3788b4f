//! Steppers for small autonomous or time-dependent ODE systems.
//!
//! State and derivative are plain `f64` slices. The right-hand side is any
//! closure `f(t, y, dy)` that writes the derivative of `y` at `t` into `dy`.

use serde::{Deserialize, Serialize};

/// Default relative/absolute tolerance, the classic LSODA defaults.
pub const DEFAULT_TOL: f64 = 1.49012e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Adaptive Dormand-Prince 5(4).
    #[default]
    Dopri5,
    /// Classical fixed-step Runge-Kutta.
    Rk4,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub method: Method,
    pub rtol: f64,
    pub atol: f64,
    /// Maximum accepted + rejected steps between two output points.
    pub max_steps: usize,
    /// Step length used by [`Method::Rk4`] (days).
    pub rk4_dt: f64,
    /// Initial step for [`Method::Dopri5`]. Estimated when `None`.
    pub h0: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: Method::Dopri5,
            rtol: DEFAULT_TOL,
            atol: DEFAULT_TOL,
            max_steps: 500,
            rk4_dt: 0.01,
            h0: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum OdeError {
    #[error("exceeded {max_steps} steps before reaching t={t_end}")]
    TooManySteps { max_steps: usize, t_end: f64 },
    #[error("step size underflow at t={t} (h={h:e})")]
    StepSizeUnderflow { t: f64, h: f64 },
    #[error("non-finite state at t={t}")]
    NonFinite { t: f64 },
}

/// Step counters, accumulated over the lifetime of a stepper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub accepted: usize,
    pub rejected: usize,
    pub evaluations: usize,
}

/// Scratch buffers for allocation-free RK4 steps.
#[derive(Debug, Clone, Default)]
pub struct Rk4Workspace {
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    ytmp: Vec<f64>,
}

impl Rk4Workspace {
    pub fn new(n: usize) -> Self {
        let mut ws = Self::default();
        ws.resize(n);
        ws
    }

    fn resize(&mut self, n: usize) {
        for buf in [&mut self.k1, &mut self.k2, &mut self.k3, &mut self.k4, &mut self.ytmp] {
            buf.resize(n, 0.0);
        }
    }
}

/// y_tmp = y + h * k
fn axpy(out: &mut [f64], y: &[f64], h: f64, k: &[f64]) {
    for ((o, yi), ki) in out.iter_mut().zip(y).zip(k) {
        *o = yi + h * ki;
    }
}

/// Advance `y` in place by one classical RK4 step of length `dt`.
pub fn rk4_step<F>(y: &mut [f64], t: f64, dt: f64, ws: &mut Rk4Workspace, mut f: F)
where
    F: FnMut(f64, &[f64], &mut [f64]),
{
    ws.resize(y.len());
    let half = 0.5 * dt;

    f(t, y, &mut ws.k1);
    axpy(&mut ws.ytmp, y, half, &ws.k1);
    f(t + half, &ws.ytmp, &mut ws.k2);
    axpy(&mut ws.ytmp, y, half, &ws.k2);
    f(t + half, &ws.ytmp, &mut ws.k3);
    axpy(&mut ws.ytmp, y, dt, &ws.k3);
    f(t + dt, &ws.ytmp, &mut ws.k4);

    for (i, yi) in y.iter_mut().enumerate() {
        *yi += (dt / 6.0) * (ws.k1[i] + 2.0 * ws.k2[i] + 2.0 * ws.k3[i] + ws.k4[i]);
    }
}

/// Fixed-step RK4 driver. The last step of each interval is shortened so the
/// integration lands exactly on the requested time.
#[derive(Debug, Clone)]
pub struct Rk4 {
    dt: f64,
    max_steps: usize,
    ws: Rk4Workspace,
    stats: Stats,
}

impl Rk4 {
    pub fn new(dt: f64, max_steps: usize) -> Self {
        Self { dt, max_steps, ws: Rk4Workspace::default(), stats: Stats::default() }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn integrate_to<F>(&mut self, y: &mut [f64], t0: f64, t_end: f64, mut f: F) -> Result<(), OdeError>
    where
        F: FnMut(f64, &[f64], &mut [f64]),
    {
        if self.dt.is_nan() || self.dt <= 0.0 {
            return Err(OdeError::StepSizeUnderflow { t: t0, h: self.dt });
        }
        let mut t = t0;
        let mut steps = 0;
        while t < t_end {
            if steps >= self.max_steps {
                return Err(OdeError::TooManySteps { max_steps: self.max_steps, t_end });
            }
            let h = self.dt.min(t_end - t);
            rk4_step(y, t, h, &mut self.ws, &mut f);
            self.stats.accepted += 1;
            self.stats.evaluations += 4;
            steps += 1;
            t = if h < self.dt { t_end } else { t + h };
            if y.iter().any(|v| !v.is_finite()) {
                return Err(OdeError::NonFinite { t });
            }
        }
        Ok(())
    }
}

// Dormand-Prince 5(4) tableau.
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;
const A71: f64 = 35.0 / 384.0;
const A73: f64 = 500.0 / 1113.0;
const A74: f64 = 125.0 / 192.0;
const A75: f64 = -2187.0 / 6784.0;
const A76: f64 = 11.0 / 84.0;

// Difference between the 5th and embedded 4th order weights.
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const SAFETY: f64 = 0.9;
const FAC_MIN: f64 = 0.2;
const FAC_MAX: f64 = 10.0;

#[derive(Debug, Clone, Default)]
struct Dopri5Workspace {
    k: [Vec<f64>; 7],
    ytmp: Vec<f64>,
    ynew: Vec<f64>,
}

impl Dopri5Workspace {
    fn resize(&mut self, n: usize) {
        for buf in self.k.iter_mut() {
            buf.resize(n, 0.0);
        }
        self.ytmp.resize(n, 0.0);
        self.ynew.resize(n, 0.0);
    }
}

/// Adaptive Dormand-Prince 5(4) stepper with embedded error estimation.
///
/// The step length is kept between calls to [`Dopri5::integrate_to`], so
/// sampling a trajectory on a dense output grid does not restart the
/// step-size controller at every sample.
#[derive(Debug, Clone)]
pub struct Dopri5 {
    rtol: f64,
    atol: f64,
    max_steps: usize,
    h: Option<f64>,
    ws: Dopri5Workspace,
    stats: Stats,
}

impl Dopri5 {
    pub fn new(cfg: &SolverConfig) -> Self {
        Self {
            rtol: cfg.rtol,
            atol: cfg.atol,
            max_steps: cfg.max_steps,
            h: cfg.h0,
            ws: Dopri5Workspace::default(),
            stats: Stats::default(),
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Current step-size suggestion, if one has been computed yet.
    pub fn step_size(&self) -> Option<f64> {
        self.h
    }

    fn scale(&self, a: f64, b: f64) -> f64 {
        self.atol + self.rtol * a.abs().max(b.abs())
    }

    /// Weighted RMS norm of `v` against tolerances built from `y`.
    fn norm(&self, v: &[f64], y: &[f64]) -> f64 {
        let n = v.len().max(1) as f64;
        let sum: f64 = v
            .iter()
            .zip(y)
            .map(|(vi, yi)| {
                let s = vi / self.scale(*yi, *yi);
                s * s
            })
            .sum();
        (sum / n).sqrt()
    }

    /// Hairer, Norsett & Wanner starting step heuristic. Expects `k[0]` to
    /// hold `f(t, y)`.
    fn initial_step<F>(&mut self, y: &[f64], t: f64, span: f64, f: &mut F) -> f64
    where
        F: FnMut(f64, &[f64], &mut [f64]),
    {
        let d0 = self.norm(y, y);
        let d1 = self.norm(&self.ws.k[0], y);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 { 1e-6 } else { 0.01 * d0 / d1 };
        let h0 = h0.min(span);

        let ws = &mut self.ws;
        axpy(&mut ws.ytmp, y, h0, &ws.k[0]);
        f(t + h0, &ws.ytmp, &mut ws.k[1]);
        self.stats.evaluations += 1;

        let diff: Vec<f64> = self.ws.k[1].iter().zip(&self.ws.k[0]).map(|(a, b)| a - b).collect();
        let d2 = self.norm(&diff, y) / h0;
        let dmax = d1.max(d2);
        let h1 = if dmax <= 1e-15 { (h0 * 1e-3).max(1e-6) } else { (0.01 / dmax).powf(0.2) };
        (100.0 * h0).min(h1).min(span)
    }

    /// Attempt one step of length `h` from `(t, y)`; `k[0]` must hold
    /// `f(t, y)`. Writes the candidate into `ynew`/`k[6]` and returns the
    /// scaled error norm.
    fn try_step<F>(&mut self, y: &[f64], t: f64, h: f64, f: &mut F) -> f64
    where
        F: FnMut(f64, &[f64], &mut [f64]),
    {
        let ws = &mut self.ws;
        let [k1, k2, k3, k4, k5, k6, k7] = &mut ws.k;
        let ytmp = &mut ws.ytmp;

        for i in 0..y.len() {
            ytmp[i] = y[i] + h * A21 * k1[i];
        }
        f(t + C2 * h, ytmp, k2);
        for i in 0..y.len() {
            ytmp[i] = y[i] + h * (A31 * k1[i] + A32 * k2[i]);
        }
        f(t + C3 * h, ytmp, k3);
        for i in 0..y.len() {
            ytmp[i] = y[i] + h * (A41 * k1[i] + A42 * k2[i] + A43 * k3[i]);
        }
        f(t + C4 * h, ytmp, k4);
        for i in 0..y.len() {
            ytmp[i] = y[i] + h * (A51 * k1[i] + A52 * k2[i] + A53 * k3[i] + A54 * k4[i]);
        }
        f(t + C5 * h, ytmp, k5);
        for i in 0..y.len() {
            ytmp[i] = y[i] + h * (A61 * k1[i] + A62 * k2[i] + A63 * k3[i] + A64 * k4[i] + A65 * k5[i]);
        }
        f(t + h, ytmp, k6);
        let ynew = &mut ws.ynew;
        for i in 0..y.len() {
            ynew[i] = y[i] + h * (A71 * k1[i] + A73 * k3[i] + A74 * k4[i] + A75 * k5[i] + A76 * k6[i]);
        }
        f(t + h, ynew, k7);
        self.stats.evaluations += 6;

        let n = y.len().max(1) as f64;
        let mut sum = 0.0;
        for i in 0..y.len() {
            let e = h * (E1 * k1[i] + E3 * k3[i] + E4 * k4[i] + E5 * k5[i] + E6 * k6[i] + E7 * k7[i]);
            let sc = self.atol + self.rtol * y[i].abs().max(ynew[i].abs());
            sum += (e / sc) * (e / sc);
        }
        (sum / n).sqrt()
    }

    /// Integrate `y` in place from `t0` to exactly `t_end` (`t_end >= t0`).
    pub fn integrate_to<F>(&mut self, y: &mut [f64], t0: f64, t_end: f64, mut f: F) -> Result<(), OdeError>
    where
        F: FnMut(f64, &[f64], &mut [f64]),
    {
        let span = t_end - t0;
        if span.is_nan() || span <= 0.0 {
            return Ok(());
        }
        self.ws.resize(y.len());

        f(t0, y, &mut self.ws.k[0]);
        self.stats.evaluations += 1;

        let mut h = match self.h {
            Some(h) if h > 0.0 => h,
            _ => self.initial_step(y, t0, span, &mut f),
        };

        let mut t = t0;
        let mut steps = 0;
        loop {
            if steps >= self.max_steps {
                self.h = Some(h);
                return Err(OdeError::TooManySteps { max_steps: self.max_steps, t_end });
            }
            steps += 1;

            let remaining = t_end - t;
            // Stretch slightly rather than leave a sliver before t_end.
            let last = h >= 0.99 * remaining;
            let h_try = if last { remaining } else { h };
            if !last && h_try <= 16.0 * f64::EPSILON * t.abs().max(1.0) {
                return Err(OdeError::StepSizeUnderflow { t, h: h_try });
            }

            let err = self.try_step(y, t, h_try, &mut f);
            if !err.is_finite() {
                return Err(OdeError::NonFinite { t: t + h_try });
            }

            if err <= 1.0 {
                self.stats.accepted += 1;
                y.copy_from_slice(&self.ws.ynew);
                self.ws.k.swap(0, 6);

                let fac = if err == 0.0 { FAC_MAX } else { (SAFETY * err.powf(-0.2)).clamp(FAC_MIN, FAC_MAX) };
                let h_next = h_try * fac;
                // A clamped final step says nothing about the natural step length.
                h = if last { h.max(h_next) } else { h_next };

                if last {
                    break;
                }
                t += h_try;
            } else {
                self.stats.rejected += 1;
                h = h_try * (SAFETY * err.powf(-0.2)).max(FAC_MIN);
            }
        }

        self.h = Some(h);
        Ok(())
    }
}

/// A stepper chosen at runtime from a [`SolverConfig`].
#[derive(Debug, Clone)]
pub enum Integrator {
    Dopri5(Dopri5),
    Rk4(Rk4),
}

impl Integrator {
    pub fn from_config(cfg: &SolverConfig) -> Self {
        match cfg.method {
            Method::Dopri5 => Integrator::Dopri5(Dopri5::new(cfg)),
            Method::Rk4 => Integrator::Rk4(Rk4::new(cfg.rk4_dt, cfg.max_steps)),
        }
    }

    pub fn integrate_to<F>(&mut self, y: &mut [f64], t0: f64, t_end: f64, f: F) -> Result<(), OdeError>
    where
        F: FnMut(f64, &[f64], &mut [f64]),
    {
        match self {
            Integrator::Dopri5(s) => s.integrate_to(y, t0, t_end, f),
            Integrator::Rk4(s) => s.integrate_to(y, t0, t_end, f),
        }
    }

    pub fn stats(&self) -> Stats {
        match self {
            Integrator::Dopri5(s) => s.stats(),
            Integrator::Rk4(s) => s.stats(),
        }
    }

    /// Step the stepper would take next. RK4 always reports its fixed step.
    pub fn step_size(&self) -> Option<f64> {
        match self {
            Integrator::Dopri5(s) => s.step_size(),
            Integrator::Rk4(s) => Some(s.dt),
        }
    }
}
