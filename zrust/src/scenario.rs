use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::math::grid::linspace;
use crate::math::ode::SolverConfig;
use crate::model::zombie::{RateConstants, Trajectory, ZombieModel, ZombieState};

/// Samples per run, independent of the horizon length.
pub const TIMELINE_SAMPLES: usize = 1000;

fn default_s0() -> f64 {
    1000.0
}

fn default_days() -> f64 {
    10.0
}

/// A named outbreak setup. Optional fractions and births default to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub title: String,
    /// Initial number of humans.
    #[serde(default = "default_s0", alias = "S0")]
    pub s0: f64,
    /// Zombies as a fraction of `s0`.
    #[serde(default, alias = "Zc")]
    pub zombie_fraction: Option<f64>,
    /// Deceased as a fraction of `s0`.
    #[serde(default, alias = "Rc")]
    pub dead_fraction: Option<f64>,
    /// New humans per day.
    #[serde(default, alias = "P")]
    pub births_per_day: Option<f64>,
    #[serde(default = "default_days")]
    pub nr_sim_days: f64,
}

impl Scenario {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            s0: default_s0(),
            zombie_fraction: None,
            dead_fraction: None,
            births_per_day: None,
            nr_sim_days: default_days(),
        }
    }

    pub fn with_s0(mut self, s0: f64) -> Self {
        self.s0 = s0;
        self
    }

    pub fn with_zc(mut self, zc: f64) -> Self {
        self.zombie_fraction = Some(zc);
        self
    }

    pub fn with_rc(mut self, rc: f64) -> Self {
        self.dead_fraction = Some(rc);
        self
    }

    pub fn with_births(mut self, p: f64) -> Self {
        self.births_per_day = Some(p);
        self
    }

    pub fn with_days(mut self, days: f64) -> Self {
        self.nr_sim_days = days;
        self
    }

    pub fn births(&self) -> f64 {
        self.births_per_day.unwrap_or(0.0)
    }

    /// `(S0, Zc*S0, Rc*S0)`. Out-of-range inputs are passed through and only
    /// reported.
    pub fn initial_state(&self) -> ZombieState {
        let y0 = ZombieState::new(
            self.s0,
            self.zombie_fraction.unwrap_or(0.0) * self.s0,
            self.dead_fraction.unwrap_or(0.0) * self.s0,
        );
        if !y0.is_non_negative() {
            warn!("scenario {:?} starts with a negative compartment: {:?}", self.title, y0);
        }
        y0
    }

    pub fn timeline(&self) -> Vec<f64> {
        linspace(0.0, self.nr_sim_days, TIMELINE_SAMPLES)
    }

    pub fn model(&self, rates: RateConstants) -> ZombieModel {
        ZombieModel::new(rates, self.births())
    }

    pub fn run(self, rates: RateConstants, solver: &SolverConfig) -> ScenarioRun {
        info!("running scenario {:?} over {} days", self.title, self.nr_sim_days);
        let model = self.model(rates);
        let trajectory = model.simulate(self.initial_state(), &self.timeline(), solver);
        if let Some(end) = trajectory.last() {
            info!(
                "day {}: humans={:.1} zombies={:.1} deceased={:.1}",
                self.nr_sim_days, end.s, end.z, end.r
            );
        }
        ScenarioRun { scenario: self, model, trajectory }
    }
}

/// A scenario together with the trajectory it produced.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub scenario: Scenario,
    pub model: ZombieModel,
    pub trajectory: Trajectory,
}

/// The three outbreak setups the binary renders.
pub fn builtin_scenarios() -> Vec<Scenario> {
    let rc2 = 0.015;
    let (rc3, p3) = (0.02, 30.0);
    vec![
        Scenario::new("Zombie Apocalypse - No initial population deceased - no new births"),
        Scenario::new(format!(
            "Zombie Apocalypse - {:.1}% of initial population deceased - no new births.",
            rc2 * 100.0
        ))
        .with_rc(rc2),
        Scenario::new(format!(
            "Zombie Apocalypse - {:.1}% of initial population deceased - {} new daily births",
            rc3 * 100.0,
            p3
        ))
        .with_rc(rc3)
        .with_births(p3),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults() {
        let sc = Scenario::new("x");
        assert_eq!(sc.s0, 1000.0);
        assert_eq!(sc.nr_sim_days, 10.0);
        assert_eq!(sc.births(), 0.0);
        assert_eq!(sc.initial_state(), ZombieState::new(1000.0, 0.0, 0.0));
    }

    #[test]
    fn fractions_scale_with_s0() {
        let sc = Scenario::new("x").with_s0(500.0).with_zc(0.1).with_rc(0.02);
        let y0 = sc.initial_state();
        assert_relative_eq!(y0.z, 50.0);
        assert_relative_eq!(y0.r, 10.0);
    }

    #[test]
    fn negative_fraction_is_passed_through() {
        let y0 = Scenario::new("x").with_zc(-0.5).initial_state();
        assert_eq!(y0.z, -500.0);
        assert!(!y0.is_non_negative());
    }

    #[test]
    fn timeline_has_fixed_resolution() {
        for days in [1.0, 10.0, 365.0] {
            let t = Scenario::new("x").with_days(days).timeline();
            assert_eq!(t.len(), TIMELINE_SAMPLES);
            assert_eq!(t[0], 0.0);
            assert_eq!(*t.last().unwrap(), days);
        }
    }

    #[test]
    fn builtin_titles() {
        let titles: Vec<String> = builtin_scenarios().into_iter().map(|s| s.title).collect();
        assert_eq!(
            titles,
            vec![
                "Zombie Apocalypse - No initial population deceased - no new births",
                "Zombie Apocalypse - 1.5% of initial population deceased - no new births.",
                "Zombie Apocalypse - 2.0% of initial population deceased - 30 new daily births",
            ]
        );
    }

    #[test]
    fn builtin_parameters() {
        let sc = builtin_scenarios();
        assert_eq!(sc[0].initial_state(), ZombieState::new(1000.0, 0.0, 0.0));
        assert_relative_eq!(sc[1].initial_state().r, 15.0, max_relative = 1e-12);
        assert_eq!(sc[1].births(), 0.0);
        assert_relative_eq!(sc[2].initial_state().r, 20.0, max_relative = 1e-12);
        assert_eq!(sc[2].births(), 30.0);
    }

    #[test]
    fn deserializes_with_defaults() {
        let sc: Scenario = serde_json::from_str(r#"{"title": "t", "Rc": 0.02, "P": 30}"#).unwrap();
        assert_eq!(sc.s0, 1000.0);
        assert_eq!(sc.zombie_fraction, None);
        assert_eq!(sc.dead_fraction, Some(0.02));
        assert_eq!(sc.births(), 30.0);
        assert_eq!(sc.nr_sim_days, 10.0);
    }
}
