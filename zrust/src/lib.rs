pub mod io;
pub mod logging;
pub mod math;
pub mod model;
pub mod scenario;

pub use math::ode::{Method, SolverConfig};
pub use model::zombie::{RateConstants, Trajectory, ZombieModel, ZombieState};
pub use scenario::{builtin_scenarios, Scenario, ScenarioRun, TIMELINE_SAMPLES};
