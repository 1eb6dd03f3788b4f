use zrust::{RateConstants, Scenario, SolverConfig};

fn main() -> anyhow::Result<()> {
    // Seed a few zombies directly instead of waiting for resurrections.
    let scenario = Scenario::new("Zombie Apocalypse - 0.5% zombies at day 0")
        .with_zc(0.005)
        .with_days(20.0);

    let run = scenario.run(RateConstants::default(), &SolverConfig::default());
    let traj = &run.trajectory;
    anyhow::ensure!(!traj.has_undefined(), "integration failed");

    // Print a daily summary (nearest sample to each whole day)
    let days = run.scenario.nr_sim_days;
    let last = traj.len() - 1;
    for day in 0..=days as usize {
        let idx = ((day as f64 / days) * last as f64).round() as usize;
        let y = traj.state_at(idx.min(last));
        println!("day {:>2}: humans={:>6.0} zombies={:>6.0} deceased={:>6.0}", day, y.s, y.z, y.r);
    }

    Ok(())
}
