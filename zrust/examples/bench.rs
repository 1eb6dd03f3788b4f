use std::time::Instant;

use zrust::{Method, RateConstants, Scenario, SolverConfig};

fn main() -> anyhow::Result<()> {
    // Long horizon to amplify differences between the steppers
    let scenario = Scenario::new("bench").with_rc(0.02).with_births(30.0).with_days(365.0);
    let rates = RateConstants::default();

    let adaptive = SolverConfig::default();
    let fixed = SolverConfig { method: Method::Rk4, rk4_dt: 0.001, max_steps: 10_000, ..SolverConfig::default() };

    let t_start = Instant::now();
    let run1 = scenario.clone().run(rates, &adaptive);
    let dur1 = t_start.elapsed();

    let t_start2 = Instant::now();
    let run2 = scenario.run(rates, &fixed);
    let dur2 = t_start2.elapsed();

    let (a, f) = (run1.trajectory.last(), run2.trajectory.last());
    anyhow::ensure!(a.is_some() && f.is_some(), "empty trajectory");

    println!("dopri5_ms,rk4_ms,speedup_x");
    let d_ms = dur1.as_secs_f64() * 1000.0;
    let r_ms = dur2.as_secs_f64() * 1000.0;
    println!("{:.3},{:.3},{:.2}", d_ms, r_ms, r_ms.max(1e-9) / d_ms.max(1e-9));
    println!("final dopri5: {:?}", a);
    println!("final rk4:    {:?}", f);

    Ok(())
}
