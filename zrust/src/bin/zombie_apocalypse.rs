use log::LevelFilter;

use zrust::io::chart::{render_chart, ChartStyle};
use zrust::logging::init_console_logger;
use zrust::{builtin_scenarios, RateConstants, SolverConfig};

fn main() -> anyhow::Result<()> {
    let _log = init_console_logger(LevelFilter::Info)?;

    let rates = RateConstants::default();
    let solver = SolverConfig::default();
    let style = ChartStyle::default();
    let out_dir = std::env::current_dir()?;

    for scenario in builtin_scenarios() {
        let run = scenario.run(rates, &solver);
        render_chart(
            &out_dir,
            &run.scenario.title,
            &run.trajectory,
            run.scenario.nr_sim_days,
            &style,
        )?;
    }

    Ok(())
}
