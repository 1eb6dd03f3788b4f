use std::fs;

use zrust::io::chart::{chart_path, render_chart, ChartStyle};
use zrust::{builtin_scenarios, RateConstants, SolverConfig};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

#[test]
fn every_builtin_scenario_renders_a_png() {
    let out = tempfile::tempdir().unwrap();
    let solver = SolverConfig::default();

    for scenario in builtin_scenarios() {
        let run = scenario.run(RateConstants::default(), &solver);
        let title = &run.scenario.title;
        let path = render_chart(
            out.path(),
            title,
            &run.trajectory,
            run.scenario.nr_sim_days,
            &ChartStyle::default(),
        )
        .unwrap();

        assert_eq!(path, chart_path(out.path(), title));
        assert!(path.is_file(), "{}", path.display());
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.len() > PNG_SIGNATURE.len());
        assert!(bytes.starts_with(PNG_SIGNATURE), "{title}");
    }

    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 3);
}
