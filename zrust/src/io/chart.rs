use std::path::{Path, PathBuf};

use anyhow::Context;
use log::info;
use plotters::prelude::*;
use plotters::style::FontStyle;

use crate::model::zombie::Trajectory;

/// Pixel sizes for the rendered chart. The default is a 12x6 inch figure at
/// 200 dpi.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub title_size: u32,
    pub axis_desc_size: u32,
    pub tick_label_size: u32,
    pub legend_size: u32,
    pub line_width: u32,
    pub x_label_area: u32,
    pub y_label_area: u32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 2400,
            height: 1200,
            margin: 20,
            title_size: 44,
            axis_desc_size: 38,
            tick_label_size: 26,
            legend_size: 30,
            line_width: 3,
            x_label_area: 110,
            y_label_area: 150,
        }
    }
}

/// `<out_dir>/<title>.png`, with the title used verbatim.
pub fn chart_path(out_dir: &Path, title: &str) -> PathBuf {
    out_dir.join(format!("{title}.png"))
}

/// Vertical extent of the plotted series with a 5% margin. Undefined samples
/// are ignored.
fn y_range(traj: &Trajectory) -> (f64, f64) {
    let (lo, hi) = traj
        .s()
        .iter()
        .chain(traj.z())
        .copied()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return (0.0, 1.0);
    }
    let pad = if hi > lo { 0.05 * (hi - lo) } else { 1.0 };
    (lo - pad, hi + pad)
}

/// Day ticks run `0, 1, ..` up to but excluding the horizon.
fn day_ticks(nr_sim_days: f64) -> usize {
    if nr_sim_days > 0.0 {
        (nr_sim_days.ceil() as usize).min(60)
    } else {
        1
    }
}

fn day_label(x: f64, nr_sim_days: f64) -> String {
    if x < nr_sim_days {
        format!("{x:.0}")
    } else {
        String::new()
    }
}

/// Plot humans and zombies over the horizon and save the chart as PNG.
///
/// `out_dir` must exist. Any failure to draw or write the image is returned
/// to the caller.
pub fn render_chart(
    out_dir: impl AsRef<Path>,
    title: &str,
    traj: &Trajectory,
    nr_sim_days: f64,
    style: &ChartStyle,
) -> anyhow::Result<PathBuf> {
    let out_dir = out_dir.as_ref();
    anyhow::ensure!(out_dir.is_dir(), "output directory {:?} does not exist", out_dir);
    let path = chart_path(out_dir, title);

    let x_max = if nr_sim_days > 0.0 { nr_sim_days } else { 1.0 };
    let (y_min, y_max) = y_range(traj);

    {
        let root = BitMapBackend::new(&path, (style.width, style.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", style.title_size, FontStyle::Bold))
            .margin(style.margin)
            .x_label_area_size(style.x_label_area)
            .y_label_area_size(style.y_label_area)
            .build_cartesian_2d(0.0..x_max, y_min..y_max)?;

        chart
            .configure_mesh()
            .x_labels(day_ticks(nr_sim_days))
            .x_label_formatter(&|x| day_label(*x, x_max))
            .x_desc("Days from outbreak")
            .y_desc("Population")
            .axis_desc_style(("sans-serif", style.axis_desc_size))
            .label_style(("sans-serif", style.tick_label_size))
            .draw()?;

        let lw = style.line_width;
        for (label, values, color) in [("Humans", traj.s(), BLUE), ("Zombies", traj.z(), RED)] {
            let points = traj
                .t()
                .iter()
                .copied()
                .zip(values.iter().copied())
                .filter(|(_, v)| v.is_finite());
            chart
                .draw_series(LineSeries::new(points, color.stroke_width(lw)))?
                .label(label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 40, y)], color.stroke_width(lw)));
        }

        chart
            .configure_series_labels()
            .label_font(("sans-serif", style.legend_size))
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        root.present()
            .with_context(|| format!("failed to write chart {:?}", path))?;
    }

    info!("wrote {}", path.display());
    Ok(path)
}
