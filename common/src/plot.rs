use std::path::{Path, PathBuf};

use eyre::{Context, Result, bail};
use itertools::{Itertools, MinMaxResult};
use plotters::prelude::*;
use tracing::{debug, info};

use crate::{
    config::ChartSettings,
    results::{ResultsBySize, ResultsByThreads},
};

pub const X_LABEL: &str = "number of threads";
pub const Y_LABEL: &str = "time in seconds";

const TITLE_FONT_SIZE: u32 = 24;
const AXIS_LABEL_FONT_SIZE: u32 = 16;
const BAR_COLOR: RGBColor = RGBColor(31, 119, 180);

pub fn chart_title(image_size: u32) -> String {
    format!("{image_size}x{image_size}")
}

pub fn chart_file_name(image_size: u32) -> String {
    format!("{image_size}x{image_size}.jpg")
}

pub trait Plot {
    /// Renders the chart for one image size into `plot_path`, returning the written file
    fn plot(&self, image_size: u32, results: &ResultsByThreads, plot_path: &Path) -> Result<PathBuf>;
}

/// Bar chart of elapsed seconds per thread count, one file per image size
#[derive(Debug, Default, Clone)]
pub struct ThreadScalingBar {
    pub settings: ChartSettings,
}

impl ThreadScalingBar {
    pub fn new(settings: ChartSettings) -> Self {
        Self { settings }
    }
}

impl Plot for ThreadScalingBar {
    fn plot(&self, image_size: u32, results: &ResultsByThreads, plot_path: &Path) -> Result<PathBuf> {
        let filepath = plot_path.join(chart_file_name(image_size));
        draw_bars(&chart_title(image_size), results, &filepath, &self.settings)
            .wrap_err_with(|| format!("Rendering {}", filepath.display()))?;
        Ok(filepath)
    }
}

fn draw_bars(
    title: &str,
    results: &ResultsByThreads,
    filepath: &Path,
    settings: &ChartSettings,
) -> Result<()> {
    let (min_threads, max_threads) = thread_axis(results.keys().copied().minmax())?;
    let max_seconds = results.values().copied().fold(0.0_f64, f64::max);
    let y_max = if max_seconds > 0.0 { max_seconds * 1.1 } else { 1.0 };

    let root = BitMapBackend::new(filepath, (settings.width, settings.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", TITLE_FONT_SIZE))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((min_threads..max_threads).into_segmented(), 0.0..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(X_LABEL)
        .y_desc(Y_LABEL)
        .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE))
        .draw()?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(BAR_COLOR.filled())
                .margin(2)
                .data(results.iter().sorted_by_key(|(t, _)| **t).map(|(t, s)| (*t, *s))),
        )?;

    root.present()?;
    Ok(())
}

/// Bounds of the thread axis. The integer axis is inclusive of both ends and a
/// single value is widened by one slot so it never maps onto a zero-width range.
fn thread_axis(threads: MinMaxResult<u32>) -> Result<(u32, u32)> {
    let bounds = match threads {
        MinMaxResult::NoElements => (0, 1),
        MinMaxResult::OneElement(t) => match t.checked_add(1) {
            Some(next) => (t, next),
            None => (t - 1, t),
        },
        // slot count is `hi - lo + 1` and must fit in a u32
        MinMaxResult::MinMax(lo, hi) if hi - lo == u32::MAX => {
            bail!("Thread counts {lo} to {hi} span more slots than the axis can hold")
        }
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    };
    Ok(bounds)
}

/// Renders every image size in ascending order and returns the written files
pub fn render_all(plot: &dyn Plot, results: &ResultsBySize, plot_path: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(results.len());
    for image_size in results.keys().copied().sorted() {
        let by_threads = &results[&image_size];
        debug!("Plotting {} thread counts for {}", by_threads.len(), chart_title(image_size));
        let filepath = plot.plot(image_size, by_threads, plot_path)?;
        info!("Wrote {}", filepath.display());
        written.push(filepath);
    }
    Ok(written)
}
