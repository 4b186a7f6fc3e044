use std::{
    fs::{create_dir_all, read_to_string, write},
    path::{Path, PathBuf},
};

use eyre::{Context, Result};
use tracing::{debug, info};

use crate::{
    config::Config,
    plot::{Plot, ThreadScalingBar, render_all},
    results::{AggregateOptions, ResultsBySize, aggregate, sorted},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub results: ResultsBySize,
    pub charts: Vec<PathBuf>,
}

/// Reads the benchmark output, aggregates it and writes one chart per image size
pub fn run(config: &Config) -> Result<Report> {
    let plot = ThreadScalingBar::new(config.chart.clone());
    run_with(config, &plot)
}

pub fn run_with(config: &Config, plot: &dyn Plot) -> Result<Report> {
    let content = read_to_string(&config.input)
        .wrap_err_with(|| format!("Reading {}", config.input.display()))?;
    let options = AggregateOptions {
        duplicates: config.duplicates,
        skip_malformed: config.skip_malformed,
    };
    let results = aggregate(content.lines(), &options)
        .wrap_err_with(|| format!("Parsing {}", config.input.display()))?;
    info!(
        "Found results for {} image sizes in {}",
        results.len(),
        config.input.display()
    );

    if let Some(summary) = &config.summary {
        write_summary(&results, summary)?;
    }

    if !results.is_empty() {
        create_dir_all(&config.output_dir)
            .wrap_err_with(|| format!("Creating {}", config.output_dir.display()))?;
    }
    let charts = render_all(plot, &results, &config.output_dir)?;

    Ok(Report { results, charts })
}

pub fn write_summary(results: &ResultsBySize, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&sorted(results))?;
    write(path, json).wrap_err_with(|| format!("Writing summary {}", path.display()))?;
    debug!("Summary written to {}", path.display());
    Ok(())
}
