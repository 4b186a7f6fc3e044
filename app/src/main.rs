use std::path::PathBuf;

use clap::Parser;
use common::config::{Config, DuplicatePolicy};
use eyre::Result;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Plots Go benchmark timings as one thread-scaling bar chart per image size
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// YAML config file
    #[arg(short, long)]
    config: Option<String>,
    /// Benchmark output to read [default: benchmark.txt]
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Directory for the generated charts [default: .]
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// overwrite, average or reject repeated size/thread pairs
    #[arg(long)]
    duplicates: Option<DuplicatePolicy>,
    /// Warn about record lines that fail to parse instead of stopping
    #[arg(long, default_value_t = false)]
    skip_malformed: bool,
    /// Also write the aggregated timings as JSON
    #[arg(long)]
    summary: Option<PathBuf>,
    #[arg(short, long)]
    log: Vec<String>,
    /// Mirror logs into this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(input) = self.input {
            config.input = input;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(duplicates) = self.duplicates {
            config.duplicates = duplicates;
        }
        if self.skip_malformed {
            config.skip_malformed = true;
        }
        if self.summary.is_some() {
            config.summary = self.summary;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();

    let mut env_filter = EnvFilter::new(format!("bench_plot={log_level}"));
    for log in &args.log {
        env_filter = env_filter.add_directive(log.parse()?);
    }
    if !args.log.iter().any(|x| x.starts_with("common")) {
        env_filter = env_filter.add_directive(format!("common={log_level}").parse()?);
    }

    let (file_layer, _guard) = match &args.log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or(std::path::Path::new("."));
            let name = path.file_name().unwrap_or(path.as_os_str());
            let (non_blocking, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(layer().with_ansi(false).with_writer(non_blocking)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(file_layer)
        .init();

    let config = args.into_config()?;
    match common::report::run(&config) {
        Ok(report) => {
            info!("Generated {} charts", report.charts.len());
            Ok(())
        }
        Err(err) => {
            error!("{err:#?}");
            Err(err)
        }
    }
}
