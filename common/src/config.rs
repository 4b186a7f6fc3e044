use std::{fmt, path::PathBuf, str::FromStr};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_INPUT: &str = "benchmark.txt";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Benchmark output to read
    pub input: PathBuf,
    /// Directory the charts are written to
    pub output_dir: PathBuf,
    pub duplicates: DuplicatePolicy,
    /// Warn and continue on record lines that fail to parse
    pub skip_malformed: bool,
    /// Optional JSON dump of the aggregated results
    pub summary: Option<PathBuf>,
    pub chart: ChartSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output_dir: PathBuf::from("."),
            duplicates: DuplicatePolicy::default(),
            skip_malformed: false,
            summary: None,
            chart: ChartSettings::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yml::from_str(content).context("Parsing config")
    }

    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).context(format!("Reading config {path}"))?;
        Self::from_yaml(&content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChartSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

/// What to do when the same (image size, thread count) pair shows up more than once
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Later measurement replaces the earlier one
    #[default]
    Overwrite,
    Average,
    Reject,
}

#[derive(Error, Debug)]
#[error("Unknown duplicate policy `{0}`, expected overwrite, average or reject")]
pub struct PolicyParseError(String);

impl FromStr for DuplicatePolicy {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "average" => Ok(Self::Average),
            "reject" => Ok(Self::Reject),
            _ => Err(PolicyParseError(s.to_owned())),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Overwrite => "overwrite",
            Self::Average => "average",
            Self::Reject => "reject",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_is_default() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.input, PathBuf::from("benchmark.txt"));
        assert_eq!(config.duplicates, DuplicatePolicy::Overwrite);
    }

    #[test]
    fn partial_yaml() {
        let config = Config::from_yaml(
            "input: results/bench.txt\nduplicates: average\nchart:\n  width: 1024\n",
        )
        .unwrap();
        assert_eq!(config.input, PathBuf::from("results/bench.txt"));
        assert_eq!(config.duplicates, DuplicatePolicy::Average);
        assert_eq!(config.chart.width, 1024);
        assert_eq!(config.chart.height, 480);
        assert!(!config.skip_malformed);
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(Config::from_yaml("colour: red\n").is_err());
        assert!(Config::from_yaml("chart:\n  dpi: 300\n").is_err());
    }

    #[test]
    fn policy_from_str() {
        assert_eq!("Reject".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Reject);
        assert_eq!(
            DuplicatePolicy::Average.to_string().parse::<DuplicatePolicy>().unwrap(),
            DuplicatePolicy::Average
        );
        assert!("sum".parse::<DuplicatePolicy>().is_err());
    }
}
