use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Lines carrying a benchmark measurement start with this marker
pub const RECORD_PREFIX: &str = "Benchmark";

pub const SIZE_ANCHOR: &str = "size=";
pub const THREADS_ANCHOR: &str = "threads=";
pub const ELAPSED_ANCHOR: &str = " ns/op";

pub const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

static SIZE_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([0-9]+)x").unwrap());
static THREADS_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([0-9]+)_").unwrap());
static ELAPSED_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s([0-9]+)$").unwrap());

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Missing `{anchor}` in line: {line}")]
    MissingAnchor { anchor: &'static str, line: String },
    #[error("Invalid number after `{anchor}` in line: {line}")]
    InvalidNumber { anchor: &'static str, line: String },
}

/// One measurement parsed from a record line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkRecord {
    pub image_size: u32,
    pub thread_count: u32,
    pub elapsed_ns: u64,
}

impl BenchmarkRecord {
    pub fn from_line(line: &str) -> Result<Self, ParseError> {
        Ok(Self {
            image_size: extract_image_size(line)?,
            thread_count: extract_thread_count(line)?,
            elapsed_ns: extract_elapsed_ns(line)?,
        })
    }

    pub fn elapsed_seconds(&self) -> f64 {
        ns_to_seconds(self.elapsed_ns)
    }
}

pub fn ns_to_seconds(ns: u64) -> f64 {
    ns as f64 / NANOS_PER_SECOND
}

pub fn is_record_line(line: &str) -> bool {
    line.get(..RECORD_PREFIX.len()) == Some(RECORD_PREFIX)
}

/// Keeps only record lines, in input order. Nothing is validated beyond the prefix.
pub fn record_lines<'a, I>(lines: I) -> impl Iterator<Item = &'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    lines.into_iter().filter(|line| is_record_line(line))
}

/// Digits between the first `size=` and the following `x`
pub fn extract_image_size(line: &str) -> Result<u32, ParseError> {
    let rest = after_anchor(line, SIZE_ANCHOR)?;
    capture_number(&SIZE_VALUE, rest, SIZE_ANCHOR, line)
}

/// Digits between the first `threads=` and the following `_`
pub fn extract_thread_count(line: &str) -> Result<u32, ParseError> {
    let rest = after_anchor(line, THREADS_ANCHOR)?;
    capture_number(&THREADS_VALUE, rest, THREADS_ANCHOR, line)
}

/// Whitespace-delimited digits right before the first ` ns/op`
pub fn extract_elapsed_ns(line: &str) -> Result<u64, ParseError> {
    let end = line
        .find(ELAPSED_ANCHOR)
        .ok_or_else(|| ParseError::MissingAnchor {
            anchor: ELAPSED_ANCHOR,
            line: line.to_owned(),
        })?;
    capture_number(&ELAPSED_VALUE, &line[..end], ELAPSED_ANCHOR, line)
}

fn after_anchor<'a>(line: &'a str, anchor: &'static str) -> Result<&'a str, ParseError> {
    line.find(anchor)
        .map(|idx| &line[idx + anchor.len()..])
        .ok_or_else(|| ParseError::MissingAnchor {
            anchor,
            line: line.to_owned(),
        })
}

fn capture_number<T: std::str::FromStr>(
    pattern: &Regex,
    haystack: &str,
    anchor: &'static str,
    line: &str,
) -> Result<T, ParseError> {
    let invalid = || ParseError::InvalidNumber {
        anchor,
        line: line.to_owned(),
    };
    pattern
        .captures(haystack)
        .and_then(|c| c.get(1))
        .ok_or_else(invalid)?
        .as_str()
        .parse()
        .map_err(|_| invalid())
}
