use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::DuplicatePolicy,
    record::{BenchmarkRecord, ParseError, is_record_line},
};

/// Thread count -> elapsed seconds
pub type ResultsByThreads = HashMap<u32, f64>;
/// Image size -> per thread count timings
pub type ResultsBySize = HashMap<u32, ResultsByThreads>;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Line {line_no}: {source}")]
    Parse {
        line_no: usize,
        #[source]
        source: ParseError,
    },
    #[error("Line {line_no}: duplicate result for {image_size}x{image_size} with {thread_count} threads")]
    Duplicate {
        line_no: usize,
        image_size: u32,
        thread_count: u32,
    },
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AggregateOptions {
    pub duplicates: DuplicatePolicy,
    pub skip_malformed: bool,
}

#[derive(Debug, Default)]
pub struct Aggregator {
    options: AggregateOptions,
    results: ResultsBySize,
    seen: HashMap<(u32, u32), usize>,
}

impl Aggregator {
    pub fn new(options: AggregateOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn insert(&mut self, record: BenchmarkRecord, line_no: usize) -> Result<(), AggregateError> {
        let seconds = record.elapsed_seconds();
        let key = (record.image_size, record.thread_count);
        let count = self.seen.entry(key).or_insert(0);
        *count += 1;

        let by_threads = self.results.entry(record.image_size).or_default();
        if *count == 1 {
            by_threads.insert(record.thread_count, seconds);
            return Ok(());
        }

        debug!(
            "Repeated result for {}x{} with {} threads",
            record.image_size, record.image_size, record.thread_count
        );
        match self.options.duplicates {
            DuplicatePolicy::Overwrite => {
                by_threads.insert(record.thread_count, seconds);
            }
            DuplicatePolicy::Average => {
                let mean = by_threads.entry(record.thread_count).or_insert(seconds);
                *mean += (seconds - *mean) / *count as f64;
            }
            DuplicatePolicy::Reject => {
                return Err(AggregateError::Duplicate {
                    line_no,
                    image_size: record.image_size,
                    thread_count: record.thread_count,
                });
            }
        }
        Ok(())
    }

    pub fn finish(self) -> ResultsBySize {
        self.results
    }
}

/// Builds the size -> threads -> seconds mapping from raw input lines.
///
/// Non-record lines are ignored. Line numbers in errors are 1-based positions
/// in `lines`.
pub fn aggregate<'a, I>(lines: I, options: &AggregateOptions) -> Result<ResultsBySize, AggregateError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut aggregator = Aggregator::new(*options);
    for (idx, line) in lines.into_iter().enumerate() {
        if !is_record_line(line) {
            continue;
        }
        let line_no = idx + 1;
        let record = match BenchmarkRecord::from_line(line) {
            Ok(record) => record,
            Err(err) if options.skip_malformed => {
                warn!("Skipping line {line_no}: {err}");
                continue;
            }
            Err(source) => return Err(AggregateError::Parse { line_no, source }),
        };
        aggregator.insert(record, line_no)?;
    }
    Ok(aggregator.finish())
}

/// Ordered copy for stable serialization
pub fn sorted(results: &ResultsBySize) -> BTreeMap<u32, BTreeMap<u32, f64>> {
    results
        .iter()
        .map(|(size, threads)| (*size, threads.iter().map(|(t, s)| (*t, *s)).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(size: u32, threads: u32, ns: u64) -> String {
        format!("Benchmark_size={size}x{size}_threads={threads}_turns=100-8 \t 1\t{ns} ns/op")
    }

    fn run(lines: &[String], options: AggregateOptions) -> Result<ResultsBySize, AggregateError> {
        aggregate(lines.iter().map(String::as_str), &options)
    }

    #[test]
    fn two_thread_counts_one_size() {
        let lines = vec![line(256, 2, 2_000_000_000), line(256, 4, 1_000_000_000)];
        let results = run(&lines, AggregateOptions::default()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[&256], HashMap::from([(2, 2.0), (4, 1.0)]));
    }

    #[test]
    fn repeated_line_keeps_single_entry() {
        let lines = vec![line(64, 8, 3_000_000_000), line(64, 8, 3_000_000_000)];
        let results = run(&lines, AggregateOptions::default()).unwrap();
        assert_eq!(results[&64], HashMap::from([(8, 3.0)]));
    }

    #[test]
    fn overwrite_keeps_last() {
        let lines = vec![line(64, 8, 3_000_000_000), line(64, 8, 1_000_000_000)];
        let results = run(&lines, AggregateOptions::default()).unwrap();
        assert_eq!(results[&64][&8], 1.0);
    }

    #[test]
    fn average_policy() {
        let lines = vec![
            line(64, 8, 1_000_000_000),
            line(64, 8, 2_000_000_000),
            line(64, 8, 6_000_000_000),
            line(64, 2, 500_000_000),
        ];
        let options = AggregateOptions {
            duplicates: DuplicatePolicy::Average,
            ..Default::default()
        };
        let results = run(&lines, options).unwrap();
        assert!((results[&64][&8] - 3.0).abs() < 1e-12);
        assert_eq!(results[&64][&2], 0.5);
    }

    #[test]
    fn reject_policy() {
        let lines = vec![
            "goos: linux".to_owned(),
            line(64, 8, 1_000_000_000),
            line(64, 8, 2_000_000_000),
        ];
        let options = AggregateOptions {
            duplicates: DuplicatePolicy::Reject,
            ..Default::default()
        };
        let err = run(&lines, options).unwrap_err();
        assert!(matches!(
            err,
            AggregateError::Duplicate {
                line_no: 3,
                image_size: 64,
                thread_count: 8
            }
        ));
    }

    #[test]
    fn non_record_lines_ignored() {
        let lines = vec![
            "goos: linux".to_owned(),
            "working".to_owned(),
            line(16, 1, 1_000),
            "PASS".to_owned(),
            "ok  \tuk.ac.bris.cs/gameoflife\t12.3s".to_owned(),
        ];
        let results = run(&lines, AggregateOptions::default()).unwrap();
        assert_eq!(sorted(&results), BTreeMap::from([(16, BTreeMap::from([(1, 1e-6)]))]));
    }

    #[test]
    fn malformed_record_fails_with_line_number() {
        let lines = vec![line(16, 1, 1_000), "BenchmarkBroken".to_owned()];
        let err = run(&lines, AggregateOptions::default()).unwrap_err();
        match err {
            AggregateError::Parse { line_no, source } => {
                assert_eq!(line_no, 2);
                assert!(matches!(source, ParseError::MissingAnchor { .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn malformed_record_skipped() {
        let lines = vec![
            line(16, 1, 1_000_000_000),
            "BenchmarkBroken".to_owned(),
            line(32, 2, 2_000_000_000),
        ];
        let options = AggregateOptions {
            skip_malformed: true,
            ..Default::default()
        };
        let results = run(&lines, options).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[&32][&2], 2.0);
    }

    #[test]
    fn empty_input() {
        let results = run(&[], AggregateOptions::default()).unwrap();
        assert!(results.is_empty());
    }
}
