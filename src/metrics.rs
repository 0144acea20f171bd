//! Log-to-metric extraction for named driver operations.
//!
//! Driver logs are unstructured text interleaving many call kinds. A line
//! carries at most one latency sample, marked by `latency_seconds=<float>`;
//! the sample is attributed to the first registered operation whose matching
//! token appears in the line. First-match-wins is the documented tie-break
//! for lines matching more than one token.

use tracing::debug;

use crate::report::FuncResult;

/// Textual marker preceding a latency value in a log line.
pub const LATENCY_MARKER: &str = "latency_seconds=";

/// One kind of remote call whose latency is being measured.
#[derive(Debug, Clone)]
pub struct NamedOperation {
    name: String,
    token: String,
}

impl NamedOperation {
    /// Builds an operation from its canonical CamelCase name, deriving the
    /// snake_case token used to recognize it in log text
    /// (`NodePublishVolume` becomes `node_publish_volume`).
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            token: matching_token(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

fn matching_token(name: &str) -> String {
    let mut token = String::with_capacity(name.len() + 4);
    for (idx, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if idx > 0 {
                token.push('_');
            }
            token.extend(ch.to_lowercase());
        } else {
            token.push(ch);
        }
    }
    token
}

/// Running latency statistics owned by one named operation.
///
/// Keeps the full ordered sample series alongside O(1) running aggregates;
/// operators need the raw distribution for percentile analysis downstream.
#[derive(Debug, Clone, Default)]
pub struct OperationStats {
    samples: Vec<f64>,
    min: f64,
    max: f64,
    sum: f64,
}

impl OperationStats {
    /// Appends one sample and updates the running aggregates.
    pub fn add_sample(&mut self, value: f64) {
        if self.samples.is_empty() {
            self.min = value;
            self.max = value;
        } else {
            if value < self.min {
                self.min = value;
            }
            if value > self.max {
                self.max = value;
            }
        }
        self.sum += value;
        self.samples.push(value);
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    /// Discards all samples, returning the stats to their initial state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Pure read of the aggregated summary. With zero samples every field
    /// reports the neutral 0 rather than an error.
    pub fn summarize(&self, name: &str) -> FuncResult {
        let num = self.samples.len();
        let avg = if num > 0 {
            round4(self.sum / num as f64)
        } else {
            0.0
        };
        FuncResult {
            func_name: name.to_string(),
            num,
            min: self.min,
            max: self.max,
            avg,
            points: self.samples.clone(),
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Scans captured log lines and feeds latency samples into per-operation
/// statistics.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    operations: Vec<(NamedOperation, OperationStats)>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an operation to the matching set. Idempotent by canonical name;
    /// re-registering is a no-op.
    pub fn register(&mut self, op: NamedOperation) {
        if self.operations.iter().any(|(o, _)| o.name() == op.name()) {
            return;
        }
        self.operations.push((op, OperationStats::default()));
    }

    /// Clears every operation's statistics for a fresh run.
    pub fn reset(&mut self) {
        for (_, stats) in &mut self.operations {
            stats.reset();
        }
    }

    /// Consumes one log's lines. Lines without a latency marker or with an
    /// unparseable value are skipped; lines matching no registered token
    /// discard their sample. Both are expected, silent outcomes.
    pub fn parse_lines<I>(&mut self, lines: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for line in lines {
            let line = line.as_ref();
            let Some(value) = extract_latency(line) else {
                continue;
            };
            for (op, stats) in &mut self.operations {
                if line.contains(op.token()) {
                    debug!("attributed sample {value} to {}", op.name());
                    stats.add_sample(value);
                    break;
                }
            }
        }
    }

    /// Summary snapshot of every registered operation, in registration
    /// order.
    pub fn results(&self) -> Vec<FuncResult> {
        self.operations
            .iter()
            .map(|(op, stats)| stats.summarize(op.name()))
            .collect()
    }
}

/// Pulls the `latency_seconds=<float>` value out of a log line, if present
/// and parseable. Exponential notation is accepted.
fn extract_latency(line: &str) -> Option<f64> {
    let start = line.find(LATENCY_MARKER)? + LATENCY_MARKER.len();
    let rest = &line[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == 'e' || c == '-'))
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_derivation() {
        assert_eq!(
            NamedOperation::new("NodePublishVolume").token(),
            "node_publish_volume"
        );
        assert_eq!(
            NamedOperation::new("ControllerCreateVolume").token(),
            "controller_create_volume"
        );
    }

    #[test]
    fn accumulates_samples_from_lines() {
        let mut collector = MetricsCollector::new();
        collector.register(NamedOperation::new("CreateVolume"));
        collector.parse_lines([
            "latency_seconds=0.25 op=create_volume",
            "latency_seconds=0.75 op=create_volume",
        ]);

        let results = collector.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].func_name, "CreateVolume");
        assert_eq!(results[0].num, 2);
        assert_eq!(results[0].min, 0.25);
        assert_eq!(results[0].max, 0.75);
        assert_eq!(results[0].avg, 0.5);
        assert_eq!(results[0].points, vec![0.25, 0.75]);
    }

    #[test]
    fn first_registered_match_wins() {
        let mut collector = MetricsCollector::new();
        collector.register(NamedOperation::new("NodePublishVolume"));
        collector.register(NamedOperation::new("NodeUnpublishVolume"));
        // Both tokens appear in the line; registration order breaks the tie.
        collector
            .parse_lines(["latency_seconds=0.1 node_publish_volume after node_unpublish_volume"]);

        let results = collector.results();
        assert_eq!(results[0].num, 1);
        assert_eq!(results[1].num, 0);
    }

    #[test]
    fn markerless_lines_are_skipped() {
        let mut collector = MetricsCollector::new();
        collector.register(NamedOperation::new("NodePublishVolume"));
        collector.parse_lines([
            "starting node_publish_volume request",
            "latency_seconds=bogus node_publish_volume",
        ]);
        assert_eq!(collector.results()[0].num, 0);
    }

    #[test]
    fn unmatched_samples_are_discarded() {
        let mut collector = MetricsCollector::new();
        collector.register(NamedOperation::new("NodePublishVolume"));
        collector.parse_lines(["latency_seconds=0.5 some_other_call"]);
        assert_eq!(collector.results()[0].num, 0);
    }

    #[test]
    fn exponential_notation_parses() {
        let mut collector = MetricsCollector::new();
        collector.register(NamedOperation::new("NodePublishVolume"));
        collector.parse_lines(["latency_seconds=2.5e-3 node_publish_volume"]);
        let result = &collector.results()[0];
        assert_eq!(result.num, 1);
        assert!((result.points[0] - 0.0025).abs() < 1e-12);
    }

    #[test]
    fn zero_samples_report_neutral_values() {
        let stats = OperationStats::default();
        let result = stats.summarize("NodePublishVolume");
        assert_eq!(result.num, 0);
        assert_eq!(result.min, 0.0);
        assert_eq!(result.max, 0.0);
        assert_eq!(result.avg, 0.0);
        assert!(result.points.is_empty());
    }

    #[test]
    fn registration_is_idempotent() {
        let mut collector = MetricsCollector::new();
        collector.register(NamedOperation::new("NodePublishVolume"));
        collector.register(NamedOperation::new("NodePublishVolume"));
        assert_eq!(collector.results().len(), 1);
    }

    #[test]
    fn reset_clears_statistics() {
        let mut collector = MetricsCollector::new();
        collector.register(NamedOperation::new("NodePublishVolume"));
        collector.parse_lines(["latency_seconds=0.5 node_publish_volume"]);
        collector.reset();
        assert_eq!(collector.results()[0].num, 0);
    }

    #[test]
    fn average_rounds_to_four_decimals() {
        let mut stats = OperationStats::default();
        stats.add_sample(0.1);
        stats.add_sample(0.2);
        stats.add_sample(0.2);
        assert_eq!(stats.summarize("Op").avg, 0.1667);
    }
}
