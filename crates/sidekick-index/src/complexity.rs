//! Decision-point counting as a cheap stand-in for cyclomatic complexity.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static DECISION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(if|for|while|case|catch)\b|&&|\|\||\?").unwrap());

#[derive(Debug, Clone, Copy)]
pub struct ComplexityConfig {
    /// Only this many of the largest files are scored.
    pub score_top_n: usize,
    /// Length of `top_complex_files`.
    pub report_top: usize,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            score_top_n: 20,
            report_top: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileComplexity {
    pub name: String,
    pub complexity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityReport {
    pub average_complexity: f64,
    pub top_complex_files: Vec<FileComplexity>,
    pub files_considered: usize,
    pub files_scored: usize,
}

/// `1 + number of decision tokens` in `content`.
#[must_use]
pub fn score(content: &str) -> usize {
    DECISION_RE.find_iter(content).count() + 1
}

/// Indices of the `n` largest entries by size. Equal sizes keep input order.
#[must_use]
pub fn largest_by_size(sizes: &[u64], n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| sizes[b].cmp(&sizes[a]));
    order.truncate(n);
    order
}

/// Summarize scored `(path, complexity)` pairs.
///
/// The average divides by the number of scored files, but is only reported when
/// `files_considered` is non-zero.
#[must_use]
pub fn summarize(
    scored: Vec<(String, usize)>,
    files_considered: usize,
    config: &ComplexityConfig,
) -> ComplexityReport {
    let files_scored = scored.len();
    let total: usize = scored.iter().map(|(_, c)| c).sum();

    #[allow(clippy::cast_precision_loss)]
    let average_complexity = if files_considered > 0 && files_scored > 0 {
        round2(total as f64 / files_scored as f64)
    } else {
        0.0
    };

    let mut top: Vec<FileComplexity> = scored
        .into_iter()
        .map(|(path, complexity)| FileComplexity {
            name: basename(&path).to_owned(),
            complexity,
        })
        .collect();
    top.sort_by(|a, b| b.complexity.cmp(&a.complexity));
    top.truncate(config.report_top);

    ComplexityReport {
        average_complexity,
        top_complex_files: top,
        files_considered,
        files_scored,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn basename(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}
