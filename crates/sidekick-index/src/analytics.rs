//! Repository analytics: language histogram, file sizes, complexity and git activity.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::complexity::{ComplexityConfig, ComplexityReport, largest_by_size, score, summarize};
use crate::languages::language_name;
use crate::repo::{code_files, read_file};

#[derive(Debug, Clone, Copy)]
pub struct AnalyticsConfig {
    pub complexity: ComplexityConfig,
    /// Number of most recent active days kept in `commit_data`.
    pub commit_days: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            complexity: ComplexityConfig::default(),
            commit_days: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub name: String,
    pub size: u64,
    pub lang: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDay {
    /// `YYYY-MM-DD`, UTC.
    pub date: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitMetrics {
    pub total_commits: usize,
    pub commit_data: Vec<CommitDay>,
    pub last_commit: Option<String>,
    pub contributors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub languages: BTreeMap<String, usize>,
    pub file_sizes: Vec<FileStat>,
    pub complexity: ComplexityReport,
    pub git_metrics: GitMetrics,
    pub total_files: usize,
    #[serde(rename = "totalLoC")]
    pub total_loc: usize,
}

/// Parse `git log --format=%aI%x09%ae` output, newest commit first.
///
/// Lines without a tab or with an unparseable timestamp are skipped.
#[must_use]
pub fn parse_git_log(output: &str, commit_days: usize) -> GitMetrics {
    let mut per_day: BTreeMap<String, usize> = BTreeMap::new();
    let mut authors: HashSet<&str> = HashSet::new();
    let mut total_commits = 0;
    let mut last_commit = None;

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some((timestamp, email)) = line.split_once('\t') else {
            continue;
        };
        let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) else {
            continue;
        };
        let day = parsed.with_timezone(&Utc).format("%Y-%m-%d").to_string();
        *per_day.entry(day).or_default() += 1;
        authors.insert(email);
        total_commits += 1;
        if last_commit.is_none() {
            last_commit = Some(timestamp.to_owned());
        }
    }

    let mut commit_data: Vec<CommitDay> = per_day
        .into_iter()
        .map(|(date, count)| CommitDay { date, count })
        .collect();
    let excess = commit_data.len().saturating_sub(commit_days);
    commit_data.drain(..excess);

    GitMetrics {
        total_commits,
        commit_data,
        last_commit,
        contributors: authors.len(),
    }
}

/// Run `git log` in `root`. Failures are logged and yield zeroed metrics.
pub async fn git_metrics(root: &Path, commit_days: usize) -> GitMetrics {
    let output = Command::new("git")
        .args(["log", "--format=%aI%x09%ae"])
        .current_dir(root)
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() => {
            parse_git_log(&String::from_utf8_lossy(&out.stdout), commit_days)
        }
        Ok(out) => {
            tracing::warn!(
                root = %root.display(),
                stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                "git metrics failed"
            );
            GitMetrics::default()
        }
        Err(e) => {
            tracing::warn!(root = %root.display(), error = %e, "git metrics failed");
            GitMetrics::default()
        }
    }
}

/// Full analytics pass over the code files under `root`.
///
/// Files that cannot be read are skipped in every aggregate except `total_files`.
pub async fn analyze(root: &Path, config: &AnalyticsConfig) -> AnalyticsReport {
    let files = code_files(root);

    let mut languages: BTreeMap<String, usize> = BTreeMap::new();
    let mut file_sizes = Vec::with_capacity(files.len());
    let mut sized: Vec<(String, u64)> = Vec::with_capacity(files.len());
    let mut total_loc = 0;

    for rel in &files {
        let lang = language_name(Path::new(rel));
        *languages.entry(lang.to_owned()).or_default() += 1;

        let size = match tokio::fs::metadata(root.join(rel)).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::warn!(file = %rel, error = %e, "skipping file in analytics");
                continue;
            }
        };
        file_sizes.push(FileStat {
            name: basename(rel).to_owned(),
            size,
            lang: lang.to_owned(),
        });
        sized.push((rel.clone(), size));

        if let Ok(content) = read_file(root, rel).await {
            total_loc += content.split('\n').count();
        }
    }

    let complexity = score_largest(root, &sized, files.len(), &config.complexity).await;
    let git_metrics = git_metrics(root, config.commit_days).await;

    tracing::info!(
        root = %root.display(),
        files = files.len(),
        total_loc,
        commits = git_metrics.total_commits,
        "analytics computed"
    );

    AnalyticsReport {
        languages,
        file_sizes,
        complexity,
        git_metrics,
        total_files: files.len(),
        total_loc,
    }
}

async fn score_largest(
    root: &Path,
    sized: &[(String, u64)],
    files_considered: usize,
    config: &ComplexityConfig,
) -> ComplexityReport {
    let sizes: Vec<u64> = sized.iter().map(|(_, s)| *s).collect();
    let mut scored = Vec::new();
    for idx in largest_by_size(&sizes, config.score_top_n) {
        let path = &sized[idx].0;
        match read_file(root, path).await {
            Ok(content) => scored.push((path.clone(), score(&content))),
            Err(e) => tracing::warn!(file = %path, error = %e, "skipping file in complexity"),
        }
    }
    summarize(scored, files_considered, config)
}

fn basename(rel: &str) -> &str {
    rel.rsplit('/').next().unwrap_or(rel)
}
