//! Overlapping line-window chunker.
//!
//! A file is split on `'\n'` and covered by windows of `window_lines` lines that
//! advance by `window_lines - overlap_lines`. Windows shorter than `min_lines` are
//! dropped, and the walk stops after the first window that reaches end-of-file.

use serde::{Deserialize, Serialize};

/// Chunker configuration.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub window_lines: usize,
    pub overlap_lines: usize,
    pub min_lines: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            window_lines: 50,
            overlap_lines: 10,
            min_lines: 5,
        }
    }
}

impl ChunkerConfig {
    /// Distance between window starts, never zero.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.window_lines.saturating_sub(self.overlap_lines).max(1)
    }
}

/// Payload stored next to each chunk vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub repo_name: String,
    pub filename: String,
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
#[must_use]
pub fn sanitize_id(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Deterministic chunk id for `(repo, rel_path, start..=end)`.
#[must_use]
pub fn chunk_id(repo: &str, rel_path: &str, start_line: usize, end_line: usize) -> String {
    sanitize_id(&format!("{repo}::{rel_path}::{start_line}-{end_line}"))
}

/// Split `content` into overlapping line windows.
#[must_use]
pub fn chunk_file(repo: &str, rel_path: &str, content: &str, config: &ChunkerConfig) -> Vec<Chunk> {
    let lines: Vec<&str> = content.split('\n').collect();
    let window = config.window_lines.max(1);
    let stride = config.stride();
    let mut chunks = Vec::new();

    let mut start = 0;
    while start < lines.len() {
        let end = (start + window).min(lines.len());
        let slice = &lines[start..end];

        if slice.len() >= config.min_lines {
            let text = slice.join("\n");
            let start_line = start + 1;
            let end_line = start + slice.len();
            chunks.push(Chunk {
                id: chunk_id(repo, rel_path, start_line, end_line),
                content: text.clone(),
                metadata: ChunkMetadata {
                    repo_name: repo.to_owned(),
                    filename: rel_path.to_owned(),
                    start_line,
                    end_line,
                    content: text,
                },
            });

            if start + window >= lines.len() {
                break;
            }
        }

        start += stride;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn numbered(n: usize) -> String {
        (1..=n)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn ranges(chunks: &[Chunk]) -> Vec<(usize, usize)> {
        chunks
            .iter()
            .map(|c| (c.metadata.start_line, c.metadata.end_line))
            .collect()
    }

    #[test]
    fn short_file_is_single_chunk() {
        let chunks = chunk_file("acme_app", "src/a.ts", &numbered(45), &ChunkerConfig::default());
        assert_eq!(ranges(&chunks), [(1, 45)]);
        assert_eq!(chunks[0].content, numbered(45));
    }

    #[test]
    fn long_file_windows_overlap_and_end_at_eof() {
        let chunks = chunk_file("acme_app", "src/a.ts", &numbered(120), &ChunkerConfig::default());
        assert_eq!(ranges(&chunks), [(1, 50), (41, 90), (81, 120)]);
    }

    #[test]
    fn exact_window_length_has_no_duplicate_tail() {
        let chunks = chunk_file("r", "f.rs", &numbered(50), &ChunkerConfig::default());
        assert_eq!(ranges(&chunks), [(1, 50)]);
    }

    #[test]
    fn tiny_file_yields_nothing() {
        assert!(chunk_file("r", "f.rs", &numbered(4), &ChunkerConfig::default()).is_empty());
        assert!(chunk_file("r", "f.rs", "", &ChunkerConfig::default()).is_empty());
    }

    #[test]
    fn trailing_newline_counts_as_a_line() {
        let content = format!("{}\n", numbered(45));
        let chunks = chunk_file("r", "f.rs", &content, &ChunkerConfig::default());
        assert_eq!(ranges(&chunks), [(1, 46)]);
    }

    #[test]
    fn metadata_and_id() {
        let chunks = chunk_file("acme_app", "src/main.rs", &numbered(10), &ChunkerConfig::default());
        let chunk = &chunks[0];
        assert_eq!(chunk.id, "acme_app__src_main_rs__1-10");
        assert_eq!(chunk.metadata.repo_name, "acme_app");
        assert_eq!(chunk.metadata.filename, "src/main.rs");
        assert_eq!(chunk.metadata.content, chunk.content);
    }

    #[test]
    fn metadata_serializes_camel_case() {
        let chunks = chunk_file("r", "f.rs", &numbered(6), &ChunkerConfig::default());
        let json = serde_json::to_value(&chunks[0].metadata).unwrap();
        assert_eq!(json["repoName"], "r");
        assert_eq!(json["startLine"], 1);
        assert_eq!(json["endLine"], 6);
        assert!(json.get("start_line").is_none());
    }

    #[test]
    fn sanitize_id_replaces_disallowed_chars() {
        assert_eq!(sanitize_id("a b/c.d::e-f_g"), "a_b_c_d__e-f_g");
        assert_eq!(sanitize_id("ünï"), "_n_");
    }

    #[test]
    fn zero_stride_is_clamped() {
        let config = ChunkerConfig {
            window_lines: 5,
            overlap_lines: 9,
            min_lines: 1,
        };
        assert_eq!(config.stride(), 1);
        let chunks = chunk_file("r", "f", &numbered(7), &config);
        assert_eq!(ranges(&chunks), [(1, 5), (2, 6), (3, 7)]);
    }

    proptest! {
        #[test]
        fn windows_cover_every_line(n in 5usize..400) {
            let config = ChunkerConfig::default();
            let chunks = chunk_file("r", "f.rs", &numbered(n), &config);
            let mut covered = vec![false; n];
            for c in &chunks {
                for line in c.metadata.start_line..=c.metadata.end_line {
                    covered[line - 1] = true;
                }
            }
            prop_assert!(covered.iter().all(|&c| c));
            prop_assert_eq!(chunks.last().unwrap().metadata.end_line, n);
        }

        #[test]
        fn window_starts_follow_stride(n in 1usize..400) {
            let config = ChunkerConfig::default();
            let chunks = chunk_file("r", "f.rs", &numbered(n), &config);
            for (i, c) in chunks.iter().enumerate() {
                prop_assert_eq!(c.metadata.start_line, 1 + i * config.stride());
                prop_assert!(c.metadata.end_line - c.metadata.start_line < config.window_lines);
            }
        }

        #[test]
        fn ids_are_unique_and_sanitized(n in 1usize..300) {
            let chunks = chunk_file("my repo", "src/x.ts", &numbered(n), &ChunkerConfig::default());
            let mut ids: Vec<_> = chunks.iter().map(|c| c.id.clone()).collect();
            prop_assert!(ids.iter().all(|id| id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')));
            let before = ids.len();
            ids.dedup();
            prop_assert_eq!(before, ids.len());
        }
    }
}
