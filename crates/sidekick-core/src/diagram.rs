//! Mermaid sanitizer for model-generated diagram text.
//!
//! [`sanitize`] runs a fixed sequence of small total functions. Each stage is
//! public so it can be tested on its own. Stages marked flowchart-only run only
//! when the caller asked for a flowchart.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static FENCED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*\n?(.*?)```").unwrap());

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```[A-Za-z]*").unwrap());

const START_KEYWORDS: &str =
    r"flowchart|graph|sequenceDiagram|classDiagram|stateDiagram(?:-v2)?|erDiagram";

const DIRECTIONS: &str = r"(?i:TD|TB|LR|RL|BT)";

/// `flowchart` and `graph` only count as a header when followed by a direction,
/// `;` or end of line, so prose such as "graph of calls" is skipped.
static LINE_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?m)^[ \t]*((?:flowchart|graph)(?:[ \t]+{DIRECTIONS}\b)?[ \t]*(?:;|\r?$)|(?:sequenceDiagram|classDiagram|stateDiagram(?:-v2)?|erDiagram)\b)"
    ))
    .unwrap()
});

static ANYWHERE_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\b({START_KEYWORDS})\b")).unwrap());

static GRAPH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\s*)graph\b").unwrap());

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(\s*flowchart)\b(?:[ \t]+({DIRECTIONS})\b)?")).unwrap()
});

static DIRECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(\s*flowchart[ \t]+){DIRECTIONS}\b")).unwrap()
});

static ARROW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-=.—–]+>").unwrap());

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\[([^\[\]"]+)\]"#).unwrap());

static PROSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:\*\*explanation|explanation|note:|this diagram|the diagram|here is|here's|in this diagram)",
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramKind {
    #[default]
    Flowchart,
    Sequence,
    Class,
}

impl DiagramKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flowchart => "flowchart",
            Self::Sequence => "sequence",
            Self::Class => "class",
        }
    }

    /// Header line the model is asked to start with.
    #[must_use]
    pub fn mermaid_header(self) -> &'static str {
        match self {
            Self::Flowchart => "flowchart TD",
            Self::Sequence => "sequenceDiagram",
            Self::Class => "classDiagram",
        }
    }
}

impl std::fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagramKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flowchart" => Ok(Self::Flowchart),
            "sequence" => Ok(Self::Sequence),
            "class" => Ok(Self::Class),
            other => Err(format!("unknown diagram kind: {other}")),
        }
    }
}

/// Clean up raw model output into renderable Mermaid.
///
/// Returns `raw` unchanged when the pipeline leaves nothing behind.
#[must_use]
pub fn sanitize(raw: &str, kind: DiagramKind) -> String {
    let flowchart = kind == DiagramKind::Flowchart;

    let mut text = extract_fenced(raw);
    text = strip_fences(&text);
    text = trim_to_diagram_start(&text);
    text = normalize_graph_keyword(&text);
    text = ensure_direction(&text);
    if flowchart {
        text = force_top_down(&text);
        text = normalize_arrows(&text);
    }
    text = split_statements(&text);
    if flowchart {
        text = quote_labels(&text);
    }
    text = truncate_prose(&text);
    text = tidy_lines(&text);

    if text.is_empty() {
        tracing::debug!(kind = %kind, raw_len = raw.len(), "sanitized diagram is empty, returning raw text");
        return raw.to_owned();
    }
    text
}

/// Content of the first fenced block, or the whole text when there is none.
#[must_use]
pub fn extract_fenced(text: &str) -> String {
    FENCED_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or_else(|| text.to_owned(), |m| m.as_str().to_owned())
}

/// Remove leftover fence markers such as an unterminated ```` ```mermaid ````.
#[must_use]
pub fn strip_fences(text: &str) -> String {
    FENCE_RE.replace_all(text, "").into_owned()
}

/// Drop everything before the first diagram keyword.
///
/// A keyword that starts a line wins over one embedded in prose.
#[must_use]
pub fn trim_to_diagram_start(text: &str) -> String {
    let start = LINE_START_RE
        .captures(text)
        .or_else(|| ANYWHERE_START_RE.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.start());
    match start {
        Some(i) => text[i..].to_owned(),
        None => text.to_owned(),
    }
}

/// `graph LR` becomes `flowchart LR`.
#[must_use]
pub fn normalize_graph_keyword(text: &str) -> String {
    GRAPH_RE.replace(text, "${1}flowchart").into_owned()
}

/// Add `TD` to a `flowchart` header that has no direction.
#[must_use]
pub fn ensure_direction(text: &str) -> String {
    match HEADER_RE.captures(text) {
        Some(caps) if caps.get(2).is_none() => HEADER_RE.replace(text, "$1 TD").into_owned(),
        _ => text.to_owned(),
    }
}

#[must_use]
pub fn force_top_down(text: &str) -> String {
    DIRECTION_RE.replace(text, "${1}TD").into_owned()
}

/// Rewrite `->`, `==>`, `-.->`, `--->` and dash variants to `-->`, leaving quoted labels alone.
#[must_use]
pub fn normalize_arrows(text: &str) -> String {
    map_unquoted(text, |segment| {
        ARROW_RE.replace_all(segment, "-->").into_owned()
    })
}

/// Turn `;` statement separators into line breaks, leaving quoted labels alone.
#[must_use]
pub fn split_statements(text: &str) -> String {
    map_unquoted(text, |segment| segment.replace(';', "\n"))
}

/// `A[some label]` becomes `A["some label"]`.
#[must_use]
pub fn quote_labels(text: &str) -> String {
    map_unquoted(text, |segment| {
        LABEL_RE.replace_all(segment, "[\"$1\"]").into_owned()
    })
}

/// Cut at the first line that opens an explanation.
#[must_use]
pub fn truncate_prose(text: &str) -> String {
    match PROSE_RE.find(text) {
        Some(m) => text[..m.start()].to_owned(),
        None => text.to_owned(),
    }
}

/// Trim every line and drop blank ones.
#[must_use]
pub fn tidy_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Apply `f` to the parts of `text` outside double quotes.
fn map_unquoted(text: &str, f: impl Fn(&str) -> String) -> String {
    text.split('"')
        .enumerate()
        .map(|(i, segment)| {
            if i % 2 == 0 {
                f(segment)
            } else {
                segment.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("\"")
}
