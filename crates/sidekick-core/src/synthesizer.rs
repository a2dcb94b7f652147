//! Grounded answer generation over retrieved chunks.

use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sidekick_index::store::SearchResult;
use sidekick_llm::provider::Message;
use sidekick_llm::{LlmError, LlmProvider, RetryPolicy, retry_on_rate_limit};

use crate::diagram::DiagramKind;

pub const DOCUMENTATION_SENTINEL: &str = "DOCUMENTATION MODE";
pub const ERROR_ANALYSIS_SENTINEL: &str = "ANALYZE ERROR MODE";

pub const NO_CONTEXT_MARKER: &str = "(No relevant code context was found in the indexed repository.)";

/// Source files longer than this are cut before being sent for a diagram.
pub const MAX_DIAGRAM_SOURCE_CHARS: usize = 30_000;

const PERSONA: &str = "You are Sidekick, an expert AI coding assistant.";

const STANDARD_INSTRUCTIONS: &str = "Answer the user's question based ONLY on the provided code context. \
If the answer is not in the context, say so. \
Provide code examples from the context where relevant.";

const DOCUMENTATION_INSTRUCTIONS: &str = "You are writing technical documentation for this repository. \
Use the provided code context as the primary source and cite files by path. \
When the context is sparse, still produce your best general technical documentation for a \
project of this shape and say which parts are inferred. Format the result as Markdown.";

const ERROR_ANALYSIS_INSTRUCTIONS: &str = "The user pasted a stack trace or log. \
Explain the most likely cause in plain terms, point to the files and line ranges from the \
provided code context that are involved, and suggest a concrete fix. \
If the context does not contain the relevant code, say so and explain the error in general terms.";

/// Prompt mode selected by sentinel substrings in the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Standard,
    Documentation,
    ErrorAnalysis,
}

impl QueryMode {
    #[must_use]
    pub fn detect(query: &str) -> Self {
        if query.contains(DOCUMENTATION_SENTINEL) {
            Self::Documentation
        } else if query.contains(ERROR_ANALYSIS_SENTINEL) {
            Self::ErrorAnalysis
        } else {
            Self::Standard
        }
    }

    fn instructions(self) -> &'static str {
        match self {
            Self::Standard => STANDARD_INSTRUCTIONS,
            Self::Documentation => DOCUMENTATION_INSTRUCTIONS,
            Self::ErrorAnalysis => ERROR_ANALYSIS_INSTRUCTIONS,
        }
    }
}

/// Documentation hub sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocSection {
    #[default]
    Architecture,
    Api,
    Lifecycle,
    Security,
}

impl DocSection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Architecture => "architecture",
            Self::Api => "api",
            Self::Lifecycle => "lifecycle",
            Self::Security => "security",
        }
    }

    /// The documentation-mode query for this section.
    #[must_use]
    pub fn query(self) -> String {
        format!(
            "SYSTEM: {DOCUMENTATION_SENTINEL}. GENERATE A COMPREHENSIVE {} GUIDE FOR THIS REPOSITORY. USE MARKDOWN.",
            self.as_str().to_uppercase()
        )
    }
}

impl std::fmt::Display for DocSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocSection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "architecture" => Ok(Self::Architecture),
            "api" => Ok(Self::Api),
            "lifecycle" => Ok(Self::Lifecycle),
            "security" => Ok(Self::Security),
            other => Err(format!("unknown documentation section: {other}")),
        }
    }
}

/// The error-analysis query wrapping a pasted trace.
#[must_use]
pub fn error_analysis_query(trace: &str) -> String {
    format!(
        "SYSTEM: {ERROR_ANALYSIS_SENTINEL}. EXPLAIN THE FOLLOWING STACK TRACE/LOG AND LINK TO FILES IN THE REPO: \n\n {trace}"
    )
}

/// Render retrieved chunks as the context block, best hit first.
#[must_use]
pub fn build_context(chunks: &[SearchResult]) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT_MARKER.to_owned();
    }
    chunks
        .iter()
        .map(|hit| {
            let m = &hit.metadata;
            format!(
                "File: {}\nLines: {}-{}\nCode:\n```\n{}\n```\n",
                m.filename, m.start_line, m.end_line, m.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// System and user messages for a question over `chunks`.
#[must_use]
pub fn build_messages(query: &str, chunks: &[SearchResult], repo: Option<&str>) -> Vec<Message> {
    let mode = QueryMode::detect(query);
    let system = format!("{PERSONA}\n{}", mode.instructions());

    let mut user = String::new();
    if let Some(repo) = repo {
        let _ = writeln!(user, "Repository: {repo}\n");
    }
    let _ = write!(
        user,
        "Context:\n{}\n\nQuestion: {query}",
        build_context(chunks)
    );

    vec![Message::system(system), Message::user(user)]
}

/// Messages asking for raw Mermaid markup describing `content`.
#[must_use]
pub fn build_diagram_messages(path: &str, content: &str, kind: DiagramKind) -> Vec<Message> {
    let source = truncate_chars(content, MAX_DIAGRAM_SOURCE_CHARS);
    let system = format!(
        "{PERSONA}\nYou turn source code into Mermaid diagrams. Reply with raw Mermaid syntax only: \
no Markdown fences, no explanation before or after the diagram."
    );
    let user = format!(
        "Create a Mermaid {kind} diagram of the logic in `{path}`.\n\
Start the reply with `{header}`. Quote every node label that contains spaces or punctuation.\n\n\
File: {path}\n```\n{source}\n```",
        header = kind.mermaid_header(),
    );
    vec![Message::system(system), Message::user(user)]
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Generation client. Every model call goes through the rate-limit retry policy.
pub struct Synthesizer<P: LlmProvider> {
    provider: Arc<P>,
    policy: RetryPolicy,
}

impl<P: LlmProvider> Synthesizer<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    /// Answer `query` from `chunks`. An empty chunk list still calls the model, with
    /// the no-context marker in place of the context block.
    ///
    /// # Errors
    ///
    /// Returns the provider error once retries are exhausted or on any non-rate-limit failure.
    pub async fn synthesize(
        &self,
        query: &str,
        chunks: &[SearchResult],
        repo: Option<&str>,
    ) -> Result<String, LlmError> {
        let mode = QueryMode::detect(query);
        let messages = build_messages(query, chunks, repo);
        tracing::info!(?mode, chunks = chunks.len(), repo = repo.unwrap_or("*"), "synthesizing answer");
        retry_on_rate_limit(&self.policy, "generate", || self.provider.chat(&messages)).await
    }

    /// Raw model output for a diagram of one file. Callers pass it to [`crate::diagram::sanitize`].
    ///
    /// # Errors
    ///
    /// Returns the provider error once retries are exhausted or on any non-rate-limit failure.
    pub async fn generate_diagram(
        &self,
        path: &str,
        content: &str,
        kind: DiagramKind,
    ) -> Result<String, LlmError> {
        let messages = build_diagram_messages(path, content, kind);
        tracing::info!(file = %path, kind = %kind, "generating diagram");
        retry_on_rate_limit(&self.policy, "diagram", || self.provider.chat(&messages)).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sidekick_index::chunker::ChunkMetadata;
    use sidekick_llm::mock::MockProvider;
    use sidekick_llm::provider::Role;

    use super::*;

    fn hit(filename: &str, start: usize, end: usize, content: &str) -> SearchResult {
        SearchResult {
            id: format!("acme_app__{filename}__{start}-{end}"),
            score: 0.9,
            metadata: ChunkMetadata {
                repo_name: "acme_app".into(),
                filename: filename.into(),
                start_line: start,
                end_line: end,
                content: content.into(),
            },
        }
    }

    fn synthesizer(provider: MockProvider) -> Synthesizer<MockProvider> {
        Synthesizer::new(
            Arc::new(provider),
            RetryPolicy::new(3, Duration::from_millis(2000)),
        )
    }

    #[test]
    fn mode_detection_uses_sentinels() {
        assert_eq!(QueryMode::detect("how does auth work?"), QueryMode::Standard);
        assert_eq!(
            QueryMode::detect(&DocSection::Api.query()),
            QueryMode::Documentation
        );
        assert_eq!(
            QueryMode::detect(&error_analysis_query("TypeError: x is undefined")),
            QueryMode::ErrorAnalysis
        );
        assert_eq!(
            QueryMode::detect("documentation mode please"),
            QueryMode::Standard
        );
    }

    #[test]
    fn documentation_query_uppercases_section() {
        assert_eq!(
            DocSection::Lifecycle.query(),
            "SYSTEM: DOCUMENTATION MODE. GENERATE A COMPREHENSIVE LIFECYCLE GUIDE FOR THIS REPOSITORY. USE MARKDOWN."
        );
        assert_eq!("Security".parse::<DocSection>().unwrap(), DocSection::Security);
        assert!("faq".parse::<DocSection>().is_err());
    }

    #[test]
    fn context_entries_are_joined_by_blank_line() {
        let context = build_context(&[
            hit("src/a.ts", 1, 50, "const a = 1;"),
            hit("src/b.ts", 41, 90, "const b = 2;"),
        ]);
        assert_eq!(
            context,
            "File: src/a.ts\nLines: 1-50\nCode:\n```\nconst a = 1;\n```\n\n\n\
File: src/b.ts\nLines: 41-90\nCode:\n```\nconst b = 2;\n```\n"
        );
    }

    #[test]
    fn empty_context_uses_marker() {
        assert_eq!(build_context(&[]), NO_CONTEXT_MARKER);
        let messages = build_messages("what is this?", &[], None);
        assert!(messages[1].content.contains(NO_CONTEXT_MARKER));
    }

    #[test]
    fn messages_carry_persona_mode_and_repo() {
        let messages = build_messages("where is main?", &[hit("main.rs", 1, 5, "fn main() {}")], Some("acme_app"));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("Sidekick"));
        assert!(messages[0].content.contains("ONLY on the provided code context"));
        assert!(messages[1].content.starts_with("Repository: acme_app\n"));
        assert!(messages[1].content.ends_with("Question: where is main?"));

        let docs = build_messages(&DocSection::Architecture.query(), &[], None);
        assert!(docs[0].content.contains("best general technical documentation"));
        let errors = build_messages(&error_analysis_query("panic at main.rs:3"), &[], None);
        assert!(errors[0].content.contains("stack trace"));
    }

    #[test]
    fn diagram_messages_request_raw_mermaid() {
        let messages = build_diagram_messages("src/app.ts", "export {}", DiagramKind::Sequence);
        assert!(messages[0].content.contains("raw Mermaid"));
        assert!(messages[1].content.contains("Mermaid sequence diagram"));
        assert!(messages[1].content.contains("`sequenceDiagram`"));
        assert!(messages[1].content.contains("export {}"));
    }

    #[test]
    fn long_sources_are_truncated_on_char_boundary() {
        let content = "é".repeat(MAX_DIAGRAM_SOURCE_CHARS + 10);
        let messages = build_diagram_messages("a.rs", &content, DiagramKind::Flowchart);
        let kept = messages[1].content.matches('é').count();
        assert_eq!(kept, MAX_DIAGRAM_SOURCE_CHARS);
    }

    #[tokio::test]
    async fn synthesize_returns_model_text() {
        let provider = MockProvider::with_responses(vec!["It lives in src/a.ts".into()]);
        let synth = synthesizer(provider.clone());
        let answer = synth
            .synthesize("where?", &[hit("src/a.ts", 1, 5, "x")], Some("acme_app"))
            .await
            .unwrap();
        assert_eq!(answer, "It lives in src/a.ts");
        let recorded = provider.recorded_messages();
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0][1].content.contains("File: src/a.ts"));
    }

    #[tokio::test]
    async fn zero_context_still_calls_model() {
        let provider = MockProvider::default();
        let synth = synthesizer(provider.clone());
        let answer = synth.synthesize("anything?", &[], None).await.unwrap();
        assert_eq!(answer, "mock response");
        assert_eq!(provider.chat_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn generation_retries_rate_limits() {
        let provider = MockProvider::default().with_rate_limits(2);
        let synth = synthesizer(provider.clone());
        let start = tokio::time::Instant::now();
        let answer = synth.synthesize("q", &[], None).await.unwrap();
        assert_eq!(answer, "mock response");
        assert_eq!(provider.chat_calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(6000));
    }

    #[tokio::test]
    async fn generation_errors_propagate() {
        let synth = synthesizer(MockProvider::failing());
        assert!(matches!(
            synth.synthesize("q", &[], None).await,
            Err(LlmError::Other(_))
        ));
    }

    #[tokio::test]
    async fn diagram_returns_raw_output() {
        let raw = "```mermaid\ngraph LR\nA->B\n```";
        let synth = synthesizer(MockProvider::with_responses(vec![raw.into()]));
        let out = synth
            .generate_diagram("a.ts", "a()", DiagramKind::Flowchart)
            .await
            .unwrap();
        assert_eq!(out, raw);
    }
}
