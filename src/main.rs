//! `sidekick` command-line front end.
//!
//! Every command loads the config, builds a [`Sidekick`] handle and prints its
//! result to stdout. Logs go to stderr so JSON output can be piped.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sidekick_core::config::Config;
use sidekick_core::{DiagramKind, DocSection, Sidekick};

#[derive(Parser)]
#[command(
    name = "sidekick",
    version,
    about = "Ask questions about a code repository, grounded in its indexed source"
)]
struct Cli {
    /// Path to the TOML config. Falls back to `SIDEKICK_CONFIG`, then `config/default.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clone or pull a repository, then chunk, embed and store its code files.
    Index { url: String },
    /// Re-index an existing local clone without pulling.
    Reindex { repo: String },
    /// Answer a question from retrieved code.
    Ask {
        query: String,
        /// Restrict retrieval to one repository.
        #[arg(long)]
        repo: Option<String>,
    },
    /// Generate a documentation guide section.
    Docs {
        repo: String,
        #[arg(long, default_value = "architecture")]
        section: DocSection,
    },
    /// Explain a stack trace or log against the repository.
    Explain { repo: String, trace: String },
    /// Print the import graph of script files as JSON.
    Graph { repo: String },
    /// Print language, size, complexity and git statistics as JSON.
    Analytics { repo: String },
    /// List the files of a local clone.
    Files { repo: String },
    /// Print one file of a local clone.
    Show { repo: String, path: String },
    /// Generate a sanitized Mermaid diagram for one file.
    Diagram {
        repo: String,
        path: String,
        #[arg(long, default_value = "flowchart")]
        kind: DiagramKind,
    },
    /// Purge a repository's vectors and delete its local clone.
    Delete { repo: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config);
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    tracing::debug!(path = %config_path.display(), "config loaded");

    let sidekick = Sidekick::init(&config).await?;
    run(&sidekick, cli.command).await
}

async fn run(sidekick: &Sidekick<sidekick_llm::any::AnyProvider>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Index { url } => print_json(&sidekick.index_repository(&url).await?),
        Command::Reindex { repo } => print_json(&sidekick.reindex(&repo).await?),
        Command::Ask { query, repo } => print_json(&sidekick.ask(&query, repo.as_deref()).await?),
        Command::Docs { repo, section } => {
            let answer = sidekick.documentation(&repo, section).await?;
            println!("{}", answer.answer);
            Ok(())
        }
        Command::Explain { repo, trace } => {
            let answer = sidekick.explain_error(&repo, &trace).await?;
            println!("{}", answer.answer);
            Ok(())
        }
        Command::Graph { repo } => print_json(&sidekick.dependency_graph(&repo).await?),
        Command::Analytics { repo } => print_json(&sidekick.analytics(&repo).await?),
        Command::Files { repo } => {
            for file in sidekick.list_files(&repo).await? {
                println!("{file}");
            }
            Ok(())
        }
        Command::Show { repo, path } => {
            print!("{}", sidekick.file_content(&repo, &path).await?);
            Ok(())
        }
        Command::Diagram { repo, path, kind } => {
            println!("{}", sidekick.visualize(&repo, &path, kind).await?);
            Ok(())
        }
        Command::Delete { repo } => {
            let removed = sidekick.delete_repository(&repo).await?;
            if removed {
                println!("deleted {repo}");
            } else {
                println!("no local clone for {repo}; vectors purged");
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Priority: `--config` > `SIDEKICK_CONFIG` > `config/default.toml`.
fn resolve_config_path(cli: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli {
        return path;
    }
    if let Ok(path) = std::env::var("SIDEKICK_CONFIG") {
        return PathBuf::from(path);
    }
    Path::new("config").join("default.toml")
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
