//! Thin CLI demonstration of the `bm25ix` library. Argument parsing,
//! output formatting, and highlighting here are intentionally minimal —
//! the engine itself makes no assumptions about how results are presented.

use bm25ix::{config::DEFAULT_DB_PATH, index, index_status, search, snippet_with_line, tokenize};
use bm25ix::{IndexOptions, SearchOptions};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bm25ix", about = "Local full-text search engine for source trees")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build or refresh the index for a directory tree.
    Index {
        #[arg(default_value = ".")]
        root: PathBuf,
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        out: PathBuf,
        #[arg(long)]
        full: bool,
        #[arg(long)]
        stem: bool,
        #[arg(long)]
        no_stopwords: bool,
    },
    /// Search an existing index.
    Search {
        query: String,
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        index: PathBuf,
        #[arg(long, default_value_t = 10)]
        k: usize,
        #[arg(long)]
        path: Option<String>,
        #[arg(long)]
        snippet: bool,
        #[arg(long)]
        json: bool,
    },
    /// Report whether an index covers the current directory.
    Status {
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        index: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "bm25ix=info".into()))
        .compact()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Index {
            root,
            out,
            full,
            stem,
            no_stopwords,
        } => {
            let opts = IndexOptions {
                stem,
                stopwords: !no_stopwords,
                ..IndexOptions::default()
            };
            let stats = index(&out, &root, &opts, !full, None)?;
            println!(
                "Indexed {} docs (unchanged {}, removed {}, failed {}); total {} -> {}",
                stats.indexed,
                stats.unchanged,
                stats.removed,
                stats.failed,
                stats.total_docs,
                out.display()
            );
        }
        Command::Search {
            query,
            index: db_path,
            k,
            path,
            snippet,
            json,
        } => {
            let opts = SearchOptions {
                k,
                path_filter: path,
                ..SearchOptions::default()
            };
            let (root, hits) = search(&db_path, &query, &opts)?;
            if hits.is_empty() {
                println!("No results.");
                return Ok(());
            }
            let q_terms = tokenize(&query, opts.stem, opts.stopwords);

            if json {
                let mut out = Vec::new();
                for hit in &hits {
                    let mut entry = serde_json::json!({
                        "score": hit.score,
                        "path": hit.path,
                    });
                    if snippet {
                        let full_path = PathBuf::from(&root).join(&hit.path);
                        let (line_no, text) = snippet_with_line(&full_path, &q_terms, 220)?;
                        entry["line"] = serde_json::json!(line_no);
                        entry["snippet"] = serde_json::json!(text);
                    }
                    out.push(entry);
                }
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                for hit in &hits {
                    println!("{:>8.3}  {}", hit.score, hit.path);
                    if snippet {
                        let full_path = PathBuf::from(&root).join(&hit.path);
                        let (line_no, text) = snippet_with_line(&full_path, &q_terms, 220)?;
                        if let Some(n) = line_no {
                            println!("         {}: {}", n, text);
                        }
                    }
                }
            }
        }
        Command::Status { index: db_path } => {
            let cwd = std::env::current_dir()?;
            let status = index_status(&db_path, &cwd)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}
