//! `bm25ix`: a local full-text search engine for source trees. Walks a
//! directory, tokenizes file contents with a code-aware identifier
//! splitter, and maintains a SQLite-backed inverted index that a BM25
//! ranker with a path-term boost searches.
//!
//! The crate owns indexing and ranking only; CLI argument parsing, progress
//! rendering, JSON formatting, and terminal color are left to callers
//! (see [`snippet::highlight`] and [`indexer::IndexProgress`] for the hooks
//! it exposes instead of owning that presentation itself).

pub mod config;
pub mod error;
pub mod indexer;
pub mod searcher;
pub mod snippet;
pub mod status;
pub mod storage;
pub mod tokenizer;
pub mod walker;

pub use config::{IndexOptions, SearchOptions};
pub use error::{EngineError, Result};
pub use indexer::{index, IndexProgress, IndexStats};
pub use searcher::{search, SearchHit};
pub use snippet::{highlight, snippet_with_line};
pub use status::{index_status, IndexStatus};
pub use tokenizer::tokenize;
