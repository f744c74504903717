//! Incremental indexing pipeline: plans unchanged/changed/removed sets by
//! comparing (mtime, size) signatures, does per-file content work (read,
//! hash, decode, tokenize) on a rayon pool, then applies the four write
//! transactions from a single thread holding the one `Connection`.

use crate::config::IndexOptions;
use crate::error::Result;
use crate::storage::{self, DocRow, IndexedDoc};
use crate::{tokenizer, walker};
use rayon::prelude::*;
use serde::Serialize;
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::warn;

/// Reported once before content work begins and once per file afterward.
#[derive(Debug, Clone)]
pub enum IndexProgress {
    Planned {
        to_index: usize,
        to_remove: usize,
        unchanged: usize,
    },
    FileDone {
        path: PathBuf,
    },
}

/// Summary counters returned from [`index`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub total_docs: usize,
    pub indexed: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub failed: usize,
}

struct FileContent {
    rel: String,
    mtime: i64,
    size: i64,
    sha1: String,
    term_freqs: HashMap<String, i64>,
    len: i64,
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn read_signature(path: &Path) -> Option<(i64, i64)> {
    let meta = std::fs::metadata(path).ok()?;
    let mtime = meta
        .modified()
        .ok()?
        .duration_since(UNIX_EPOCH)
        .ok()?
        .as_secs() as i64;
    Some((mtime, meta.len() as i64))
}

/// Reads and prepares one file's content work. Returns `None` (logged as a
/// warning, counted as a failure) on any I/O error; a file that decodes but
/// yields zero tokens still produces a `FileContent` with an empty term map
/// (indexed as a placeholder doc).
fn prepare_file(root: &Path, path: &Path, opts: &IndexOptions) -> Option<FileContent> {
    let rel = relative_path(root, path);
    let (mtime, size) = read_signature(path)?;
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read file, skipping");
            return None;
        }
    };
    let sha1 = {
        let mut hasher = Sha1::new();
        hasher.update(&bytes);
        format!("{:x}", hasher.finalize())
    };
    let text = String::from_utf8_lossy(&bytes);
    let tokens = tokenizer::tokenize(&text, opts.stem, opts.stopwords);
    let mut term_freqs: HashMap<String, i64> = HashMap::new();
    for tok in &tokens {
        *term_freqs.entry(tok.clone()).or_insert(0) += 1;
    }
    Some(FileContent {
        rel,
        mtime,
        size,
        sha1,
        len: tokens.len() as i64,
        term_freqs,
    })
}

/// Indexes `root` into the store at `db_path`. When `incremental` is true,
/// files whose (mtime, size) signature is unchanged since the last run are
/// skipped entirely; when false, every candidate file is re-read and
/// re-hashed regardless of signature (but doc rows are still upserted, not
/// duplicated).
pub fn index(
    db_path: &Path,
    root: &Path,
    opts: &IndexOptions,
    incremental: bool,
    progress: Option<&dyn Fn(IndexProgress)>,
) -> Result<IndexStats> {
    let mut conn = storage::open(db_path)?;
    storage::init_schema(&conn)?;

    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

    storage::set_meta(&conn, "root", &root.to_string_lossy())?;
    storage::set_meta(&conn, "version", storage::SCHEMA_VERSION)?;

    let existing = storage::load_docs_by_path(&conn)?;
    let candidates = walker::iter_files(&root, &opts.exts);

    let candidate_rels: std::collections::HashSet<String> = candidates
        .iter()
        .map(|p| relative_path(&root, p))
        .collect();

    let to_remove: Vec<String> = existing
        .keys()
        .filter(|rel| !candidate_rels.contains(*rel))
        .cloned()
        .collect();

    let mut to_index: Vec<PathBuf> = Vec::new();
    let mut unchanged_count = 0usize;

    for path in &candidates {
        let rel = relative_path(&root, path);
        let existing_row: Option<&DocRow> = existing.get(&rel);
        match (incremental, existing_row, read_signature(path)) {
            (true, Some(row), Some((mtime, size))) if row.mtime == mtime && row.size == size => {
                unchanged_count += 1;
            }
            _ => to_index.push(path.clone()),
        }
    }

    if let Some(cb) = progress {
        cb(IndexProgress::Planned {
            to_index: to_index.len(),
            to_remove: to_remove.len(),
            unchanged: unchanged_count,
        });
    }

    // T1: drop docs whose file disappeared.
    storage::remove_docs(&mut conn, &to_remove)?;

    // T2: drop postings for docs we're about to re-write (no-op for brand
    // new paths; ON DELETE CASCADE only fires on doc removal, not update).
    let changed_docids: Vec<i64> = to_index
        .iter()
        .filter_map(|p| existing.get(&relative_path(&root, p)).map(|row| row.docid))
        .collect();
    storage::delete_postings_for_docids(&mut conn, &changed_docids)?;

    // Content work: parallel across files, the connection stays untouched.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.workers)
        .build()
        .map_err(|e| crate::error::EngineError::Query(e.to_string()))?;

    let prepared: Vec<Option<FileContent>> = pool.install(|| {
        to_index
            .par_iter()
            .map(|path| prepare_file(&root, path, opts))
            .collect()
    });

    let mut failed = 0usize;
    let mut ready_docs = Vec::with_capacity(prepared.len());
    for (path, content) in to_index.iter().zip(prepared.into_iter()) {
        match content {
            Some(c) => {
                let path_tokens = tokenizer::tokenize_path(&c.rel);
                let term_freqs: Vec<(String, i64)> = c.term_freqs.into_iter().collect();
                ready_docs.push(IndexedDoc {
                    path: c.rel,
                    len: c.len,
                    mtime: c.mtime,
                    size: c.size,
                    sha1: c.sha1,
                    path_tokens: path_tokens.into_iter().collect::<Vec<_>>().join(" "),
                    term_freqs,
                });
                if let Some(cb) = progress {
                    cb(IndexProgress::FileDone { path: path.clone() });
                }
            }
            None => failed += 1,
        }
    }

    let indexed = ready_docs.len();

    // T3: upsert docs + postings (placeholders included — a zero-token doc
    // is still a valid row with no postings).
    storage::upsert_docs_and_postings(&mut conn, &ready_docs)?;

    // T4: rebuild df cache and refresh avgdl/total_docs.
    storage::rebuild_terms_and_meta(&mut conn)?;

    let total_docs: i64 = conn.query_row("SELECT COUNT(*) FROM docs", [], |r| r.get(0))?;

    Ok(IndexStats {
        total_docs: total_docs as usize,
        indexed,
        unchanged: unchanged_count,
        removed: to_remove.len(),
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexOptions;
    use std::fs;

    #[test]
    fn indexes_new_files_and_reports_stats() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "redis replication backlog backlog").unwrap();
        fs::write(dir.path().join("b.txt"), "append only file aof fsync").unwrap();

        let db_path = dir.path().join("idx.sqlite");
        let opts = IndexOptions::default();
        let stats = index(&db_path, dir.path(), &opts, true, None).unwrap();

        assert_eq!(stats.total_docs, 2);
        assert_eq!(stats.indexed, 2);
        assert_eq!(stats.unchanged, 0);
        assert_eq!(stats.removed, 0);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn second_incremental_run_reports_all_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello world").unwrap();
        fs::write(dir.path().join("b.txt"), "hello there").unwrap();

        let db_path = dir.path().join("idx.sqlite");
        let opts = IndexOptions::default();
        index(&db_path, dir.path(), &opts, true, None).unwrap();
        let stats = index(&db_path, dir.path(), &opts, true, None).unwrap();

        assert_eq!(stats.total_docs, 2);
        assert_eq!(stats.indexed, 0);
        assert_eq!(stats.unchanged, 2);
    }

    #[test]
    fn removes_doc_whose_file_disappeared() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        fs::write(&a, "hello world").unwrap();

        let db_path = dir.path().join("idx.sqlite");
        let opts = IndexOptions::default();
        index(&db_path, dir.path(), &opts, true, None).unwrap();

        fs::remove_file(&a).unwrap();
        let stats = index(&db_path, dir.path(), &opts, true, None).unwrap();

        assert_eq!(stats.total_docs, 0);
        assert_eq!(stats.removed, 1);
    }
}
