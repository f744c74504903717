//! BM25 search over the index: plain and `|`-alternation queries, path and
//! extension filters, path-boosted scoring.

use crate::config::SearchOptions;
use crate::error::Result;
use crate::storage;
use crate::tokenizer;
use regex::Regex;
use rusqlite::params;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// One ranked result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub score: f64,
    pub path: String,
    pub docid: i64,
}

fn bm25_idf(total_docs: i64, df: i64) -> f64 {
    ((total_docs as f64 - df as f64 + 0.5) / (df as f64 + 0.5) + 1.0).ln()
}

/// Expands a query into its term list. Plain queries are tokenized as-is;
/// `|`-alternation queries tokenize each alternative and additionally
/// regex-match the raw (escaped) alternatives against the `terms` table so
/// exact identifiers that wouldn't otherwise split out still survive.
fn expand_query_terms(
    conn: &rusqlite::Connection,
    query: &str,
    stem: bool,
    stopwords: bool,
) -> Result<Vec<String>> {
    if !query.contains('|') {
        return Ok(tokenizer::tokenize(query, stem, stopwords));
    }

    let alternatives: Vec<String> = query
        .split('|')
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();

    let mut terms = Vec::new();
    for alt in &alternatives {
        terms.extend(tokenizer::tokenize(alt, stem, stopwords));
    }

    let pattern = alternatives
        .iter()
        .filter(|a| !a.is_empty())
        .map(|a| regex::escape(&a.to_lowercase()))
        .collect::<Vec<_>>()
        .join("|");
    if let Ok(rx) = Regex::new(&format!("^(?:{})$", pattern)) {
        let mut stmt = conn.prepare("SELECT term FROM terms")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        for row in rows {
            let term = row?;
            if rx.is_match(&term) {
                terms.push(term);
            }
        }
    }

    let mut seen = HashSet::new();
    let mut deduped = Vec::new();
    for t in terms {
        if seen.insert(t.clone()) {
            deduped.push(t);
        }
    }
    Ok(deduped)
}

/// Runs a BM25 search against the index at `db_path`. Returns the indexed
/// root (for display) and up to `opts.k` ranked hits. An unindexed or empty
/// store, or a query that tokenizes to nothing, yields an empty hit list
/// rather than an error.
pub fn search(db_path: &Path, query: &str, opts: &SearchOptions) -> Result<(String, Vec<SearchHit>)> {
    let conn = storage::open(db_path)?;
    storage::init_schema(&conn)?;

    let root = storage::get_meta(&conn, "root")?.unwrap_or_else(|| ".".to_string());
    let total_docs: i64 = storage::get_meta(&conn, "total_docs")?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    if total_docs <= 0 {
        return Ok((root, Vec::new()));
    }
    let avgdl: f64 = storage::get_meta(&conn, "avgdl")?
        .and_then(|v| v.parse().ok())
        .filter(|v| *v > 0.0)
        .unwrap_or(1.0);

    let q_terms = expand_query_terms(&conn, query, opts.stem, opts.stopwords)?;
    if q_terms.is_empty() {
        return Ok((root, Vec::new()));
    }

    let mut doc_scores: HashMap<i64, f64> = HashMap::new();
    let mut doc_order: Vec<i64> = Vec::new();
    let mut doc_paths: HashMap<i64, String> = HashMap::new();

    for term in &q_terms {
        let df: Option<i64> = conn
            .query_row("SELECT df FROM terms WHERE term = ?1", params![term], |r| r.get(0))
            .ok();
        let df = match df {
            Some(df) => df,
            None => continue,
        };
        let idf = bm25_idf(total_docs, df);

        let mut stmt = if opts.path_filter.is_some() {
            conn.prepare(
                "SELECT p.docid, p.tf, d.path, d.len, d.path_tokens
                 FROM postings p JOIN docs d ON d.docid = p.docid
                 WHERE p.term = ?1 AND d.path LIKE ?2",
            )?
        } else {
            conn.prepare(
                "SELECT p.docid, p.tf, d.path, d.len, d.path_tokens
                 FROM postings p JOIN docs d ON d.docid = p.docid
                 WHERE p.term = ?1",
            )?
        };

        let like_pattern = opts
            .path_filter
            .as_ref()
            .map(|f| format!("%{}%", f));

        let rows: Vec<(i64, i64, String, i64, String)> = if let Some(pat) = &like_pattern {
            stmt.query_map(params![term, pat], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            stmt.query_map(params![term], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        for (docid, tf, path, dlen, path_tokens) in rows {
            if let Some(exts) = &opts.exts_filter {
                let p = Path::new(&path);
                let name = p
                    .file_name()
                    .map(|n| n.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                let suffix = p
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
                    .unwrap_or_default();
                if !exts.contains(&name) && !exts.contains(&suffix) {
                    continue;
                }
            }
            doc_paths.entry(docid).or_insert_with(|| path.clone());

            let dl = if dlen > 0 { dlen as f64 } else { 1.0 };
            let denom = tf as f64 + opts.k1 * (1.0 - opts.b + opts.b * (dl / avgdl));
            let mut score = idf * (tf as f64 * (opts.k1 + 1.0)) / denom;
            let path_token_set: HashSet<&str> = path_tokens.split_whitespace().collect();
            if path_token_set.contains(term.as_str()) {
                score *= opts.path_boost;
            }
            if !doc_scores.contains_key(&docid) {
                doc_order.push(docid);
            }
            *doc_scores.entry(docid).or_insert(0.0) += score;
        }
    }

    if doc_scores.is_empty() {
        return Ok((root, Vec::new()));
    }

    // Build the ranked list in first-contributing-docid order, then apply a
    // stable sort so equal scores keep that order instead of HashMap's
    // nondeterministic iteration order.
    let mut ranked: Vec<(i64, f64)> = doc_order
        .into_iter()
        .map(|docid| (docid, doc_scores[&docid]))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(opts.k);

    let hits = ranked
        .into_iter()
        .map(|(docid, score)| SearchHit {
            score,
            path: doc_paths.remove(&docid).unwrap_or_default(),
            docid,
        })
        .collect();

    Ok((root, hits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexOptions;
    use std::fs;

    fn build_index(dir: &std::path::Path) -> std::path::PathBuf {
        fs::write(dir.join("a.txt"), "redis replication backlog backlog").unwrap();
        fs::write(dir.join("b.txt"), "append only file aof fsync").unwrap();
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(dir.join("src/replication.md"), "replication internals").unwrap();

        let db_path = dir.join("idx.sqlite");
        crate::indexer::index(&db_path, dir, &IndexOptions::default(), true, None).unwrap();
        db_path
    }

    #[test]
    fn ranks_best_match_first() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = build_index(dir.path());

        let (_root, hits) = search(&db_path, "replication backlog", &SearchOptions::default()).unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].path, "a.txt");
    }

    #[test]
    fn empty_index_returns_no_hits() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("idx.sqlite");
        crate::indexer::index(&db_path, dir.path(), &IndexOptions::default(), true, None).unwrap();

        let (_root, hits) = search(&db_path, "anything", &SearchOptions::default()).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn alternation_query_unions_terms() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = build_index(dir.path());

        let (_root, hits) = search(&db_path, "backlog|fsync", &SearchOptions::default()).unwrap();
        let paths: HashSet<String> = hits.into_iter().map(|h| h.path).collect();
        assert!(paths.contains("a.txt"));
        assert!(paths.contains("b.txt"));
    }

    #[test]
    fn path_filter_restricts_results() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = build_index(dir.path());

        let mut opts = SearchOptions::default();
        opts.path_filter = Some("src/".to_string());

        let (_root, hits) = search(&db_path, "replication", &opts).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "src/replication.md");
    }
}
