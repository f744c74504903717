//! SQLite-backed index store: schema management and the four-transaction
//! write discipline used by the indexer (remove stale docs, delete postings
//! of changed docs, upsert docs + postings, rebuild the terms table).

use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

pub const SCHEMA_VERSION: &str = "2";

/// A single indexed document's metadata row.
#[derive(Debug, Clone)]
pub struct DocRow {
    pub docid: i64,
    pub path: String,
    pub len: i64,
    pub mtime: i64,
    pub size: i64,
    pub sha1: String,
}

/// Opens (creating the parent directory if needed) and configures a
/// connection: foreign keys on, a 5s busy timeout, temp tables in memory,
/// and WAL + NORMAL synchronous attempted best-effort.
pub fn open(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(db_path)?;
    conn.execute_batch(
        "PRAGMA foreign_keys=ON;
         PRAGMA busy_timeout=5000;
         PRAGMA temp_store=MEMORY;",
    )?;
    // WAL isn't available on every filesystem/sandbox; fall back silently.
    let _ = conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;");
    Ok(conn)
}

/// Creates the schema if it does not already exist.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS meta (
            k TEXT PRIMARY KEY,
            v TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS docs (
            docid INTEGER PRIMARY KEY,
            path TEXT NOT NULL UNIQUE,
            len INTEGER NOT NULL,
            mtime INTEGER NOT NULL,
            size INTEGER NOT NULL,
            sha1 TEXT NOT NULL,
            path_tokens TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS terms (
            term TEXT PRIMARY KEY,
            df INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS postings (
            term TEXT NOT NULL,
            docid INTEGER NOT NULL,
            tf INTEGER NOT NULL,
            PRIMARY KEY(term, docid),
            FOREIGN KEY(docid) REFERENCES docs(docid) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_postings_term ON postings(term);
        CREATE INDEX IF NOT EXISTS idx_docs_path ON docs(path);",
    )?;
    Ok(())
}

pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row("SELECT v FROM meta WHERE k = ?1", params![key], |r| {
            r.get(0)
        })
        .optional()?)
}

pub fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO meta(k, v) VALUES (?1, ?2)
         ON CONFLICT(k) DO UPDATE SET v = excluded.v",
        params![key, value],
    )?;
    Ok(())
}

/// Loads every currently-indexed document keyed by path, for diffing
/// against the walker's candidate set.
pub fn load_docs_by_path(conn: &Connection) -> Result<HashMap<String, DocRow>> {
    let mut stmt = conn.prepare("SELECT docid, path, len, mtime, size, sha1 FROM docs")?;
    let rows = stmt.query_map([], |r| {
        Ok(DocRow {
            docid: r.get(0)?,
            path: r.get(1)?,
            len: r.get(2)?,
            mtime: r.get(3)?,
            size: r.get(4)?,
            sha1: r.get(5)?,
        })
    })?;
    let mut out = HashMap::new();
    for row in rows {
        let row = row?;
        out.insert(row.path.clone(), row);
    }
    Ok(out)
}

/// T1: removes docs (and cascades their postings) whose path is no longer
/// present on disk.
pub fn remove_docs(conn: &mut Connection, paths: &[String]) -> Result<()> {
    if paths.is_empty() {
        return Ok(());
    }
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare("DELETE FROM docs WHERE path = ?1")?;
        for path in paths {
            stmt.execute(params![path])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// T2: deletes postings belonging to docs that changed content and are
/// about to be re-indexed (the doc row itself is updated in T3).
pub fn delete_postings_for_docids(conn: &mut Connection, docids: &[i64]) -> Result<()> {
    if docids.is_empty() {
        return Ok(());
    }
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare("DELETE FROM postings WHERE docid = ?1")?;
        for docid in docids {
            stmt.execute(params![docid])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// A fully prepared document ready for T3: either a real file with tokens,
/// or a placeholder for a file that failed to read/decode or produced zero
/// tokens.
pub struct IndexedDoc {
    pub path: String,
    pub len: i64,
    pub mtime: i64,
    pub size: i64,
    pub sha1: String,
    pub path_tokens: String,
    pub term_freqs: Vec<(String, i64)>,
}

/// T3: upserts doc rows and inserts their postings in one transaction.
pub fn upsert_docs_and_postings(conn: &mut Connection, docs: &[IndexedDoc]) -> Result<()> {
    if docs.is_empty() {
        return Ok(());
    }
    let tx = conn.transaction()?;
    {
        let mut upsert_doc = tx.prepare(
            "INSERT INTO docs(path, len, mtime, size, sha1, path_tokens)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(path) DO UPDATE SET
                len = excluded.len, mtime = excluded.mtime, size = excluded.size,
                sha1 = excluded.sha1, path_tokens = excluded.path_tokens",
        )?;
        let mut get_docid = tx.prepare("SELECT docid FROM docs WHERE path = ?1")?;
        let mut insert_posting =
            tx.prepare("INSERT INTO postings(term, docid, tf) VALUES (?1, ?2, ?3)")?;

        for doc in docs {
            upsert_doc.execute(params![
                doc.path,
                doc.len,
                doc.mtime,
                doc.size,
                doc.sha1,
                doc.path_tokens
            ])?;
            let docid: i64 = get_docid.query_row(params![doc.path], |r| r.get(0))?;
            for (term, tf) in &doc.term_freqs {
                insert_posting.execute(params![term, docid, tf])?;
            }
        }
    }
    tx.commit()?;
    Ok(())
}

/// T4: rebuilds the `terms` df cache from `postings` and refreshes
/// `meta.total_docs` / `meta.avgdl`.
pub fn rebuild_terms_and_meta(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM terms", [])?;
    tx.execute(
        "INSERT INTO terms(term, df)
         SELECT term, COUNT(*) FROM postings GROUP BY term",
        [],
    )?;
    let (total_docs, avgdl): (i64, f64) =
        tx.query_row("SELECT COUNT(*), COALESCE(AVG(len), 0.0) FROM docs", [], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })?;
    tx.execute(
        "INSERT INTO meta(k, v) VALUES ('total_docs', ?1)
         ON CONFLICT(k) DO UPDATE SET v = excluded.v",
        params![total_docs.to_string()],
    )?;
    tx.execute(
        "INSERT INTO meta(k, v) VALUES ('avgdl', ?1)
         ON CONFLICT(k) DO UPDATE SET v = excluded.v",
        params![avgdl.to_string()],
    )?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_roundtrip_and_meta() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("sub/bm25.sqlite");
        let conn = open(&db_path).unwrap();
        init_schema(&conn).unwrap();
        set_meta(&conn, "root", "/x").unwrap();
        assert_eq!(get_meta(&conn, "root").unwrap(), Some("/x".to_string()));
        assert_eq!(get_meta(&conn, "missing").unwrap(), None);
    }

    #[test]
    fn upsert_then_rebuild_terms() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = open(&dir.path().join("bm25.sqlite")).unwrap();
        init_schema(&conn).unwrap();
        let docs = vec![IndexedDoc {
            path: "a.txt".to_string(),
            len: 2,
            mtime: 1,
            size: 10,
            sha1: "abc".to_string(),
            path_tokens: "a txt".to_string(),
            term_freqs: vec![("hello".to_string(), 2), ("world".to_string(), 1)],
        }];
        upsert_docs_and_postings(&mut conn, &docs).unwrap();
        rebuild_terms_and_meta(&mut conn).unwrap();

        let df: i64 = conn
            .query_row("SELECT df FROM terms WHERE term = 'hello'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(df, 1);
        assert_eq!(get_meta(&conn, "total_docs").unwrap(), Some("1".to_string()));
    }

    #[test]
    fn remove_docs_cascades_postings() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = open(&dir.path().join("bm25.sqlite")).unwrap();
        init_schema(&conn).unwrap();
        let docs = vec![IndexedDoc {
            path: "a.txt".to_string(),
            len: 1,
            mtime: 1,
            size: 1,
            sha1: "x".to_string(),
            path_tokens: "a txt".to_string(),
            term_freqs: vec![("hello".to_string(), 1)],
        }];
        upsert_docs_and_postings(&mut conn, &docs).unwrap();
        remove_docs(&mut conn, &["a.txt".to_string()]).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM postings", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
