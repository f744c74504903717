//! Reports whether an index exists, whether it covers the current working
//! directory, and basic size info — without opening a write connection.

use crate::error::Result;
use crate::storage;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub exists: bool,
    pub indexed: bool,
    pub reason: String,
    pub db_path: PathBuf,
    pub root: Option<PathBuf>,
    pub total_docs: usize,
}

/// Inspects the index at `db_path` relative to `cwd`. `indexed` is true only
/// when the index exists, carries root metadata, and `cwd` is that root or a
/// descendant of it.
pub fn index_status(db_path: &Path, cwd: &Path) -> Result<IndexStatus> {
    if !db_path.exists() {
        return Ok(IndexStatus {
            exists: false,
            indexed: false,
            reason: "index file does not exist".to_string(),
            db_path: db_path.to_path_buf(),
            root: None,
            total_docs: 0,
        });
    }

    let conn = storage::open(db_path)?;
    storage::init_schema(&conn)?;
    let root = storage::get_meta(&conn, "root")?;
    let total_docs: usize = storage::get_meta(&conn, "total_docs")?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let root = match root {
        Some(r) if !r.is_empty() => r,
        _ => {
            return Ok(IndexStatus {
                exists: true,
                indexed: false,
                reason: "index exists but has no root metadata".to_string(),
                db_path: db_path.to_path_buf(),
                root: None,
                total_docs,
            });
        }
    };

    let root_path = Path::new(&root)
        .canonicalize()
        .unwrap_or_else(|_| PathBuf::from(&root));
    let cwd_path = cwd.canonicalize().unwrap_or_else(|_| cwd.to_path_buf());

    let indexed = cwd_path == root_path || cwd_path.starts_with(&root_path);
    let reason = if indexed {
        "ok".to_string()
    } else {
        "current directory is outside indexed root".to_string()
    };

    Ok(IndexStatus {
        exists: true,
        indexed,
        reason,
        db_path: db_path.to_path_buf(),
        root: Some(root_path),
        total_docs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexOptions;
    use std::fs;

    #[test]
    fn reports_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let status = index_status(&dir.path().join("nope.sqlite"), dir.path()).unwrap();
        assert!(!status.exists);
        assert!(!status.indexed);
    }

    #[test]
    fn reports_indexed_when_cwd_is_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello world").unwrap();
        let db_path = dir.path().join("idx.sqlite");
        crate::indexer::index(&db_path, dir.path(), &IndexOptions::default(), true, None).unwrap();

        let status = index_status(&db_path, dir.path()).unwrap();
        assert!(status.exists);
        assert!(status.indexed);
        assert_eq!(status.total_docs, 1);
    }

    #[test]
    fn reports_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello world").unwrap();
        let db_path = dir.path().join("idx.sqlite");
        crate::indexer::index(&db_path, dir.path(), &IndexOptions::default(), true, None).unwrap();

        let status = index_status(&db_path, other.path()).unwrap();
        assert!(status.exists);
        assert!(!status.indexed);
    }
}
