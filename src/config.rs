use std::collections::HashSet;

/// Canonical list of accepted basenames/extensions (lowercase, extensions keep
/// their leading dot). Both the indexer's walk filter and the searcher's
/// `exts_filter` use this single list so they never diverge.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".c", ".h", ".cpp", ".cc", ".hpp", ".py", ".go", ".rs", ".java", ".js", ".ts", ".tsx", ".jsx",
    ".sh", ".zsh", ".bash", ".md", ".txt", ".rst", ".toml", ".yaml", ".yml", ".json", ".ini",
    ".cfg", ".conf", ".mk", ".make", "makefile",
];

/// Default path for the persisted index, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = "bm25.sqlite";

pub const DEFAULT_K1: f64 = 1.2;
pub const DEFAULT_B: f64 = 0.75;
pub const DEFAULT_PATH_BOOST: f64 = 1.5;
pub const DEFAULT_K: usize = 10;

/// Build the default extension set as owned, lowercase strings.
pub fn default_extensions() -> HashSet<String> {
    DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

/// `max(1, cpu_count - 1)`, the default worker-pool size for indexing.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
        .saturating_sub(1)
        .max(1)
}

/// Options recognized by [`crate::indexer::index`].
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Accepted basenames/extensions, lowercase (extensions keep their leading dot).
    pub exts: HashSet<String>,
    pub stem: bool,
    pub stopwords: bool,
    pub workers: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            exts: default_extensions(),
            stem: false,
            stopwords: true,
            workers: default_workers(),
        }
    }
}

/// Options recognized by [`crate::searcher::search`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub k: usize,
    pub k1: f64,
    pub b: f64,
    pub stem: bool,
    pub stopwords: bool,
    pub path_boost: f64,
    pub path_filter: Option<String>,
    pub exts_filter: Option<HashSet<String>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            k1: DEFAULT_K1,
            b: DEFAULT_B,
            stem: false,
            stopwords: true,
            path_boost: DEFAULT_PATH_BOOST,
            path_filter: None,
            exts_filter: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_workers_is_at_least_one() {
        assert!(default_workers() >= 1);
    }

    #[test]
    fn default_extensions_contains_makefile_basename() {
        let exts = default_extensions();
        assert!(exts.contains("makefile"));
        assert!(exts.contains(".rs"));
    }
}
