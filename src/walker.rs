//! Candidate file discovery: walks a root directory, skipping known
//! build/VCS directories and dotfiles, and keeps only files whose basename
//! or extension is in the accepted set and that look like text.

use ignore::WalkBuilder;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Directories never descended into, regardless of the accepted extension
/// set.
const SKIP_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".venv",
    "venv",
    "__pycache__",
    "node_modules",
    "dist",
    "build",
    "target",
    ".idea",
    ".vscode",
];

fn is_skipped_dir(name: &str) -> bool {
    SKIP_DIRS.contains(&name) || name.starts_with('.')
}

/// Returns true if `path`'s basename or extension (lowercased) is a member
/// of `exts`.
fn is_accepted(path: &Path, exts: &HashSet<String>) -> bool {
    let file_name = match path.file_name() {
        Some(n) => n.to_string_lossy().to_lowercase(),
        None => return false,
    };
    if exts.contains(file_name.as_str()) {
        return true;
    }
    match path.extension() {
        Some(ext) => {
            let with_dot = format!(".{}", ext.to_string_lossy().to_lowercase());
            exts.contains(with_dot.as_str())
        }
        None => false,
    }
}

/// Heuristic binary-file check: looks for a NUL byte in the first 8KiB.
pub fn is_probably_text_file(path: &Path) -> bool {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };
    let mut buf = [0u8; 8192];
    let n = match file.read(&mut buf) {
        Ok(n) => n,
        Err(_) => return false,
    };
    !buf[..n].contains(&0u8)
}

/// Returns true if `path` should be indexed: accepted name/extension and not
/// apparently binary.
pub fn should_index_file(path: &Path, exts: &HashSet<String>) -> bool {
    is_accepted(path, exts) && is_probably_text_file(path)
}

/// Walks `root`, pruning [`SKIP_DIRS`] and dot-prefixed directories, and
/// returns every regular file whose name/extension is accepted and that
/// passes the binary heuristic.
pub fn iter_files(root: &Path, exts: &HashSet<String>) -> Vec<PathBuf> {
    WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .filter_entry(|entry| {
            if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                let name = entry.file_name().to_string_lossy().to_lowercase();
                return !is_skipped_dir(&name);
            }
            true
        })
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| should_index_file(path, exts))
        .collect()
}
