use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use regex::Regex;

use crate::error::BlogError;

/// Discovers content files under one or more glob-like patterns and returns a
/// snapshot of path -> modification time. A match that turns out to be a
/// directory is re-scanned as `match/*`, so nested directories are walked to
/// unbounded depth. Read-only; any stat or directory-listing failure aborts
/// the whole scan.
pub struct ContentScanner {
    patterns: Vec<String>,
}

impl ContentScanner {
    pub fn new(patterns: Vec<String>) -> ContentScanner {
        ContentScanner { patterns }
    }

    pub fn scan(&self) -> Result<BTreeMap<PathBuf, SystemTime>, BlogError> {
        let mut snapshot = BTreeMap::new();
        for pattern in &self.patterns {
            scan_pattern(pattern, &mut snapshot)?;
        }
        Ok(snapshot)
    }
}

fn scan_pattern(pattern: &str, snapshot: &mut BTreeMap<PathBuf, SystemTime>) -> Result<(), BlogError> {
    for path in glob_matches(pattern)? {
        let meta = fs::metadata(&path).map_err(BlogError::scan)?;
        if meta.is_dir() {
            let sub_pattern = format!("{}/*", path.display());
            scan_pattern(&sub_pattern, snapshot)?;
        } else {
            let mtime = meta.modified().map_err(BlogError::scan)?;
            snapshot.insert(path, mtime);
        }
    }
    Ok(())
}

/// Expands one pattern into existing paths. `*` matches within a single path
/// component and does not match hidden entries. A literal component that does
/// not exist simply yields no matches.
fn glob_matches(pattern: &str) -> Result<Vec<PathBuf>, BlogError> {
    let mut candidates: Vec<PathBuf> = vec![PathBuf::new()];

    for component in Path::new(pattern).components() {
        match component {
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                if name.contains('*') {
                    let matcher = component_regex(&name);
                    let mut expanded = vec![];
                    for dir in &candidates {
                        let dir = if dir.as_os_str().is_empty() {
                            Path::new(".")
                        } else {
                            dir.as_path()
                        };
                        if !dir.is_dir() {
                            continue;
                        }
                        let entries = fs::read_dir(dir).map_err(BlogError::scan)?;
                        for entry in entries {
                            let entry = entry.map_err(BlogError::scan)?;
                            let entry_name = entry.file_name().to_string_lossy().to_string();
                            if entry_name.starts_with('.') {
                                continue;
                            }
                            if matcher.is_match(&entry_name) {
                                expanded.push(entry.path());
                            }
                        }
                    }
                    expanded.sort();
                    candidates = expanded;
                } else {
                    candidates = candidates
                        .into_iter()
                        .map(|p| p.join(&*name))
                        .filter(|p| p.exists())
                        .collect();
                }
            }
            other => {
                candidates = candidates
                    .into_iter()
                    .map(|p| p.join(other.as_os_str()))
                    .collect();
            }
        }
        if candidates.is_empty() {
            break;
        }
    }

    Ok(candidates)
}

fn component_regex(component: &str) -> Regex {
    let mut source = String::from("^");
    for (i, chunk) in component.split('*').enumerate() {
        if i > 0 {
            source.push_str("[^/]*");
        }
        source.push_str(&regex::escape(chunk));
    }
    source.push('$');
    Regex::new(&source).unwrap()
}
