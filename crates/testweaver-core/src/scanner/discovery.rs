//! Source file discovery with glob-style exclusion.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use regex::{Regex, RegexBuilder};
use walkdir::{DirEntry, WalkDir};

use crate::cancel::CancellationToken;
use crate::error::ScanError;

/// Directory names never descended into.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    ".vs",
    ".vscode",
    ".idea",
    "bin",
    "obj",
    "node_modules",
    "packages",
    "TestResults",
];

/// File type key to the extensions it covers.
fn type_extensions(file_type: &str) -> &'static [&'static str] {
    match file_type {
        "csharp" => &[".cs"],
        "typescript" => &[".ts", ".tsx"],
        "javascript" => &[".js", ".jsx"],
        "html" => &[".html", ".cshtml", ".razor"],
        "css" => &[".css", ".less", ".scss", ".sass"],
        _ => &[],
    }
}

/// Resolve file type keys (`csharp`) and literal extensions (`.cs`) to a
/// lowercase extension set. Defaults to `.cs`.
pub fn file_extensions(file_types: &[String]) -> BTreeSet<String> {
    let mut extensions = BTreeSet::new();
    for file_type in file_types {
        let lower = file_type.to_lowercase();
        if lower.starts_with('.') {
            extensions.insert(lower);
        } else {
            extensions.extend(type_extensions(&lower).iter().map(|e| e.to_string()));
        }
    }
    if extensions.is_empty() {
        extensions.insert(".cs".to_string());
    }
    extensions
}

/// Compile a glob to an anchored, case-insensitive regex over `/`-separated
/// relative paths. `**` spans directories, `*` and `?` stay within one segment.
/// A pattern without `/` matches the last path segment only.
pub fn glob_to_regex(glob: &str) -> Option<Regex> {
    let glob = glob.replace('\\', "/");
    let mut pattern = String::from("^");
    if !glob.contains('/') {
        pattern.push_str("(?:.*/)?");
    }
    let chars: Vec<char> = glob.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    pattern.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    pattern.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => pattern.push_str("[^/]*"),
            '?' => pattern.push_str("[^/]"),
            c => pattern.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    pattern.push('$');

    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .inspect_err(|e| warn!("Ignoring invalid exclude pattern '{glob}': {e}"))
        .ok()
}

/// Compiled exclusion set.
pub struct ExcludeSet {
    patterns: Vec<Regex>,
}

impl ExcludeSet {
    pub fn new(globs: &[String]) -> Self {
        Self {
            patterns: globs.iter().filter_map(|g| glob_to_regex(g)).collect(),
        }
    }

    /// `rel_path` is `/`-separated and relative to the scan root.
    pub fn is_excluded(&self, rel_path: &str, is_dir: bool) -> bool {
        let candidate = if is_dir {
            format!("{rel_path}/")
        } else {
            rel_path.to_string()
        };
        self.patterns
            .iter()
            .any(|re| re.is_match(&candidate) || (is_dir && re.is_match(rel_path)))
    }
}

/// Root-relative path with `/` separators.
pub fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Whether a directory entry below the root is a build, cache or hidden directory.
pub(crate) fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || DEFAULT_EXCLUDES.iter().any(|d| d.eq_ignore_ascii_case(&name))
}

/// Name-sorted walk of `root` that prunes [`DEFAULT_EXCLUDES`] and hidden directories.
pub(crate) fn walk(root: &Path) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                warn!("Skipping unreadable entry: {err}");
                None
            }
        })
}

/// Find source files under `root` whose extension belongs to `file_types`,
/// in depth-first, name-sorted order.
pub fn discover_files(
    root: &Path,
    file_types: &[String],
    exclude_patterns: &[String],
    cancel: &CancellationToken,
) -> Result<Vec<PathBuf>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }
    let extensions = file_extensions(file_types);
    let excludes = ExcludeSet::new(exclude_patterns);
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if is_skipped_dir(e) {
                return false;
            }
            !(e.depth() > 0
                && e.file_type().is_dir()
                && excludes.is_excluded(&relative_path(root, e.path()), true))
        });

    for entry in walker {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!("Skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let ext = entry
            .path()
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        if !extensions.contains(&ext) {
            continue;
        }
        let rel = relative_path(root, entry.path());
        if excludes.is_excluded(&rel, false) {
            debug!("Excluded {rel}");
            continue;
        }
        files.push(entry.into_path());
    }

    info!("Discovered {} files matching criteria", files.len());
    Ok(files)
}
