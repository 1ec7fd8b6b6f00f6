//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

use testweaver_core::config::GeneratorConfig;
use testweaver_core::languages::csharp::CSharpAnalyser;
use testweaver_core::languages::CodeAnalyser;
use testweaver_core::model::AnalysisResult;
use testweaver_core::scanner::analyze_project_structure;

// ---------------------------------------------------------------------------
// Fixture path resolution
// ---------------------------------------------------------------------------

/// Resolve `tests/fixtures/{name}` relative to the workspace root.
pub fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .join("../../tests/fixtures")
        .join(name)
        .canonicalize()
        .unwrap_or_else(|_| {
            Path::new(manifest_dir)
                .join("../../tests/fixtures")
                .join(name)
        })
}

/// Copy a fixture project into a fresh temporary directory. Runs that write
/// output never touch the checked-in fixture.
pub fn copy_fixture(name: &str) -> TempDir {
    let source = fixture_path(name);
    let dir = tempfile::tempdir().unwrap();
    for entry in WalkDir::new(&source) {
        let entry = entry.unwrap();
        let rel = entry.path().strip_prefix(&source).unwrap();
        let target = dir.path().join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).unwrap();
        } else {
            std::fs::copy(entry.path(), &target).unwrap();
        }
    }
    dir
}

// ---------------------------------------------------------------------------
// Analysis helpers
// ---------------------------------------------------------------------------

/// Analyse one file of the `csharp_shop` fixture.
pub fn analyse_shop_file(rel: &str) -> AnalysisResult {
    CSharpAnalyser::new()
        .analyze(&fixture_path("csharp_shop").join(rel))
        .unwrap()
}

/// The configuration `init` would write for `root`.
pub fn project_config(root: &Path) -> GeneratorConfig {
    let structure = analyze_project_structure(root).unwrap();
    GeneratorConfig::default_for_project(root, &structure)
}

/// Paths of every file below `dir`, relative and `/`-separated, sorted.
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(dir)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}
