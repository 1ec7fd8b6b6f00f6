//! Code analyser trait and capability registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::AnalysisError;
use crate::model::AnalysisResult;

pub mod csharp;

/// Trait that every language analyser implements.
pub trait CodeAnalyser: Send + Sync {
    /// File extensions this analyser handles, without the dot (e.g. &["cs"]).
    fn extensions(&self) -> &[&str];

    /// Human-readable language name (e.g. "C#").
    fn language_name(&self) -> &str;

    /// File-type tag stamped on every result (e.g. "csharp").
    fn file_type(&self) -> &str;

    /// Analyse in-memory source as if it were read from `path`.
    fn analyze_source(&self, source: &str, path: &Path) -> Result<AnalysisResult, AnalysisError>;

    /// Case-insensitive extension match.
    fn can_analyze(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions().iter().any(|x| *x == ext))
    }

    /// Read and analyse one file. Read and parse failures are logged and returned.
    fn analyze(&self, path: &Path) -> Result<AnalysisResult, AnalysisError> {
        let source = std::fs::read_to_string(path).map_err(|source| {
            log::error!("Error reading {}: {source}", path.display());
            AnalysisError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        self.analyze_source(&source, path).inspect_err(|e| {
            log::error!("Error analysing {}: {e}", path.display());
        })
    }

    /// Analyse every path in parallel. Result `i` belongs to `paths[i]`;
    /// the first failure is returned.
    fn analyze_batch(&self, paths: &[PathBuf]) -> Result<Vec<AnalysisResult>, AnalysisError> {
        paths.par_iter().map(|p| self.analyze(p)).collect()
    }
}

/// Registry of analysers, queried first-match by path.
pub struct AnalyserRegistry {
    analysers: Vec<Box<dyn CodeAnalyser>>,
    extension_map: HashMap<String, usize>,
}

impl AnalyserRegistry {
    /// Build the registry with every built-in analyser.
    pub fn new() -> Self {
        Self::with_analysers(vec![Box::new(csharp::CSharpAnalyser::new())])
    }

    pub fn with_analysers(analysers: Vec<Box<dyn CodeAnalyser>>) -> Self {
        let mut extension_map = HashMap::new();
        for (i, analyser) in analysers.iter().enumerate() {
            for ext in analyser.extensions() {
                extension_map.entry(ext.to_lowercase()).or_insert(i);
            }
        }
        Self {
            analysers,
            extension_map,
        }
    }

    /// The first analyser that claims `path`, if any.
    pub fn for_path(&self, path: &Path) -> Option<&dyn CodeAnalyser> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        self.extension_map
            .get(&ext)
            .map(|&i| self.analysers[i].as_ref())
            .or_else(|| {
                self.analysers
                    .iter()
                    .find(|a| a.can_analyze(path))
                    .map(|a| a.as_ref())
            })
    }

    /// Get all registered extensions.
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.extension_map.keys().map(|s| s.as_str()).collect();
        exts.sort_unstable();
        exts
    }
}

impl Default for AnalyserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
