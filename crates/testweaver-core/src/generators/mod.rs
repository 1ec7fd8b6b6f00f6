//! Test generator trait and capability registry.

use std::path::Path;
use std::sync::Arc;

use crate::cancel::CancellationToken;
use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::model::{AnalysisResult, GeneratedTestFile, TestCase};
use crate::templates::TemplateRegistry;

pub mod csharp;
pub mod files;
pub mod framework;
pub mod values;

pub use csharp::CSharpTestGenerator;
pub use framework::TestFramework;

/// Trait that every language test generator implements.
pub trait TestGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this generator accepts the analysed file.
    fn can_generate(&self, result: &AnalysisResult) -> bool;

    /// Derive test cases for every eligible class in `result`.
    fn generate_tests(&self, result: &AnalysisResult) -> Vec<TestCase>;

    /// Render `cases` into the content of one test file for `result`.
    fn render(&self, result: &AnalysisResult, cases: &[TestCase]) -> Result<String, GenerationError>;

    /// Generate, render and write one test file per result into `output_dir`.
    ///
    /// The directory is purged before the first write of a call. Per-file
    /// failures are logged and skipped.
    fn generate_test_files(
        &self,
        results: &[AnalysisResult],
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<GeneratedTestFile>, GenerationError>;
}

/// Registry of generators, queried first-match per analysis result.
pub struct GeneratorRegistry {
    generators: Vec<Box<dyn TestGenerator>>,
}

impl GeneratorRegistry {
    /// Build the registry with every built-in generator.
    pub fn new(config: &GeneratorConfig, templates: Arc<TemplateRegistry>) -> Self {
        Self::with_generators(vec![Box::new(CSharpTestGenerator::new(config, templates))])
    }

    pub fn with_generators(generators: Vec<Box<dyn TestGenerator>>) -> Self {
        Self { generators }
    }

    /// Index of the first generator that claims `result`.
    pub fn position(&self, result: &AnalysisResult) -> Option<usize> {
        self.generators.iter().position(|g| g.can_generate(result))
    }

    pub fn for_result(&self, result: &AnalysisResult) -> Option<&dyn TestGenerator> {
        self.position(result).map(|i| self.generators[i].as_ref())
    }

    pub fn get(&self, index: usize) -> Option<&dyn TestGenerator> {
        self.generators.get(index).map(|g| g.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.generators.iter().map(|g| g.name()).collect()
    }
}
