//! Six-phase generation engine with timing, progress reporting and cancellation.

use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};
use rayon::prelude::*;

use crate::cancel::CancellationToken;
use crate::config::GeneratorConfig;
use crate::error::{AnalysisError, GenerationError};
use crate::generators::{files, GeneratorRegistry};
use crate::heuristics;
use crate::languages::AnalyserRegistry;
use crate::model::{
    AccessModifier, AnalysisResult, ExistingTestInfo, GeneratedTestFile, GenerationResult,
    ProjectStructure, TestType,
};
use crate::scanner::{
    analyze_existing_tests_excluding, analyze_project_structure, discover_files,
};
use crate::templates::TemplateRegistry;

/// Phase labels for progress reporting.
const PHASE_LABELS: &[(&str, &str)] = &[
    ("structure", "Analyzing project structure"),
    ("existing_tests", "Analyzing existing tests"),
    ("discovery", "Discovering source files"),
    ("analysis", "Analyzing source files"),
    ("generation", "Generating tests"),
    ("validation", "Validating generated tests"),
];

/// Progress callback type: (phase_name, label).
pub type ProgressCallback = Box<dyn FnMut(&str, &str)>;

/// Inputs of one generation run.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub project_path: PathBuf,
    /// Overrides the configured output directory.
    pub output_path: Option<PathBuf>,
    /// Explicit source files; empty means discover under `project_path`.
    pub files: Vec<PathBuf>,
    /// File types or `.ext` literals; empty means the configured file types.
    pub file_types: Vec<String>,
    pub ignore_existing_tests: bool,
    pub skip_validation: bool,
}

impl GenerationRequest {
    pub fn for_project(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
            ..Default::default()
        }
    }
}

/// Shallow checks on rendered content. Returns one message per problem.
pub fn validate_test_file(file: &GeneratedTestFile) -> Vec<String> {
    let name = file.file_path.display();
    if file.content.trim().is_empty() {
        return vec![format!("Generated test file is empty: {name}")];
    }
    let mut problems = Vec::new();
    if !file.content.contains("namespace") {
        problems.push(format!("Generated test file has no namespace: {name}"));
    }
    if !file.content.contains("class") {
        problems.push(format!("Generated test file has no class: {name}"));
    }
    problems
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Public methods of testable classes, the denominator of the coverage estimate.
fn testable_method_count(results: &[AnalysisResult]) -> usize {
    results
        .iter()
        .flat_map(|r| &r.classes)
        .filter(|c| !c.is_interface && !heuristics::is_test_class(&c.name, &c.attributes))
        .flat_map(|c| &c.methods)
        .filter(|m| m.access_modifier == AccessModifier::Public && !m.is_abstract)
        .count()
}

/// Reports and times each phase into the result statistics.
struct PhaseClock {
    progress: Option<ProgressCallback>,
    current: Option<(&'static str, Instant)>,
}

impl PhaseClock {
    fn start(&mut self, name: &'static str, result: &mut GenerationResult) {
        self.finish(result);
        if let Some(ref mut cb) = self.progress {
            let label = PHASE_LABELS
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, l)| *l)
                .unwrap_or(name);
            cb(name, label);
        }
        debug!("Phase started: {name}");
        self.current = Some((name, Instant::now()));
    }

    fn finish(&mut self, result: &mut GenerationResult) {
        if let Some((name, start)) = self.current.take() {
            result
                .statistics
                .phase_timings
                .insert(name.to_string(), start.elapsed().as_secs_f64());
        }
    }
}

pub struct TestGeneratorEngine {
    config: GeneratorConfig,
    analysers: AnalyserRegistry,
    generators: GeneratorRegistry,
    templates: Arc<TemplateRegistry>,
}

impl TestGeneratorEngine {
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_templates(config, TemplateRegistry::new())
    }

    /// Build an engine over `templates`, adding the configured template
    /// overrides as `{language}/{name}`.
    pub fn with_templates(config: GeneratorConfig, mut templates: TemplateRegistry) -> Self {
        for (language, named) in &config.templates {
            for (name, content) in named {
                let key = format!("{language}/{name}");
                if let Err(e) = templates.register(&key, content) {
                    warn!("Ignoring custom template {key}: {e}");
                }
            }
        }
        let templates = Arc::new(templates);
        let generators = GeneratorRegistry::new(&config, Arc::clone(&templates));
        Self {
            config,
            analysers: AnalyserRegistry::new(),
            generators,
            templates,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Execute the six phases. Never fails: errors and panics inside the run
    /// yield `success == false` with the statistics gathered so far.
    pub fn run(
        &self,
        request: &GenerationRequest,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> GenerationResult {
        let start = Instant::now();
        let mut result = GenerationResult::default();
        let mut clock = PhaseClock {
            progress,
            current: None,
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_phases(request, &mut clock, cancel, &mut result)
        }));
        clock.finish(&mut result);

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };
        match failure {
            None => result.success = true,
            Some(message) => {
                error!("Test generation failed: {message}");
                result.success = false;
                result.errors.push(format!("Test generation failed: {message}"));
            }
        }

        result.statistics.warnings_count = result.warnings.len();
        result.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            "Test generation finished in {:.0} ms: {} files, {} test cases",
            result.duration_ms,
            result.generated_files.len(),
            result.test_cases.len()
        );
        result
    }

    /// Run the engine for a single source file inside its project.
    pub fn generate_for_file(
        &self,
        path: &Path,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> GenerationResult {
        let project_path = files::find_project_root(path)
            .or_else(|| path.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        let request = GenerationRequest {
            project_path,
            files: vec![path.to_path_buf()],
            ..Default::default()
        };
        self.run(&request, progress, cancel)
    }

    /// Render the tests one source file would receive without writing
    /// anything. `None` when the file yields no test cases.
    pub fn preview_file(&self, path: &Path) -> Result<Option<String>, GenerationError> {
        let analyser = self
            .analysers
            .for_path(path)
            .ok_or_else(|| AnalysisError::Unsupported(path.to_path_buf()))?;
        let mut result = analyser.analyze(path)?;

        if let Some(root) = files::find_project_root(path) {
            match analyze_project_structure(&root) {
                Ok(structure) => result.project_structure = Some(Arc::new(structure)),
                Err(e) => debug!("No project structure for preview: {e}"),
            }
            let output_dir = self.config.output_path();
            let generated = [output_dir.clone(), files::backup_path(&output_dir)];
            match analyze_existing_tests_excluding(&root, &generated) {
                Ok(existing) => result.existing_tests = Some(Arc::new(existing)),
                Err(e) => debug!("No existing tests for preview: {e}"),
            }
        }

        let Some(generator) = self.generators.for_result(&result) else {
            return Ok(None);
        };
        let cases = generator.generate_tests(&result);
        if cases.is_empty() {
            return Ok(None);
        }
        generator.render(&result, &cases).map(Some)
    }

    /// Output directory of a request; relative overrides resolve against the project.
    pub fn output_dir(&self, request: &GenerationRequest) -> PathBuf {
        match &request.output_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => request.project_path.join(path),
            None => self.config.output_path(),
        }
    }

    fn run_phases(
        &self,
        request: &GenerationRequest,
        clock: &mut PhaseClock,
        cancel: &CancellationToken,
        result: &mut GenerationResult,
    ) -> Result<(), GenerationError> {
        let root = &request.project_path;
        let output_dir = self.output_dir(request);
        info!("Starting test generation for {}", root.display());

        clock.start("structure", result);
        let structure: Arc<ProjectStructure> = Arc::new(analyze_project_structure(root)?);
        info!(
            "Project structure: {} ({} packages, {} test folders)",
            structure.project_name,
            structure.package_references.len(),
            structure.test_folders.len()
        );
        check_cancel(cancel)?;

        let existing: Option<Arc<ExistingTestInfo>> = if request.ignore_existing_tests {
            None
        } else {
            clock.start("existing_tests", result);
            let generated = [output_dir.clone(), files::backup_path(&output_dir)];
            let info = analyze_existing_tests_excluding(root, &generated)?;
            result.statistics.existing_test_files = info.test_files.len();
            result.statistics.existing_test_methods =
                info.test_classes.iter().map(|c| c.test_methods.len()).sum();
            check_cancel(cancel)?;
            Some(Arc::new(info))
        };

        clock.start("discovery", result);
        let paths = self.discover(request, &output_dir, cancel, result)?;
        info!("Discovered {} source files", paths.len());
        check_cancel(cancel)?;

        clock.start("analysis", result);
        let mut analyses = self.analyze(&paths, cancel, result);
        check_cancel(cancel)?;
        for analysis in &mut analyses {
            analysis.project_structure = Some(Arc::clone(&structure));
            analysis.existing_tests = existing.clone();
        }
        result.statistics.files_analyzed = analyses.len();
        result.statistics.dependencies_detected =
            analyses.iter().map(|a| a.dependencies.len()).sum();
        for analysis in &analyses {
            *result
                .statistics
                .file_type_breakdown
                .entry(analysis.file_type.clone())
                .or_insert(0) += 1;
        }

        clock.start("generation", result);
        self.generate(&analyses, &output_dir, cancel, result)?;

        if !request.skip_validation && self.config.validation.run_basic_validation {
            clock.start("validation", result);
            for file in &result.generated_files {
                result.warnings.extend(validate_test_file(file));
            }
        }
        clock.finish(result);
        Ok(())
    }

    fn discover(
        &self,
        request: &GenerationRequest,
        output_dir: &Path,
        cancel: &CancellationToken,
        result: &mut GenerationResult,
    ) -> Result<Vec<PathBuf>, GenerationError> {
        if !request.files.is_empty() {
            let mut paths = Vec::new();
            for path in &request.files {
                if path.is_file() {
                    paths.push(path.clone());
                } else {
                    warn!("Source file not found: {}", path.display());
                    result.warnings.push(format!("Source file not found: {}", path.display()));
                    result.statistics.files_skipped += 1;
                }
            }
            return Ok(paths);
        }

        let file_types = if request.file_types.is_empty() {
            self.config.enabled_extensions()
        } else {
            request.file_types.clone()
        };
        let discovered = discover_files(
            &request.project_path,
            &file_types,
            &self.config.exclude_patterns(),
            cancel,
        )?;

        // Previously generated output and its backup are never sources.
        let out = canonical(output_dir);
        let backup = canonical(&files::backup_path(output_dir));
        Ok(discovered
            .into_iter()
            .filter(|p| {
                let p = canonical(p);
                !p.starts_with(&out) && !p.starts_with(&backup)
            })
            .collect())
    }

    /// Bounded parallel analysis. Files not yet started when `cancel` fires
    /// are dropped; failures become warnings.
    fn analyze(
        &self,
        paths: &[PathBuf],
        cancel: &CancellationToken,
        result: &mut GenerationResult,
    ) -> Vec<AnalysisResult> {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let configured = usize::try_from(self.config.performance.max_concurrency)
            .unwrap_or(1)
            .max(1);
        let threads = configured.min(available);

        let analyse_all = || -> Vec<Option<Result<AnalysisResult, AnalysisError>>> {
            paths
                .par_iter()
                .map(|path| {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    debug!("Analyzing {}", path.display());
                    Some(match self.analysers.for_path(path) {
                        Some(analyser) => analyser.analyze(path),
                        None => Err(AnalysisError::Unsupported(path.clone())),
                    })
                })
                .collect()
        };
        let outcomes = match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(analyse_all),
            Err(e) => {
                warn!("Falling back to the global thread pool: {e}");
                analyse_all()
            }
        };

        let mut analyses = Vec::with_capacity(paths.len());
        for (path, outcome) in paths.iter().zip(outcomes) {
            match outcome {
                Some(Ok(analysis)) => analyses.push(analysis),
                Some(Err(e)) => {
                    warn!("Skipping {}: {e}", path.display());
                    result
                        .warnings
                        .push(format!("Failed to analyze {}: {e}", path.display()));
                    result.statistics.files_skipped += 1;
                }
                None => result.statistics.files_skipped += 1,
            }
        }
        info!("Analyzed {} of {} files with {threads} threads", analyses.len(), paths.len());
        analyses
    }

    /// One `generate_test_files` call per generator, over the results it claims first.
    fn generate(
        &self,
        analyses: &[AnalysisResult],
        output_dir: &Path,
        cancel: &CancellationToken,
        result: &mut GenerationResult,
    ) -> Result<(), GenerationError> {
        let mut groups: Vec<(usize, Vec<AnalysisResult>)> = Vec::new();
        for analysis in analyses {
            let Some(index) = self.generators.position(analysis) else {
                debug!("No generator for {}", analysis.file_path.display());
                continue;
            };
            match groups.iter().position(|(i, _)| *i == index) {
                Some(g) => groups[g].1.push(analysis.clone()),
                None => groups.push((index, vec![analysis.clone()])),
            }
        }

        for (index, group) in groups {
            let Some(generator) = self.generators.get(index) else {
                continue;
            };
            info!("{}: {} files", generator.name(), group.len());
            let generated = generator.generate_test_files(&group, output_dir, cancel)?;
            result.generated_files.extend(generated);
        }

        let stats = &mut result.statistics;
        let mut classes = BTreeSet::new();
        let mut methods = BTreeSet::new();
        for file in &result.generated_files {
            if file.is_new_file {
                stats.test_files_created += 1;
            } else {
                stats.test_files_updated += 1;
            }
            *stats
                .framework_breakdown
                .entry(file.framework.clone())
                .or_insert(0) += 1;
            let mocks: BTreeSet<&String> =
                file.test_cases.iter().flat_map(|c| &c.mock_setup).collect();
            stats.mocks_generated += mocks.len();

            for case in &file.test_cases {
                classes.insert((file.source_file_path.clone(), case.target_class.clone()));
                if !matches!(case.test_type, TestType::Constructor | TestType::Property) {
                    methods.insert((
                        file.source_file_path.clone(),
                        case.target_class.clone(),
                        case.target_method.clone(),
                    ));
                }
                stats.assertions_generated += case.assertions.len();
            }
            result.test_cases.extend(file.test_cases.iter().cloned());
        }
        stats.test_cases_generated = result.test_cases.len();
        stats.test_methods_generated = result.test_cases.len();
        stats.classes_covered = classes.len();
        stats.methods_covered = methods.len();

        let testable = testable_method_count(analyses);
        stats.coverage_estimate = if testable == 0 {
            0.0
        } else {
            (methods.len() as f64 / testable as f64 * 100.0).min(100.0)
        };
        Ok(())
    }
}

fn check_cancel(cancel: &CancellationToken) -> Result<(), GenerationError> {
    if cancel.is_cancelled() {
        Err(GenerationError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn validation_findings() {
        let mut file = GeneratedTestFile {
            file_path: PathBuf::from("out/CalculatorTests.cs"),
            content: "namespace Shop.Tests { public class CalculatorTests { } }".into(),
            ..Default::default()
        };
        assert!(validate_test_file(&file).is_empty());

        file.content = "   ".into();
        assert_eq!(validate_test_file(&file).len(), 1);

        file.content = "// nothing useful".into();
        assert_eq!(validate_test_file(&file).len(), 2);
    }

    #[test]
    fn missing_project_fails_the_run() {
        let engine = TestGeneratorEngine::new(GeneratorConfig::default());
        let request = GenerationRequest::for_project("/no/such/project");
        let result = engine.run(&request, None, &CancellationToken::new());
        assert!(!result.success);
        assert!(result.errors[0].starts_with("Test generation failed: "));
        assert!(result.statistics.phase_timings.contains_key("structure"));
    }

    #[test]
    fn phases_are_reported_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Calculator.cs", "public class Calculator { public bool IsOn() { return true; } }");

        let phases = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = Arc::clone(&phases);
        let progress: ProgressCallback = Box::new(move |name, _label| {
            seen.lock().unwrap().push(name.to_string());
        });

        let engine = TestGeneratorEngine::new(GeneratorConfig::default());
        let mut request = GenerationRequest::for_project(dir.path());
        request.output_path = Some(dir.path().join("out"));
        let result = engine.run(&request, Some(progress), &CancellationToken::new());

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(
            *phases.lock().unwrap(),
            vec!["structure", "existing_tests", "discovery", "analysis", "generation", "validation"]
        );
        assert_eq!(result.statistics.phase_timings.len(), 6);
        assert_eq!(result.generated_files.len(), 1);
        assert_eq!(result.statistics.coverage_estimate, 100.0);
    }

    #[test]
    fn cancelled_token_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Calculator.cs", "public class Calculator { }");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let engine = TestGeneratorEngine::new(GeneratorConfig::default());
        let result = engine.run(&GenerationRequest::for_project(dir.path()), None, &cancel);
        assert!(!result.success);
        assert!(result.errors[0].contains("cancelled"));
    }

    #[test]
    fn custom_templates_override_embedded() {
        let mut config = GeneratorConfig::default();
        config.templates.insert(
            "csharp".into(),
            [("unit-test".to_string(), "// {{className}} namespace class".to_string())]
                .into_iter()
                .collect(),
        );
        let engine = TestGeneratorEngine::new(config);
        assert!(engine.templates().contains("csharp/unit-test"));

        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Widget.cs", "public class Widget { public void Spin() { } }");
        let preview = engine.preview_file(&dir.path().join("Widget.cs")).unwrap();
        assert_eq!(preview.as_deref(), Some("// Widget namespace class"));
    }

    #[test]
    fn preview_of_unsupported_file() {
        let engine = TestGeneratorEngine::new(GeneratorConfig::default());
        let err = engine.preview_file(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, GenerationError::Analysis(AnalysisError::Unsupported(_))));
    }
}
