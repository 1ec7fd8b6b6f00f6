//! Generator configuration document: defaults, JSON load/save and validation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::ProjectStructure;
use crate::output::unsupported_report_formats;

/// File name `init` writes and `generate` looks for in the project root.
pub const CONFIG_FILE_NAME: &str = "testweaver.config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorConfig {
    pub project: ProjectConfig,
    pub analysis: AnalysisSettings,
    pub generation: GenerationSettings,
    pub file_types: BTreeMap<String, FileTypeConfig>,
    /// Language to template name to template body; overrides the embedded templates.
    pub templates: BTreeMap<String, BTreeMap<String, String>>,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
    pub performance: PerformanceSettings,
    pub validation: ValidationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectConfig {
    pub name: String,
    pub root_path: String,
    pub output_path: String,
    pub test_frameworks: BTreeMap<String, String>,
    pub source_directories: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            root_path: "./".to_string(),
            output_path: "./GeneratedTests".to_string(),
            test_frameworks: BTreeMap::from([("csharp".to_string(), "xunit".to_string())]),
            source_directories: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisSettings {
    pub include_private_methods: bool,
    pub include_internal_methods: bool,
    pub generate_mocks: bool,
    pub analyze_dependencies: bool,
    pub max_depth: u32,
    pub exclude_patterns: Vec<String>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            include_private_methods: false,
            include_internal_methods: true,
            generate_mocks: true,
            analyze_dependencies: true,
            max_depth: 3,
            exclude_patterns: vec![
                "*.designer.cs".to_string(),
                "*.generated.cs".to_string(),
                "**/bin/**".to_string(),
                "**/obj/**".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationSettings {
    pub test_naming_convention: String,
    pub include_arrange_act_assert: bool,
    pub generate_test_data: bool,
    pub generate_negative_tests: bool,
    pub include_documentation: bool,
    pub test_method_prefix: String,
    pub mock_framework: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            test_naming_convention: "MethodName_Scenario_ExpectedResult".to_string(),
            include_arrange_act_assert: true,
            generate_test_data: true,
            generate_negative_tests: true,
            include_documentation: true,
            test_method_prefix: String::new(),
            mock_framework: "Moq".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FileTypeConfig {
    pub enabled: bool,
    pub extensions: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub test_settings: BTreeMap<String, serde_json::Value>,
}

impl Default for FileTypeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extensions: Vec::new(),
            exclude_patterns: Vec::new(),
            test_settings: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputSettings {
    pub overwrite_existing: bool,
    pub create_backups: bool,
    pub generate_reports: bool,
    pub report_formats: Vec<String>,
    pub group_tests_by_type: bool,
    /// Supports `{SourceFileName}` and `{Extension}` placeholders.
    pub test_file_naming: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            overwrite_existing: false,
            create_backups: true,
            generate_reports: true,
            report_formats: vec!["json".to_string()],
            group_tests_by_type: true,
            test_file_naming: "{SourceFileName}Tests.{Extension}".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// One of Trace, Debug, Information, Warning, Error, None.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "Warning".to_string(),
        }
    }
}

impl LoggingSettings {
    pub fn level_filter(&self) -> LevelFilter {
        match self.level.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "information" | "info" => LevelFilter::Info,
            "error" | "critical" => LevelFilter::Error,
            "none" | "off" => LevelFilter::Off,
            _ => LevelFilter::Warn,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceSettings {
    pub max_concurrency: i32,
    pub enable_caching: bool,
    pub cache_directory: String,
    pub timeout_seconds: i32,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            enable_caching: true,
            cache_directory: "./.testweaver-cache".to_string(),
            timeout_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationSettings {
    pub run_basic_validation: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            run_basic_validation: true,
        }
    }
}

/// Blocking errors and advisory warnings from [`GeneratorConfig::validate`].
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

fn default_file_types() -> BTreeMap<String, FileTypeConfig> {
    BTreeMap::from([(
        "csharp".to_string(),
        FileTypeConfig {
            enabled: true,
            extensions: vec![".cs".to_string()],
            exclude_patterns: vec![
                "**/bin/**".to_string(),
                "**/obj/**".to_string(),
                "**/*Tests.cs".to_string(),
                "**/*Test.cs".to_string(),
            ],
            test_settings: BTreeMap::new(),
        },
    )])
}

impl GeneratorConfig {
    /// Read a configuration document from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write the configuration as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(io_err)
    }

    /// Build the configuration `init` writes for a scanned project.
    pub fn default_for_project(root: &Path, structure: &ProjectStructure) -> Self {
        let concurrency = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let name = if structure.project_name.is_empty() {
            root.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        } else {
            structure.project_name.clone()
        };

        Self {
            project: ProjectConfig {
                name,
                root_path: root.to_string_lossy().to_string(),
                source_directories: vec![".".to_string()],
                test_frameworks: BTreeMap::from([(
                    "csharp".to_string(),
                    detect_test_framework(structure).to_string(),
                )]),
                ..Default::default()
            },
            generation: GenerationSettings {
                mock_framework: detect_mock_framework(structure).to_string(),
                ..Default::default()
            },
            file_types: default_file_types(),
            performance: PerformanceSettings {
                max_concurrency: i32::try_from(concurrency).unwrap_or(4),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        if self.project.name.trim().is_empty() {
            report.errors.push("Project name is required".to_string());
        }
        if self.project.root_path.is_empty() || !Path::new(&self.project.root_path).is_dir() {
            report.errors.push("Project root path must exist".to_string());
        }
        if self.project.output_path.trim().is_empty() {
            report.errors.push("Output path is required".to_string());
        }
        if !self.file_types.values().any(|ft| ft.enabled) {
            report
                .warnings
                .push("No file types are enabled for analysis".to_string());
        }
        for format in unsupported_report_formats(&self.output.report_formats) {
            report
                .warnings
                .push(format!("Report format '{format}' is not supported and will be skipped"));
        }
        if self.performance.max_concurrency <= 0 {
            report
                .errors
                .push("MaxConcurrency must be greater than 0".to_string());
        }
        if self.performance.timeout_seconds <= 0 {
            report
                .errors
                .push("TimeoutSeconds must be greater than 0".to_string());
        }

        report
    }

    /// Extensions of every enabled file type, e.g. `.cs`. Falls back to `.cs`.
    pub fn enabled_extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self
            .file_types
            .values()
            .filter(|ft| ft.enabled)
            .flat_map(|ft| ft.extensions.iter().cloned())
            .collect();
        if exts.is_empty() {
            exts.push(".cs".to_string());
        }
        exts.sort();
        exts.dedup();
        exts
    }

    /// Global exclude globs plus those of every enabled file type.
    pub fn exclude_patterns(&self) -> Vec<String> {
        self.analysis
            .exclude_patterns
            .iter()
            .cloned()
            .chain(
                self.file_types
                    .values()
                    .filter(|ft| ft.enabled)
                    .flat_map(|ft| ft.exclude_patterns.iter().cloned()),
            )
            .collect()
    }

    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(&self.project.root_path)
    }

    /// Output directory; relative paths resolve against the project root.
    pub fn output_path(&self) -> PathBuf {
        let out = Path::new(&self.project.output_path);
        if out.is_absolute() {
            out.to_path_buf()
        } else {
            self.root_path().join(out)
        }
    }
}

fn detect_test_framework(structure: &ProjectStructure) -> &'static str {
    let kinds: Vec<&str> = structure
        .nuget
        .test_frameworks
        .iter()
        .map(|f| f.kind.as_str())
        .collect();
    if kinds.contains(&"nunit") && !kinds.contains(&"xunit") {
        "nunit"
    } else if kinds.contains(&"mstest") && !kinds.contains(&"xunit") {
        "mstest"
    } else {
        "xunit"
    }
}

fn detect_mock_framework(structure: &ProjectStructure) -> &'static str {
    let kinds: Vec<&str> = structure
        .nuget
        .mocking_frameworks
        .iter()
        .map(|f| f.kind.as_str())
        .collect();
    if kinds.contains(&"moq") {
        "Moq"
    } else if kinds.contains(&"nsubstitute") {
        "NSubstitute"
    } else if kinds.contains(&"fakeiteasy") {
        "FakeItEasy"
    } else {
        "Moq"
    }
}
