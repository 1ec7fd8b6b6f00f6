//! Source model: the normalised, language-agnostic description of analysed
//! code, project layout, existing tests and generated output.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// C# access level, including the two combined forms.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AccessModifier {
    #[default]
    Private,
    Protected,
    Internal,
    Public,
    ProtectedInternal,
    PrivateProtected,
}

impl AccessModifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Protected => "protected",
            Self::Internal => "internal",
            Self::Public => "public",
            Self::ProtectedInternal => "protected internal",
            Self::PrivateProtected => "private protected",
        }
    }
}

impl std::fmt::Display for AccessModifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guessed service lifetime of an injected dependency.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DependencyLifetime {
    Transient,
    Scoped,
    Singleton,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AttributeInfo {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub named_arguments: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParameterInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub is_optional: bool,
    pub default_value: Option<String>,
    #[serde(default)]
    pub is_params: bool,
    #[serde(default)]
    pub is_out: bool,
    #[serde(default)]
    pub is_ref: bool,
    #[serde(default)]
    pub attributes: Vec<AttributeInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MethodInfo {
    pub name: String,
    pub return_type: String,
    #[serde(default)]
    pub parameters: Vec<ParameterInfo>,
    #[serde(default)]
    pub attributes: Vec<AttributeInfo>,
    #[serde(default)]
    pub access_modifier: AccessModifier,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub is_override: bool,
    #[serde(default)]
    pub is_abstract: bool,
    pub documentation: Option<String>,
    /// Exception types constructed in `throw new X(..)` statements.
    #[serde(default)]
    pub thrown_exceptions: Vec<String>,
    pub cyclomatic_complexity: u32,
    pub line: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConstructorInfo {
    #[serde(default)]
    pub parameters: Vec<ParameterInfo>,
    #[serde(default)]
    pub access_modifier: AccessModifier,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub calls_base: bool,
    #[serde(default)]
    pub calls_this: bool,
    pub documentation: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PropertyInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(default)]
    pub access_modifier: AccessModifier,
    #[serde(default)]
    pub has_getter: bool,
    #[serde(default)]
    pub has_setter: bool,
    #[serde(default)]
    pub is_auto_property: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub attributes: Vec<AttributeInfo>,
    pub default_value: Option<String>,
}

/// A class or interface declaration with its direct members.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClassInfo {
    pub name: String,
    pub full_name: String,
    pub namespace: String,
    #[serde(default)]
    pub access_modifier: AccessModifier,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_sealed: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_interface: bool,
    #[serde(default)]
    pub is_controller: bool,
    #[serde(default)]
    pub is_service: bool,
    #[serde(default)]
    pub is_repository: bool,
    #[serde(default)]
    pub base_types: Vec<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeInfo>,
    #[serde(default)]
    pub methods: Vec<MethodInfo>,
    #[serde(default)]
    pub properties: Vec<PropertyInfo>,
    #[serde(default)]
    pub constructors: Vec<ConstructorInfo>,
    pub line: usize,
}

/// A constructor-injected collaborator that generated tests should mock.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DependencyInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub dependency_type: String,
    pub interface_type: Option<String>,
    #[serde(default)]
    pub is_injected: bool,
    #[serde(default)]
    pub lifetime: DependencyLifetime,
    #[serde(default)]
    pub requires_mock: bool,
    /// Name of the class whose constructor declares this dependency.
    pub owner: String,
}

/// Structural summary of one source file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub file_path: PathBuf,
    pub file_type: String,
    pub namespace: String,
    #[serde(default)]
    pub classes: Vec<ClassInfo>,
    #[serde(default)]
    pub methods: Vec<MethodInfo>,
    #[serde(default)]
    pub properties: Vec<PropertyInfo>,
    #[serde(default)]
    pub dependencies: Vec<DependencyInfo>,
    #[serde(default)]
    pub usings: Vec<String>,
    /// Read-only run context, attached by the engine after analysis.
    #[serde(skip)]
    pub project_structure: Option<Arc<ProjectStructure>>,
    #[serde(skip)]
    pub existing_tests: Option<Arc<ExistingTestInfo>>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl AnalysisResult {
    pub fn new(file_path: impl Into<PathBuf>, file_type: &str) -> Self {
        Self {
            file_path: file_path.into(),
            file_type: file_type.to_string(),
            ..Default::default()
        }
    }

    pub fn find_class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Look up a class or interface by simple or fully-qualified name.
    pub fn find_type(&self, type_name: &str) -> Option<&ClassInfo> {
        self.classes
            .iter()
            .find(|c| c.name == type_name || c.full_name == type_name)
    }

    /// Dependencies declared by `class_name` that need a mock.
    pub fn mockable_dependencies<'a>(
        &'a self,
        class_name: &'a str,
    ) -> impl Iterator<Item = &'a DependencyInfo> + 'a {
        self.dependencies
            .iter()
            .filter(move |d| d.requires_mock && d.owner == class_name)
    }
}

// ---------------------------------------------------------------------------
// Project structure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FolderType {
    Controllers,
    Services,
    Models,
    Repositories,
    ViewModels,
    Helpers,
    Extensions,
    Configuration,
    Data,
    Business,
    Web,
    Api,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TestingPattern {
    #[default]
    UnitTests,
    IntegrationTests,
    FunctionalTests,
    AcceptanceTests,
    PerformanceTests,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PackageType {
    TestFramework,
    MockingFramework,
    AssertionLibrary,
    TestingUtility,
    #[default]
    Other,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectReference {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub project_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PackageReference {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub package_type: PackageType,
    #[serde(default)]
    pub is_test_package: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SourceFolder {
    pub name: String,
    /// Path relative to the project root, `/`-separated.
    pub path: String,
    pub folder_type: FolderType,
    #[serde(default)]
    pub source_files: Vec<String>,
    #[serde(default)]
    pub sub_folders: Vec<SourceFolder>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TestFolder {
    pub name: String,
    pub path: String,
    pub pattern: TestingPattern,
    #[serde(default)]
    pub test_files: Vec<String>,
}

/// A detected test, mocking or assertion package with its known vocabulary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FrameworkInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
    /// Short lowercase identifier, e.g. `xunit`, `moq`.
    pub kind: String,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NuGetInfo {
    #[serde(default)]
    pub test_frameworks: Vec<FrameworkInfo>,
    #[serde(default)]
    pub mocking_frameworks: Vec<FrameworkInfo>,
    #[serde(default)]
    pub assertion_libraries: Vec<FrameworkInfo>,
    #[serde(default)]
    pub testing_utilities: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BuildInfo {
    pub configuration: String,
    pub platform: String,
    pub output_type: Option<String>,
    #[serde(default)]
    pub has_web_config: bool,
    #[serde(default)]
    pub has_app_config: bool,
    #[serde(default)]
    pub build_targets: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectStructure {
    pub root_path: PathBuf,
    pub project_name: String,
    pub project_type: String,
    pub target_framework: Option<String>,
    #[serde(default)]
    pub project_references: Vec<ProjectReference>,
    #[serde(default)]
    pub package_references: Vec<PackageReference>,
    #[serde(default)]
    pub project_properties: BTreeMap<String, String>,
    #[serde(default)]
    pub configuration_files: Vec<String>,
    #[serde(default)]
    pub source_folders: Vec<SourceFolder>,
    #[serde(default)]
    pub test_folders: Vec<TestFolder>,
    #[serde(default)]
    pub nuget: NuGetInfo,
    #[serde(default)]
    pub build: BuildInfo,
}

// ---------------------------------------------------------------------------
// Existing tests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TestClassInfo {
    pub name: String,
    pub tested_class: String,
    pub file_path: PathBuf,
    #[serde(default)]
    pub test_methods: Vec<String>,
    pub framework: Option<String>,
    #[serde(default)]
    pub mocked_dependencies: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExistingTestInfo {
    #[serde(default)]
    pub test_files: Vec<PathBuf>,
    #[serde(default)]
    pub test_classes: Vec<TestClassInfo>,
    pub test_framework: Option<String>,
    #[serde(default)]
    pub testing_libraries: Vec<String>,
    /// Tested class name to the names of its existing test methods.
    #[serde(default)]
    pub existing_test_methods: BTreeMap<String, Vec<String>>,
}

impl ExistingTestInfo {
    /// Whether any existing test for `class_name` already targets `method`.
    ///
    /// Matches either the bare method name or the `{method}_` naming prefix.
    pub fn has_test_for(&self, class_name: &str, method: &str) -> bool {
        let prefix = format!("{method}_");
        self.existing_test_methods
            .get(class_name)
            .is_some_and(|names| names.iter().any(|n| n == method || n.starts_with(&prefix)))
    }
}

// ---------------------------------------------------------------------------
// Generated output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TestType {
    #[default]
    Unit,
    Integration,
    Controller,
    Service,
    Repository,
    Model,
    Property,
    Constructor,
    Exception,
    AsyncMethod,
    StaticMethod,
    ExtensionMethod,
}

/// One synthesised test: name, target and the code fragments of its body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    pub test_name: String,
    pub target_method: String,
    pub target_class: String,
    pub scenario: String,
    pub expected_result: String,
    pub test_type: TestType,
    pub framework: String,
    #[serde(default)]
    pub arrange_code: Vec<String>,
    #[serde(default)]
    pub mock_setup: Vec<String>,
    /// Statements that exercise the target, between arrange and assert.
    #[serde(default)]
    pub act_code: Vec<String>,
    #[serde(default)]
    pub assertions: Vec<String>,
    #[serde(default)]
    pub mock_verifications: Vec<String>,
    #[serde(default)]
    pub test_data: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub is_async: bool,
    pub priority: u8,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GeneratedTestFile {
    pub file_path: PathBuf,
    pub source_file_path: PathBuf,
    pub content: String,
    pub framework: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub is_new_file: bool,
    #[serde(default)]
    pub requires_compilation: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStatistics {
    pub files_analyzed: usize,
    pub files_skipped: usize,
    pub test_cases_generated: usize,
    pub test_methods_generated: usize,
    pub test_files_created: usize,
    pub test_files_updated: usize,
    pub classes_covered: usize,
    pub methods_covered: usize,
    pub dependencies_detected: usize,
    pub mocks_generated: usize,
    pub assertions_generated: usize,
    pub existing_test_files: usize,
    pub existing_test_methods: usize,
    pub warnings_count: usize,
    /// Share of public methods in analysed classes that received a test, 0..=100.
    pub coverage_estimate: f64,
    /// Phase name to elapsed seconds.
    #[serde(default)]
    pub phase_timings: HashMap<String, f64>,
    #[serde(default)]
    pub file_type_breakdown: BTreeMap<String, usize>,
    #[serde(default)]
    pub framework_breakdown: BTreeMap<String, usize>,
}

/// Aggregate outcome of one generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationResult {
    pub success: bool,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub generated_files: Vec<GeneratedTestFile>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub statistics: GenerationStatistics,
    pub duration_ms: f64,
}

/// Render a path with `/` separators regardless of platform.
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_modifier_display() {
        assert_eq!(AccessModifier::ProtectedInternal.to_string(), "protected internal");
        assert_eq!(AccessModifier::default(), AccessModifier::Private);
    }

    #[test]
    fn mockable_dependencies_are_scoped_to_owner() {
        let mut result = AnalysisResult::new("Services/OrderService.cs", "csharp");
        result.dependencies = vec![
            DependencyInfo {
                name: "repository".into(),
                dependency_type: "IOrderRepository".into(),
                requires_mock: true,
                owner: "OrderService".into(),
                ..Default::default()
            },
            DependencyInfo {
                name: "clock".into(),
                dependency_type: "IClock".into(),
                requires_mock: true,
                owner: "AuditLog".into(),
                ..Default::default()
            },
        ];
        let names: Vec<_> = result
            .mockable_dependencies("OrderService")
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["repository"]);
    }

    #[test]
    fn existing_test_lookup_matches_prefix() {
        let mut info = ExistingTestInfo::default();
        info.existing_test_methods.insert(
            "OrderService".into(),
            vec!["PlaceOrder_WithValidInput_ReturnsExpectedResult".into()],
        );
        assert!(info.has_test_for("OrderService", "PlaceOrder"));
        assert!(!info.has_test_for("OrderService", "Place"));
        assert!(!info.has_test_for("Calculator", "PlaceOrder"));
    }

    #[test]
    fn context_fields_are_not_serialised() {
        let mut result = AnalysisResult::new("a.cs", "csharp");
        result.project_structure = Some(Arc::new(ProjectStructure::default()));
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("project_structure").is_none());
        assert_eq!(json["file_type"], "csharp");
    }
}
