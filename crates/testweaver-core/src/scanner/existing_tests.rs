//! Discovery of hand-written tests already present in a project.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{info, warn};
use regex::Regex;

use super::discovery::walk;
use crate::error::ScanError;
use crate::model::{ExistingTestInfo, TestClassInfo};

static TEST_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)public\s+(?:sealed\s+)?class\s+(\w+Tests?\w*)").unwrap());

static TEST_METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\[(?:Test|Fact|Theory|TestMethod|TestCase|DataTestMethod)\b[^\]]*\]\s*(?:\[[^\]]*\]\s*)*public\s+(?:async\s+)?(?:static\s+)?[\w<>\[\],]+\s+(\w+)\s*\(",
    )
    .unwrap()
});

static MOCKED_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\bMock<|Substitute\.For<|A\.Fake<)(\w+)>").unwrap()
});

/// Strip a trailing `Tests` or `Test` from a test class name.
pub fn tested_class_name(test_class: &str) -> &str {
    test_class
        .strip_suffix("Tests")
        .or_else(|| test_class.strip_suffix("Test"))
        .unwrap_or(test_class)
}

/// Framework and helper libraries referenced by a manifest.
fn detect_from_manifest(content: &str, info: &mut ExistingTestInfo) {
    let lower = content.to_lowercase();
    let framework = if lower.contains("xunit") {
        Some(("xunit", "xUnit"))
    } else if lower.contains("nunit") {
        Some(("nunit", "NUnit"))
    } else if lower.contains("mstest") {
        Some(("mstest", "MSTest"))
    } else {
        None
    };
    let mut libraries = Vec::new();
    if let Some((kind, library)) = framework {
        info.test_framework = Some(kind.to_string());
        libraries.push(library);
    }
    for (needle, library) in [
        ("moq", "Moq"),
        ("fluentassertions", "FluentAssertions"),
        ("nsubstitute", "NSubstitute"),
    ] {
        if lower.contains(needle) {
            libraries.push(library);
        }
    }
    for library in libraries {
        if !info.testing_libraries.iter().any(|l| l == library) {
            info.testing_libraries.push(library.to_string());
        }
    }
}

fn analyze_test_file(content: &str, path: &Path, info: &mut ExistingTestInfo) {
    let methods: Vec<String> = TEST_METHOD_RE
        .captures_iter(content)
        .map(|cap| cap[1].to_string())
        .collect();
    let mut mocked: Vec<String> = Vec::new();
    for cap in MOCKED_TYPE_RE.captures_iter(content) {
        if !mocked.iter().any(|m| m == &cap[1]) {
            mocked.push(cap[1].to_string());
        }
    }

    for cap in TEST_CLASS_RE.captures_iter(content) {
        let name = cap[1].to_string();
        let tested = tested_class_name(&name).to_string();
        info.existing_test_methods
            .entry(tested.clone())
            .or_default()
            .extend(methods.iter().cloned());
        info.test_classes.push(TestClassInfo {
            name,
            tested_class: tested,
            file_path: path.to_path_buf(),
            test_methods: methods.clone(),
            framework: info.test_framework.clone(),
            mocked_dependencies: mocked.clone(),
        });
    }
}

/// Find existing test files under `root` and index their test methods by the
/// class they test. Unreadable files are logged and skipped.
pub fn analyze_existing_tests(root: &Path) -> Result<ExistingTestInfo, ScanError> {
    analyze_existing_tests_excluding(root, &[])
}

/// As [`analyze_existing_tests`], ignoring everything below `excluded_dirs`
/// (previously generated output and its backup).
pub fn analyze_existing_tests_excluding(
    root: &Path,
    excluded_dirs: &[PathBuf],
) -> Result<ExistingTestInfo, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }
    info!("Analyzing existing tests in project: {}", root.display());

    let excluded: Vec<PathBuf> = excluded_dirs
        .iter()
        .filter_map(|d| d.canonicalize().ok())
        .collect();
    let is_excluded = |path: &Path| {
        !excluded.is_empty()
            && path
                .canonicalize()
                .is_ok_and(|p| excluded.iter().any(|d| p.starts_with(d)))
    };

    let mut info = ExistingTestInfo::default();
    for entry in walk(root).filter(|e| e.file_type().is_file()) {
        let path = entry.path();
        if is_excluded(path) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if name.ends_with(".csproj") {
            match std::fs::read_to_string(path) {
                Ok(content) => detect_from_manifest(&content, &mut info),
                Err(e) => warn!("Error reading project file {}: {e}", path.display()),
            }
        } else if name.ends_with(".cs") && name.contains("test") {
            info.test_files.push(path.to_path_buf());
        }
    }

    for path in info.test_files.clone() {
        match std::fs::read_to_string(&path) {
            Ok(content) => analyze_test_file(&content, &path, &mut info),
            Err(e) => warn!("Error analyzing test file {}: {e}", path.display()),
        }
    }

    info!(
        "Existing tests analysis completed. Found {} test files using {} framework",
        info.test_files.len(),
        info.test_framework.as_deref().unwrap_or("unknown")
    );
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    const XUNIT_TESTS: &str = r#"
using Moq;
using Xunit;

public class OrderServiceTests
{
    private readonly Mock<IOrderRepository> _repository = new();
    private readonly ILogger _logger = Substitute.For<ILogger>();

    [Fact]
    public void PlaceOrder_WithValidInput_ReturnsExpectedResult() { }

    [Theory]
    [InlineData(1)]
    public async Task Cancel_WithId_Works(int id) { }

    public void Helper() { }
}
"#;

    #[test]
    fn suffix_stripping() {
        assert_eq!(tested_class_name("OrderServiceTests"), "OrderService");
        assert_eq!(tested_class_name("CalculatorTest"), "Calculator");
        assert_eq!(tested_class_name("TestsHelper"), "TestsHelper");
    }

    #[test]
    fn extracts_classes_methods_and_mocks() {
        let mut info = ExistingTestInfo::default();
        analyze_test_file(XUNIT_TESTS, Path::new("OrderServiceTests.cs"), &mut info);

        assert_eq!(info.test_classes.len(), 1);
        let class = &info.test_classes[0];
        assert_eq!(class.tested_class, "OrderService");
        assert_eq!(
            class.test_methods,
            vec!["PlaceOrder_WithValidInput_ReturnsExpectedResult", "Cancel_WithId_Works"]
        );
        assert_eq!(class.mocked_dependencies, vec!["IOrderRepository", "ILogger"]);
        assert!(info.has_test_for("OrderService", "PlaceOrder"));
        assert!(!info.has_test_for("OrderService", "Helper"));
    }

    #[test]
    fn manifest_detection() {
        let mut info = ExistingTestInfo::default();
        detect_from_manifest(
            r#"<PackageReference Include="NUnit" /><PackageReference Include="Moq" />"#,
            &mut info,
        );
        assert_eq!(info.test_framework.as_deref(), Some("nunit"));
        assert_eq!(info.testing_libraries, vec!["NUnit", "Moq"]);
    }

    #[test]
    fn scans_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("Shop.Tests")).unwrap();
        std::fs::write(
            root.join("Shop.Tests/Shop.Tests.csproj"),
            r#"<PackageReference Include="xunit" />"#,
        )
        .unwrap();
        std::fs::write(root.join("Shop.Tests/OrderServiceTests.cs"), XUNIT_TESTS).unwrap();
        std::fs::write(root.join("Order.cs"), "public class Order {}").unwrap();

        let info = analyze_existing_tests(root).unwrap();
        assert_eq!(info.test_files.len(), 1);
        assert_eq!(info.test_framework.as_deref(), Some("xunit"));
        assert_eq!(info.test_classes[0].framework.as_deref(), Some("xunit"));
        assert_eq!(info.existing_test_methods["OrderService"].len(), 2);
    }

    #[test]
    fn excluded_directories_are_not_existing_tests() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("GeneratedTests")).unwrap();
        std::fs::write(root.join("GeneratedTests/OrderServiceTests.cs"), XUNIT_TESTS).unwrap();

        let all = analyze_existing_tests(root).unwrap();
        assert_eq!(all.test_files.len(), 1);

        let info = analyze_existing_tests_excluding(root, &[root.join("GeneratedTests")]).unwrap();
        assert!(info.test_files.is_empty());
        assert!(!info.has_test_for("OrderService", "PlaceOrder"));
    }
}
