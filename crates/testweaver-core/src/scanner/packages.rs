//! NuGet package classification and known framework vocabularies.

use log::debug;

use crate::model::{FrameworkInfo, NuGetInfo, PackageReference, PackageType};

/// Package name fragments of libraries that support tests without being frameworks.
const TESTING_UTILITIES: &[&str] = &[
    "autofixture",
    "bogus",
    "coverlet",
    "microsoft.net.test.sdk",
    "microsoft.aspnetcore.mvc.testing",
    "testcontainers",
    "wiremock",
    "verify",
];

pub fn package_type(name: &str) -> PackageType {
    let lower = name.to_lowercase();
    if ["moq", "nsubstitute", "fakeiteasy"].iter().any(|m| lower.contains(m)) {
        PackageType::MockingFramework
    } else if lower.contains("fluentassertions") || lower.contains("shouldly") {
        PackageType::AssertionLibrary
    } else if ["xunit", "nunit", "mstest"].iter().any(|m| lower.contains(m)) {
        PackageType::TestFramework
    } else if TESTING_UTILITIES.iter().any(|m| lower.contains(m)) {
        PackageType::TestingUtility
    } else if lower.contains("test") {
        PackageType::TestFramework
    } else {
        PackageType::Other
    }
}

pub fn is_test_package(name: &str) -> bool {
    let lower = name.to_lowercase();
    ["test", "moq", "nsubstitute", "fakeiteasy", "fluentassertions", "shouldly"]
        .iter()
        .any(|m| lower.contains(m))
}

pub fn package_reference(name: &str, version: &str) -> PackageReference {
    PackageReference {
        name: name.to_string(),
        version: version.to_string(),
        package_type: package_type(name),
        is_test_package: is_test_package(name),
    }
}

fn framework(package: &PackageReference, kind: &str, attributes: &[&str], methods: &[&str]) -> FrameworkInfo {
    FrameworkInfo {
        name: package.name.clone(),
        version: package.version.clone(),
        kind: kind.to_string(),
        attributes: attributes.iter().map(|s| s.to_string()).collect(),
        methods: methods.iter().map(|s| s.to_string()).collect(),
    }
}

fn test_framework(package: &PackageReference) -> Option<FrameworkInfo> {
    let lower = package.name.to_lowercase();
    if lower.contains("xunit") {
        Some(framework(
            package,
            "xunit",
            &["Fact", "Theory", "InlineData"],
            &["Assert.Equal", "Assert.True", "Assert.False", "Assert.Null"],
        ))
    } else if lower.contains("nunit") {
        Some(framework(
            package,
            "nunit",
            &["Test", "TestCase", "TestCaseSource"],
            &["Assert.AreEqual", "Assert.IsTrue", "Assert.IsFalse", "Assert.IsNull"],
        ))
    } else if lower.contains("mstest") {
        Some(framework(
            package,
            "mstest",
            &["TestMethod", "DataRow", "DataTestMethod"],
            &["Assert.AreEqual", "Assert.IsTrue", "Assert.IsFalse", "Assert.IsNull"],
        ))
    } else {
        None
    }
}

fn mocking_framework(package: &PackageReference) -> Option<FrameworkInfo> {
    let lower = package.name.to_lowercase();
    if lower.contains("moq") {
        Some(framework(package, "moq", &[], &["Setup", "Returns", "Verify", "Callback"]))
    } else if lower.contains("nsubstitute") {
        Some(framework(
            package,
            "nsubstitute",
            &[],
            &["Returns", "Received", "DidNotReceive", "When"],
        ))
    } else if lower.contains("fakeiteasy") {
        Some(framework(
            package,
            "fakeiteasy",
            &[],
            &["CallTo", "Returns", "MustHaveHappened"],
        ))
    } else {
        None
    }
}

fn assertion_library(package: &PackageReference) -> Option<FrameworkInfo> {
    let lower = package.name.to_lowercase();
    if lower.contains("fluentassertions") {
        Some(framework(
            package,
            "fluentassertions",
            &[],
            &["Should().Be", "Should().BeNull", "Should().BeOfType", "Should().Contain"],
        ))
    } else if lower.contains("shouldly") {
        Some(framework(
            package,
            "shouldly",
            &[],
            &["ShouldBe", "ShouldBeNull", "ShouldBeOfType", "ShouldContain"],
        ))
    } else {
        None
    }
}

fn push_unique(list: &mut Vec<FrameworkInfo>, info: Option<FrameworkInfo>) {
    if let Some(info) = info {
        if !list.iter().any(|f| f.kind == info.kind) {
            list.push(info);
        }
    }
}

/// Classify package references into frameworks and utilities. One entry per
/// framework kind; `xunit.runner.visualstudio` does not add a second xunit.
pub fn detect_frameworks(packages: &[PackageReference]) -> NuGetInfo {
    let mut info = NuGetInfo::default();
    for package in packages {
        push_unique(&mut info.test_frameworks, test_framework(package));
        push_unique(&mut info.mocking_frameworks, mocking_framework(package));
        push_unique(&mut info.assertion_libraries, assertion_library(package));
        if package.package_type == PackageType::TestingUtility {
            info.testing_utilities.push(package.name.clone());
        }
    }
    debug!(
        "Detected {} test, {} mocking and {} assertion frameworks",
        info.test_frameworks.len(),
        info.mocking_frameworks.len(),
        info.assertion_libraries.len()
    );
    info
}
