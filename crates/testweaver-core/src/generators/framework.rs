//! Unit test framework vocabulary: attributes, usings and assertion syntax.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TestFramework {
    #[default]
    XUnit,
    NUnit,
    MsTest,
}

impl TestFramework {
    /// Parse a framework kind such as `xunit`, `NUnit` or `mstest`.
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind.trim().to_lowercase().as_str() {
            "xunit" => Some(Self::XUnit),
            "nunit" => Some(Self::NUnit),
            "mstest" => Some(Self::MsTest),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::XUnit => "xunit",
            Self::NUnit => "nunit",
            Self::MsTest => "mstest",
        }
    }

    pub fn using_namespace(&self) -> &'static str {
        match self {
            Self::XUnit => "Xunit",
            Self::NUnit => "NUnit.Framework",
            Self::MsTest => "Microsoft.VisualStudio.TestTools.UnitTesting",
        }
    }

    pub fn test_attribute(&self) -> &'static str {
        match self {
            Self::XUnit => "Fact",
            Self::NUnit => "Test",
            Self::MsTest => "TestMethod",
        }
    }

    /// xUnit needs no class attribute.
    pub fn class_attribute(&self) -> Option<&'static str> {
        match self {
            Self::XUnit => None,
            Self::NUnit => Some("TestFixture"),
            Self::MsTest => Some("TestClass"),
        }
    }

    /// xUnit sets up in the test class constructor instead.
    pub fn setup_attribute(&self) -> Option<&'static str> {
        match self {
            Self::XUnit => None,
            Self::NUnit => Some("SetUp"),
            Self::MsTest => Some("TestInitialize"),
        }
    }

    /// Whether assertions are written with FluentAssertions.
    pub fn uses_fluent_assertions(&self) -> bool {
        matches!(self, Self::XUnit)
    }

    /// Assert that the `act` delegate throws `exception`.
    pub fn throws(&self, exception: &str, is_async: bool) -> String {
        match (self, is_async) {
            (Self::XUnit, false) => format!("act.Should().Throw<{exception}>();"),
            (Self::XUnit, true) => format!("await act.Should().ThrowAsync<{exception}>();"),
            (Self::NUnit, false) => format!("Assert.Throws<{exception}>(() => act());"),
            (Self::NUnit, true) => {
                format!("Assert.ThrowsAsync<{exception}>(async () => await act());")
            }
            (Self::MsTest, false) => format!("Assert.ThrowsException<{exception}>(act);"),
            (Self::MsTest, true) => {
                format!("await Assert.ThrowsExceptionAsync<{exception}>(act);")
            }
        }
    }

    pub fn not_null(&self, variable: &str) -> String {
        match self {
            Self::XUnit => format!("{variable}.Should().NotBeNull();"),
            Self::NUnit => format!("Assert.That({variable}, Is.Not.Null);"),
            Self::MsTest => format!("Assert.IsNotNull({variable});"),
        }
    }

    pub fn equal(&self, expected: &str, actual: &str) -> String {
        match self {
            Self::XUnit => format!("{actual}.Should().Be({expected});"),
            Self::NUnit => format!("Assert.That({actual}, Is.EqualTo({expected}));"),
            Self::MsTest => format!("Assert.AreEqual({expected}, {actual});"),
        }
    }
}
