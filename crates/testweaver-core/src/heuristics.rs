//! Naming and type classification heuristics.
//!
//! Everything here is a syntactic guess over identifiers. A class named
//! `IPAddress` is classified as an interface; that imprecision is accepted.

use crate::model::{AttributeInfo, DependencyLifetime, FolderType, TestingPattern};

/// Substrings marking a type as an injectable service.
const SERVICE_MARKERS: &[&str] = &[
    "service",
    "repository",
    "manager",
    "handler",
    "provider",
    "factory",
];

const VALUE_TYPES: &[&str] = &[
    "int", "int32", "long", "int64", "bool", "boolean", "decimal", "double", "float", "byte",
    "sbyte", "short", "ushort", "uint", "ulong", "char", "guid", "datetime", "timespan",
    "datetimeoffset", "cancellationtoken",
];

const NUMERIC_TYPES: &[&str] = &[
    "int", "int32", "long", "int64", "decimal", "double", "float", "byte", "sbyte", "short",
    "ushort", "uint", "ulong",
];

/// Strip namespace qualification and generic arguments: `A.B.IRepo<T>` -> `IRepo`.
pub fn simple_type_name(type_name: &str) -> &str {
    let without_generics = type_name.split('<').next().unwrap_or(type_name);
    without_generics
        .rsplit('.')
        .next()
        .unwrap_or(without_generics)
        .trim()
}

/// Leading `I` followed by another uppercase letter.
pub fn is_interface_name(type_name: &str) -> bool {
    let mut chars = simple_type_name(type_name).chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('I'), Some(second)) if second.is_ascii_uppercase()
    )
}

pub fn is_service_type(type_name: &str) -> bool {
    let lower = type_name.to_lowercase();
    SERVICE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Whether a constructor parameter of this type is treated as an injected dependency.
pub fn is_dependency_type(type_name: &str) -> bool {
    is_interface_name(type_name) || is_service_type(type_name)
}

pub fn guess_lifetime(type_name: &str) -> DependencyLifetime {
    let lower = type_name.to_lowercase();
    if lower.contains("repository") || lower.contains("context") {
        DependencyLifetime::Scoped
    } else if lower.contains("configuration")
        || lower.contains("settings")
        || lower.contains("options")
    {
        DependencyLifetime::Singleton
    } else {
        DependencyLifetime::Transient
    }
}

// ---------------------------------------------------------------------------
// Class roles
// ---------------------------------------------------------------------------

pub fn is_controller(name: &str, base_types: &[String], attributes: &[AttributeInfo]) -> bool {
    name.to_lowercase().ends_with("controller")
        || base_types.iter().any(|b| b.contains("Controller"))
        || attributes.iter().any(|a| a.name.contains("Controller"))
}

pub fn is_service(name: &str) -> bool {
    name.to_lowercase().contains("service")
}

pub fn is_repository(name: &str) -> bool {
    name.to_lowercase().contains("repository")
}

/// Test classes are never targets for generation.
pub fn is_test_class(name: &str, attributes: &[AttributeInfo]) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with("test")
        || lower.ends_with("tests")
        || attributes
            .iter()
            .any(|a| a.name.contains("TestClass") || a.name.contains("TestFixture"))
}

pub fn is_test_method(attributes: &[AttributeInfo]) -> bool {
    attributes
        .iter()
        .any(|a| a.name.contains("Test") || a.name.contains("Fact") || a.name.contains("Theory"))
}

// ---------------------------------------------------------------------------
// Parameter types
// ---------------------------------------------------------------------------

pub fn is_value_type(type_name: &str) -> bool {
    let lower = simple_type_name(type_name).to_lowercase();
    VALUE_TYPES.contains(&lower.as_str())
}

/// Nullable value types (`int?`) accept null, so they are neither value nor reference here.
pub fn is_nullable_value_type(type_name: &str) -> bool {
    type_name
        .strip_suffix('?')
        .is_some_and(|inner| is_value_type(inner))
}

pub fn is_reference_type(type_name: &str) -> bool {
    if is_nullable_value_type(type_name) {
        return false;
    }
    is_string_type(type_name)
        || type_name.ends_with("[]")
        || type_name.starts_with("List<")
        || is_interface_name(type_name)
        || !is_value_type(type_name)
}

pub fn is_numeric_type(type_name: &str) -> bool {
    NUMERIC_TYPES.contains(&type_name.to_lowercase().as_str())
}

pub fn is_string_type(type_name: &str) -> bool {
    type_name.eq_ignore_ascii_case("string")
}

// ---------------------------------------------------------------------------
// Folders
// ---------------------------------------------------------------------------

pub fn folder_type(name: &str) -> FolderType {
    match name.to_lowercase().as_str() {
        "controllers" => FolderType::Controllers,
        "services" => FolderType::Services,
        "models" => FolderType::Models,
        "repositories" => FolderType::Repositories,
        "viewmodels" => FolderType::ViewModels,
        "helpers" => FolderType::Helpers,
        "extensions" => FolderType::Extensions,
        "configuration" | "config" => FolderType::Configuration,
        "data" => FolderType::Data,
        "business" => FolderType::Business,
        "web" => FolderType::Web,
        "api" => FolderType::Api,
        _ => FolderType::Other,
    }
}

pub fn is_test_folder(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("test") || lower.contains("spec")
}

pub fn testing_pattern(name: &str) -> TestingPattern {
    let lower = name.to_lowercase();
    if lower.contains("integration") {
        TestingPattern::IntegrationTests
    } else if lower.contains("functional") {
        TestingPattern::FunctionalTests
    } else if lower.contains("acceptance") {
        TestingPattern::AcceptanceTests
    } else if lower.contains("performance") {
        TestingPattern::PerformanceTests
    } else {
        TestingPattern::UnitTests
    }
}

// ---------------------------------------------------------------------------
// Identifier casing
// ---------------------------------------------------------------------------

pub fn pascal_case(name: &str) -> String {
    let trimmed = name.trim_start_matches(['_', '@']);
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn camel_case(name: &str) -> String {
    let trimmed = name.trim_start_matches(['_', '@']);
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(name: &str) -> AttributeInfo {
        AttributeInfo {
            name: name.to_string(),
            full_name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn interface_prefix() {
        assert!(is_interface_name("IOrderRepository"));
        assert!(is_interface_name("Shop.Data.IOrderRepository"));
        assert!(is_interface_name("IRepository<Order>"));
        assert!(!is_interface_name("Item"));
        assert!(!is_interface_name("I"));
        // Known imprecision: passes the prefix check.
        assert!(is_interface_name("IPAddress"));
    }

    #[test]
    fn service_markers() {
        assert!(is_service_type("PaymentService"));
        assert!(is_service_type("orderhandler"));
        assert!(is_dependency_type("ILogger<OrderService>"));
        assert!(!is_dependency_type("string"));
        assert!(!is_dependency_type("Order"));
    }

    #[test]
    fn lifetimes() {
        assert_eq!(guess_lifetime("IOrderRepository"), DependencyLifetime::Scoped);
        assert_eq!(guess_lifetime("AppDbContext"), DependencyLifetime::Scoped);
        assert_eq!(guess_lifetime("IOptions<ShopSettings>"), DependencyLifetime::Singleton);
        assert_eq!(guess_lifetime("IConfiguration"), DependencyLifetime::Singleton);
        assert_eq!(guess_lifetime("IEmailSender"), DependencyLifetime::Transient);
    }

    #[test]
    fn controller_role_sources() {
        assert!(is_controller("OrdersController", &[], &[]));
        assert!(is_controller("Orders", &["ControllerBase".into()], &[]));
        assert!(is_controller("Orders", &[], &[attr("ApiController")]));
        assert!(!is_controller("OrderService", &[], &[attr("Serializable")]));
    }

    #[test]
    fn test_class_detection() {
        assert!(is_test_class("OrderServiceTests", &[]));
        assert!(is_test_class("CalculatorTest", &[]));
        assert!(is_test_class("Checks", &[attr("TestFixture")]));
        assert!(!is_test_class("Calculator", &[]));
    }

    #[test]
    fn test_method_detection() {
        assert!(is_test_method(&[attr("Fact")]));
        assert!(is_test_method(&[attr("TestMethod")]));
        assert!(is_test_method(&[attr("Theory")]));
        assert!(!is_test_method(&[attr("HttpGet")]));
    }

    #[test]
    fn parameter_type_classes() {
        assert!(is_reference_type("string"));
        assert!(is_reference_type("Order"));
        assert!(is_reference_type("int[]"));
        assert!(!is_reference_type("int"));
        assert!(!is_reference_type("Guid"));
        assert!(!is_reference_type("int?"));
        assert!(is_numeric_type("decimal"));
        assert!(is_numeric_type("Int32"));
        assert!(!is_numeric_type("string"));
        assert!(is_string_type("String"));
    }

    #[test]
    fn folders() {
        assert_eq!(folder_type("Controllers"), FolderType::Controllers);
        assert_eq!(folder_type("config"), FolderType::Configuration);
        assert_eq!(folder_type("ViewModels"), FolderType::ViewModels);
        assert_eq!(folder_type("Utilities"), FolderType::Other);
        assert!(is_test_folder("Shop.Tests"));
        assert!(is_test_folder("Specs"));
        assert!(is_test_folder("tests"));
        assert!(!is_test_folder("Services"));
        assert_eq!(testing_pattern("Shop.IntegrationTests"), TestingPattern::IntegrationTests);
        assert_eq!(testing_pattern("Shop.Tests"), TestingPattern::UnitTests);
    }

    #[test]
    fn casing() {
        assert_eq!(pascal_case("data"), "Data");
        assert_eq!(pascal_case("_repository"), "Repository");
        assert_eq!(camel_case("OrderRepository"), "orderRepository");
        assert_eq!(camel_case(""), "");
    }
}
