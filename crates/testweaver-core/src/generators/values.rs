//! C# literal tables used when arranging test inputs.

use crate::heuristics::is_interface_name;

/// Representative non-null literal for a parameter or property of `type_name`.
pub fn test_value(type_name: &str) -> String {
    let type_name = type_name.trim().trim_end_matches('?');
    match type_name.to_lowercase().as_str() {
        "string" => return "\"test\"".to_string(),
        "int" | "int32" | "short" | "int16" | "byte" | "sbyte" | "ushort" | "uint" => {
            return "42".to_string()
        }
        "long" | "int64" => return "42L".to_string(),
        "ulong" => return "42UL".to_string(),
        "bool" | "boolean" => return "true".to_string(),
        "decimal" => return "42.0m".to_string(),
        "double" => return "42.0".to_string(),
        "float" | "single" => return "42.0f".to_string(),
        "char" => return "'a'".to_string(),
        "guid" => return "Guid.NewGuid()".to_string(),
        "datetime" => return "new DateTime(2023, 1, 1)".to_string(),
        "timespan" => return "TimeSpan.FromSeconds(1)".to_string(),
        "object" => return "new object()".to_string(),
        _ => {}
    }

    if let Some(element) = type_name.strip_suffix("[]") {
        format!("new {element}[0]")
    } else if type_name.starts_with("List<") {
        format!("new {type_name}()")
    } else if is_interface_name(type_name) {
        format!("Mock.Of<{type_name}>()")
    } else {
        format!("new {type_name}()")
    }
}

/// Zero literal for a numeric type, `default(T)` for the rest of the family.
pub fn zero_value(type_name: &str) -> String {
    let type_name = type_name.trim().trim_end_matches('?');
    match type_name.to_lowercase().as_str() {
        "int" | "int32" => "0".to_string(),
        "long" | "int64" => "0L".to_string(),
        "decimal" => "0m".to_string(),
        "double" => "0.0".to_string(),
        "float" | "single" => "0f".to_string(),
        _ => format!("default({type_name})"),
    }
}

/// Moq argument matcher for a parameter of `type_name`.
pub fn mock_argument(type_name: &str) -> String {
    format!("It.IsAny<{}>()", type_name.trim().trim_end_matches('?'))
}
