//! .sln text format reader.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::ProjectReference;

/// Solution folder GUID; these entries organise projects and are not buildable.
const SOLUTION_FOLDER_GUID: &str = "2150E333-8FDC-42A3-9474-1A3956D46DE8";

static PROJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^Project\("\{([^}]+)\}"\)\s*=\s*"([^"]+)"\s*,\s*"([^"]+)"\s*,\s*"\{([^}]+)\}""#,
    )
    .unwrap()
});

/// Project kind from the manifest extension.
pub fn project_kind(path: &str) -> &'static str {
    let lower = path.to_lowercase();
    if lower.ends_with(".csproj") {
        "C# Project"
    } else if lower.ends_with(".vbproj") {
        "VB.NET Project"
    } else if lower.ends_with(".fsproj") {
        "F# Project"
    } else {
        "Unknown"
    }
}

/// Project entries of a solution, solution folders excluded.
pub fn parse_solution(content: &str) -> Vec<ProjectReference> {
    PROJECT_RE
        .captures_iter(content)
        .filter(|cap| cap[1].to_uppercase() != SOLUTION_FOLDER_GUID)
        .map(|cap| {
            let path = cap[3].replace('\\', "/");
            ProjectReference {
                name: cap[2].to_string(),
                project_type: project_kind(&path).to_string(),
                path,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_SLN: &str = r#"
Microsoft Visual Studio Solution File, Format Version 12.00
# Visual Studio Version 17
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "Shop", "src\Shop\Shop.csproj", "{12345678-1234-1234-1234-123456789ABC}"
EndProject
Project("{F2A71F9B-5D33-465A-A702-920D77279786}") = "Shop.Reports", "src\Reports\Shop.Reports.fsproj", "{87654321-4321-4321-4321-CBA987654321}"
EndProject
Project("{2150E333-8FDC-42A3-9474-1A3956D46DE8}") = "Solution Items", "Solution Items", "{AAAA1111-BBBB-CCCC-DDDD-EEEE22223333}"
EndProject
"#;

    #[test]
    fn parse_projects() {
        let projects = parse_solution(SAMPLE_SLN);
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].name, "Shop");
        assert_eq!(projects[0].project_type, "C# Project");
        assert_eq!(projects[1].project_type, "F# Project");
    }

    #[test]
    fn skip_solution_folders() {
        let projects = parse_solution(SAMPLE_SLN);
        assert!(projects.iter().all(|p| p.name != "Solution Items"));
    }

    #[test]
    fn normalize_backslashes() {
        let projects = parse_solution(SAMPLE_SLN);
        assert_eq!(projects[0].path, "src/Shop/Shop.csproj");
    }

    #[test]
    fn empty_solution() {
        assert!(parse_solution("# empty file\n").is_empty());
    }
}
