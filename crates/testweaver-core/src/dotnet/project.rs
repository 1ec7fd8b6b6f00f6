//! .csproj/.vbproj/.fsproj XML reader.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Leaf element `<Name attr="..">text</Name>`; the close tag is compared separately.
static LEAF_ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([A-Za-z_][\w.\-]*)(?:\s[^>]*)?>([^<]*)</([A-Za-z_][\w.\-]*)\s*>").unwrap()
});

/// Parsed project manifest.
#[derive(Debug, Clone, Default)]
pub struct ProjectFile {
    pub name: String,
    pub target_framework: Option<String>,
    pub output_type: Option<String>,
    /// Every leaf child of every `<PropertyGroup>`; later groups win.
    pub properties: BTreeMap<String, String>,
    pub project_references: Vec<String>,
    pub package_references: Vec<(String, String)>, // (name, version)
    pub build_targets: Vec<String>,
}

/// Parse manifest content. `project_path` supplies the project name.
///
/// Handles both SDK-style and legacy project formats.
pub fn parse_project_file(content: &str, project_path: &Path) -> ProjectFile {
    let mut info = ProjectFile {
        name: project_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default(),
        properties: extract_property_groups(content),
        ..Default::default()
    };

    info.target_framework = extract_element_text(content, "TargetFramework")
        .or_else(|| extract_element_text(content, "TargetFrameworks"));
    info.output_type = extract_element_text(content, "OutputType");

    for include in extract_attr_values(content, "ProjectReference", "Include") {
        info.project_references.push(include.replace('\\', "/"));
    }
    info.package_references = extract_package_refs(content);
    info.build_targets = extract_attr_values(content, "Target", "Name");

    info
}

/// Text content of the first `<Tag>value</Tag>`.
fn extract_element_text(content: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = content.find(&open)?;
    let after = start + open.len();
    let end = content[after..].find(&close)?;
    let text = content[after..after + end].trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn extract_property_groups(content: &str) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    let mut search_from = 0;

    while let Some(pos) = content[search_from..].find("<PropertyGroup") {
        let abs_pos = search_from + pos;
        let rest = &content[abs_pos..];
        let Some(open_end) = rest.find('>') else {
            break;
        };
        // Self-closing group
        if rest[..open_end].ends_with('/') {
            search_from = abs_pos + open_end;
            continue;
        }
        let Some(close) = rest.find("</PropertyGroup>") else {
            break;
        };
        let body = &rest[open_end + 1..close];
        for cap in LEAF_ELEMENT_RE.captures_iter(body) {
            if cap[1] == cap[3] {
                properties.insert(cap[1].to_string(), cap[2].trim().to_string());
            }
        }
        search_from = abs_pos + close;
    }
    properties
}

/// Values of `attr` on every `<tag ...>` element.
fn extract_attr_values(content: &str, tag: &str, attr: &str) -> Vec<String> {
    let mut results = Vec::new();
    let pattern = format!("<{}", tag);
    let mut search_from = 0;

    while let Some(pos) = content[search_from..].find(&pattern) {
        let abs_pos = search_from + pos;
        let rest = &content[abs_pos..];
        search_from = abs_pos + pattern.len();

        // `<Target` must not match `<TargetFramework>`
        if !rest[pattern.len()..].starts_with(|c: char| c.is_whitespace() || c == '/' || c == '>') {
            continue;
        }
        if let Some(end) = rest.find('>') {
            if let Some(value) = extract_attr(&rest[..=end], attr) {
                results.push(value);
            }
        }
    }
    results
}

/// PackageReference entries with Include and Version attributes.
fn extract_package_refs(content: &str) -> Vec<(String, String)> {
    let mut results = Vec::new();
    let pattern = "<PackageReference";
    let mut search_from = 0;

    while let Some(pos) = content[search_from..].find(pattern) {
        let abs_pos = search_from + pos;
        let rest = &content[abs_pos..];
        search_from = abs_pos + pattern.len();

        let Some(gt) = rest.find('>') else {
            continue;
        };
        let element = &rest[..=gt];
        let self_closing = element.ends_with("/>");
        let name = extract_attr(element, "Include").unwrap_or_default();
        let mut version = extract_attr(element, "Version").unwrap_or_default();

        // Version as a child element
        if version.is_empty() && !self_closing {
            if let Some(close_pos) = rest.find("</PackageReference>") {
                if let Some(v) = extract_element_text(&rest[gt + 1..close_pos], "Version") {
                    version = v;
                }
            }
        }

        if !name.is_empty() {
            results.push((name, version));
        }
    }
    results
}

/// An attribute value from an XML element string.
fn extract_attr(element: &str, attr: &str) -> Option<String> {
    for quote in ['"', '\''] {
        let pat = format!(" {}={}", attr, quote);
        if let Some(start) = element.find(&pat) {
            let after = start + pat.len();
            if let Some(end) = element[after..].find(quote) {
                return Some(element[after..after + end].to_string());
            }
        }
    }
    None
}
