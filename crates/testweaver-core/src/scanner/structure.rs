//! Project structure scan: manifests, solution, folder tree, packages and build info.

use std::path::Path;

use log::{info, warn};

use super::discovery::{is_skipped_dir, relative_path, walk};
use super::packages;
use crate::dotnet::{project, solution};
use crate::error::ScanError;
use crate::heuristics;
use crate::model::{BuildInfo, ProjectReference, ProjectStructure, SourceFolder, TestFolder};

const MANIFEST_EXTENSIONS: &[&str] = &["csproj", "vbproj", "fsproj"];

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.contains(&ext.as_str()))
}

/// `*.config`, `appsettings*.json` or `*.settings`.
fn is_configuration_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".config")
        || lower.ends_with(".settings")
        || (lower.starts_with("appsettings") && lower.ends_with(".json"))
}

/// Scan `root` and describe the project it contains.
///
/// Unreadable manifests and directories are logged and skipped.
pub fn analyze_project_structure(root: &Path) -> Result<ProjectStructure, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }
    info!("Analyzing project structure: {}", root.display());

    let mut structure = ProjectStructure {
        root_path: root.to_path_buf(),
        project_name: root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        ..Default::default()
    };

    // Manifests first, in walk order; the first is the main project.
    let mut main_manifest = None;
    for entry in walk(root) {
        let path = entry.path();
        if entry.file_type().is_file() {
            if main_manifest.is_none() && has_extension(path, MANIFEST_EXTENSIONS) {
                main_manifest = Some(path.to_path_buf());
            }
            let name = entry.file_name().to_string_lossy();
            if is_configuration_file(&name) {
                structure.configuration_files.push(relative_path(root, path));
            }
        }
    }

    if let Some(manifest) = main_manifest {
        apply_manifest(&manifest, &mut structure);
    }

    if let Some(sln) = find_solution(root) {
        match std::fs::read_to_string(&sln) {
            Ok(content) => structure
                .project_references
                .extend(solution::parse_solution(&content)),
            Err(e) => warn!("Error reading solution {}: {e}", sln.display()),
        }
    }

    let root_folder = scan_folder(root, root);
    collect_test_folders(&root_folder, &mut structure.test_folders);
    structure.source_folders.push(root_folder);

    structure.nuget = packages::detect_frameworks(&structure.package_references);
    structure.build = build_info(&structure);

    info!(
        "Project structure analysis completed. Found '{}' project with {} packages",
        structure.project_type,
        structure.package_references.len()
    );
    Ok(structure)
}

fn apply_manifest(manifest: &Path, structure: &mut ProjectStructure) {
    let content = match std::fs::read_to_string(manifest) {
        Ok(c) => c,
        Err(e) => {
            warn!("Error analyzing project file {}: {e}", manifest.display());
            return;
        }
    };
    let parsed = project::parse_project_file(&content, manifest);

    structure.project_name = parsed.name;
    structure.project_properties = parsed.properties;
    structure.target_framework = parsed.target_framework;
    structure.project_type = parsed.output_type.unwrap_or_default();
    structure.package_references = parsed
        .package_references
        .iter()
        .map(|(name, version)| packages::package_reference(name, version))
        .collect();
    structure.project_references = parsed
        .project_references
        .into_iter()
        .map(|path| ProjectReference {
            name: Path::new(&path)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            project_type: solution::project_kind(&path).to_string(),
            path,
        })
        .collect();
    structure.build.build_targets = parsed.build_targets;
}

/// First `*.sln` directly under `root`, by name.
fn find_solution(root: &Path) -> Option<std::path::PathBuf> {
    let mut solutions: Vec<_> = std::fs::read_dir(root)
        .ok()?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_extension(p, &["sln"]))
        .collect();
    solutions.sort();
    solutions.into_iter().next()
}

fn scan_folder(root: &Path, dir: &Path) -> SourceFolder {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let rel = relative_path(root, dir);
    let mut folder = SourceFolder {
        folder_type: heuristics::folder_type(&name),
        name,
        path: if rel.is_empty() { ".".to_string() } else { rel },
        ..Default::default()
    };

    let walker = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e));
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Access denied under {}: {e}", dir.display());
                continue;
            }
        };
        if entry.file_type().is_dir() {
            folder.sub_folders.push(scan_folder(root, entry.path()));
        } else if has_extension(entry.path(), &["cs"]) {
            folder.source_files.push(relative_path(root, entry.path()));
        }
    }
    folder
}

/// Every folder whose name marks it as holding tests, at any depth.
fn collect_test_folders(folder: &SourceFolder, out: &mut Vec<TestFolder>) {
    if heuristics::is_test_folder(&folder.name) && folder.path != "." {
        out.push(TestFolder {
            name: folder.name.clone(),
            path: folder.path.clone(),
            pattern: heuristics::testing_pattern(&folder.name),
            test_files: folder
                .source_files
                .iter()
                .filter(|f| {
                    let lower = f.rsplit('/').next().unwrap_or(f).to_lowercase();
                    lower.contains("test") || lower.contains("spec")
                })
                .cloned()
                .collect(),
        });
    }
    for sub in &folder.sub_folders {
        collect_test_folders(sub, out);
    }
}

fn build_info(structure: &ProjectStructure) -> BuildInfo {
    let has_config = |file: &str| {
        structure
            .configuration_files
            .iter()
            .any(|f| f.rsplit('/').next().unwrap_or(f).eq_ignore_ascii_case(file))
    };
    BuildInfo {
        configuration: structure
            .project_properties
            .get("Configuration")
            .cloned()
            .unwrap_or_else(|| "Debug".to_string()),
        platform: structure
            .project_properties
            .get("Platform")
            .cloned()
            .unwrap_or_else(|| "AnyCPU".to_string()),
        output_type: (!structure.project_type.is_empty()).then(|| structure.project_type.clone()),
        has_web_config: has_config("web.config"),
        has_app_config: has_config("app.config"),
        build_targets: structure.build.build_targets.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FolderType, TestingPattern};

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn configuration_file_names() {
        assert!(is_configuration_file("Web.config"));
        assert!(is_configuration_file("appsettings.Development.json"));
        assert!(is_configuration_file("User.settings"));
        assert!(!is_configuration_file("package.json"));
    }

    #[test]
    fn scans_minimal_project() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "Api.csproj",
            r#"<Project Sdk="Microsoft.NET.Sdk.Web">
  <PropertyGroup><TargetFramework>net8.0</TargetFramework><OutputType>Exe</OutputType></PropertyGroup>
  <ItemGroup><PackageReference Include="NUnit" Version="3.14.0" /></ItemGroup>
</Project>"#,
        );
        write(root, "web.config", "<configuration />");
        write(root, "Controllers/HomeController.cs", "class HomeController {}");
        write(root, "Api.IntegrationTests/HomeTests.cs", "class HomeTests {}");
        write(root, "obj/Generated.cs", "class Generated {}");

        let structure = analyze_project_structure(root).unwrap();
        assert_eq!(structure.project_name, "Api");
        assert_eq!(structure.project_type, "Exe");
        assert_eq!(structure.target_framework.as_deref(), Some("net8.0"));
        assert_eq!(structure.nuget.test_frameworks[0].kind, "nunit");
        assert!(structure.build.has_web_config);
        assert!(!structure.build.has_app_config);
        assert_eq!(structure.build.platform, "AnyCPU");
        assert_eq!(structure.build.output_type.as_deref(), Some("Exe"));

        let root_folder = &structure.source_folders[0];
        let names: Vec<_> = root_folder.sub_folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Api.IntegrationTests", "Controllers"]);
        assert_eq!(root_folder.sub_folders[1].folder_type, FolderType::Controllers);
        assert_eq!(
            root_folder.sub_folders[1].source_files,
            vec!["Controllers/HomeController.cs"]
        );

        assert_eq!(structure.test_folders.len(), 1);
        assert_eq!(structure.test_folders[0].pattern, TestingPattern::IntegrationTests);
        assert_eq!(
            structure.test_folders[0].test_files,
            vec!["Api.IntegrationTests/HomeTests.cs"]
        );
    }

    #[test]
    fn empty_directory_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let structure = analyze_project_structure(dir.path()).unwrap();
        assert!(structure.package_references.is_empty());
        assert_eq!(structure.build.configuration, "Debug");
        assert_eq!(structure.source_folders.len(), 1);
    }
}
