//! Output layout for generated test files: naming, path mirroring, backup,
//! purge and writing.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::GenerationError;

const PROJECT_MANIFEST_EXTENSIONS: &[&str] = &["csproj", "sln", "vbproj", "fsproj"];

fn has_project_manifest(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.filter_map(|e| e.ok()).any(|entry| {
        entry.path().is_file()
            && entry
                .path()
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| PROJECT_MANIFEST_EXTENSIONS.contains(&ext.as_str()))
    })
}

/// Nearest ancestor directory of `source` holding a project or solution file.
pub fn find_project_root(source: &Path) -> Option<PathBuf> {
    source
        .parent()?
        .ancestors()
        .find(|dir| !dir.as_os_str().is_empty() && has_project_manifest(dir))
        .map(Path::to_path_buf)
}

/// Expand `{SourceFileName}` and `{Extension}` in the naming pattern.
pub fn test_file_name(naming: &str, source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    naming
        .replace("{SourceFileName}", &stem)
        .replace("{Extension}", "cs")
}

/// Where the tests for `source` land below `output_dir`.
///
/// The directory of `source` relative to its project root is mirrored; files
/// outside any project are written flat.
pub fn test_file_path(output_dir: &Path, source: &Path, naming: &str) -> PathBuf {
    let file_name = test_file_name(naming, source);
    let relative_dir = find_project_root(source).and_then(|root| {
        source
            .parent()
            .and_then(|dir| dir.strip_prefix(&root).ok())
            .map(Path::to_path_buf)
    });
    match relative_dir {
        Some(dir) => output_dir.join(dir).join(file_name),
        None => output_dir.join(file_name),
    }
}

/// Sibling directory holding the previous run's output, `<output>.backup`.
pub fn backup_path(output_dir: &Path) -> PathBuf {
    let mut name = output_dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output".into());
    name.push(".backup");
    output_dir.with_file_name(name)
}

/// Copy the current output directory to its backup location, replacing any
/// older backup. Returns the backup path when something was copied.
pub fn backup_output_dir(output_dir: &Path) -> Result<Option<PathBuf>, GenerationError> {
    if !output_dir.is_dir() {
        return Ok(None);
    }
    let backup = backup_path(output_dir);
    if backup.exists() {
        std::fs::remove_dir_all(&backup).map_err(|e| GenerationError::io(&backup, e))?;
    }

    for entry in WalkDir::new(output_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| GenerationError::io(output_dir, e.into()))?;
        let Ok(relative) = entry.path().strip_prefix(output_dir) else {
            continue;
        };
        let target = backup.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| GenerationError::io(&target, e))?;
        } else if entry.file_type().is_file() {
            std::fs::copy(entry.path(), &target).map_err(|e| GenerationError::io(&target, e))?;
        }
    }
    info!("Backed up {} to {}", output_dir.display(), backup.display());
    Ok(Some(backup))
}

/// Remove everything inside `output_dir`, leaving the directory itself.
pub fn purge_output_dir(output_dir: &Path) -> Result<(), GenerationError> {
    if !output_dir.exists() {
        return Ok(());
    }
    let entries = std::fs::read_dir(output_dir).map_err(|e| GenerationError::io(output_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| GenerationError::io(output_dir, e))?;
        let path = entry.path();
        let removed = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        if let Err(e) = removed {
            warn!("Failed to remove {}: {e}", path.display());
            return Err(GenerationError::io(&path, e));
        }
    }
    debug!("Purged output directory {}", output_dir.display());
    Ok(())
}

pub fn write_test_file(path: &Path, content: &str) -> Result<(), GenerationError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| GenerationError::io(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| GenerationError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_pattern_placeholders() {
        let source = Path::new("src/Services/OrderService.cs");
        assert_eq!(
            test_file_name("{SourceFileName}Tests.{Extension}", source),
            "OrderServiceTests.cs"
        );
        assert_eq!(
            test_file_name("Test_{SourceFileName}.{Extension}", source),
            "Test_OrderService.cs"
        );
    }

    #[test]
    fn mirrors_path_below_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("Shop");
        std::fs::create_dir_all(root.join("Services")).unwrap();
        std::fs::write(root.join("Shop.csproj"), "<Project />").unwrap();
        let source = root.join("Services/OrderService.cs");
        std::fs::write(&source, "public class OrderService {}").unwrap();

        assert_eq!(find_project_root(&source), Some(root.clone()));
        let out = dir.path().join("out");
        assert_eq!(
            test_file_path(&out, &source, "{SourceFileName}Tests.{Extension}"),
            out.join("Services").join("OrderServiceTests.cs")
        );
    }

    #[test]
    fn flat_without_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("loose/Widget.cs");
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        std::fs::write(&source, "").unwrap();
        let out = dir.path().join("out");
        assert_eq!(
            test_file_path(&out, &source, "{SourceFileName}Tests.{Extension}"),
            out.join("WidgetTests.cs")
        );
    }

    #[test]
    fn backup_then_purge() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("GeneratedTests");
        write_test_file(&out.join("Services/OldTests.cs"), "old").unwrap();
        write_test_file(&out.join("TopTests.cs"), "top").unwrap();

        let backup = backup_output_dir(&out).unwrap().unwrap();
        assert_eq!(backup, dir.path().join("GeneratedTests.backup"));
        assert_eq!(
            std::fs::read_to_string(backup.join("Services/OldTests.cs")).unwrap(),
            "old"
        );

        purge_output_dir(&out).unwrap();
        assert!(out.is_dir());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
        assert!(backup.join("TopTests.cs").is_file());
    }

    #[test]
    fn missing_output_dir_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("absent");
        assert!(backup_output_dir(&out).unwrap().is_none());
        purge_output_dir(&out).unwrap();
    }
}
