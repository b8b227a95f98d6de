//! Repository walking: collect the files worth handing to the front-end
//! adapters.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::frontend;

/// A file the scanner should read and classify.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub relative_path: String,
}

const WORKFLOW_PATTERNS: &[&str] = &[".github/workflows/*.yml", ".github/workflows/*.yaml"];

const SHELL_EXTENSIONS: &[&str] = &["sh", "bash", "mksh", "dash", "ksh"];

/// Recursively discover candidate files under `root`, up to `max_depth`
/// directory levels.
pub fn discover_repository(root: &Path, max_depth: usize) -> Result<Vec<CandidateFile>> {
    if !root.exists() {
        anyhow::bail!("Path '{}' does not exist", root.display());
    }
    if !root.is_dir() {
        anyhow::bail!("'{}' is not a directory", root.display());
    }

    let mut results = Vec::new();

    // Workflow files sit at fixed glob locations.
    for pattern in WORKFLOW_PATTERNS {
        let full_pattern = format!("{}/{}", root.display(), pattern);
        if let Ok(entries) = glob::glob(&full_pattern) {
            for entry in entries.flatten() {
                if entry.is_file() {
                    push_candidate(root, entry, &mut results);
                }
            }
        }
    }

    // Everything else comes from the walk.
    walk_dirs(root, root, 0, max_depth, &mut results)?;

    results.sort_by(|a, b| a.path.cmp(&b.path));
    results.dedup_by(|a, b| a.path == b.path);

    Ok(results)
}

fn walk_dirs(
    root: &Path,
    current: &Path,
    depth: usize,
    max_depth: usize,
    results: &mut Vec<CandidateFile>,
) -> Result<()> {
    if depth > max_depth {
        return Ok(());
    }

    let entries = std::fs::read_dir(current)
        .with_context(|| format!("Failed to read directory '{}'", current.display()))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let name_str = name.to_string_lossy();

        if path.is_dir() {
            // Skip hidden dirs, build artifacts, and vendored trees.
            if name_str.starts_with('.')
                || name_str == "target"
                || name_str == "node_modules"
                || name_str == "vendor"
                || name_str == "dist"
                || name_str == "build"
                || name_str == "__pycache__"
            {
                continue;
            }
            walk_dirs(root, &path, depth + 1, max_depth, results)?;
            continue;
        }

        if is_candidate_name(&name_str) {
            push_candidate(root, path, results);
        }
    }

    Ok(())
}

/// Dockerfile-named files, shell extensions, and extensionless files, which
/// may carry a shebang; classification happens once content is read.
fn is_candidate_name(name: &str) -> bool {
    if frontend::is_dockerfile_path(name) {
        return true;
    }
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some(ext) => SHELL_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)),
        None => !name.starts_with('.'),
    }
}

fn push_candidate(root: &Path, path: PathBuf, results: &mut Vec<CandidateFile>) {
    let relative = path
        .strip_prefix(root)
        .unwrap_or(&path)
        .to_string_lossy()
        .replace('\\', "/");
    results.push(CandidateFile {
        path,
        relative_path: relative,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_nonexistent_path() {
        assert!(discover_repository(Path::new("/nonexistent/path"), 5).is_err());
    }

    #[test]
    fn test_discover_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let result = discover_repository(tmp.path(), 5).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_discover_collects_all_kinds() {
        let tmp = tempfile::tempdir().unwrap();
        let workflows = tmp.path().join(".github/workflows");
        fs::create_dir_all(&workflows).unwrap();
        fs::write(workflows.join("ci.yml"), "name: CI").unwrap();
        fs::write(tmp.path().join("Dockerfile"), "FROM alpine:3.19").unwrap();
        fs::write(tmp.path().join("setup.sh"), "echo hi").unwrap();
        fs::write(tmp.path().join("install"), "#!/bin/sh\necho hi").unwrap();
        fs::write(tmp.path().join("main.rs"), "fn main() {}").unwrap();

        let result = discover_repository(tmp.path(), 5).unwrap();
        let relative: Vec<&str> = result.iter().map(|c| c.relative_path.as_str()).collect();
        assert!(relative.contains(&".github/workflows/ci.yml"));
        assert!(relative.contains(&"Dockerfile"));
        assert!(relative.contains(&"setup.sh"));
        assert!(relative.contains(&"install"));
        assert!(!relative.iter().any(|p| p.ends_with("main.rs")));
    }

    #[test]
    fn test_skip_list() {
        let tmp = tempfile::tempdir().unwrap();
        let vendored = tmp.path().join("node_modules/pkg");
        fs::create_dir_all(&vendored).unwrap();
        fs::write(vendored.join("postinstall.sh"), "echo hi").unwrap();

        let result = discover_repository(tmp.path(), 5).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_deduplicates() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join(".github/workflows")).unwrap();
        fs::write(tmp.path().join(".github/workflows/ci.yml"), "name: CI").unwrap();

        let result = discover_repository(tmp.path(), 5).unwrap();
        assert_eq!(result.len(), 1);
    }
}
