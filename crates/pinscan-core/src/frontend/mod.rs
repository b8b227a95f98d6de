//! Front-end adapters: per-artifact-type drivers that extract shell
//! fragments and pinning references from Dockerfiles, CI workflows, and
//! shell scripts.

pub mod dockerfile;
pub mod script;
pub mod workflow;

use std::path::Path;

/// Artifact types the engine knows how to analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Dockerfile,
    ShellScript,
    Workflow,
}

// Source extensions that rule a dockerfile-named file out (e.g. a
// `dockerfile.go` parser source).
const NON_DOCKERFILE_EXTENSIONS: &[&str] = &[
    "go", "rs", "py", "js", "ts", "c", "h", "cpp", "hpp", "java", "rb", "php", "cs", "md",
    "html", "json", "yml", "yaml", "toml", "lock", "txt",
];

/// Decide which adapter handles a file, from its path and content.
/// `None` means the file is not an analyzable artifact.
pub fn classify(relative_path: &str, content: &str) -> Option<FileKind> {
    if is_workflow_path(relative_path) {
        return Some(FileKind::Workflow);
    }
    if script::is_shell_script(relative_path, content) {
        return Some(FileKind::ShellScript);
    }
    if is_dockerfile_path(relative_path) {
        return Some(FileKind::Dockerfile);
    }
    None
}

pub fn is_workflow_path(relative_path: &str) -> bool {
    let normalized = relative_path.replace('\\', "/");
    normalized.contains(".github/workflows/")
        && Path::new(&normalized)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yml") || e.eq_ignore_ascii_case("yaml"))
}

pub fn is_dockerfile_path(relative_path: &str) -> bool {
    let name = Path::new(relative_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !name.contains("dockerfile") {
        return false;
    }
    match Path::new(&name).extension().and_then(|e| e.to_str()) {
        Some(ext) => !NON_DOCKERFILE_EXTENSIONS.contains(&ext),
        None => true,
    }
}

/// Cheap rejection before any grammar parse: a file whose every line is
/// blank or a `#` comment contains no commands to analyze.
pub(crate) fn contains_commands(content: &str) -> bool {
    content.lines().any(|line| {
        let line = line.trim();
        !line.is_empty() && !line.starts_with('#')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_paths() {
        assert!(is_workflow_path(".github/workflows/ci.yml"));
        assert!(is_workflow_path(".github/workflows/release.yaml"));
        assert!(!is_workflow_path(".github/dependabot.yml"));
        assert!(!is_workflow_path(".github/workflows/README.md"));
    }

    #[test]
    fn test_dockerfile_paths() {
        assert!(is_dockerfile_path("Dockerfile"));
        assert!(is_dockerfile_path("docker/Dockerfile.prod"));
        assert!(is_dockerfile_path("build.dockerfile"));
        assert!(!is_dockerfile_path("dockerfile.go"));
        assert!(!is_dockerfile_path("Makefile"));
    }

    #[test]
    fn test_classify_prefers_shebang() {
        // A dockerfile-named file that is really a shell script goes to the
        // script adapter.
        assert_eq!(
            classify("Dockerfile.sh", "#!/bin/bash\necho hi"),
            Some(FileKind::ShellScript)
        );
        assert_eq!(
            classify("Dockerfile", "FROM alpine:3.19"),
            Some(FileKind::Dockerfile)
        );
        assert_eq!(classify("main.rs", "fn main() {}"), None);
    }

    #[test]
    fn test_contains_commands() {
        assert!(contains_commands("FROM alpine\nRUN ls"));
        assert!(!contains_commands("# only a comment\n\n   # another"));
        assert!(!contains_commands(""));
    }
}
