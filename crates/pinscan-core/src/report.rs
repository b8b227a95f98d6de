use serde::{Deserialize, Serialize};

/// What kind of external reference a finding points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    GithubAction,
    DockerImage,
    DownloadThenRun,
    GoCommand,
    PipCommand,
    NpmCommand,
    ChocoCommand,
    NugetCommand,
}

impl DependencyKind {
    pub fn label(&self) -> &str {
        match self {
            DependencyKind::GithubAction => "GitHub Action",
            DependencyKind::DockerImage => "Docker base image",
            DependencyKind::DownloadThenRun => "Download-then-run",
            DependencyKind::GoCommand => "go install",
            DependencyKind::PipCommand => "pip install",
            DependencyKind::NpmCommand => "npm install",
            DependencyKind::ChocoCommand => "choco install",
            DependencyKind::NugetCommand => "nuget install",
        }
    }

    /// Download-then-run findings are insecure regardless of pinning;
    /// everything else is a pinning concern.
    pub fn is_insecure_fetch(&self) -> bool {
        matches!(self, DependencyKind::DownloadThenRun)
    }
}

/// Where in the repository a dependency reference was found.
///
/// `end_line >= start_line`; they are equal when the underlying grammar
/// reports no end position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub snippet: String,
}

/// One externally-fetched dependency discovered during the scan.
///
/// Never mutated after creation; the collection keeps insertion (scan)
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub name: Option<String>,
    pub pinned_at: Option<String>,
    pub pinned: bool,
    pub kind: DependencyKind,
    pub location: SourceLocation,
}

/// A file or element the scanner had to give up on, with the reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingError {
    pub path: String,
    pub reason: String,
}

/// Accumulated result of scanning one repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PinningReport {
    pub dependencies: Vec<Dependency>,
    pub errors: Vec<ProcessingError>,
}

impl PinningReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pinned_count(&self) -> usize {
        self.dependencies.iter().filter(|d| d.pinned).count()
    }

    pub fn unpinned_count(&self) -> usize {
        self.dependencies.iter().filter(|d| !d.pinned).count()
    }

    pub fn count_of(&self, kind: DependencyKind) -> usize {
        self.dependencies.iter().filter(|d| d.kind == kind).count()
    }

    pub fn record_error(&mut self, path: &str, reason: impl Into<String>) {
        self.errors.push(ProcessingError {
            path: path.to_string(),
            reason: reason.into(),
        });
    }
}
