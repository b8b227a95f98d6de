//! Repository-wide driver: ties discovery, classification, and the
//! front-end adapters together into one report.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::discovery::{discover_repository, CandidateFile};
use crate::error::ScanError;
use crate::frontend::{self, FileKind};
use crate::report::PinningReport;
use crate::score::{HygieneScore, HygieneScoreCalculator};

pub const DEFAULT_MAX_DEPTH: usize = 12;

/// Everything one scan produced, ready to render.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub root: String,
    pub generated_at: DateTime<Utc>,
    pub files_scanned: usize,
    pub report: PinningReport,
    pub score: HygieneScore,
}

/// Scan a repository checkout on disk.
///
/// Recoverable per-file errors (parse failures, unreadable files) are
/// recorded on the report and the scan continues; an internal engine error
/// aborts.
pub fn scan_repository(root: &Path, max_depth: usize) -> Result<ScanSummary> {
    let candidates = discover_repository(root, max_depth)?;

    let mut report = PinningReport::new();
    let mut files_scanned = 0usize;

    for candidate in &candidates {
        match analyze_candidate(candidate, &mut report) {
            Ok(analyzed) => {
                if analyzed {
                    files_scanned += 1;
                }
            }
            Err(err) if err.is_recoverable() => {
                report.record_error(&candidate.relative_path, err.to_string());
            }
            Err(err) => {
                return Err(err).context("scan aborted by internal error");
            }
        }
    }

    let score = HygieneScoreCalculator::new().calculate(&report);
    Ok(ScanSummary {
        root: root.display().to_string(),
        generated_at: Utc::now(),
        files_scanned,
        report,
        score,
    })
}

fn analyze_candidate(candidate: &CandidateFile, report: &mut PinningReport) -> Result<bool, ScanError> {
    let bytes = std::fs::read(&candidate.path).map_err(|source| ScanError::Io {
        path: candidate.relative_path.clone(),
        source,
    })?;
    let content = String::from_utf8_lossy(&bytes);

    let Some(kind) = frontend::classify(&candidate.relative_path, &content) else {
        return Ok(false);
    };
    analyze_content(&candidate.relative_path, kind, &content, report)?;
    Ok(true)
}

/// Analyze one already-read file. Exposed so callers with their own file
/// access can drive the adapters directly.
pub fn analyze_content(
    path: &str,
    kind: FileKind,
    content: &str,
    report: &mut PinningReport,
) -> Result<(), ScanError> {
    match kind {
        FileKind::Dockerfile => frontend::dockerfile::analyze(path, content, report),
        FileKind::Workflow => frontend::workflow::analyze(path, content, report),
        FileKind::ShellScript => frontend::script::analyze(path, content, report),
    }
}
