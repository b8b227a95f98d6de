//! GitHub Actions workflow front-end: `uses:` pinning checks and `run:`
//! steps fed through the shared shell walker.
//!
//! serde_yaml carries no source positions, so step locations come from a
//! forward textual scan of the raw file.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value;

use crate::error::ScanError;
use crate::report::{Dependency, DependencyKind, PinningReport, SourceLocation};
use crate::shell::classify::is_action_dependency_pinned;
use crate::shell::{walk_fragment, FragmentLines, TaintedFiles};

use super::contains_commands;

// `${{ … }}` expression spans would fail the shell grammar; they are
// replaced with a fixed token before parsing.
static EXPRESSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\$\{\{.*?\}\}").unwrap());
const EXPRESSION_PLACEHOLDER: &str = "REDACTED";

const SUPPORTED_SHELLS: &[&str] = &["bash", "sh"];

pub fn analyze(path: &str, content: &str, report: &mut PinningReport) -> Result<(), ScanError> {
    if !contains_commands(content) {
        return Ok(());
    }

    let yaml: Value = serde_yaml::from_str(content)
        .map_err(|e| ScanError::parse(path, format!("workflow YAML: {e}")))?;

    // YAML without a jobs mapping is just not a workflow.
    let Some(jobs) = yaml.get("jobs").and_then(Value::as_mapping) else {
        return Ok(());
    };

    let workflow_shell = default_run_shell(&yaml);
    let mut locator = LineLocator::new(content);

    for (job_id, job) in jobs {
        let job_id = job_id.as_str().unwrap_or("unknown");
        let Some(steps) = job.get("steps").and_then(Value::as_sequence) else {
            continue;
        };
        let job_shell = default_run_shell(job);
        let windows = runs_on_windows(job);

        // One taint set per job: a download in an earlier step can be
        // executed by a later one.
        let mut tainted = TaintedFiles::new();

        for (index, step) in steps.iter().enumerate() {
            if let Some(uses_value) = step.get("uses") {
                match uses_value.as_str() {
                    Some(uses) => handle_uses(path, uses, &mut locator, report),
                    None => report.record_error(
                        path,
                        format!("job `{job_id}` step {index}: malformed uses field"),
                    ),
                }
            }

            let Some(run_value) = step.get("run") else {
                continue;
            };
            let Some(run) = run_value.as_str() else {
                report.record_error(
                    path,
                    format!("job `{job_id}` step {index}: malformed run field"),
                );
                continue;
            };

            let shell = match step.get("shell") {
                Some(value) => match value.as_str() {
                    Some(s) => Some(s.to_string()),
                    None => {
                        report.record_error(
                            path,
                            format!("job `{job_id}` step {index}: malformed shell field"),
                        );
                        continue;
                    }
                },
                None => job_shell.clone().or_else(|| workflow_shell.clone()),
            };
            let shell = shell
                .unwrap_or_else(|| String::from(if windows { "pwsh" } else { "bash" }));
            // pwsh, powershell, cmd, python… are out of scope: skipped, not
            // an error.
            if !is_supported_shell(&shell) {
                continue;
            }

            let offset = locator.locate_script(run);
            let redacted = EXPRESSION_RE.replace_all(run, EXPRESSION_PLACEHOLDER);
            walk_fragment(
                path,
                &redacted,
                FragmentLines::Offset(offset),
                &mut tainted,
                &mut report.dependencies,
            )?;
        }
    }
    Ok(())
}

fn handle_uses(path: &str, uses: &str, locator: &mut LineLocator, report: &mut PinningReport) {
    // Local composite actions live in this repository; nothing to pin.
    if uses.starts_with("./") {
        return;
    }
    let pinned = is_action_dependency_pinned(uses);
    let (name, pinned_at) = match uses.rsplit_once('@') {
        Some((name, reference)) => (name.to_string(), Some(reference.to_string())),
        None => (uses.to_string(), None),
    };
    let line = locator.find(uses).unwrap_or(1);
    report.dependencies.push(Dependency {
        name: Some(name),
        pinned_at,
        pinned,
        kind: DependencyKind::GithubAction,
        location: SourceLocation {
            path: path.to_string(),
            start_line: line,
            end_line: line,
            snippet: uses.to_string(),
        },
    });
}

fn default_run_shell(value: &Value) -> Option<String> {
    value
        .get("defaults")?
        .get("run")?
        .get("shell")?
        .as_str()
        .map(str::to_string)
}

fn runs_on_windows(job: &Value) -> bool {
    match job.get("runs-on") {
        Some(Value::String(s)) => s.to_lowercase().contains("windows"),
        Some(Value::Sequence(seq)) => seq
            .iter()
            .filter_map(Value::as_str)
            .any(|s| s.to_lowercase().contains("windows")),
        _ => false,
    }
}

/// The shell field may carry options (`bash -e {0}`); only the program name
/// decides support.
fn is_supported_shell(shell: &str) -> bool {
    let name = shell.split_whitespace().next().unwrap_or("");
    let name = name.rsplit('/').next().unwrap_or(name);
    SUPPORTED_SHELLS.iter().any(|s| name.eq_ignore_ascii_case(s))
}

/// Forward textual scan with a monotonic cursor, so repeated snippets
/// resolve to successive lines.
struct LineLocator<'a> {
    lines: Vec<&'a str>,
    cursor: usize,
}

impl<'a> LineLocator<'a> {
    fn new(content: &'a str) -> Self {
        LineLocator {
            lines: content.lines().collect(),
            cursor: 0,
        }
    }

    /// 1-based line of the next occurrence of `needle`.
    fn find(&mut self, needle: &str) -> Option<u32> {
        if needle.is_empty() {
            return None;
        }
        for (i, line) in self.lines.iter().enumerate().skip(self.cursor) {
            if line.contains(needle) {
                self.cursor = i + 1;
                return Some(i as u32 + 1);
            }
        }
        // Out-of-order fallback: retry from the top.
        for (i, line) in self.lines.iter().enumerate().take(self.cursor) {
            if line.contains(needle) {
                return Some(i as u32 + 1);
            }
        }
        None
    }

    /// Line offset of a run script: locate its first non-empty line.
    fn locate_script(&mut self, run: &str) -> u32 {
        let Some(first) = run.lines().map(str::trim).find(|l| !l.is_empty()) else {
            return 0;
        };
        self.find(first).map(|line| line - 1).unwrap_or(0)
    }
}
