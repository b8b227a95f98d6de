//! Dockerfile front-end: base-image pinning with multi-stage alias
//! resolution, and `RUN` blocks fed through the shared shell walker.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ScanError;
use crate::report::{Dependency, DependencyKind, PinningReport, SourceLocation};
use crate::shell::{walk_fragment, FragmentLines, TaintedFiles};

use super::contains_commands;

// A digest, or a build-arg placeholder standing in for one.
static IMAGE_DIGEST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@sha256:([a-f0-9]{64}|\$\{.*\})").unwrap());

/// One parsed instruction: keyword, flattened arguments, and the line span
/// it covers in the file.
#[derive(Debug, Clone)]
struct Instruction {
    keyword: String,
    arguments: String,
    start_line: u32,
    end_line: u32,
    original: String,
}

/// Line-based instruction parser with `\` continuation handling.
fn parse_instructions(content: &str) -> Vec<Instruction> {
    let mut instructions = Vec::new();
    let mut continuation = String::new();
    let mut raw_lines: Vec<&str> = Vec::new();
    let mut line_start = 0u32;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.starts_with('#') || trimmed.is_empty() {
            continue;
        }

        if continuation.is_empty() {
            line_start = i as u32 + 1;
        }

        if let Some(stripped) = trimmed.strip_suffix('\\') {
            continuation.push_str(stripped);
            continuation.push(' ');
            raw_lines.push(line);
            continue;
        }

        let full = if continuation.is_empty() {
            trimmed.to_string()
        } else {
            continuation.push_str(trimmed);
            let result = continuation.clone();
            continuation.clear();
            result
        };
        raw_lines.push(line);
        let original = raw_lines.join("\n");
        raw_lines.clear();

        let (keyword, arguments) = match full.split_once(char::is_whitespace) {
            Some((kw, args)) => (kw.to_uppercase(), args.trim().to_string()),
            None => (full.to_uppercase(), String::new()),
        };
        instructions.push(Instruction {
            keyword,
            arguments,
            start_line: line_start,
            end_line: i as u32 + 1,
            original,
        });
    }

    instructions
}

pub fn analyze(path: &str, content: &str, report: &mut PinningReport) -> Result<(), ScanError> {
    if !contains_commands(content) {
        return Ok(());
    }

    let instructions = parse_instructions(content);
    let mut alias_pinned: HashMap<String, bool> = HashMap::new();
    // One taint set per file: a download in one RUN block can be executed
    // in a later one.
    let mut tainted = TaintedFiles::new();

    for ins in &instructions {
        match ins.keyword.as_str() {
            "FROM" => handle_from(path, ins, &mut alias_pinned, report)?,
            "RUN" => handle_run(path, ins, &mut tainted, report)?,
            _ => {}
        }
    }
    Ok(())
}

fn handle_from(
    path: &str,
    ins: &Instruction,
    alias_pinned: &mut HashMap<String, bool>,
    report: &mut PinningReport,
) -> Result<(), ScanError> {
    // `--platform=…` and friends are not image references.
    let tokens: Vec<&str> = ins
        .arguments
        .split_whitespace()
        .filter(|t| !t.starts_with("--"))
        .collect();
    if tokens.is_empty() {
        return Err(ScanError::internal(
            path,
            format!("FROM with no image reference at line {}", ins.start_line),
        ));
    }

    let image = tokens[0];
    if image.eq_ignore_ascii_case("scratch") {
        return Ok(());
    }

    // A bare reference may name an earlier build stage; otherwise it needs
    // a digest.
    let pinned =
        alias_pinned.get(image).copied().unwrap_or(false) || IMAGE_DIGEST_RE.is_match(image);

    if tokens.len() >= 3 && tokens[1].eq_ignore_ascii_case("as") {
        alias_pinned.insert(tokens[2].to_string(), pinned);
    }

    let (name, pinned_at) = match image.split_once(':') {
        Some((name, tag)) => (name.to_string(), Some(tag.to_string())),
        None => (image.to_string(), None),
    };
    report.dependencies.push(Dependency {
        name: Some(name),
        pinned_at,
        pinned,
        kind: DependencyKind::DockerImage,
        location: SourceLocation {
            path: path.to_string(),
            start_line: ins.start_line,
            end_line: ins.end_line,
            snippet: ins.original.clone(),
        },
    });
    Ok(())
}

fn handle_run(
    path: &str,
    ins: &Instruction,
    tainted: &mut TaintedFiles,
    report: &mut PinningReport,
) -> Result<(), ScanError> {
    if ins.arguments.is_empty() {
        return Err(ScanError::internal(
            path,
            format!("RUN with no command at line {}", ins.start_line),
        ));
    }
    let fragment = run_shell_fragment(&ins.arguments);
    if fragment.is_empty() {
        return Ok(());
    }
    walk_fragment(
        path,
        &fragment,
        FragmentLines::Fixed(ins.start_line, ins.end_line),
        tainted,
        &mut report.dependencies,
    )
}

/// The shell text of a RUN instruction: exec-form JSON arrays are joined
/// with spaces (elements with whitespace re-quoted so they stay one
/// argument), leading `--mount=`-style flags dropped.
fn run_shell_fragment(arguments: &str) -> String {
    let trimmed = arguments.trim();
    if trimmed.starts_with('[') {
        if let Ok(parts) = serde_json::from_str::<Vec<String>>(trimmed) {
            return parts
                .iter()
                .map(|p| {
                    if p.contains(char::is_whitespace) {
                        format!("'{p}'")
                    } else {
                        p.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
        }
    }

    let mut rest = trimmed;
    while let Some(first) = rest.split_whitespace().next() {
        if !first.starts_with("--") {
            break;
        }
        rest = rest[first.len()..].trim_start();
    }
    rest.to_string()
}
