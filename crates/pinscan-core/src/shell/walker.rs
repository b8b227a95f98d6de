//! Depth-first walk of a parsed shell fragment.
//!
//! One walk per fragment, carrying the file's tainted-download set so that
//! "download now, execute many statements later" is caught without
//! re-parsing. Detectors never stop the descent; a fragment that fails to
//! parse fails the whole file as a recoverable error.

use std::collections::HashSet;

use tree_sitter::{Node, Parser, Tree};

use crate::error::ScanError;
use crate::report::{Dependency, DependencyKind, SourceLocation};

use super::classify::{
    self, is_download_utility, is_interpreter, nested_shell_payload, strip_quotes,
};
use super::command::{extract_command, node_lines, Command};

/// Files observed as download targets earlier in the current file's walk.
/// Insert-only for the file's lifetime.
pub type TaintedFiles = HashSet<String>;

/// How fragment-relative rows map back to lines of the source file.
#[derive(Debug, Clone, Copy)]
pub enum FragmentLines {
    /// Added to the 1-based in-fragment line. Whole scripts use 0; workflow
    /// steps use the script's position in the file.
    Offset(u32),
    /// Every finding carries this fixed range. Used for flattened
    /// Dockerfile `RUN` instructions, whose fragment no longer has the
    /// file's line structure.
    Fixed(u32, u32),
}

/// Parse one shell fragment and walk it, appending findings to `deps`.
pub fn walk_fragment(
    path: &str,
    text: &str,
    lines: FragmentLines,
    tainted: &mut TaintedFiles,
    deps: &mut Vec<Dependency>,
) -> Result<(), ScanError> {
    let tree = parse_shell(path, text)?;
    let mut walk = Walk {
        path,
        lines,
        override_lines: match lines {
            FragmentLines::Fixed(start, end) => Some((start, end)),
            FragmentLines::Offset(_) => None,
        },
        tainted,
        deps,
    };
    walk.visit(tree.root_node(), text.as_bytes())
}

fn parse_shell(path: &str, text: &str) -> Result<Tree, ScanError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_bash::LANGUAGE.into())
        .map_err(|e| ScanError::internal(path, format!("loading bash grammar: {e}")))?;
    let tree = parser
        .parse(text, None)
        .ok_or_else(|| ScanError::parse(path, "shell parser produced no tree"))?;
    if tree.root_node().has_error() {
        return Err(ScanError::parse(path, "shell syntax not understood"));
    }
    Ok(tree)
}

struct Walk<'a> {
    path: &'a str,
    lines: FragmentLines,
    /// When set, findings inherit this range instead of node positions:
    /// fixed-range fragments and nested `-c` payloads.
    override_lines: Option<(u32, u32)>,
    tainted: &'a mut TaintedFiles,
    deps: &'a mut Vec<Dependency>,
}

impl Walk<'_> {
    fn visit(&mut self, node: Node, src: &[u8]) -> Result<(), ScanError> {
        match node.kind() {
            "pipeline" => self.check_pipeline(node, src),
            "command" => self.check_command(node, src)?,
            "redirected_statement" => self.check_redirected_statement(node, src),
            _ => {}
        }

        // Pre-order, exhaustive: a detector firing never stops the descent.
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, src)?;
        }
        Ok(())
    }

    fn location(&self, node: Node, src: &[u8]) -> SourceLocation {
        let (start, end) = match self.override_lines {
            Some(range) => range,
            None => {
                let (s, e) = node_lines(node);
                let offset = match self.lines {
                    FragmentLines::Offset(o) => o,
                    FragmentLines::Fixed(..) => 0,
                };
                (s + offset, e + offset)
            }
        };
        SourceLocation {
            path: self.path.to_string(),
            start_line: start,
            end_line: end,
            snippet: node.utf8_text(src).unwrap_or_default().to_string(),
        }
    }

    fn push_download_then_run(&mut self, node: Node, src: &[u8]) {
        self.deps.push(Dependency {
            name: None,
            pinned_at: None,
            pinned: false,
            kind: DependencyKind::DownloadThenRun,
            location: self.location(node, src),
        });
    }

    /// `X | … | Y` where some command after a download utility is an
    /// interpreter. At most one finding per pipeline node.
    fn check_pipeline(&mut self, node: Node, src: &[u8]) {
        let mut downloaded = false;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            let Some(cmd_node) = pipeline_command(child) else {
                continue;
            };
            let Some(cmd) = extract_command(cmd_node, src) else {
                continue;
            };
            if downloaded && is_interpreter(&cmd) {
                self.push_download_then_run(node, src);
                return;
            }
            if is_download_utility(&cmd) {
                downloaded = true;
            }
        }
    }

    fn check_command(&mut self, node: Node, src: &[u8]) -> Result<(), ScanError> {
        let Some(cmd) = extract_command(node, src) else {
            return Ok(());
        };

        // Execution of a file downloaded earlier in this walk.
        if self.references_tainted_file(&cmd) {
            self.push_download_then_run(node, src);
        }

        // Interpreter fed by a process-substituted download:
        // `bash <(wget -qO- URL)`.
        if is_interpreter(&cmd) && has_download_process_substitution(node, src) {
            self.push_download_then_run(node, src);
        }

        if let Some(kind) = unpinned_package_download(&cmd) {
            self.deps.push(Dependency {
                name: None,
                pinned_at: None,
                pinned: false,
                kind,
                location: self.location(node, src),
            });
        }

        // Statement-level downloads record their output target. Pipelines
        // stream to the next command and redirected statements are handled
        // at the statement node.
        let parent_kind = node.parent().map(|p| p.kind()).unwrap_or("");
        if parent_kind != "pipeline" && parent_kind != "redirected_statement" {
            self.record_download_target(&cmd);
        }

        // `sh -c "…"` payloads are more shell: re-parse and walk with the
        // same taint set. Findings inherit this node's line range.
        if let Some(payload) = nested_shell_payload(&cmd) {
            self.walk_nested(node, &payload)?;
        }
        Ok(())
    }

    fn walk_nested(&mut self, parent: Node, payload: &str) -> Result<(), ScanError> {
        // A nested parse failure aborts the whole file's walk.
        let tree = parse_shell(self.path, payload)?;
        let saved = self.override_lines;
        self.override_lines = Some(match saved {
            Some(range) => range,
            None => {
                let (s, e) = node_lines(parent);
                let offset = match self.lines {
                    FragmentLines::Offset(o) => o,
                    FragmentLines::Fixed(..) => 0,
                };
                (s + offset, e + offset)
            }
        });
        let result = self.visit(tree.root_node(), payload.as_bytes());
        self.override_lines = saved;
        result
    }

    fn references_tainted_file(&self, cmd: &Command) -> bool {
        let Some(first) = cmd.first() else {
            return false;
        };
        if self.tainted.contains(normalize_exec_path(strip_quotes(first))) {
            return true;
        }
        is_interpreter(cmd)
            && cmd.args[1..]
                .iter()
                .any(|a| self.tainted.contains(normalize_exec_path(strip_quotes(a))))
    }

    fn record_download_target(&mut self, cmd: &Command) {
        if !is_download_utility(cmd) {
            return;
        }
        if let Some(target) = classify::download_target(cmd) {
            self.tainted
                .insert(normalize_exec_path(&target).to_string());
        }
    }

    /// `cmd … > file`: a download utility with an explicit output redirect
    /// taints the redirect destination; otherwise the utility-specific
    /// rules apply.
    fn check_redirected_statement(&mut self, node: Node, src: &[u8]) {
        let Some(body) = statement_body(node) else {
            return;
        };
        let Some(cmd) = extract_command(body, src) else {
            return;
        };
        if !is_download_utility(&cmd) {
            return;
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() != "file_redirect" {
                continue;
            }
            if !has_output_operator(child) {
                continue;
            }
            if let Some(dest) = redirect_destination(child, src) {
                self.tainted
                    .insert(normalize_exec_path(&dest).to_string());
                return;
            }
        }

        self.record_download_target(&cmd);
    }
}

/// A pipeline child that is (or wraps) a command.
fn pipeline_command(node: Node) -> Option<Node> {
    match node.kind() {
        "command" => Some(node),
        "redirected_statement" => statement_body(node),
        _ => None,
    }
}

fn statement_body(node: Node) -> Option<Node> {
    if let Some(body) = node.child_by_field_name("body") {
        if body.kind() == "command" {
            return Some(body);
        }
    }
    let mut cursor = node.walk();
    let result = node.children(&mut cursor).find(|c| c.kind() == "command");
    result
}

fn has_output_operator(redirect: Node) -> bool {
    let mut cursor = redirect.walk();
    let result = redirect
        .children(&mut cursor)
        .any(|c| c.kind() == ">" || c.kind() == ">>");
    result
}

fn redirect_destination(redirect: Node, src: &[u8]) -> Option<String> {
    let dest = redirect
        .child_by_field_name("destination")
        .or_else(|| {
            let mut cursor = redirect.walk();
            redirect
                .children(&mut cursor)
                .filter(|c| matches!(c.kind(), "word" | "string" | "raw_string"))
                .last()
        })?;
    match dest.kind() {
        "word" => dest.utf8_text(src).ok().map(str::to_string),
        "raw_string" | "string" => dest
            .utf8_text(src)
            .ok()
            .map(|t| strip_quotes(t).to_string()),
        _ => None,
    }
}

fn normalize_exec_path(path: &str) -> &str {
    path.strip_prefix("./").unwrap_or(path)
}

/// Process-substitution arguments wrapping a download-utility command.
fn has_download_process_substitution(node: Node, src: &[u8]) -> bool {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() != "process_substitution" {
            continue;
        }
        if let Some(inner) = first_command_descendant(child) {
            if let Some(cmd) = extract_command(inner, src) {
                if is_download_utility(&cmd) {
                    return true;
                }
            }
        }
    }
    false
}

fn first_command_descendant(node: Node) -> Option<Node> {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if current.kind() == "command" {
            return Some(current);
        }
        for i in (0..current.child_count()).rev() {
            if let Some(child) = current.child(i) {
                stack.push(child);
            }
        }
    }
    None
}

fn unpinned_package_download(cmd: &Command) -> Option<DependencyKind> {
    if classify::is_go_unpinned_download(cmd) {
        return Some(DependencyKind::GoCommand);
    }
    if classify::is_unpinned_pip_install(cmd) || classify::is_unpinned_python_pip_install(cmd) {
        return Some(DependencyKind::PipCommand);
    }
    if classify::is_npm_unpinned_download(cmd) {
        return Some(DependencyKind::NpmCommand);
    }
    if classify::is_choco_unpinned_download(cmd) {
        return Some(DependencyKind::ChocoCommand);
    }
    if classify::is_nuget_unpinned_download(cmd) {
        return Some(DependencyKind::NugetCommand);
    }
    None
}
