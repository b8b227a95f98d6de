//! Normalizes a parsed shell `command` node into a flat argument list.
//!
//! Only arguments made of exactly one literal syntactic part survive:
//! concatenations, expansions, and substitutions are dropped rather than
//! guessed at, so dynamic commands under-report instead of mis-reporting.

use tree_sitter::Node;

/// One shell invocation's argv. Quote markers are preserved (`'x'`, `"x"`
/// stay delimited; bare words are unquoted); every bare `sudo` literal is
/// elided. Lives for a single AST-node visit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub args: Vec<String>,
}

impl Command {
    pub fn first(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    #[cfg(test)]
    pub fn from_args<S: Into<String>>(args: impl IntoIterator<Item = S>) -> Self {
        Command {
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Extract the literal argv of a `command` node. Returns `None` when nothing
/// literal could be extracted (e.g. the whole command is a variable
/// expansion); callers must skip such nodes, not error.
pub fn extract_command(node: Node, source: &[u8]) -> Option<Command> {
    if node.kind() != "command" {
        return None;
    }

    let mut args = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "command_name" => {
                if let Some(inner) = child.named_child(0) {
                    push_literal_part(inner, source, &mut args);
                }
            }
            "variable_assignment" => {}
            _ => push_literal_part(child, source, &mut args),
        }
    }

    if args.is_empty() {
        None
    } else {
        Some(Command { args })
    }
}

/// Append one argument if the node is a single literal part; drop it
/// otherwise. Bare `sudo` literals are elided here.
fn push_literal_part(node: Node, source: &[u8], args: &mut Vec<String>) {
    match node.kind() {
        "word" | "number" => {
            if let Ok(text) = node.utf8_text(source) {
                if !text.eq_ignore_ascii_case("sudo") {
                    args.push(text.to_string());
                }
            }
        }
        // Kept verbatim, quotes included.
        "raw_string" => {
            if let Ok(text) = node.utf8_text(source) {
                args.push(text.to_string());
            }
        }
        // A double-quoted string survives only when it wraps exactly one
        // literal content part (no expansions, no substitutions).
        "string" => {
            if node.named_child_count() == 1 {
                let inner = node.named_child(0).expect("checked count");
                if inner.kind() == "string_content" {
                    if let Ok(text) = inner.utf8_text(source) {
                        args.push(format!("\"{text}\""));
                    }
                }
            }
        }
        _ => {}
    }
}

/// 1-based line span of a node within its fragment.
pub fn node_lines(node: Node) -> (u32, u32) {
    (
        node.start_position().row as u32 + 1,
        node.end_position().row as u32 + 1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::{Parser, Tree};

    fn parse(source: &str) -> Tree {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_bash::LANGUAGE.into())
            .unwrap();
        parser.parse(source, None).unwrap()
    }

    fn first_command(source: &str) -> Option<Command> {
        let tree = parse(source);
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            if node.kind() == "command" {
                return extract_command(node, source.as_bytes());
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                stack.push(child);
            }
        }
        None
    }

    #[test]
    fn test_bare_words() {
        let cmd = first_command("curl -sSL https://example.com/i.sh").unwrap();
        assert_eq!(cmd.args, vec!["curl", "-sSL", "https://example.com/i.sh"]);
    }

    #[test]
    fn test_sudo_is_elided() {
        let cmd = first_command("sudo apt-get update").unwrap();
        assert_eq!(cmd.first(), Some("apt-get"));
        let cmd = first_command("SUDO true").unwrap();
        assert_eq!(cmd.args, vec!["true"]);
    }

    #[test]
    fn test_quotes_preserved() {
        let cmd = first_command("bash -c 'curl x | bash'").unwrap();
        assert_eq!(cmd.args, vec!["bash", "-c", "'curl x | bash'"]);

        let cmd = first_command("echo \"hello\"").unwrap();
        assert_eq!(cmd.args, vec!["echo", "\"hello\""]);
    }

    #[test]
    fn test_dynamic_arguments_dropped() {
        let cmd = first_command("pip install $PKG").unwrap();
        assert_eq!(cmd.args, vec!["pip", "install"]);

        let cmd = first_command("echo \"v$VERSION\"").unwrap();
        assert_eq!(cmd.args, vec!["echo"]);
    }

    #[test]
    fn test_concatenation_dropped() {
        let cmd = first_command("ba'sh' script.sh").unwrap();
        // The obfuscated name is a concatenation: only the literal arg
        // survives.
        assert_eq!(cmd.args, vec!["script.sh"]);
    }

    #[test]
    fn test_fully_dynamic_command_is_none() {
        assert!(first_command("$CMD").is_none());
    }

    #[test]
    fn test_assignment_prefix_ignored() {
        let cmd = first_command("FOO=bar make all").unwrap();
        assert_eq!(cmd.args, vec!["make", "all"]);
    }
}
