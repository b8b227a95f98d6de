//! Shell-script front-end: the whole file is one fragment.

use std::path::Path;

use crate::error::ScanError;
use crate::report::PinningReport;
use crate::shell::{walk_fragment, FragmentLines, TaintedFiles};

use super::contains_commands;

const SHELL_NAMES: &[&str] = &["sh", "bash", "mksh", "dash", "ksh"];

/// A file is a shell script when its shebang names a known shell; absent a
/// shebang, when its extension does.
pub fn is_shell_script(path: &str, content: &str) -> bool {
    if let Some(interpreter) = shebang_interpreter(content) {
        return SHELL_NAMES.contains(&interpreter);
    }
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SHELL_NAMES.iter().any(|s| ext.eq_ignore_ascii_case(s)))
}

/// The interpreter named by a shebang line, handling `#!/bin/sh`,
/// `#!/usr/bin/env bash`, `#!bash`, and `#!env bash`.
fn shebang_interpreter(content: &str) -> Option<&str> {
    let first_line = content.lines().next()?;
    let rest = first_line.strip_prefix("#!")?;
    let mut tokens = rest.split_whitespace();
    let head = tokens.next()?;
    let head = head.rsplit('/').next().unwrap_or(head);
    if head == "env" {
        tokens.next()
    } else {
        Some(head)
    }
}

pub fn analyze(path: &str, content: &str, report: &mut PinningReport) -> Result<(), ScanError> {
    if !contains_commands(content) {
        return Ok(());
    }
    let mut tainted = TaintedFiles::new();
    walk_fragment(
        path,
        content,
        FragmentLines::Offset(0),
        &mut tainted,
        &mut report.dependencies,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::DependencyKind;

    #[test]
    fn test_shebang_detection() {
        assert!(is_shell_script("install", "#!/bin/bash\necho hi"));
        assert!(is_shell_script("install", "#!/usr/bin/env sh\necho hi"));
        assert!(is_shell_script("install", "#!env dash\necho hi"));
        assert!(is_shell_script("install", "#!bash\necho hi"));
        assert!(!is_shell_script("install", "#!/usr/bin/env python3\nprint()"));
    }

    #[test]
    fn test_extension_fallback() {
        assert!(is_shell_script("scripts/setup.sh", "echo hi"));
        assert!(is_shell_script("scripts/setup.KSH", "echo hi"));
        assert!(!is_shell_script("setup.py", "print()"));
        // A shebang naming another language wins over the extension.
        assert!(!is_shell_script("setup.sh", "#!/usr/bin/env python\nprint()"));
    }

    #[test]
    fn test_analyze_whole_file() {
        let script = "#!/bin/sh\nwget -O tool.sh https://example.com/t\nsh tool.sh\n";
        let mut report = PinningReport::new();
        analyze("setup.sh", script, &mut report).unwrap();
        assert_eq!(report.dependencies.len(), 1);
        assert_eq!(report.dependencies[0].kind, DependencyKind::DownloadThenRun);
        assert_eq!(report.dependencies[0].location.start_line, 3);
    }

    #[test]
    fn test_comment_only_file_skipped() {
        let mut report = PinningReport::new();
        analyze("empty.sh", "# nothing here\n", &mut report).unwrap();
        assert!(report.dependencies.is_empty());
    }
}
