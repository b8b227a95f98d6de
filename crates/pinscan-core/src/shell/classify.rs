//! Pure predicates over extracted commands: download utilities,
//! interpreters, unpinned package-manager installs, and pinned-reference
//! checks for action and image references.

use once_cell::sync::Lazy;
use regex::Regex;

use super::command::Command;

const DOWNLOAD_UTILITIES: &[&str] = &["curl", "wget", "gsutil"];
const SHELL_INTERPRETERS: &[&str] = &["sh", "bash", "mksh", "dash", "ksh"];
const PYTHON_INTERPRETERS: &[&str] = &["python", "python3", "python2.7"];
const OTHER_INTERPRETERS: &[&str] = &["perl", "ruby", "php", "node", "nodejs", "java"];
const INTERPRETER_WRAPPERS: &[&str] = &["exec", "su"];

/// Strip one layer of surrounding single or double quotes.
pub fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2
        && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn basename(s: &str) -> &str {
    s.rsplit('/').next().unwrap_or(s)
}

/// Case-insensitive comparison of the last path segment, quotes stripped.
pub fn is_binary_name(expected: &str, actual: &str) -> bool {
    basename(strip_quotes(actual)).eq_ignore_ascii_case(expected)
}

fn matches_any(name: &str, table: &[&str]) -> bool {
    table.iter().any(|n| is_binary_name(n, name))
}

pub fn is_download_utility(cmd: &Command) -> bool {
    let Some(first) = cmd.first() else {
        return false;
    };
    if matches_any(first, DOWNLOAD_UTILITIES) {
        return true;
    }
    // aws s3api get-object
    is_binary_name("aws", first)
        && cmd.len() > 2
        && strip_quotes(&cmd.args[1]).eq_ignore_ascii_case("s3api")
        && strip_quotes(&cmd.args[2]).eq_ignore_ascii_case("get-object")
}

fn is_interpreter_name(name: &str) -> bool {
    matches_any(name, SHELL_INTERPRETERS)
        || matches_any(name, PYTHON_INTERPRETERS)
        || matches_any(name, OTHER_INTERPRETERS)
        || matches_any(name, INTERPRETER_WRAPPERS)
}

pub fn is_interpreter(cmd: &Command) -> bool {
    cmd.first().is_some_and(is_interpreter_name)
}

fn is_python_name(name: &str) -> bool {
    matches_any(name, PYTHON_INTERPRETERS)
}

/// Whether a `-c` payload of this command would be more shell. False only
/// for Python commands and the other named non-shell runtimes.
pub fn is_shell_interpreter_or_command(cmd: &Command) -> bool {
    let Some(first) = cmd.first() else {
        return false;
    };
    !(is_python_name(first) || matches_any(first, OTHER_INTERPRETERS))
}

/// Find an interpreter token with a later `-c`-style flag (a `-…` token
/// containing `c`), returning the interpreter name.
pub fn interpreter_with_command_flag(cmd: &Command) -> Option<String> {
    for (i, arg) in cmd.args.iter().enumerate() {
        let name = strip_quotes(arg);
        if !is_interpreter_name(name) {
            continue;
        }
        if cmd.args[i + 1..]
            .iter()
            .any(|a| a.starts_with('-') && a.contains('c'))
        {
            return Some(basename(name).to_string());
        }
    }
    None
}

/// The inline-shell payload of an interpreter `-c` invocation, when the
/// command is shell-flavored and the payload was captured as a literal.
pub fn nested_shell_payload(cmd: &Command) -> Option<String> {
    if !is_shell_interpreter_or_command(cmd) {
        return None;
    }
    interpreter_with_command_flag(cmd)?;
    let flag = cmd
        .args
        .iter()
        .position(|a| a.starts_with('-') && a.contains('c'))?;
    let payload = cmd.args.get(flag + 1)?;
    let payload = strip_quotes(payload);
    if payload.is_empty() {
        None
    } else {
        Some(payload.to_string())
    }
}

// ─── Package-manager pinning predicates ───

static GO_REMOTE_MODULE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+\.\w+/\w+").unwrap());
static FULL_HEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-f]{40,}$").unwrap());
static SEMVER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^v?\d+\.\d+\.\d+(-[0-9A-Za-z.-]+)?(\+[0-9A-Za-z.-]+)?$").unwrap()
});

/// `go get`/`go install` of a remote module without an immutable version.
/// Boolean flags between the subcommand and the package token
/// (`-d -f -t -u -v -fix -insecure`) are skipped; `@none`, a 40+ hex hash,
/// and a full semver (absent `-insecure`) count as pinned; local paths are
/// never flagged.
pub fn is_go_unpinned_download(cmd: &Command) -> bool {
    let Some(first) = cmd.first() else {
        return false;
    };
    if !is_binary_name("go", first) {
        return false;
    }

    let mut insecure = false;
    let mut subcommand_seen = false;
    for arg in &cmd.args[1..] {
        let arg = strip_quotes(arg);
        if !subcommand_seen {
            subcommand_seen =
                arg.eq_ignore_ascii_case("get") || arg.eq_ignore_ascii_case("install");
            continue;
        }
        if arg.starts_with('-') {
            if arg == "-insecure" {
                insecure = true;
            }
            continue;
        }
        // First non-flag token after the subcommand is the package.
        if !GO_REMOTE_MODULE_RE.is_match(arg) {
            return false;
        }
        return match arg.split_once('@') {
            None => true,
            Some((_, version)) => {
                !(version == "none"
                    || FULL_HEX_RE.is_match(version)
                    || (SEMVER_RE.is_match(version) && !insecure))
            }
        };
    }
    false
}

static PIP_VCS_SOURCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(git|svn|bzr|hg)\+").unwrap());
static PIP_PINNED_GIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^git(\+(https?|ssh|git))?://.*@[a-f0-9]{40}(#egg=.*)?$").unwrap()
});

/// An editable source is pinned when it is a local path, or a git URL
/// locked to a full commit hash. The VCS alternation admits svn/hg/bzr as
/// remote sources, but the pinned form only ever matches git, so those are
/// always unpinned.
fn is_pinned_editable_source(source: &str) -> bool {
    if !PIP_VCS_SOURCE_RE.is_match(source) {
        return true;
    }
    PIP_PINNED_GIT_RE.is_match(source)
}

fn is_unpinned_pip_args(args: &[String]) -> bool {
    let mut is_install = false;
    let mut editable = false;
    let mut has_require_hashes = false;
    let mut has_wheel = false;
    let mut has_package = false;
    let mut editable_pinned = true;

    for arg in args {
        let arg = strip_quotes(arg);
        if !is_install {
            is_install = arg.eq_ignore_ascii_case("install");
            continue;
        }
        if arg.eq_ignore_ascii_case("--require-hashes") {
            has_require_hashes = true;
            continue;
        }
        if arg.eq_ignore_ascii_case("-e") || arg.eq_ignore_ascii_case("--editable") {
            editable = true;
            continue;
        }
        if editable {
            editable_pinned = editable_pinned && is_pinned_editable_source(arg);
            editable = false;
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        if arg.ends_with(".whl") {
            has_wheel = true;
        } else {
            has_package = true;
        }
    }

    if !is_install || has_require_hashes {
        return false;
    }
    if !editable_pinned {
        return true;
    }
    if has_package {
        return true;
    }
    if has_wheel {
        return false;
    }
    // `-e local/path` alone is pinned; a bare `pip install` is not.
    !args
        .iter()
        .any(|a| strip_quotes(a).eq_ignore_ascii_case("-e") || strip_quotes(a).eq_ignore_ascii_case("--editable"))
}

/// `pip install` / `pip3 install` without hash verification.
pub fn is_unpinned_pip_install(cmd: &Command) -> bool {
    let Some(first) = cmd.first() else {
        return false;
    };
    if !is_binary_name("pip", first) && !is_binary_name("pip3", first) {
        return false;
    }
    is_unpinned_pip_args(&cmd.args[1..])
}

/// The `python -m pip install` spelling of the same thing.
pub fn is_unpinned_python_pip_install(cmd: &Command) -> bool {
    let Some(first) = cmd.first() else {
        return false;
    };
    if !is_python_name(first) || cmd.len() < 3 {
        return false;
    }
    if strip_quotes(&cmd.args[1]) != "-m" || !strip_quotes(&cmd.args[2]).eq_ignore_ascii_case("pip")
    {
        return false;
    }
    is_unpinned_pip_args(&cmd.args[3..])
}

/// npm fetches without lockfile verification: `install`, `i`,
/// `install-test`, and `update`. `npm ci` is clean.
pub fn is_npm_unpinned_download(cmd: &Command) -> bool {
    let Some(first) = cmd.first() else {
        return false;
    };
    if !is_binary_name("npm", first) {
        return false;
    }
    cmd.args[1..].iter().any(|a| {
        let a = strip_quotes(a);
        a.eq_ignore_ascii_case("install")
            || a.eq_ignore_ascii_case("i")
            || a.eq_ignore_ascii_case("install-test")
            || a.eq_ignore_ascii_case("update")
    })
}

/// `choco install` without checksum enforcement.
pub fn is_choco_unpinned_download(cmd: &Command) -> bool {
    let Some(first) = cmd.first() else {
        return false;
    };
    if !is_binary_name("choco", first) && !is_binary_name("choco.exe", first) {
        return false;
    }
    if cmd.len() < 2 || !strip_quotes(&cmd.args[1]).eq_ignore_ascii_case("install") {
        return false;
    }
    !cmd.args[2..].iter().any(|a| {
        let key = strip_quotes(a).split('=').next().unwrap_or("");
        key.eq_ignore_ascii_case("--requirechecksum")
            || key.eq_ignore_ascii_case("--requirechecksums")
            || key.eq_ignore_ascii_case("--require-checksums")
    })
}

/// `nuget install` without `-Version`, or `dotnet add … package` without
/// `-v`/`--version`.
pub fn is_nuget_unpinned_download(cmd: &Command) -> bool {
    let Some(first) = cmd.first() else {
        return false;
    };
    if is_binary_name("nuget", first) || is_binary_name("nuget.exe", first) {
        if cmd.len() < 2 || !strip_quotes(&cmd.args[1]).eq_ignore_ascii_case("install") {
            return false;
        }
        return !cmd.args[2..]
            .iter()
            .any(|a| strip_quotes(a).eq_ignore_ascii_case("-version"));
    }
    if is_binary_name("dotnet", first) || is_binary_name("dotnet.exe", first) {
        let mut add_seen = false;
        let mut package_seen = false;
        for arg in &cmd.args[1..] {
            let arg = strip_quotes(arg);
            if !add_seen {
                add_seen = arg.eq_ignore_ascii_case("add");
                continue;
            }
            if !package_seen {
                package_seen = arg.eq_ignore_ascii_case("package");
                continue;
            }
            if arg.eq_ignore_ascii_case("-v") || arg.eq_ignore_ascii_case("--version") {
                return false;
            }
        }
        return package_seen;
    }
    false
}

// ─── Action and image reference pinning ───

static DOCKER_ACTION_PINNED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^docker://.*@sha256:[a-f0-9]{64}$").unwrap());

/// Local actions are always pinned; GitHub actions need a 40+ hex commit
/// suffix; docker-referenced actions need a sha256 digest.
pub fn is_action_dependency_pinned(uses: &str) -> bool {
    if uses.starts_with("./") {
        return true;
    }
    if uses.starts_with("docker://") {
        return DOCKER_ACTION_PINNED_RE.is_match(uses);
    }
    match uses.rsplit_once('@') {
        Some((_, reference)) => {
            reference.len() >= 40 && reference.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

// ─── Download output targets (taint sources) ───

/// The local file a recognized download utility writes to, if statically
/// knowable. curl taints only through an explicit redirect, handled by the
/// walker.
pub fn download_target(cmd: &Command) -> Option<String> {
    let first = cmd.first()?;
    if is_binary_name("wget", first) {
        return wget_target(&cmd.args[1..]);
    }
    if is_binary_name("gsutil", first) {
        return copy_target(&cmd.args[1..]);
    }
    if is_binary_name("aws", first) && is_download_utility(cmd) {
        return copy_target(&cmd.args[3..]);
    }
    None
}

fn wget_target(args: &[String]) -> Option<String> {
    for (i, arg) in args.iter().enumerate() {
        let arg = strip_quotes(arg);
        if arg == "-O" || arg == "--output-document" {
            let dest = strip_quotes(args.get(i + 1)?);
            return if dest == "-" || dest.is_empty() {
                None
            } else {
                Some(dest.to_string())
            };
        }
        if let Some(dest) = arg.strip_prefix("--output-document=") {
            return Some(dest.to_string());
        }
    }
    // Default output is the URL's basename.
    args.iter()
        .map(|a| strip_quotes(a))
        .find(|a| !a.starts_with('-'))
        .and_then(url_basename)
}

fn url_basename(url: &str) -> Option<String> {
    let trimmed = url.split(['?', '#']).next()?;
    let (_, base) = trimmed.rsplit_once('/')?;
    if base.is_empty() {
        None
    } else {
        Some(base.to_string())
    }
}

/// Last non-remote argument of a copy-style command, if it names a file
/// rather than a directory. Mirrors Go's `filepath.Dir(p) == Clean(p)`
/// directory test.
fn copy_target(args: &[String]) -> Option<String> {
    let target = strip_quotes(args.last()?);
    if target.is_empty() || target.starts_with('-') || target.contains("://") {
        return None;
    }
    if parent_dir(target) == clean_path(target) {
        return None;
    }
    Some(clean_path(target))
}

fn clean_path(p: &str) -> String {
    if p.len() > 1 {
        p.trim_end_matches('/').to_string()
    } else {
        p.to_string()
    }
}

fn parent_dir(p: &str) -> String {
    match p.rsplit_once('/') {
        Some(("", _)) => "/".to_string(),
        Some((dir, _)) => dir.to_string(),
        None => ".".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(args: &[&str]) -> Command {
        Command::from_args(args.iter().copied())
    }

    #[test]
    fn test_is_binary_name() {
        assert!(is_binary_name("curl", "/usr/bin/curl"));
        assert!(is_binary_name("bash", "BASH"));
        assert!(is_binary_name("bash", "'bash'"));
        assert!(!is_binary_name("sh", "install.sh"));
    }

    #[test]
    fn test_download_utilities() {
        assert!(is_download_utility(&cmd(&["curl", "https://x"])));
        assert!(is_download_utility(&cmd(&["wget", "https://x"])));
        assert!(is_download_utility(&cmd(&["gsutil", "cp", "gs://b/o", "f"])));
        assert!(is_download_utility(&cmd(&[
            "aws", "s3api", "get-object", "--bucket", "b"
        ])));
        assert!(!is_download_utility(&cmd(&["aws", "s3", "cp", "x", "y"])));
        assert!(!is_download_utility(&cmd(&["git", "clone", "x"])));
    }

    #[test]
    fn test_interpreters() {
        assert!(is_interpreter(&cmd(&["bash"])));
        assert!(is_interpreter(&cmd(&["/bin/sh"])));
        assert!(is_interpreter(&cmd(&["python3"])));
        assert!(is_interpreter(&cmd(&["su", "-c", "x"])));
        assert!(!is_interpreter(&cmd(&["make"])));
    }

    #[test]
    fn test_shell_interpreter_or_command() {
        assert!(is_shell_interpreter_or_command(&cmd(&["bash", "-c", "x"])));
        assert!(is_shell_interpreter_or_command(&cmd(&["exec", "bash"])));
        assert!(!is_shell_interpreter_or_command(&cmd(&["python", "-c", "x"])));
        assert!(!is_shell_interpreter_or_command(&cmd(&["node", "-e", "x"])));
    }

    #[test]
    fn test_nested_shell_payload() {
        assert_eq!(
            nested_shell_payload(&cmd(&["bash", "-c", "'curl x | bash'"])),
            Some("curl x | bash".to_string())
        );
        assert_eq!(
            nested_shell_payload(&cmd(&["su", "-c", "'./run.sh'", "builder"])),
            Some("./run.sh".to_string())
        );
        assert_eq!(nested_shell_payload(&cmd(&["python", "-c", "'print()'"])), None);
        assert_eq!(nested_shell_payload(&cmd(&["grep", "-c", "foo", "f"])), None);
    }

    #[test]
    fn test_go_pinning() {
        assert!(is_go_unpinned_download(&cmd(&["go", "get", "example.com/pkg"])));
        assert!(is_go_unpinned_download(&cmd(&["go", "get", "example.com/pkg@main"])));
        assert!(is_go_unpinned_download(&cmd(&[
            "go", "install", "-v", "example.com/pkg@latest"
        ])));
        // Full semver is accepted as pinned.
        assert!(!is_go_unpinned_download(&cmd(&["go", "get", "example.com/pkg@v1.2.3"])));
        // Unless -insecure disables the exemption.
        assert!(is_go_unpinned_download(&cmd(&[
            "go", "get", "-insecure", "example.com/pkg@v1.2.3"
        ])));
        // 40-hex hashes and @none are pinned.
        assert!(!is_go_unpinned_download(&cmd(&[
            "go",
            "get",
            "example.com/pkg@abcdef0123456789abcdef0123456789abcdef01"
        ])));
        assert!(!is_go_unpinned_download(&cmd(&["go", "get", "example.com/pkg@none"])));
        // Local paths are not remote modules.
        assert!(!is_go_unpinned_download(&cmd(&["go", "install", "./cmd/tool"])));
        assert!(!is_go_unpinned_download(&cmd(&["go", "build", "./..."])));
    }

    #[test]
    fn test_pip_pinning() {
        assert!(is_unpinned_pip_install(&cmd(&["pip", "install", "requests"])));
        assert!(is_unpinned_pip_install(&cmd(&["pip3", "install", "requests"])));
        assert!(is_unpinned_pip_install(&cmd(&["pip", "install"])));
        assert!(!is_unpinned_pip_install(&cmd(&[
            "pip",
            "install",
            "--require-hashes",
            "requests"
        ])));
        // Wheel files are immutable artifacts.
        assert!(!is_unpinned_pip_install(&cmd(&["pip", "install", "pkg.whl"])));
        assert!(is_unpinned_pip_install(&cmd(&["pip", "install", "pkg.whl", "extra"])));
        assert!(!is_unpinned_pip_install(&cmd(&["pip", "download", "requests"])));
        assert!(!is_unpinned_pip_install(&cmd(&["pipenv", "install", "requests"])));
    }

    #[test]
    fn test_pip_editable_pinning() {
        assert!(!is_unpinned_pip_install(&cmd(&[
            "pip",
            "install",
            "-e",
            "git+https://github.com/o/r.git@aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
        ])));
        assert!(is_unpinned_pip_install(&cmd(&[
            "pip",
            "install",
            "-e",
            "git+https://github.com/o/r.git@v1.0"
        ])));
        // Local editable installs are pinned.
        assert!(!is_unpinned_pip_install(&cmd(&["pip", "install", "-e", "."])));
        // Non-git VCS sources never match the pinned form.
        assert!(is_unpinned_pip_install(&cmd(&[
            "pip",
            "install",
            "-e",
            "hg+https://x/y@aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
        ])));
    }

    #[test]
    fn test_python_m_pip() {
        assert!(is_unpinned_python_pip_install(&cmd(&[
            "python", "-m", "pip", "install", "requests"
        ])));
        assert!(!is_unpinned_python_pip_install(&cmd(&[
            "python",
            "-m",
            "pip",
            "install",
            "--require-hashes",
            "-r",
            "requirements.txt"
        ])));
        assert!(!is_unpinned_python_pip_install(&cmd(&["python", "-m", "venv", "env"])));
    }

    #[test]
    fn test_npm_pinning() {
        assert!(is_npm_unpinned_download(&cmd(&["npm", "install", "left-pad"])));
        assert!(is_npm_unpinned_download(&cmd(&["npm", "i"])));
        assert!(is_npm_unpinned_download(&cmd(&["npm", "install-test"])));
        assert!(is_npm_unpinned_download(&cmd(&["npm", "update"])));
        assert!(!is_npm_unpinned_download(&cmd(&["npm", "ci"])));
        assert!(!is_npm_unpinned_download(&cmd(&["npm", "run", "build"])));
    }

    #[test]
    fn test_choco_pinning() {
        assert!(is_choco_unpinned_download(&cmd(&["choco", "install", "git"])));
        assert!(!is_choco_unpinned_download(&cmd(&[
            "choco",
            "install",
            "git",
            "--requirechecksums"
        ])));
        assert!(!is_choco_unpinned_download(&cmd(&[
            "choco",
            "install",
            "git",
            "--require-checksums=true"
        ])));
        assert!(!is_choco_unpinned_download(&cmd(&["choco", "upgrade", "git"])));
    }

    #[test]
    fn test_nuget_pinning() {
        assert!(is_nuget_unpinned_download(&cmd(&["nuget", "install", "Foo"])));
        assert!(!is_nuget_unpinned_download(&cmd(&[
            "nuget", "install", "Foo", "-Version", "1.2.3"
        ])));
        assert!(is_nuget_unpinned_download(&cmd(&["dotnet", "add", "package", "Foo"])));
        assert!(!is_nuget_unpinned_download(&cmd(&[
            "dotnet",
            "add",
            "app.csproj",
            "package",
            "Foo",
            "--version",
            "1.2.3"
        ])));
        assert!(!is_nuget_unpinned_download(&cmd(&["dotnet", "build"])));
    }

    #[test]
    fn test_action_pinning() {
        assert!(is_action_dependency_pinned(
            "actions/checkout@a5ac7e51b41094c92402da3b24376905380afc29"
        ));
        assert!(!is_action_dependency_pinned("actions/checkout@v4"));
        assert!(!is_action_dependency_pinned("some/action@main"));
        assert!(!is_action_dependency_pinned("some/action"));
        assert!(is_action_dependency_pinned("./local/action@whatever"));
        assert!(is_action_dependency_pinned(&format!(
            "docker://gcr.io/distroless/static@sha256:{}",
            "a".repeat(64)
        )));
        assert!(!is_action_dependency_pinned("docker://alpine:3.19"));
    }

    #[test]
    fn test_wget_target() {
        assert_eq!(
            download_target(&cmd(&["wget", "-O", "install.sh", "https://x/i"])),
            Some("install.sh".to_string())
        );
        assert_eq!(
            download_target(&cmd(&["wget", "https://x/install.sh"])),
            Some("install.sh".to_string())
        );
        assert_eq!(download_target(&cmd(&["wget", "-O", "-", "https://x/i"])), None);
        assert_eq!(
            download_target(&cmd(&["wget", "--output-document=out.sh", "https://x/i"])),
            Some("out.sh".to_string())
        );
    }

    #[test]
    fn test_copy_targets() {
        assert_eq!(
            download_target(&cmd(&["gsutil", "cp", "gs://b/o.sh", "/tmp/o.sh"])),
            Some("/tmp/o.sh".to_string())
        );
        // Directory destinations are not a single tainted file.
        assert_eq!(download_target(&cmd(&["gsutil", "cp", "gs://b/o.sh", "."])), None);
        assert_eq!(
            download_target(&cmd(&[
                "aws", "s3api", "get-object", "--bucket", "b", "--key", "k", "out/run.sh"
            ])),
            Some("out/run.sh".to_string())
        );
        // curl taints only through redirects.
        assert_eq!(download_target(&cmd(&["curl", "https://x/i.sh"])), None);
    }
}
