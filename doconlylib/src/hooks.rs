//! Hooks decide whether a changed file is documentation.
//!
//! Every hook owns the files matching its patterns. The first enabled hook
//! matching a file checks it; a file no hook matches is not documentation.
//!
//! - `unconditional`: the whole file is documentation (`*.rst`, `*.md`).
//! - `python`: only docstrings changed (`*.py`).

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::comparator::is_docstring_only;
use crate::error::DoconlyError;
use crate::report::Report;
use crate::source::FilterConfig;
use crate::Result;

pub const IS_DOCUMENTATION: &str = "is documentation.";
pub const IS_NOT_DOCUMENTATION: &str = "is not documentation.";
pub const ONLY_DOCSTRINGS: &str = "contains only docstring changes.";
pub const NOT_ONLY_DOCSTRINGS: &str = "contains non-docstring changes.";

/// The available hooks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    Unconditional,
    Python,
}

impl HookKind {
    pub const ALL: [HookKind; 2] = [HookKind::Unconditional, HookKind::Python];

    pub fn name(self) -> &'static str {
        match self {
            HookKind::Unconditional => "unconditional",
            HookKind::Python => "python",
        }
    }

    /// Files the hook owns unless configured otherwise.
    pub fn default_patterns(self) -> &'static [&'static str] {
        match self {
            HookKind::Unconditional => &["*.rst", "*.md"],
            HookKind::Python => &["*.py"],
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HookKind {
    type Err = DoconlyError;

    fn from_str(s: &str) -> Result<Self> {
        HookKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DoconlyError::UnknownHook(s.trim().to_string()))
    }
}

/// Contents of a changed file on both sides of the change.
///
/// `None` means the file does not exist on that side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContents {
    pub filename: String,
    pub before: Option<String>,
    pub after: Option<String>,
    /// Why a side could not be decoded; hooks reading the text report it as an error.
    pub unreadable: Option<String>,
}

impl FileContents {
    pub fn new(
        filename: impl Into<String>,
        before: Option<String>,
        after: Option<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            before,
            after,
            unreadable: None,
        }
    }

    /// Decode both sides as UTF-8.
    ///
    /// A side that does not decode is left out and the file is marked
    /// unreadable.
    pub fn from_bytes(
        filename: impl Into<String>,
        before: Option<Vec<u8>>,
        after: Option<Vec<u8>>,
    ) -> Self {
        let mut unreadable = None;
        let mut decode = |side: &'static str, bytes: Option<Vec<u8>>| {
            String::from_utf8(bytes?)
                .map_err(|source| {
                    let error = DoconlyError::InvalidUtf8 { side, source };
                    unreadable.get_or_insert_with(|| error.to_string());
                })
                .ok()
        };
        let before = decode("before", before);
        let after = decode("after", after);

        let mut contents = Self::new(filename, before, after);
        contents.unreadable = unreadable;
        contents
    }

    /// Read both sides from disk, naming the file after `after`.
    pub fn from_paths(before: impl AsRef<Path>, after: impl AsRef<Path>) -> Result<Self> {
        let after = after.as_ref();
        Ok(Self::from_bytes(
            after.display().to_string(),
            Some(read_file(before.as_ref())?),
            Some(read_file(after)?),
        ))
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| DoconlyError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

/// A hook together with the files it owns.
#[derive(Debug, Clone)]
pub struct Hook {
    kind: HookKind,
    filter: FilterConfig,
}

impl Hook {
    /// Create a hook owning its default patterns.
    pub fn new(kind: HookKind) -> Result<Self> {
        Self::with_patterns(kind, kind.default_patterns())
    }

    /// Create a hook owning the files matching `patterns`.
    pub fn with_patterns<S: AsRef<str>>(kind: HookKind, patterns: &[S]) -> Result<Self> {
        let filter = FilterConfig::from_lines(patterns.iter().map(AsRef::as_ref))?;
        Ok(Self { kind, filter })
    }

    pub fn kind(&self) -> HookKind {
        self.kind
    }

    pub fn matches(&self, filename: &str) -> bool {
        self.filter.matches(filename)
    }

    /// Check the given files, all of which this hook owns.
    pub fn run(&self, files: &[&FileContents]) -> Report {
        let mut report = Report::new();
        for file in files {
            match self.kind {
                HookKind::Unconditional => report.info(&file.filename, IS_DOCUMENTATION),
                HookKind::Python => check_python(&mut report, file),
            }
        }
        report
    }
}

fn check_python(report: &mut Report, file: &FileContents) {
    if let Some(reason) = &file.unreadable {
        tracing::warn!(file = %file.filename, error = %reason, "contents not decoded");
        report.error(&file.filename, reason.as_str());
        return;
    }
    let before = file.before.as_deref().unwrap_or_default();
    let after = file.after.as_deref().unwrap_or_default();
    match is_docstring_only(before, after) {
        Ok(true) => report.success(&file.filename, ONLY_DOCSTRINGS),
        Ok(false) => report.fail(&file.filename, NOT_ONLY_DOCSTRINGS),
        Err(e) if e.is_parse_failure() => {
            tracing::debug!(file = %file.filename, error = %e, "parse failure");
            report.fail(&file.filename, e.to_string());
        }
        Err(e) => {
            tracing::warn!(file = %file.filename, error = %e, "check aborted");
            report.error(&file.filename, e.to_string());
        }
    }
}

/// Run the hooks over a set of changed files.
///
/// Files no hook owns are reported first, then each hook's verdicts in
/// hook order.
pub fn run_hooks(hooks: &[Hook], files: &[FileContents]) -> Report {
    let mut report = Report::new();
    let mut owned: Vec<Vec<&FileContents>> = vec![Vec::new(); hooks.len()];

    for file in files {
        match hooks.iter().position(|hook| hook.matches(&file.filename)) {
            Some(index) => owned[index].push(file),
            None => report.fail(&file.filename, IS_NOT_DOCUMENTATION),
        }
    }

    for (hook, files) in hooks.iter().zip(&owned) {
        tracing::debug!(hook = %hook.kind(), files = files.len(), "running hook");
        report.merge(hook.run(files));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MessageKind;

    fn default_hooks() -> Vec<Hook> {
        HookKind::ALL
            .into_iter()
            .map(|kind| Hook::new(kind).unwrap())
            .collect()
    }

    fn changed(filename: &str, before: &str, after: &str) -> FileContents {
        FileContents::new(filename, Some(before.to_string()), Some(after.to_string()))
    }

    #[test]
    fn test_hook_kind_from_str() {
        assert_eq!("python".parse::<HookKind>().unwrap(), HookKind::Python);
        assert_eq!(" Unconditional ".parse::<HookKind>().unwrap(), HookKind::Unconditional);
        assert!(matches!(
            "rust".parse::<HookKind>(),
            Err(DoconlyError::UnknownHook(name)) if name == "rust"
        ));
    }

    #[test]
    fn test_documentation_files() {
        let files = [changed("docs/index.rst", "a", "b"), changed("README.md", "a", "b")];
        let report = run_hooks(&default_hooks(), &files);
        assert!(report.is_doc_only);
        assert_eq!(report.exit_code(), 0);
        assert!(report
            .messages
            .iter()
            .all(|m| m.kind == MessageKind::Info && m.text == IS_DOCUMENTATION));
    }

    #[test]
    fn test_unowned_file_is_not_documentation() {
        let files = [changed("Cargo.toml", "a", "b")];
        let report = run_hooks(&default_hooks(), &files);
        assert!(!report.is_doc_only);
        assert_eq!(report.messages[0].text, IS_NOT_DOCUMENTATION);
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn test_python_verdicts() {
        let files = [
            changed("a.py", "'''old'''\nx = 1\n", "'''new'''\nx = 1\n"),
            changed("b.py", "x = 1\n", "x = 2\n"),
        ];
        let report = run_hooks(&default_hooks(), &files);
        assert_eq!(report.messages[0].kind, MessageKind::Success);
        assert_eq!(report.messages[0].text, ONLY_DOCSTRINGS);
        assert_eq!(report.messages[1].kind, MessageKind::Fail);
        assert_eq!(report.messages[1].text, NOT_ONLY_DOCSTRINGS);
    }

    #[test]
    fn test_python_parse_failure_fails_the_file() {
        let files = [changed("a.py", "x = 1\n", "x = (\n")];
        let report = run_hooks(&default_hooks(), &files);
        assert_eq!(report.messages[0].kind, MessageKind::Fail);
        assert!(report.messages[0].text.contains("never closed"));
        assert!(!report.errored);
    }

    #[test]
    fn test_added_file_is_compared_with_empty_text() {
        let added = FileContents::new("new.py", None, Some("'''Doc.'''\n".to_string()));
        let code = FileContents::new("code.py", None, Some("x = 1\n".to_string()));
        let report = run_hooks(&default_hooks(), &[added, code]);
        assert_eq!(report.messages[0].kind, MessageKind::Success);
        assert_eq!(report.messages[1].kind, MessageKind::Fail);
    }

    #[test]
    fn test_first_matching_hook_owns_the_file() {
        let hooks = vec![
            Hook::with_patterns(HookKind::Unconditional, &["*.py"]).unwrap(),
            Hook::new(HookKind::Python).unwrap(),
        ];
        let report = run_hooks(&hooks, &[changed("a.py", "x = 1\n", "x = 2\n")]);
        assert_eq!(report.messages.len(), 1);
        assert_eq!(report.messages[0].kind, MessageKind::Info);
    }

    #[test]
    fn test_from_paths() {
        let dir = tempfile::tempdir().unwrap();
        let before = dir.path().join("before.py");
        let after = dir.path().join("after.py");
        std::fs::write(&before, "x = 1\n").unwrap();
        std::fs::write(&after, "x = 2\n").unwrap();

        let file = FileContents::from_paths(&before, &after).unwrap();
        assert_eq!(file.filename, after.display().to_string());
        assert_eq!(file.before.as_deref(), Some("x = 1\n"));

        let missing = FileContents::from_paths(dir.path().join("nope.py"), &after);
        assert!(matches!(missing, Err(DoconlyError::FileRead { .. })));
    }

    #[test]
    fn test_undecodable_python_file_is_an_error() {
        let file = FileContents::from_bytes(
            "latin1.py",
            Some(b"x = \"\xe9\"\n".to_vec()),
            Some(b"x = \"\xe8\"\n".to_vec()),
        );
        assert!(file.before.is_none() && file.after.is_none());

        let report = run_hooks(&default_hooks(), &[file]);
        assert_eq!(report.messages[0].kind, MessageKind::Error);
        assert!(report.messages[0].text.contains("not valid UTF-8"));
        assert!(report.errored);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_undecodable_documentation_file() {
        let file = FileContents::from_bytes("notes.md", None, Some(vec![0xff, b'\n']));
        assert!(file.unreadable.is_some());
        let report = run_hooks(&default_hooks(), &[file]);
        assert_eq!(report.messages[0].kind, MessageKind::Info);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_unowned_files_reported_first() {
        let files = [changed("a.py", "x\n", "x\n"), changed("setup.cfg", "", "a")];
        let report = run_hooks(&default_hooks(), &files);
        assert_eq!(report.messages[0].filename, "setup.cfg");
        assert_eq!(report.messages[1].filename, "a.py");
    }
}
