//! # doconlylib
//!
//! Detect changes to Python source files that only touch docstrings.
//!
//! ## Overview
//!
//! A change is documentation-only when, once the docstrings of modules,
//! classes and functions are disregarded, both versions of every file are
//! identical token for token. Comments, blank lines inside code and string
//! literals outside docstring position all count as code.
//!
//! Files are parsed into a lossless syntax tree ([`syntax`]) so that nothing,
//! not even whitespace, is lost. Two formulations decide the question:
//!
//! - **Lockstep**: both trees are flattened and walked side by side; a
//!   docstring present on one side only is consumed together with the
//!   formatting around it ([`is_docstring_only`])
//! - **Stripping**: every docstring is deleted and the remaining trees are
//!   compared ([`is_docstring_only_stripped`])
//!
//! ## Features
//!
//! - **Hooks**: route changed files to a checker by glob pattern
//!   (documentation files, Python files)
//! - **Reports**: per-file verdicts with a process exit code
//! - **Git integration**: check every file changed between two commits
//!
//! ## Example
//!
//! ```rust
//! use doconlylib::{is_docstring_only, run_hooks, CheckOptions, FileContents};
//!
//! // A single pair of texts
//! assert!(is_docstring_only("'''Old.'''\nx = 1\n", "'''New.'''\nx = 1\n").unwrap());
//! assert!(!is_docstring_only("x = 1\n", "x = 2\n").unwrap());
//!
//! // A set of changed files through the default hooks
//! let hooks = CheckOptions::new().build_hooks().unwrap();
//! let files = vec![
//!     FileContents::new("README.md", Some("a".into()), Some("b".into())),
//!     FileContents::new("pkg/mod.py", None, Some("\"\"\"Doc.\"\"\"\n".into())),
//! ];
//! let report = run_hooks(&hooks, &files);
//! assert!(report.is_doc_only);
//! assert_eq!(report.exit_code(), 0);
//! ```

pub mod data;
pub mod error;
pub mod hooks;
pub mod options;
pub mod report;
pub mod source;
pub mod syntax;

pub use data::{
    diff_commits, is_docstring_only, is_docstring_only_stripped, parse_commit_range,
    strip_docstrings, DiffReport, DocLocation, FileChange, FileChangeType,
};
pub use error::DoconlyError;
pub use hooks::{run_hooks, FileContents, Hook, HookKind};
pub use options::CheckOptions;
pub use report::{Message, MessageKind, Report};
pub use source::FilterConfig;
pub use syntax::{parse_module, SyntaxKind, SyntaxNode};

/// Result type for doconlylib operations
pub type Result<T> = std::result::Result<T, DoconlyError>;
