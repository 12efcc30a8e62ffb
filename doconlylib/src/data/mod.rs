//! Docstring-only change detection over lossless syntax trees.
//!
//! The pipeline for one pair of files:
//!
//! - **Location**: find the docstring of every module, class and function
//!   (`locate_all`)
//! - **Sequencing**: flatten both trees in preorder (`flatten`, `NodeCursor`)
//! - **Comparison**: walk both sequences in lockstep, skipping docstrings
//!   and the formatting next to them (`is_docstring_only`)
//! - **Stripping**: the same verdict by deleting docstrings and comparing
//!   the rest (`is_docstring_only_stripped`)
//!
//! [`diff_commits`] applies the hooks to every file changed between two
//! commits.
//!
//! ## Example
//!
//! ```rust
//! use doconlylib::data::{is_docstring_only, is_docstring_only_stripped};
//!
//! let before = "def f():\n    \"\"\"Old.\"\"\"\n    return 1\n";
//! let after = "def f():\n    \"\"\"New.\"\"\"\n    return 1\n";
//! assert!(is_docstring_only(before, after).unwrap());
//! assert!(is_docstring_only_stripped(before, after).unwrap());
//! ```

pub mod comparator;
pub mod consumer;
pub mod diff;
pub mod locator;
pub mod sequence;
pub mod strip;

pub use comparator::{compare_trees, is_docstring_only};
pub use diff::{diff_commits, parse_commit_range, DiffReport, FileChange, FileChangeType};
pub use locator::{locate_all, locate_docstring, DocLocation};
pub use sequence::{flatten, shallow_eq, NodeCursor};
pub use strip::{deep_eq, is_docstring_only_stripped, strip_docstring_pair, strip_docstrings};
