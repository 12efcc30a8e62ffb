//! Per-file verdicts collected while checking a change.

use serde::{Deserialize, Serialize};

/// Kind of a report message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// The file changed in a documentation-only way
    Success,
    /// The file has changes beyond documentation
    Fail,
    /// The file could not be checked
    Error,
    /// Informational note that does not affect the verdict
    Info,
}

impl MessageKind {
    /// Failures and errors are reported on stderr.
    pub fn is_problem(self) -> bool {
        matches!(self, MessageKind::Fail | MessageKind::Error)
    }
}

/// A verdict about one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub filename: String,
    pub text: String,
}

/// Aggregated outcome of checking a set of files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// At least one file could not be checked
    pub errored: bool,
    /// Every file changed in a documentation-only way
    pub is_doc_only: bool,
    pub messages: Vec<Message>,
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

impl Report {
    pub fn new() -> Self {
        Self {
            errored: false,
            is_doc_only: true,
            messages: Vec::new(),
        }
    }

    pub fn success(&mut self, filename: impl Into<String>, text: impl Into<String>) {
        self.push(MessageKind::Success, filename.into(), text.into());
    }

    pub fn fail(&mut self, filename: impl Into<String>, text: impl Into<String>) {
        self.is_doc_only = false;
        self.push(MessageKind::Fail, filename.into(), text.into());
    }

    pub fn error(&mut self, filename: impl Into<String>, text: impl Into<String>) {
        self.errored = true;
        self.is_doc_only = false;
        self.push(MessageKind::Error, filename.into(), text.into());
    }

    pub fn info(&mut self, filename: impl Into<String>, text: impl Into<String>) {
        self.push(MessageKind::Info, filename.into(), text.into());
    }

    /// Fold the messages of another report into this one.
    pub fn merge(&mut self, other: Report) {
        self.errored |= other.errored;
        self.is_doc_only &= other.is_doc_only;
        self.messages.extend(other.messages);
    }

    /// Process exit code: 1 if errored, 2 if not documentation-only, 0 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.errored {
            1
        } else if !self.is_doc_only {
            2
        } else {
            0
        }
    }

    fn push(&mut self, kind: MessageKind, filename: String, text: String) {
        self.messages.push(Message {
            kind,
            filename,
            text,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_is_doc_only() {
        let report = Report::new();
        assert!(report.is_doc_only);
        assert!(!report.errored);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_fail_clears_doc_only() {
        let mut report = Report::new();
        report.info("README.md", "is documentation.");
        report.fail("setup.py", "contains non-docstring changes.");
        assert!(!report.is_doc_only);
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn test_error_wins_over_fail() {
        let mut report = Report::new();
        report.fail("a.py", "contains non-docstring changes.");
        report.error("b.py", "internal invariant violated: lost");
        assert!(report.errored);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_merge() {
        let mut report = Report::new();
        report.success("a.py", "contains only docstring changes.");
        let mut other = Report::new();
        other.fail("b.txt", "is not documentation.");
        report.merge(other);
        assert_eq!(report.messages.len(), 2);
        assert!(!report.is_doc_only);
        assert!(!report.errored);
    }

    #[test]
    fn test_serialized_message_type() {
        let mut report = Report::new();
        report.success("a.py", "contains only docstring changes.");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["messages"][0]["type"], "success");
        assert_eq!(json["is_doc_only"], true);
    }
}
