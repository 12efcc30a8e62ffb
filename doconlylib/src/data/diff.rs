//! Checking every file changed between two commits.
//!
//! Changed files are taken from the tree diff of the two commits. Each
//! file's contents on both sides are read from the object database and run
//! through the enabled hooks; a file missing on one side is checked against
//! empty text. Contents that are not UTF-8 make that file an error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DoconlyError;
use crate::hooks::{run_hooks, FileContents};
use crate::options::CheckOptions;
use crate::report::Report;
use crate::Result;

/// Type of file change in the diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileChangeType {
    /// File was added.
    Added,
    /// File was deleted.
    Deleted,
    /// File was modified.
    Modified,
}

/// A file changed between the two commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path to the file (relative to repo root).
    pub path: String,
    /// The type of change.
    pub change_type: FileChangeType,
}

/// Result of checking the changes between two commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffReport {
    /// Root path of the repository analyzed.
    pub root: PathBuf,
    /// Base commit (from).
    pub base: String,
    /// Target commit (to).
    pub head: String,
    /// Every changed file, in tree order.
    pub changes: Vec<FileChange>,
    /// Verdicts of the hooks.
    pub report: Report,
}

/// Split a commit range argument into base and head.
///
/// Accepts `base..head`, a separate `head`, or a lone `base` (head is `HEAD`).
pub fn parse_commit_range(base: &str, head: Option<&str>) -> Result<(String, String)> {
    if let Some(head) = head {
        return Ok((base.to_string(), head.to_string()));
    }
    match base.split_once("..") {
        Some((from, to)) if !to.contains("..") => {
            let to = if to.is_empty() { "HEAD" } else { to };
            Ok((from.to_string(), to.to_string()))
        }
        Some(_) => Err(DoconlyError::GitError(
            "Invalid commit range format. Use 'base..head' or 'base head'".to_string(),
        )),
        None => Ok((base.to_string(), "HEAD".to_string())),
    }
}

/// Check whether the changes between two commits are documentation-only.
pub fn diff_commits(
    repo_path: impl AsRef<Path>,
    base: &str,
    head: &str,
    options: &CheckOptions,
) -> Result<DiffReport> {
    let repo_path = repo_path.as_ref();
    let hooks = options.build_hooks()?;

    let repo = gix::discover(repo_path)
        .map_err(|e| DoconlyError::GitError(format!("Failed to discover git repository: {}", e)))?;

    let root = repo
        .work_dir()
        .ok_or_else(|| DoconlyError::GitError("Repository has no work directory".to_string()))?
        .to_path_buf();

    let base_commit = resolve_commit(&repo, base)?;
    let head_commit = resolve_commit(&repo, head)?;

    let base_tree = base_commit
        .tree()
        .map_err(|e| DoconlyError::GitError(format!("Failed to get tree for '{}': {}", base, e)))?;
    let head_tree = head_commit
        .tree()
        .map_err(|e| DoconlyError::GitError(format!("Failed to get tree for '{}': {}", head, e)))?;

    let blob_changes = compute_tree_diff(&base_tree, &head_tree)?;
    tracing::debug!(base, head, files = blob_changes.len(), "tree diff computed");

    let mut files = Vec::with_capacity(blob_changes.len());
    let mut changes = Vec::with_capacity(blob_changes.len());
    for change in blob_changes {
        let before = change.old_oid.map(|oid| read_blob(&repo, oid)).transpose()?;
        let after = change.new_oid.map(|oid| read_blob(&repo, oid)).transpose()?;
        files.push(FileContents::from_bytes(change.path.clone(), before, after));
        changes.push(FileChange {
            path: change.path,
            change_type: change.change_type,
        });
    }

    let report = run_hooks(&hooks, &files);

    Ok(DiffReport {
        root,
        base: base.to_string(),
        head: head.to_string(),
        changes,
        report,
    })
}

/// Internal representation of a changed blob
struct BlobChange {
    path: String,
    change_type: FileChangeType,
    old_oid: Option<gix::ObjectId>,
    new_oid: Option<gix::ObjectId>,
}

/// Resolve a commit reference to a commit object
fn resolve_commit<'repo>(
    repo: &'repo gix::Repository,
    reference: &str,
) -> Result<gix::Commit<'repo>> {
    let id = repo
        .rev_parse_single(reference.as_bytes())
        .map_err(|e| DoconlyError::GitError(format!("Failed to resolve '{}': {}", reference, e)))?
        .detach();

    repo.find_commit(id).map_err(|e| {
        DoconlyError::GitError(format!("Failed to find commit '{}': {}", reference, e))
    })
}

/// Compute the blob changes between two trees
///
/// A rename shows up as the deletion of the old path and the addition of
/// the new one, so each side is judged on its own contents.
fn compute_tree_diff(
    base_tree: &gix::Tree<'_>,
    head_tree: &gix::Tree<'_>,
) -> Result<Vec<BlobChange>> {
    use gix::object::tree::diff::Action;

    let mut changes = Vec::new();

    base_tree
        .changes()
        .map_err(|e| DoconlyError::GitError(format!("Failed to get tree changes: {}", e)))?
        .for_each_to_obtain_tree(head_tree, |change| {
            use gix::object::tree::diff::Change;

            match change {
                Change::Addition {
                    entry_mode,
                    id,
                    location,
                    ..
                } if entry_mode.is_blob() => changes.push(BlobChange {
                    path: location.to_string(),
                    change_type: FileChangeType::Added,
                    old_oid: None,
                    new_oid: Some(id.detach()),
                }),
                Change::Deletion {
                    entry_mode,
                    id,
                    location,
                    ..
                } if entry_mode.is_blob() => changes.push(BlobChange {
                    path: location.to_string(),
                    change_type: FileChangeType::Deleted,
                    old_oid: Some(id.detach()),
                    new_oid: None,
                }),
                Change::Modification {
                    previous_entry_mode,
                    entry_mode,
                    previous_id,
                    id,
                    location,
                    ..
                } if entry_mode.is_blob() && previous_entry_mode.is_blob() => {
                    changes.push(BlobChange {
                        path: location.to_string(),
                        change_type: FileChangeType::Modified,
                        old_oid: Some(previous_id.detach()),
                        new_oid: Some(id.detach()),
                    })
                }
                Change::Rewrite {
                    source_location,
                    source_entry_mode,
                    source_id,
                    entry_mode,
                    id,
                    location,
                    copy,
                    ..
                } => {
                    if !copy && source_entry_mode.is_blob() {
                        changes.push(BlobChange {
                            path: source_location.to_string(),
                            change_type: FileChangeType::Deleted,
                            old_oid: Some(source_id.detach()),
                            new_oid: None,
                        });
                    }
                    if entry_mode.is_blob() {
                        changes.push(BlobChange {
                            path: location.to_string(),
                            change_type: FileChangeType::Added,
                            old_oid: None,
                            new_oid: Some(id.detach()),
                        });
                    }
                }
                _ => {}
            }
            Ok::<_, std::convert::Infallible>(Action::Continue)
        })
        .map_err(|e| DoconlyError::GitError(format!("Failed to compute tree diff: {}", e)))?;

    Ok(changes)
}

/// Read a blob's raw content
fn read_blob(repo: &gix::Repository, oid: gix::ObjectId) -> Result<Vec<u8>> {
    let object = repo
        .find_object(oid)
        .map_err(|e| DoconlyError::GitError(format!("Failed to find object {}: {}", oid, e)))?;

    let blob = object
        .try_into_blob()
        .map_err(|_| DoconlyError::GitError(format!("Object {} is not a blob", oid)))?;

    Ok(blob.data.to_vec())
}
