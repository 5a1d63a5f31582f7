//! Staging area
//!
//! The index is the tree the next commit will record. It remembers the tree
//! of the head commit it was built from (`baseline`) so removals can tell
//! whether a working file still needs deleting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::object::{Commit, ObjectId, Tree};

/// Staged and removed paths relative to a head tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStatus {
    pub staged: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

impl IndexStatus {
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty() && self.removed.is_empty()
    }
}

/// Mutable overlay describing the next commit's tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    tree: Tree,
    baseline: Tree,
}

impl Index {
    /// Build a fresh index from a commit
    pub fn from_commit(commit: &Commit) -> Self {
        Self {
            tree: commit.tree.clone(),
            baseline: commit.tree.clone(),
        }
    }

    /// Tree the next commit would record
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Blob staged at `path`, if any
    pub fn tracked(&self, path: &str) -> Option<ObjectId> {
        self.tree.tracked(path)
    }

    /// Stage `id` for `path`. The blob must already be in the store.
    pub fn stage(&mut self, path: impl Into<String>, id: ObjectId) {
        self.tree.insert(path, id);
    }

    /// Remove `path` from the index.
    ///
    /// Returns true when the working file must be deleted too: the last
    /// commit tracked the path and it had not already been removed.
    pub fn unstage(&mut self, path: &str) -> bool {
        let was_staged = self.tree.remove(path).is_some();
        was_staged && self.baseline.contains(path)
    }

    /// Paths whose staged blob differs from `head_tree`, and paths of
    /// `head_tree` no longer in the index.
    pub fn status_relative_to(&self, head_tree: &Tree) -> IndexStatus {
        let staged = self
            .tree
            .iter()
            .filter(|(path, id)| head_tree.tracked(path) != Some(*id))
            .map(|(path, _)| path.to_string())
            .collect();
        let removed = head_tree
            .paths()
            .filter(|path| !self.tree.contains(path))
            .map(str::to_string)
            .collect();
        IndexStatus { staged, removed }
    }

    pub fn is_clean_relative_to(&self, head_tree: &Tree) -> bool {
        &self.tree == head_tree
    }

    /// Paths whose working content no longer matches the index.
    ///
    /// `current_hash` returns the hash of the file on disk, or `None` when
    /// the file is missing.
    pub fn modified_not_staged<F>(&self, mut current_hash: F) -> BTreeSet<String>
    where
        F: FnMut(&str) -> Option<ObjectId>,
    {
        self.tree
            .iter()
            .filter(|(path, id)| current_hash(path) != Some(*id))
            .map(|(path, _)| path.to_string())
            .collect()
    }
}
