//! Three-way merge engine
//!
//! Merging runs in two phases. Planning classifies every path against the
//! split point, checks every precondition, and builds the resulting tree
//! without touching the working directory. Applying writes the plan out and
//! records a merge commit. Conflicts are not errors: the conflicted file is
//! written with markers, staged, and committed with the rest.

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{GitletError, Result};
use crate::object::{Commit, ObjectId, Parentage, Tree};
use crate::repository::Repository;

/// How a path changed between the split point and the two tips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Both tips agree
    Unchanged,
    /// Only the given branch changed it
    TakeGiven,
    /// Only the current branch changed it
    KeepCurrent,
    /// Both changed it, differently
    Conflict,
}

/// Classify one path from its blob at the split point, the current tip, and
/// the given tip. `None` means the path is absent.
pub fn classify(
    split: Option<ObjectId>,
    current: Option<ObjectId>,
    given: Option<ObjectId>,
) -> Classification {
    if given == current {
        Classification::Unchanged
    } else if current == split {
        Classification::TakeGiven
    } else if given == split {
        Classification::KeepCurrent
    } else {
        Classification::Conflict
    }
}

/// Contents of a conflicted file. A missing side contributes nothing.
pub fn conflict_content(current: &[u8], given: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(current.len() + given.len() + 32);
    out.extend_from_slice(b"<<<<<<< HEAD\n");
    out.extend_from_slice(current);
    out.extend_from_slice(b"=======\n");
    out.extend_from_slice(given);
    out.extend_from_slice(b">>>>>>>\n");
    out
}

/// What to do with one path when applying a merge
#[derive(Debug, Clone, PartialEq, Eq)]
enum FileAction {
    /// Write and stage the given branch's blob
    Checkout(ObjectId),
    /// Unstage and delete the working file
    Remove,
    /// Write and stage conflict-marker content
    Conflict(Vec<u8>),
}

/// Result of a merge that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The current branch was an ancestor of the given branch and now points
    /// at its tip; no merge commit was made.
    FastForwarded(ObjectId),
    /// The given branch is already contained in the current branch.
    AlreadyAncestor,
    /// A merge commit was created. `conflicts` lists paths written with
    /// conflict markers.
    Merged {
        commit: ObjectId,
        conflicts: Vec<String>,
    },
}

impl Repository {
    /// Merge branch `given` into the current branch
    pub fn merge(&mut self, given: &str) -> Result<MergeOutcome> {
        let given_tip = self
            .state
            .branches
            .get(given)
            .ok_or(GitletError::BranchNotFound)?;
        let current = self.state.branches.current().to_string();
        if given == current {
            return Err(GitletError::MergeWithSelf);
        }
        let current_commit = self.head_commit()?;
        if !self
            .state
            .index
            .status_relative_to(&current_commit.tree)
            .is_empty()
        {
            return Err(GitletError::UncommittedChanges);
        }

        let split = self.state.graph.split_point(current_commit.id(), given_tip)?;
        tracing::debug!(%split, current = %current_commit.id(), given = %given_tip, "found split point");
        if split == current_commit.id() {
            self.revert_working_folder(&given_tip)?;
            tracing::info!(branch = %current, tip = %given_tip, "fast-forwarded");
            return Ok(MergeOutcome::FastForwarded(given_tip));
        }
        if split == given_tip {
            return Ok(MergeOutcome::AlreadyAncestor);
        }

        let split_commit = self.resolve(&split)?;
        let given_commit = self.resolve(&given_tip)?;
        let plan = self.plan_merge(&split_commit, &current_commit, &given_commit)?;
        if plan.tree == current_commit.tree {
            return Err(GitletError::NothingToCommit);
        }

        let conflicts = self.apply_merge_plan(&plan)?;
        if !conflicts.is_empty() {
            tracing::warn!(count = conflicts.len(), "merge produced conflicts");
        }
        let commit = Commit::new(
            self.state.index.tree().clone(),
            format!("Merged {} into {}.", given, current),
            Utc::now(),
            Parentage::Merge(current_commit.id(), given_tip),
        )?;
        let commit = self.record_commit(commit)?;
        Ok(MergeOutcome::Merged { commit, conflicts })
    }

    fn plan_merge(&self, split: &Commit, current: &Commit, given: &Commit) -> Result<MergePlan> {
        let paths: BTreeSet<&str> = split
            .tree
            .paths()
            .chain(current.tree.paths())
            .chain(given.tree.paths())
            .collect();

        let mut actions = BTreeMap::new();
        let mut tree = self.state.index.tree().clone();
        for path in paths {
            let s = split.tracked(path);
            let c = current.tracked(path);
            let g = given.tracked(path);
            match classify(s, c, g) {
                Classification::Unchanged | Classification::KeepCurrent => {}
                Classification::TakeGiven => match g {
                    Some(blob) => {
                        self.ensure_not_untracked(path)?;
                        tree.insert(path, blob);
                        actions.insert(path.to_string(), FileAction::Checkout(blob));
                    }
                    None => {
                        if self.state.index.tracked(path).is_some() {
                            tree.remove(path);
                            actions.insert(path.to_string(), FileAction::Remove);
                        } else if self.worktree.exists(path) {
                            return Err(GitletError::UntrackedFileConflict);
                        }
                    }
                },
                Classification::Conflict => {
                    self.ensure_not_untracked(path)?;
                    let current_data = self.blob_or_empty(c)?;
                    let given_data = self.blob_or_empty(g)?;
                    let content = conflict_content(&current_data, &given_data);
                    tree.insert(path, ObjectId::from_data(&content));
                    actions.insert(path.to_string(), FileAction::Conflict(content));
                }
            }
        }
        Ok(MergePlan { actions, tree })
    }

    /// A write to `path` would clobber a working file the index does not
    /// track.
    fn ensure_not_untracked(&self, path: &str) -> Result<()> {
        if self.state.index.tracked(path).is_none() && self.worktree.exists(path) {
            return Err(GitletError::UntrackedFileConflict);
        }
        Ok(())
    }

    fn blob_or_empty(&self, blob: Option<ObjectId>) -> Result<Vec<u8>> {
        match blob {
            Some(id) => self.store.get(&id),
            None => Ok(Vec::new()),
        }
    }

    /// Write the plan to the working tree and index; returns conflicted paths
    fn apply_merge_plan(&mut self, plan: &MergePlan) -> Result<Vec<String>> {
        let mut conflicts = Vec::new();
        for (path, action) in &plan.actions {
            match action {
                FileAction::Checkout(blob) => {
                    self.worktree.write(path, &self.store.get(blob)?)?;
                    self.state.index.stage(path.as_str(), *blob);
                }
                FileAction::Remove => {
                    if self.state.index.unstage(path) {
                        self.worktree.delete(path)?;
                    }
                }
                FileAction::Conflict(content) => {
                    let blob = self.store.put(content)?;
                    self.worktree.write(path, content)?;
                    self.state.index.stage(path.as_str(), blob);
                    conflicts.push(path.clone());
                }
            }
        }
        Ok(conflicts)
    }
}

/// Planned merge: per-path actions and the tree they produce
struct MergePlan {
    actions: BTreeMap<String, FileAction>,
    tree: Tree,
}
