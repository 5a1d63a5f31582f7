//! Repository context
//!
//! A [`Repository`] bundles the working tree, the object store, and the
//! persisted [`RepositoryState`] (branches, remotes, commit graph, staging
//! area). Every operation takes the context explicitly; nothing is written
//! to `state.bin` until the caller invokes [`Repository::save`], so a failed
//! operation leaves the persisted metadata untouched.
//!
//! Layout on disk:
//! ```text
//! {work_dir}/
//!   .gitlet/
//!     config.json                        # configuration
//!     state.bin                          # RepositoryState (bincode)
//!     objects/{hash[0..2]}/{hash[2..]}   # blobs and commit records
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{GitletError, Result};
use crate::graph::{CommitCache, CommitGraph, Traversal};
use crate::index::Index;
use crate::object::{Commit, ObjectId, Parentage};
use crate::refs::{BranchTable, RemoteRegistry};
use crate::store::ObjectStore;
use crate::worktree::{GITLET_DIR, WorkTree, is_valid_path};

const STATE_FILE: &str = "state.bin";

/// Everything persisted between invocations besides objects and config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryState {
    pub branches: BranchTable,
    pub remotes: RemoteRegistry,
    pub graph: CommitGraph,
    pub index: Index,
}

/// How a file under the index differs from its working copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modification {
    Modified,
    Deleted,
}

/// Snapshot reported by `status`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    pub branches: Vec<String>,
    pub current_branch: String,
    pub staged: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    pub modified: BTreeMap<String, Modification>,
    pub untracked: BTreeSet<String>,
}

/// Explicit repository context threaded through every operation
pub struct Repository {
    gitlet_dir: PathBuf,
    pub(crate) worktree: WorkTree,
    pub(crate) store: ObjectStore,
    pub(crate) state: RepositoryState,
    config: Config,
    cache: CommitCache,
}

impl Repository {
    /// Create an empty repository in `work_dir` with the root commit and
    /// the default branch.
    pub fn init(work_dir: &Path) -> Result<Self> {
        let gitlet_dir = work_dir.join(GITLET_DIR);
        if gitlet_dir.join(STATE_FILE).exists() {
            return Err(GitletError::AlreadyInitialized);
        }
        fs::create_dir_all(&gitlet_dir)?;

        let config = Config::load(&gitlet_dir)?;
        config.save(&gitlet_dir)?;
        let store = ObjectStore::open(&gitlet_dir.join("objects"), config.compression_level)?;

        let root = Commit::initial()?;
        let mut graph = CommitGraph::new();
        graph.write(&store, &root)?;
        let state = RepositoryState {
            branches: BranchTable::new(&config.default_branch, root.id()),
            remotes: RemoteRegistry::default(),
            graph,
            index: Index::from_commit(&root),
        };

        let repo = Self {
            worktree: WorkTree::new(work_dir),
            cache: CommitCache::new(config.commit_cache_capacity),
            gitlet_dir,
            store,
            state,
            config,
        };
        repo.save()?;
        tracing::info!(root = %root.id(), "initialized repository");
        Ok(repo)
    }

    /// Open the repository whose working directory is `work_dir`
    pub fn open(work_dir: &Path) -> Result<Self> {
        Self::open_at(&work_dir.join(GITLET_DIR))
    }

    /// Open a repository given its `.gitlet` directory. The working tree is
    /// the directory containing it.
    pub fn open_at(gitlet_dir: &Path) -> Result<Self> {
        let state_path = gitlet_dir.join(STATE_FILE);
        if !state_path.is_file() {
            return Err(GitletError::NotInitialized);
        }
        let config = Config::load(gitlet_dir)?;
        let store = ObjectStore::open(&gitlet_dir.join("objects"), config.compression_level)?;
        let state: RepositoryState = bincode::deserialize(&fs::read(&state_path)?)?;
        let work_dir = gitlet_dir.parent().unwrap_or(gitlet_dir);
        Ok(Self {
            gitlet_dir: gitlet_dir.to_path_buf(),
            worktree: WorkTree::new(work_dir),
            cache: CommitCache::new(config.commit_cache_capacity),
            store,
            state,
            config,
        })
    }

    /// Persist the repository state
    pub fn save(&self) -> Result<()> {
        let path = self.gitlet_dir.join(STATE_FILE);
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, bincode::serialize(&self.state)?)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    // ==================== Accessors ====================

    pub fn worktree(&self) -> &WorkTree {
        &self.worktree
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn branches(&self) -> &BranchTable {
        &self.state.branches
    }

    pub fn remotes(&self) -> &RemoteRegistry {
        &self.state.remotes
    }

    pub fn graph(&self) -> &CommitGraph {
        &self.state.graph
    }

    pub fn index(&self) -> &Index {
        &self.state.index
    }

    /// Id of the checked-out commit
    pub fn head(&self) -> Result<ObjectId> {
        self.state.branches.head()
    }

    pub fn head_commit(&self) -> Result<Commit> {
        self.resolve(&self.head()?)
    }

    /// Load a commit known to this repository
    pub fn resolve(&self, id: &ObjectId) -> Result<Commit> {
        self.cache.resolve(&self.state.graph, &self.store, id)
    }

    /// Expand an abbreviated commit id
    pub fn expand(&self, prefix: &str) -> Result<ObjectId> {
        self.state.graph.expand(prefix)
    }

    // ==================== Staging ====================

    /// Store the working copy of `file` and stage it
    pub fn add(&mut self, file: &str) -> Result<ObjectId> {
        if !is_valid_path(file) || !self.worktree.exists(file) {
            return Err(GitletError::FileNotFound);
        }
        let id = self.store.put(&self.worktree.read(file)?)?;
        self.state.index.stage(file, id);
        tracing::debug!(file, %id, "staged file");
        Ok(id)
    }

    /// Unstage `file`, deleting the working copy if head tracked it
    pub fn rm(&mut self, file: &str) -> Result<()> {
        let head = self.head_commit()?;
        if self.state.index.tracked(file).is_none() && head.tracked(file).is_none() {
            return Err(GitletError::NoReasonToRemove);
        }
        if self.state.index.unstage(file) {
            self.worktree.delete(file)?;
        }
        Ok(())
    }

    // ==================== Commits ====================

    /// Commit the staging area with the current time
    pub fn commit(&mut self, message: &str) -> Result<ObjectId> {
        self.commit_at(message, Utc::now())
    }

    /// Commit the staging area with an explicit timestamp
    pub fn commit_at(&mut self, message: &str, timestamp: DateTime<Utc>) -> Result<ObjectId> {
        if message.is_empty() {
            return Err(GitletError::EmptyMessage);
        }
        let head = self.head_commit()?;
        if self.state.index.is_clean_relative_to(&head.tree) {
            return Err(GitletError::NothingToCommit);
        }
        let commit = Commit::new(
            self.state.index.tree().clone(),
            message,
            timestamp,
            Parentage::Single(head.id()),
        )?;
        self.record_commit(commit)
    }

    /// Write `commit`, move the current branch to it, and rebuild the index
    pub(crate) fn record_commit(&mut self, commit: Commit) -> Result<ObjectId> {
        self.state.graph.write(&self.store, &commit)?;
        self.state.branches.advance(commit.id());
        self.state.index = Index::from_commit(&commit);
        tracing::info!(id = %commit.id(), message = %commit.message, "created commit");
        Ok(commit.id())
    }

    /// First-parent history from head
    pub fn log(&self) -> Result<Vec<Commit>> {
        self.state
            .graph
            .ancestors(self.head()?, Traversal::FirstParent)
            .map(|id| self.resolve(&id))
            .collect()
    }

    /// Every commit in the graph
    pub fn global_log(&self) -> Result<Vec<Commit>> {
        self.state.graph.ids().map(|id| self.resolve(&id)).collect()
    }

    /// Ids of commits with exactly this message
    pub fn find(&self, message: &str) -> Result<Vec<ObjectId>> {
        let found = self.state.graph.find_by_message(message);
        if found.is_empty() {
            return Err(GitletError::MessageNotFound);
        }
        Ok(found)
    }

    // ==================== Status ====================

    /// Files under the index whose working copy differs or is missing
    pub fn working_changes(&self) -> Result<BTreeMap<String, Modification>> {
        let mut on_disk = BTreeMap::new();
        for path in self.state.index.tree().paths() {
            on_disk.insert(path.to_string(), self.worktree.hash(path)?);
        }
        let changed = self
            .state
            .index
            .modified_not_staged(|path| on_disk.get(path).copied().flatten());
        Ok(changed
            .into_iter()
            .map(|path| {
                let kind = if self.worktree.exists(&path) {
                    Modification::Modified
                } else {
                    Modification::Deleted
                };
                (path, kind)
            })
            .collect())
    }

    pub fn status(&self) -> Result<Status> {
        let head = self.head_commit()?;
        let index_status = self.state.index.status_relative_to(&head.tree);
        let untracked = self
            .worktree
            .plain_files()?
            .into_iter()
            .filter(|file| self.state.index.tracked(file).is_none())
            .collect();
        Ok(Status {
            branches: self.state.branches.names().map(str::to_string).collect(),
            current_branch: self.state.branches.current().to_string(),
            staged: index_status.staged,
            removed: index_status.removed,
            modified: self.working_changes()?,
            untracked,
        })
    }

    // ==================== Checkout / Reset ====================

    /// Write the version of `file` recorded in `commit` to the working tree
    pub fn revert_file(&self, commit: &ObjectId, file: &str) -> Result<()> {
        let commit = self.resolve(commit)?;
        let blob = commit.tracked(file).ok_or(GitletError::FileNotInCommit)?;
        self.worktree.write(file, &self.store.get(&blob)?)
    }

    /// `checkout -- <file>`
    pub fn checkout_file(&self, file: &str) -> Result<()> {
        self.revert_file(&self.head()?, file)
    }

    /// `checkout <id> -- <file>`
    pub fn checkout_file_at(&self, id_prefix: &str, file: &str) -> Result<()> {
        let id = self.expand(id_prefix)?;
        self.revert_file(&id, file)
    }

    /// Switch to branch `name` and check out its tip
    pub fn checkout_branch(&mut self, name: &str) -> Result<()> {
        if name == self.state.branches.current() {
            return Err(GitletError::CheckoutCurrentBranch);
        }
        let tip = self.state.branches.get(name).ok_or(GitletError::NoSuchBranch)?;
        let target = self.resolve(&tip)?;
        self.check_untracked(&target)?;
        self.state.branches.switch(name)?;
        self.replace_working_folder(&target)
    }

    /// `reset <id>`
    pub fn reset(&mut self, id_prefix: &str) -> Result<()> {
        let id = self.expand(id_prefix)?;
        self.revert_working_folder(&id)
    }

    /// Replace the working tree and index with `commit`'s snapshot and move
    /// the current branch to it. Fails before touching anything if a file
    /// of `commit` would overwrite an untracked working file.
    pub fn revert_working_folder(&mut self, commit: &ObjectId) -> Result<()> {
        let target = self.resolve(commit)?;
        self.check_untracked(&target)?;
        self.replace_working_folder(&target)
    }

    fn check_untracked(&self, target: &Commit) -> Result<()> {
        for path in target.tree.paths() {
            if self.state.index.tracked(path).is_none() && self.worktree.exists(path) {
                return Err(GitletError::UntrackedFileConflict);
            }
        }
        Ok(())
    }

    fn replace_working_folder(&mut self, target: &Commit) -> Result<()> {
        for path in self.state.index.tree().paths() {
            self.worktree.delete(path)?;
        }
        for (path, blob) in target.tree.iter() {
            self.worktree.write(path, &self.store.get(&blob)?)?;
        }
        self.state.branches.advance(target.id());
        self.state.index = Index::from_commit(target);
        tracing::debug!(id = %target.id(), "working folder replaced");
        Ok(())
    }

    // ==================== Branches ====================

    /// Create a branch at head
    pub fn create_branch(&mut self, name: &str) -> Result<()> {
        let head = self.head()?;
        self.state.branches.create(name, head)
    }

    pub fn remove_branch(&mut self, name: &str) -> Result<()> {
        self.state.branches.remove(name)
    }
}
