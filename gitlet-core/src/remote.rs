//! Remote synchronization
//!
//! A remote is another repository's `.gitlet` directory on the local
//! filesystem. Fetch and push copy commit records and the blobs they
//! reference between the two object stores, then update refs. Remote
//! working files are never touched.

use std::path::{Path, PathBuf};

use crate::error::{GitletError, Result};
use crate::graph::Traversal;
use crate::index::Index;
use crate::merge::MergeOutcome;
use crate::object::ObjectId;
use crate::repository::Repository;

/// Counts from copying history between two repositories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Commit records copied
    pub commits: u64,
    /// Blobs copied
    pub blobs: u64,
    /// Blobs skipped (already present)
    pub blobs_skipped: u64,
}

/// Result of a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    /// Local branch recording the remote tip, `<remote>/<branch>`
    pub branch: String,
    pub tip: ObjectId,
    pub stats: TransferStats,
}

/// Result of a push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReport {
    pub tip: ObjectId,
    pub stats: TransferStats,
}

/// Result of a pull
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullReport {
    pub fetch: FetchReport,
    pub merge: MergeOutcome,
}

/// Name of the local branch that tracks `branch` of `remote`
pub fn tracking_branch(remote: &str, branch: &str) -> String {
    format!("{}/{}", remote, branch)
}

/// Copy the given commits (and every blob they reference) from `src` into
/// `dst`, registering them in `dst`'s graph.
fn transfer_commits(
    src: &Repository,
    dst: &mut Repository,
    ids: &[ObjectId],
) -> Result<TransferStats> {
    let mut stats = TransferStats::default();
    for id in ids {
        let commit = src.resolve(id)?;
        for (_, blob) in commit.tree.iter() {
            if dst.store.contains(&blob) {
                stats.blobs_skipped += 1;
                continue;
            }
            dst.store.put(&src.store.get(&blob)?)?;
            stats.blobs += 1;
        }
        dst.state.graph.write(&dst.store, &commit)?;
        stats.commits += 1;
    }
    Ok(stats)
}

impl Repository {
    /// Register a remote repository location
    pub fn add_remote(&mut self, name: &str, location: &Path) -> Result<()> {
        self.state.remotes.add(name, location)
    }

    pub fn remove_remote(&mut self, name: &str) -> Result<()> {
        self.state.remotes.remove(name)
    }

    /// Location of a registered remote, relative paths taken from the
    /// working directory
    fn remote_location(&self, name: &str) -> Result<PathBuf> {
        let location = self
            .state
            .remotes
            .get(name)
            .ok_or(GitletError::RemoteDirectoryNotFound)?;
        if location.is_absolute() {
            Ok(location.to_path_buf())
        } else {
            Ok(self.worktree.root().join(location))
        }
    }

    fn open_remote(&self, name: &str) -> Result<Repository> {
        let location = self.remote_location(name)?;
        if !location.is_dir() {
            return Err(GitletError::RemoteDirectoryNotFound);
        }
        match Repository::open_at(&location) {
            Err(GitletError::NotInitialized) => Err(GitletError::RemoteDirectoryNotFound),
            other => other,
        }
    }

    /// Copy the history of `branch` from `remote` and record its tip as the
    /// local branch `<remote>/<branch>`.
    pub fn fetch(&mut self, remote: &str, branch: &str) -> Result<FetchReport> {
        let remote_repo = self.open_remote(remote)?;
        let tip = remote_repo
            .branches()
            .get(branch)
            .ok_or(GitletError::RemoteBranchNotFound)?;

        let missing: Vec<ObjectId> = remote_repo
            .graph()
            .ancestors(tip, Traversal::AllParents)
            .filter(|id| !self.state.graph.contains(id) || !self.store.contains(id))
            .collect();
        let stats = transfer_commits(&remote_repo, self, &missing)?;

        let local_branch = tracking_branch(remote, branch);
        self.state.branches.set(&local_branch, tip);
        tracing::info!(
            remote,
            branch = %local_branch,
            %tip,
            commits = stats.commits,
            blobs = stats.blobs,
            "fetched"
        );
        Ok(FetchReport {
            branch: local_branch,
            tip,
            stats,
        })
    }

    /// Publish the current branch to `branch` on `remote`.
    ///
    /// Rejected unless the remote tip lies on the first-parent chain of the
    /// local tip. A branch the remote lacks is created at the local tip
    /// instead of being refused. On success the remote branch is forced to
    /// the local tip and, if it is the remote's checked-out branch, the
    /// remote staging area is rebuilt from it.
    pub fn push(&self, remote: &str, branch: &str) -> Result<PushReport> {
        let mut remote_repo = self.open_remote(remote)?;
        let local_tip = self.head()?;

        if let Some(remote_tip) = remote_repo.branches().get(branch) {
            let fast_forward = self
                .state
                .graph
                .ancestors(local_tip, Traversal::FirstParent)
                .any(|id| id == remote_tip);
            if !fast_forward {
                return Err(GitletError::NonFastForward);
            }
        }

        let missing: Vec<ObjectId> = self
            .state
            .graph
            .ancestors(local_tip, Traversal::AllParents)
            .filter(|id| !remote_repo.graph().contains(id) || !remote_repo.store().contains(id))
            .collect();
        let stats = transfer_commits(self, &mut remote_repo, &missing)?;

        remote_repo.state.branches.set(branch, local_tip);
        if remote_repo.branches().current() == branch {
            let tip_commit = remote_repo.resolve(&local_tip)?;
            remote_repo.state.index = Index::from_commit(&tip_commit);
        }
        remote_repo.save()?;
        tracing::info!(remote, branch, tip = %local_tip, commits = stats.commits, "pushed");
        Ok(PushReport {
            tip: local_tip,
            stats,
        })
    }

    /// `fetch` followed by merging `<remote>/<branch>`
    pub fn pull(&mut self, remote: &str, branch: &str) -> Result<PullReport> {
        let fetch = self.fetch(remote, branch)?;
        let merge = self.merge(&fetch.branch)?;
        Ok(PullReport { fetch, merge })
    }
}
