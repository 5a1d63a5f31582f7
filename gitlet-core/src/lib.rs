//! Gitlet Core Library
//!
//! A single-user local version-control engine:
//! - Content-addressed object store (blobs and commit records)
//! - Commit graph with ancestor walks and split-point search
//! - Staging area, branches, checkout and reset
//! - Three-way merge with conflict markers
//! - Fetch, push and pull between repositories on the same filesystem

pub mod config;
pub mod error;
pub mod graph;
pub mod index;
pub mod merge;
pub mod object;
pub mod refs;
pub mod remote;
pub mod repository;
pub mod store;
pub mod worktree;

pub use config::Config;
pub use error::{GitletError, Result};
pub use graph::{CommitGraph, Traversal};
pub use index::Index;
pub use merge::MergeOutcome;
pub use object::{Commit, INITIAL_COMMIT_MESSAGE, ObjectId, Parentage, Tree};
pub use refs::{BranchTable, RemoteRegistry};
pub use remote::{FetchReport, PullReport, PushReport, TransferStats};
pub use repository::{Modification, Repository, Status};
pub use store::ObjectStore;
pub use worktree::{GITLET_DIR, WorkTree};
