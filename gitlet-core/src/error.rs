//! Error type for gitlet operations
//!
//! User-level failures render as stable literal messages that the command
//! line prints verbatim. I/O and decoding failures are fatal and kept
//! distinct so the dispatcher can treat them differently.

use crate::object::ObjectId;

/// Result type for gitlet operations
pub type Result<T> = std::result::Result<T, GitletError>;

/// Errors that can occur during repository operations
#[derive(Debug, thiserror::Error)]
pub enum GitletError {
    #[error("A Gitlet version-control system already exists in the current directory.")]
    AlreadyInitialized,

    #[error("Not in an initialized Gitlet directory.")]
    NotInitialized,

    #[error("No changes added to the commit.")]
    NothingToCommit,

    #[error("Please enter a commit message.")]
    EmptyMessage,

    #[error("File does not exist.")]
    FileNotFound,

    #[error("No reason to remove the file.")]
    NoReasonToRemove,

    #[error("No commit with that id exists.")]
    UnknownCommit,

    #[error("No commit with that id exists.")]
    AmbiguousOrUnknownId,

    #[error("File does not exist in that commit.")]
    FileNotInCommit,

    #[error("There is an untracked file in the way; delete it or add it first.")]
    UntrackedFileConflict,

    #[error("A branch with that name already exists.")]
    BranchExists,

    #[error("A branch with that name does not exist.")]
    BranchNotFound,

    #[error("No such branch exists.")]
    NoSuchBranch,

    #[error("No need to checkout the current branch.")]
    CheckoutCurrentBranch,

    #[error("Cannot remove the current branch.")]
    RemoveCurrentBranch,

    #[error("Cannot merge a branch with itself.")]
    MergeWithSelf,

    #[error("You have uncommitted changes.")]
    UncommittedChanges,

    #[error("No common ancestor found.")]
    SplitPointNotFound,

    #[error("Found no commit with that message.")]
    MessageNotFound,

    #[error("A remote with that name already exists.")]
    RemoteExists,

    #[error("A remote with that name does not exist.")]
    RemoteNotFound,

    #[error("Remote directory not found.")]
    RemoteDirectoryNotFound,

    #[error("That remote does not have that branch.")]
    RemoteBranchNotFound,

    #[error("Please pull down remote changes before pushing.")]
    NonFastForward,

    #[error("Object not found: {0}")]
    NotFound(ObjectId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt repository: {0}")]
    Corrupt(String),
}

impl GitletError {
    /// True for failures that are not user preconditions: I/O, decoding,
    /// and objects missing from the store.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GitletError::NotFound(_)
                | GitletError::Io(_)
                | GitletError::Serialization(_)
                | GitletError::Corrupt(_)
        )
    }
}

impl From<bincode::Error> for GitletError {
    fn from(e: bincode::Error) -> Self {
        GitletError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for GitletError {
    fn from(e: serde_json::Error) -> Self {
        GitletError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_are_not_fatal() {
        assert!(!GitletError::NothingToCommit.is_fatal());
        assert!(!GitletError::UntrackedFileConflict.is_fatal());
        assert!(!GitletError::NonFastForward.is_fatal());
    }

    #[test]
    fn test_io_errors_are_fatal() {
        let err = GitletError::from(std::io::Error::other("disk gone"));
        assert!(err.is_fatal());
        assert!(GitletError::NotFound(ObjectId::new([0u8; 32])).is_fatal());
    }

    #[test]
    fn test_messages_are_stable() {
        assert_eq!(
            GitletError::UncommittedChanges.to_string(),
            "You have uncommitted changes."
        );
        assert_eq!(
            GitletError::AmbiguousOrUnknownId.to_string(),
            "No commit with that id exists."
        );
    }
}
