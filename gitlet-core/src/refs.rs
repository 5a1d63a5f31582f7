//! Branch table and remote registry

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{GitletError, Result};
use crate::object::ObjectId;

/// Branch name to tip commit, plus the checked-out branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchTable {
    branches: BTreeMap<String, ObjectId>,
    current: String,
}

impl BranchTable {
    /// A table with a single branch, which is current
    pub fn new(name: &str, tip: ObjectId) -> Self {
        let mut branches = BTreeMap::new();
        branches.insert(name.to_string(), tip);
        Self {
            branches,
            current: name.to_string(),
        }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Tip of the current branch
    pub fn head(&self) -> Result<ObjectId> {
        self.get(&self.current)
            .ok_or_else(|| GitletError::Corrupt(format!("current branch {} has no tip", self.current)))
    }

    pub fn get(&self, name: &str) -> Option<ObjectId> {
        self.branches.get(name).copied()
    }

    /// Branch names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.branches.keys().map(String::as_str)
    }

    /// Create `name` pointing at `tip`
    pub fn create(&mut self, name: &str, tip: ObjectId) -> Result<()> {
        if self.branches.contains_key(name) {
            return Err(GitletError::BranchExists);
        }
        self.branches.insert(name.to_string(), tip);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        if name == self.current {
            return Err(GitletError::RemoveCurrentBranch);
        }
        self.branches
            .remove(name)
            .map(|_| ())
            .ok_or(GitletError::BranchNotFound)
    }

    /// Point `name` at `tip`, creating the branch if needed
    pub fn set(&mut self, name: &str, tip: ObjectId) {
        self.branches.insert(name.to_string(), tip);
    }

    /// Move the current branch
    pub fn advance(&mut self, tip: ObjectId) {
        let current = self.current.clone();
        self.set(&current, tip);
    }

    /// Make an existing branch current
    pub fn switch(&mut self, name: &str) -> Result<ObjectId> {
        if name == self.current {
            return Err(GitletError::CheckoutCurrentBranch);
        }
        let tip = self.get(name).ok_or(GitletError::NoSuchBranch)?;
        self.current = name.to_string();
        Ok(tip)
    }
}

/// Remote name to the `.gitlet` directory of another repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRegistry {
    remotes: BTreeMap<String, PathBuf>,
}

impl RemoteRegistry {
    pub fn add(&mut self, name: &str, location: &Path) -> Result<()> {
        if self.remotes.contains_key(name) {
            return Err(GitletError::RemoteExists);
        }
        self.remotes.insert(name.to_string(), location.to_path_buf());
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        self.remotes
            .remove(name)
            .map(|_| ())
            .ok_or(GitletError::RemoteNotFound)
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.remotes.get(name).map(PathBuf::as_path)
    }
}
