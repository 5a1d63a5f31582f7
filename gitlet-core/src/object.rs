//! Core object model for gitlet
//!
//! Content-addressable identities, file trees, and commits. A commit's
//! identity is derived from its tree, message, and timestamp; the parent
//! links are carried alongside as a tagged [`Parentage`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::error::{GitletError, Result};

/// Message of the root commit shared by every repository
pub const INITIAL_COMMIT_MESSAGE: &str = "initial commit";

/// SHA-256 name of a blob or commit record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; 32]);

impl ObjectId {
    pub fn new(digest: [u8; 32]) -> Self {
        Self(digest)
    }

    /// Name `data` by its content
    pub fn from_data(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Full 64-character lowercase form, as printed by `log` and `find`
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First seven hex digits, as printed on `Merge:` log lines
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(7);
        hex
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Snapshot of the working set: relative path to blob id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    /// Sorted entries for deterministic hashing
    entries: BTreeMap<String, ObjectId>,
}

impl Tree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update an entry
    pub fn insert(&mut self, path: impl Into<String>, id: ObjectId) -> Option<ObjectId> {
        self.entries.insert(path.into(), id)
    }

    /// Remove an entry
    pub fn remove(&mut self, path: &str) -> Option<ObjectId> {
        self.entries.remove(path)
    }

    /// Blob tracked at `path`, if any
    pub fn tracked(&self, path: &str) -> Option<ObjectId> {
        self.entries.get(path).copied()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Iterate over tracked paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over `(path, blob id)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, ObjectId)> {
        self.entries.iter().map(|(p, id)| (p.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to binary format
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }
}

impl FromIterator<(String, ObjectId)> for Tree {
    fn from_iter<I: IntoIterator<Item = (String, ObjectId)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// How a commit relates to the history before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parentage {
    /// The universal root commit
    Root,
    /// An ordinary commit
    Single(ObjectId),
    /// A merge commit: the current tip and the merged-in tip
    Merge(ObjectId, ObjectId),
}

impl Parentage {
    /// First parent, followed by `log`
    pub fn first(&self) -> Option<ObjectId> {
        match self {
            Parentage::Root => None,
            Parentage::Single(p) | Parentage::Merge(p, _) => Some(*p),
        }
    }

    /// Second parent of a merge commit
    pub fn second(&self) -> Option<ObjectId> {
        match self {
            Parentage::Merge(_, q) => Some(*q),
            _ => None,
        }
    }

    /// All parents, first parent first
    pub fn parents(&self) -> impl Iterator<Item = ObjectId> {
        self.first().into_iter().chain(self.second())
    }
}

/// Immutable snapshot record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    id: ObjectId,
    /// Commit message
    pub message: String,
    /// Commit time
    pub timestamp: DateTime<Utc>,
    /// Tracked files
    pub tree: Tree,
    /// Parent links
    pub parentage: Parentage,
}

impl Commit {
    /// Create a new commit, computing its content-derived id
    pub fn new(
        tree: Tree,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
        parentage: Parentage,
    ) -> Result<Self> {
        let message = message.into();
        let id = Self::compute_id(&tree, &message, &timestamp)?;
        Ok(Self {
            id,
            message,
            timestamp,
            tree,
            parentage,
        })
    }

    /// The root commit: empty tree, fixed message, epoch timestamp
    pub fn initial() -> Result<Self> {
        Self::new(
            Tree::new(),
            INITIAL_COMMIT_MESSAGE,
            DateTime::<Utc>::UNIX_EPOCH,
            Parentage::Root,
        )
    }

    /// `SHA-256(tree ++ message ++ timestamp)`
    fn compute_id(tree: &Tree, message: &str, timestamp: &DateTime<Utc>) -> Result<ObjectId> {
        let mut hasher = Sha256::new();
        hasher.update(tree.to_bytes()?);
        hasher.update(message.as_bytes());
        hasher.update(bincode::serialize(timestamp)?);
        Ok(ObjectId::new(hasher.finalize().into()))
    }

    /// Compute the object ID
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Blob tracked at `path`, if any
    pub fn tracked(&self, path: &str) -> Option<ObjectId> {
        self.tree.tracked(path)
    }

    /// Check if this is the root commit (no parents)
    pub fn is_initial(&self) -> bool {
        self.parentage == Parentage::Root
    }

    /// Serialize to binary format
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from binary format, checking the stored id
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let commit: Commit = bincode::deserialize(data)?;
        let expected = Self::compute_id(&commit.tree, &commit.message, &commit.timestamp)?;
        if expected != commit.id {
            return Err(GitletError::Corrupt(format!(
                "commit record {} hashes to {}",
                commit.id, expected
            )));
        }
        Ok(commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn blob(data: &[u8]) -> ObjectId {
        ObjectId::from_data(data)
    }

    #[test]
    fn test_object_id_rendering() {
        let id = ObjectId::new([0xabu8; 32]);
        assert_eq!(id.to_hex(), "ab".repeat(32));
        assert_eq!(id.to_string(), id.to_hex());
        assert_eq!(id.short(), "abababa");
    }

    #[test]
    fn test_tree_insert_remove() {
        let mut tree = Tree::new();
        tree.insert("test.txt", blob(b"x"));
        assert_eq!(tree.tracked("test.txt"), Some(blob(b"x")));
        tree.remove("test.txt");
        assert_eq!(tree.tracked("test.txt"), None);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_initial_commit_is_deterministic() {
        let a = Commit::initial().unwrap();
        let b = Commit::initial().unwrap();
        assert_eq!(a.id(), b.id());
        assert!(a.is_initial());
        assert_eq!(a.message, INITIAL_COMMIT_MESSAGE);
    }

    #[test]
    fn test_commit_identity_ignores_parentage() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut tree = Tree::new();
        tree.insert("a.txt", blob(b"1"));
        let root = Commit::initial().unwrap();
        let c1 = Commit::new(tree.clone(), "msg", ts, Parentage::Single(root.id())).unwrap();
        let c2 = Commit::new(tree.clone(), "msg", ts, Parentage::Root).unwrap();
        assert_eq!(c1.id(), c2.id());

        let c3 = Commit::new(tree.clone(), "other", ts, Parentage::Root).unwrap();
        assert_ne!(c1.id(), c3.id());

        tree.insert("b.txt", blob(b"2"));
        let c4 = Commit::new(tree, "msg", ts, Parentage::Root).unwrap();
        assert_ne!(c1.id(), c4.id());
    }

    #[test]
    fn test_commit_serialization() {
        let root = Commit::initial().unwrap();
        let commit = Commit::new(
            Tree::new(),
            "Test message",
            Utc::now(),
            Parentage::Merge(root.id(), ObjectId::new([2u8; 32])),
        )
        .unwrap();
        let bytes = commit.to_bytes().unwrap();
        let decoded = Commit::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, commit);
        assert_eq!(decoded.parentage.second(), Some(ObjectId::new([2u8; 32])));
    }

    #[test]
    fn test_tampered_commit_is_rejected() {
        let mut commit = Commit::initial().unwrap();
        commit.message = "rewritten".to_string();
        let bytes = commit.to_bytes().unwrap();
        assert!(matches!(
            Commit::from_bytes(&bytes),
            Err(GitletError::Corrupt(_))
        ));
    }

    #[test]
    fn test_parentage_parents_order() {
        let p = ObjectId::new([1u8; 32]);
        let q = ObjectId::new([2u8; 32]);
        assert_eq!(Parentage::Root.parents().count(), 0);
        assert_eq!(Parentage::Single(p).parents().collect::<Vec<_>>(), vec![p]);
        assert_eq!(Parentage::Merge(p, q).parents().collect::<Vec<_>>(), vec![p, q]);
    }
}
