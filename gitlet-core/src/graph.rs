//! Commit graph
//!
//! An arena-style index of every known commit: commit id to its message and
//! parent links. Graph walks run entirely on this index; full commits
//! (with trees) are loaded from the object store on demand and kept in a
//! small LRU cache.

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::num::NonZeroUsize;

use crate::error::{GitletError, Result};
use crate::object::{Commit, ObjectId, Parentage};
use crate::store::ObjectStore;

/// Per-commit record kept in the graph index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEntry {
    pub message: String,
    pub parentage: Parentage,
}

/// Which parent links an ancestor walk follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Only first parents, as `log` shows history
    FirstParent,
    /// Breadth-first over both parents, first parent before second
    AllParents,
}

/// Index of all commits reachable in this repository
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitGraph {
    commits: BTreeMap<ObjectId, CommitEntry>,
}

impl CommitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.commits.contains_key(id)
    }

    pub fn entry(&self, id: &ObjectId) -> Option<&CommitEntry> {
        self.commits.get(id)
    }

    /// Register a commit in the index without touching the store
    pub fn insert(&mut self, commit: &Commit) {
        self.commits.insert(
            commit.id(),
            CommitEntry {
                message: commit.message.clone(),
                parentage: commit.parentage,
            },
        );
    }

    /// Persist a commit record to `store` and register it
    pub fn write(&mut self, store: &ObjectStore, commit: &Commit) -> Result<()> {
        store.insert(commit.id(), &commit.to_bytes()?)?;
        self.insert(commit);
        Ok(())
    }

    /// All known commit ids in sorted order
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.commits.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Load a full commit. Fails with `UnknownCommit` if the id is not in
    /// the graph.
    pub fn resolve(&self, store: &ObjectStore, id: &ObjectId) -> Result<Commit> {
        if !self.contains(id) {
            return Err(GitletError::UnknownCommit);
        }
        Commit::from_bytes(&store.get(id)?)
    }

    /// Lazy walk starting at `start` (inclusive)
    pub fn ancestors(&self, start: ObjectId, traversal: Traversal) -> Ancestors<'_> {
        let mut queue = VecDeque::new();
        if self.contains(&start) {
            queue.push_back(start);
        }
        Ancestors {
            graph: self,
            traversal,
            queue,
            seen: HashSet::new(),
        }
    }

    /// Expand an abbreviated id to the unique full id it prefixes
    pub fn expand(&self, prefix: &str) -> Result<ObjectId> {
        let prefix = prefix.to_ascii_lowercase();
        if prefix.is_empty() {
            return Err(GitletError::AmbiguousOrUnknownId);
        }
        let mut matches = self.ids().filter(|id| id.to_hex().starts_with(&prefix));
        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(id),
            _ => Err(GitletError::AmbiguousOrUnknownId),
        }
    }

    /// Ids of all commits whose message equals `message`
    pub fn find_by_message(&self, message: &str) -> Vec<ObjectId> {
        self.commits
            .iter()
            .filter(|(_, entry)| entry.message == message)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Nearest common ancestor of `current` and `given`.
    ///
    /// Collects every ancestor of `given`, then returns the first ancestor of
    /// `current` in breadth-first order that is in that set. With several
    /// equally near merge bases (criss-cross histories) the one met first
    /// from `current` wins; this is not a general lowest-common-ancestor
    /// search.
    pub fn split_point(&self, current: ObjectId, given: ObjectId) -> Result<ObjectId> {
        let given_ancestors: HashSet<ObjectId> =
            self.ancestors(given, Traversal::AllParents).collect();
        self.ancestors(current, Traversal::AllParents)
            .find(|id| given_ancestors.contains(id))
            .ok_or(GitletError::SplitPointNotFound)
    }
}

/// Iterator returned by [`CommitGraph::ancestors`]
pub struct Ancestors<'a> {
    graph: &'a CommitGraph,
    traversal: Traversal,
    queue: VecDeque<ObjectId>,
    seen: HashSet<ObjectId>,
}

impl Iterator for Ancestors<'_> {
    type Item = ObjectId;

    fn next(&mut self) -> Option<ObjectId> {
        loop {
            let id = self.queue.pop_front()?;
            if !self.seen.insert(id) {
                continue;
            }
            let Some(entry) = self.graph.entry(&id) else {
                tracing::warn!(%id, "ancestor walk reached a commit missing from the graph");
                continue;
            };
            match self.traversal {
                Traversal::FirstParent => self.queue.extend(entry.parentage.first()),
                Traversal::AllParents => self.queue.extend(entry.parentage.parents()),
            }
            return Some(id);
        }
    }
}

/// LRU cache of resolved commits
pub struct CommitCache {
    cache: RefCell<LruCache<ObjectId, Commit>>,
}

impl CommitCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RefCell::new(LruCache::new(capacity)),
        }
    }

    /// Resolve through the cache
    pub fn resolve(
        &self,
        graph: &CommitGraph,
        store: &ObjectStore,
        id: &ObjectId,
    ) -> Result<Commit> {
        if let Some(commit) = self.cache.borrow_mut().get(id) {
            return Ok(commit.clone());
        }
        let commit = graph.resolve(store, id)?;
        self.cache.borrow_mut().put(*id, commit.clone());
        Ok(commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Tree;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        store: ObjectStore,
        graph: CommitGraph,
        root: ObjectId,
        tick: i64,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let store = ObjectStore::open(&tmp.path().join("objects"), 1).unwrap();
            let mut graph = CommitGraph::new();
            let root = Commit::initial().unwrap();
            graph.write(&store, &root).unwrap();
            Self {
                _tmp: tmp,
                store,
                graph,
                root: root.id(),
                tick: 0,
            }
        }

        fn commit(&mut self, message: &str, parentage: Parentage) -> ObjectId {
            self.tick += 1;
            let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(self.tick);
            let commit = Commit::new(Tree::new(), message, ts, parentage).unwrap();
            self.graph.write(&self.store, &commit).unwrap();
            commit.id()
        }
    }

    #[test]
    fn test_resolve_known_and_unknown() {
        let fx = Fixture::new();
        let root = fx.graph.resolve(&fx.store, &fx.root).unwrap();
        assert!(root.is_initial());
        let err = fx.graph.resolve(&fx.store, &ObjectId::new([9u8; 32])).unwrap_err();
        assert!(matches!(err, GitletError::UnknownCommit));
    }

    #[test]
    fn test_first_parent_walk_ends_at_root() {
        let mut fx = Fixture::new();
        let a = fx.commit("a", Parentage::Single(fx.root));
        let b = fx.commit("b", Parentage::Single(a));
        let walk: Vec<_> = fx.graph.ancestors(b, Traversal::FirstParent).collect();
        assert_eq!(walk, vec![b, a, fx.root]);
    }

    #[test]
    fn test_all_parents_walk_visits_merge_sides_once() {
        let mut fx = Fixture::new();
        let a = fx.commit("a", Parentage::Single(fx.root));
        let b = fx.commit("b", Parentage::Single(fx.root));
        let m = fx.commit("m", Parentage::Merge(a, b));
        let walk: Vec<_> = fx.graph.ancestors(m, Traversal::AllParents).collect();
        assert_eq!(walk, vec![m, a, b, fx.root]);
        let first: Vec<_> = fx.graph.ancestors(m, Traversal::FirstParent).collect();
        assert_eq!(first, vec![m, a, fx.root]);
    }

    #[test]
    fn test_split_point_of_diverged_branches() {
        let mut fx = Fixture::new();
        let base = fx.commit("base", Parentage::Single(fx.root));
        let left = fx.commit("left", Parentage::Single(base));
        let right = fx.commit("right", Parentage::Single(base));
        let right2 = fx.commit("right2", Parentage::Single(right));
        assert_eq!(fx.graph.split_point(left, right2).unwrap(), base);
        assert_eq!(fx.graph.split_point(right2, left).unwrap(), base);
    }

    #[test]
    fn test_split_point_through_merge_commit() {
        let mut fx = Fixture::new();
        let base = fx.commit("base", Parentage::Single(fx.root));
        let other = fx.commit("other", Parentage::Single(base));
        let main = fx.commit("main", Parentage::Single(base));
        let merged = fx.commit("merged", Parentage::Merge(main, other));
        let other2 = fx.commit("other2", Parentage::Single(other));
        // `other` is reachable from `merged` only through the second parent
        assert_eq!(fx.graph.split_point(merged, other2).unwrap(), other);
    }

    #[test]
    fn test_split_point_for_ancestor() {
        let mut fx = Fixture::new();
        let a = fx.commit("a", Parentage::Single(fx.root));
        let b = fx.commit("b", Parentage::Single(a));
        assert_eq!(fx.graph.split_point(a, b).unwrap(), a);
        assert_eq!(fx.graph.split_point(b, a).unwrap(), a);
    }

    #[test]
    fn test_expand_prefix() {
        let mut fx = Fixture::new();
        let a = fx.commit("a", Parentage::Single(fx.root));
        let hex = a.to_hex();
        assert_eq!(fx.graph.expand(&hex).unwrap(), a);
        assert_eq!(fx.graph.expand(&hex[..10]).unwrap(), a);
        assert!(matches!(
            fx.graph.expand(""),
            Err(GitletError::AmbiguousOrUnknownId)
        ));
        let absent = ObjectId::new([0xffu8; 32]).to_hex();
        assert!(matches!(
            fx.graph.expand(&absent),
            Err(GitletError::AmbiguousOrUnknownId)
        ));
    }

    #[test]
    fn test_expand_ambiguous_prefix() {
        let mut fx = Fixture::new();
        let mut ids = vec![fx.root];
        for i in 0..40 {
            ids.push(fx.commit(&format!("c{i}"), Parentage::Single(fx.root)));
        }
        // With 41 commits two must share a leading hex digit
        let shared = ids
            .iter()
            .map(|id| id.to_hex()[..1].to_string())
            .find(|p| ids.iter().filter(|id| id.to_hex().starts_with(p.as_str())).count() > 1)
            .unwrap();
        assert!(matches!(
            fx.graph.expand(&shared),
            Err(GitletError::AmbiguousOrUnknownId)
        ));
    }

    #[test]
    fn test_find_by_message() {
        let mut fx = Fixture::new();
        let a = fx.commit("same", Parentage::Single(fx.root));
        let b = fx.commit("same", Parentage::Single(a));
        let mut found = fx.graph.find_by_message("same");
        found.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(found, expected);
        assert!(fx.graph.find_by_message("missing").is_empty());
    }

    #[test]
    fn test_commit_cache_resolves() {
        let mut fx = Fixture::new();
        let a = fx.commit("a", Parentage::Single(fx.root));
        let cache = CommitCache::new(2);
        let first = cache.resolve(&fx.graph, &fx.store, &a).unwrap();
        let second = cache.resolve(&fx.graph, &fx.store, &a).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.message, "a");
    }
}
