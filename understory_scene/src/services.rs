// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collaborators a list talks to: identifier allocation, undoable deletion, and the marked set.
//!
//! Each is a trait passed explicitly into the operations that need it, plus a small
//! reference implementation.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::{HashMap, HashSet};

use crate::node::SceneNode;
use crate::types::{IdGroup, ObjectId, Owner};

/// Hands out and releases node identifiers, partitioned by [`IdGroup`].
pub trait IdAllocator {
    /// Allocate an unused identifier in `group`.
    fn next_id(&mut self, group: IdGroup) -> ObjectId;

    /// Claim a specific identifier, for example one read back from a file or carried by a
    /// node being re-added.
    ///
    /// Returns `false` if it is already in use; the caller should then give the node a fresh
    /// identifier from [`IdAllocator::next_id`].
    fn reserve_id(&mut self, id: ObjectId) -> bool;

    /// Release an identifier.
    fn remove_id(&mut self, id: ObjectId);
}

#[derive(Clone, Debug)]
struct GroupIds {
    used: HashSet<u32>,
    /// next candidate; wraps to 1 on overflow
    cursor: u32,
}

impl Default for GroupIds {
    fn default() -> Self {
        Self {
            used: HashSet::new(),
            cursor: 1,
        }
    }
}

/// Default [`IdAllocator`]: the lowest free identifier at or above a per-group cursor.
///
/// ```rust
/// use understory_scene::{IdAllocator, IdGroup, IdRegistry, ObjectId};
///
/// let mut ids = IdRegistry::new();
/// let a = ids.next_id(IdGroup::SOLID);
/// let b = ids.next_id(IdGroup::SOLID);
/// assert_ne!(a, b);
///
/// // Groups count independently, but identifiers keep their group.
/// let g = ids.next_id(IdGroup::GROUP);
/// assert_eq!(g.get(), a.get());
/// assert_ne!(g, a);
///
/// // Ids read from a file can be claimed, once.
/// let stored = ObjectId::new(IdGroup::SOLID, 40).unwrap();
/// assert!(ids.reserve_id(stored));
/// assert!(!ids.reserve_id(stored));
/// ```
#[derive(Clone, Debug, Default)]
pub struct IdRegistry {
    groups: HashMap<IdGroup, GroupIds>,
}

impl IdRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `id` is currently in use.
    #[must_use]
    pub fn is_used(&self, id: ObjectId) -> bool {
        self.groups
            .get(&id.group())
            .is_some_and(|g| g.used.contains(&id.get()))
    }

    /// Number of identifiers in use in `group`.
    #[must_use]
    pub fn used_count(&self, group: IdGroup) -> usize {
        self.groups.get(&group).map_or(0, |g| g.used.len())
    }

    /// Forget every allocation and restart every group at 1.
    pub fn reset(&mut self) {
        self.groups.clear();
    }
}

impl IdAllocator for IdRegistry {
    fn next_id(&mut self, group: IdGroup) -> ObjectId {
        let ids = self.groups.entry(group).or_default();
        loop {
            let candidate = ids.cursor;
            ids.cursor = ids.cursor.checked_add(1).unwrap_or(1);
            if let Some(id) = ObjectId::new(group, candidate)
                && ids.used.insert(candidate)
            {
                return id;
            }
        }
    }

    fn reserve_id(&mut self, id: ObjectId) -> bool {
        self.groups.entry(id.group()).or_default().used.insert(id.get())
    }

    fn remove_id(&mut self, id: ObjectId) {
        if let Some(ids) = self.groups.get_mut(&id.group()) {
            ids.used.remove(&id.get());
        }
    }
}

/// Receives nodes deleted as part of an undoable action.
///
/// The log takes ownership and decides whether to drop the node now or keep it so the deletion
/// can be reversed. `owner` is the list the node was removed from.
pub trait UndoLog {
    /// Take ownership of a deleted node.
    fn delete_undoably(&mut self, owner: Owner, node: Box<dyn SceneNode>);
}

/// A node held by [`DeleteLog`] together with where it came from.
#[derive(Debug)]
pub struct Deleted {
    /// The list the node was removed from.
    pub owner: Owner,
    /// The node itself.
    pub node: Box<dyn SceneNode>,
}

/// Default [`UndoLog`]: keeps deleted nodes in deletion order until purged.
#[derive(Debug, Default)]
pub struct DeleteLog {
    entries: Vec<Deleted>,
}

impl DeleteLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes held for reversal.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Held nodes, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[Deleted] {
        &self.entries
    }

    /// Reverse the most recent deletion, returning the node to the caller.
    pub fn undo_last(&mut self) -> Option<Deleted> {
        self.entries.pop()
    }

    /// Drop every held node; deletions can no longer be reversed.
    pub fn purge(&mut self) {
        tracing::debug!(count = self.entries.len(), "purging delete log");
        self.entries.clear();
    }
}

impl UndoLog for DeleteLog {
    fn delete_undoably(&mut self, owner: Owner, node: Box<dyn SceneNode>) {
        tracing::trace!(id = ?node.id(), ?owner, "node deleted undoably");
        self.entries.push(Deleted { owner, node });
    }
}

/// Answers whether a node is marked (highlighted) for rendering.
pub trait MarkedSet {
    /// Returns `true` if `id` is marked.
    fn is_marked(&self, id: ObjectId) -> bool;
}

/// A [`MarkedSet`] that marks nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct Unmarked;

impl MarkedSet for Unmarked {
    fn is_marked(&self, _id: ObjectId) -> bool {
        false
    }
}

/// Default [`MarkedSet`]: a hash set of identifiers.
#[derive(Clone, Default)]
pub struct MarkedList {
    ids: HashSet<ObjectId>,
}

impl fmt::Debug for MarkedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkedList")
            .field("len", &self.ids.len())
            .finish_non_exhaustive()
    }
}

impl MarkedList {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id`. Returns `true` if it was not marked before.
    pub fn insert(&mut self, id: ObjectId) -> bool {
        self.ids.insert(id)
    }

    /// Unmark `id`. Returns `true` if it was marked.
    pub fn remove(&mut self, id: ObjectId) -> bool {
        self.ids.remove(&id)
    }

    /// Flip the mark on `id`.
    pub fn toggle(&mut self, id: ObjectId) {
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    /// Unmark everything.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Number of marked identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if nothing is marked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl MarkedSet for MarkedList {
    fn is_marked(&self, id: ObjectId) -> bool {
        self.ids.contains(&id)
    }
}

impl<M: MarkedSet + ?Sized> MarkedSet for &M {
    fn is_marked(&self, id: ObjectId) -> bool {
        (**self).is_marked(id)
    }
}
