// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core list implementation: ordered ownership, positional access, traversal, dispatch.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::iter::FusedIterator;

use kurbo::Affine;

use crate::bounds::BoundingBox;
use crate::node::{NodeBase, SceneNode};
use crate::render::{RenderFlags, Renderer};
use crate::services::{IdAllocator, MarkedSet, UndoLog};
use crate::types::{IdGroup, NodeKinds, ObjectId, Owner};
use crate::xml::{Element, ReadContext};

/// Decides what an [`ObjList`] accepts and how it presents itself as a node.
pub trait ListPolicy: Clone + Default + fmt::Debug + 'static {
    /// Element name used when the list is written as a child of another list.
    const TAG: &'static str;
    /// Category reported by the list itself.
    const KIND: NodeKinds = NodeKinds::GROUP;
    /// Group the list's own identifier is allocated from.
    const ID_GROUP: IdGroup = IdGroup::GROUP;

    /// Returns `false` to reject `node` in [`ObjList::add`].
    fn can_add(&self, node: &dyn SceneNode) -> bool {
        let _ = node;
        true
    }
}

/// Accepts every node.
#[derive(Copy, Clone, Debug, Default)]
pub struct Group;

impl ListPolicy for Group {
    const TAG: &'static str = "Group";
}

/// Accepts only solid bodies.
#[derive(Copy, Clone, Debug, Default)]
pub struct Solids;

impl ListPolicy for Solids {
    const TAG: &'static str = "Solids";

    fn can_add(&self, node: &dyn SceneNode) -> bool {
        node.kind().intersects(NodeKinds::SOLID)
    }
}

/// A node refused by [`ObjList::add`], handed back to the caller.
pub struct AddError {
    node: Box<dyn SceneNode>,
}

impl AddError {
    /// Take the rejected node back.
    #[must_use]
    pub fn into_node(self) -> Box<dyn SceneNode> {
        self.node
    }

    /// The rejected node.
    #[must_use]
    pub fn node(&self) -> &dyn SceneNode {
        &*self.node
    }
}

impl fmt::Debug for AddError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddError")
            .field("type_name", &self.node.type_name())
            .field("id", &self.node.id())
            .finish()
    }
}

impl fmt::Display for AddError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "list does not accept {} nodes", self.node.type_name())
    }
}

impl core::error::Error for AddError {}

#[derive(Debug)]
struct Entry {
    generation: u32,
    prev: Option<usize>,
    next: Option<usize>,
    node: Box<dyn SceneNode>,
}

/// Position of a pull-based traversal over an [`ObjList`].
///
/// Cursors are plain values: several may walk the same list at once. A cursor whose child has
/// since been removed (or whose list was cleared) is stale and yields `None`.
///
/// ```rust
/// use understory_scene::{ChildCursor, Group, ObjList};
///
/// let list = ObjList::<Group>::new();
/// let mut cursor = ChildCursor::new();
/// assert!(list.first_child(&mut cursor).is_none());
/// assert!(list.next_child(&mut cursor).is_none());
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChildCursor {
    /// slot and generation of the child last returned
    at: Option<(usize, u32)>,
}

impl ChildCursor {
    /// A cursor positioned nowhere; call [`ObjList::first_child`] to start.
    #[must_use]
    pub const fn new() -> Self {
        Self { at: None }
    }
}

/// Composite node owning an ordered list of children.
///
/// Children are boxed [`SceneNode`]s. [`ObjList::add`] moves a child in and assigns its
/// identifier; [`ObjList::remove`] moves it back out. Dropping the list drops its children.
///
/// The canonical order lives in a slot arena linked front to back. A flat index over that order
/// is rebuilt on demand for [`ObjList::at_index`], so positional reads take `&mut self`.
///
/// The type parameter `P` is the [`ListPolicy`] that filters insertions. It defaults to
/// [`Group`], which accepts everything.
///
/// ## Example
///
/// ```rust
/// use understory_scene::{Group, IdRegistry, ObjList, SceneNode};
///
/// let mut ids = IdRegistry::new();
/// let mut list = ObjList::<Group>::new();
///
/// let a = list.add(Box::new(ObjList::<Group>::new()), None, &mut ids).unwrap();
/// let b = list.add(Box::new(ObjList::<Group>::new()), None, &mut ids).unwrap();
/// // Insert before `b`.
/// let c = list.add(Box::new(ObjList::<Group>::new()), Some(b), &mut ids).unwrap();
///
/// let order: Vec<_> = list.iter().filter_map(|n| n.id()).collect();
/// assert_eq!(order, [a, c, b]);
/// assert_eq!(list.at_index(1).and_then(|n| n.id()), Some(c));
///
/// let taken = list.remove(c, &mut ids).unwrap();
/// assert_eq!(taken.owner(), None);
/// assert_eq!(list.len(), 2);
/// ```
pub struct ObjList<P: ListPolicy = Group> {
    base: NodeBase,
    policy: P,
    /// slots
    slots: Vec<Option<Entry>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
    /// slot indices in list order, valid only while `index_valid`
    index: Vec<usize>,
    index_valid: bool,
}

impl<P: ListPolicy> fmt::Debug for ObjList<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjList")
            .field("tag", &P::TAG)
            .field("id", &self.base.id)
            .field("len", &self.len)
            .field("slots_total", &self.slots.len())
            .field("free_list", &self.free_list.len())
            .field("index_valid", &self.index_valid)
            .finish_non_exhaustive()
    }
}

impl<P: ListPolicy> Default for ObjList<P> {
    fn default() -> Self {
        Self::with_policy(P::default())
    }
}

impl<P: ListPolicy> ObjList<P> {
    /// Create an empty list with the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty list with a specific policy value.
    #[must_use]
    pub fn with_policy(policy: P) -> Self {
        Self {
            base: NodeBase::new(),
            policy,
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            head: None,
            tail: None,
            len: 0,
            index: Vec::new(),
            index_valid: true,
        }
    }

    /// The insertion policy.
    #[must_use]
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The owner link this list hands to its children.
    fn owner_link(&self) -> Owner {
        self.base.id.map_or(Owner::Root, Owner::Node)
    }

    /// Insert `node`, taking ownership.
    ///
    /// With `anchor` set and present, `node` goes immediately before the anchor. With no anchor,
    /// an empty list, or an anchor that is not a child of this list, `node` is appended; an
    /// absent anchor is not an error.
    ///
    /// On success the node's owner link is set and its [`SceneNode::on_add`] hook runs. A node
    /// without an identifier receives one from `ids`. A node that already carries one (re-added
    /// after removal, or read back from markup) has it reserved in `ids`; if another node holds
    /// it, the node gets a fresh identifier instead. Returns the identifier.
    ///
    /// Fails without changing anything when the [`ListPolicy`] rejects the node; the error
    /// carries the node back.
    pub fn add(
        &mut self,
        mut node: Box<dyn SceneNode>,
        anchor: Option<ObjectId>,
        ids: &mut dyn IdAllocator,
    ) -> Result<ObjectId, AddError> {
        if !self.policy.can_add(&*node) {
            tracing::debug!(
                type_name = node.type_name(),
                list = P::TAG,
                "list rejected node"
            );
            return Err(AddError { node });
        }

        let before = match anchor {
            Some(anchor) if !self.is_empty() => self.find(anchor),
            _ => None,
        };

        node.set_owner(Some(self.owner_link()));
        node.on_add();
        let id = match node.id() {
            Some(id) if ids.reserve_id(id) => id,
            stale => {
                let id = ids.next_id(node.id_group());
                if let Some(taken) = stale {
                    tracing::debug!(%taken, %id, "identifier already in use, reassigned");
                }
                node.set_id(id);
                id
            }
        };

        let slot = self.alloc_slot(node);
        match before {
            Some(next) => self.link_before(slot, next),
            None => self.link_back(slot),
        }
        self.len += 1;
        self.index_valid = false;

        tracing::trace!(%id, ?anchor, inserted_before_anchor = before.is_some(), "child added");
        Ok(id)
    }

    /// Remove the child with identifier `id` and hand it back to the caller.
    ///
    /// The child's owner link is cleared, its [`SceneNode::on_remove`] hook runs, and its
    /// identifier is released in `ids` (the node keeps the value). Returns `None`, changing
    /// nothing, if no child has that identifier.
    pub fn remove(&mut self, id: ObjectId, ids: &mut dyn IdAllocator) -> Option<Box<dyn SceneNode>> {
        let slot = self.find(id)?;
        self.unlink(slot);
        let mut node = self.free_slot(slot);
        self.len -= 1;
        self.index_valid = false;

        node.set_owner(None);
        node.on_remove();
        ids.remove_id(id);

        tracing::trace!(%id, "child removed");
        Some(node)
    }

    /// Drop every child, clearing each owner link first.
    ///
    /// This is not recorded anywhere; use [`ObjList::clear_undoably`] for user-visible deletion.
    pub fn clear(&mut self) {
        if self.is_empty() {
            return;
        }
        tracing::debug!(count = self.len, list = P::TAG, "clearing list");
        for mut node in self.drain_in_order() {
            node.set_owner(None);
            drop(node);
        }
    }

    /// Hand every child to `undo`, in order, and empty the list.
    ///
    /// The undo log decides whether each child is dropped now or kept for reversal. Children
    /// are detached (owner link cleared) before hand-off. Cursors into this list become stale.
    pub fn clear_undoably(&mut self, undo: &mut dyn UndoLog) {
        if self.is_empty() {
            return;
        }
        tracing::debug!(count = self.len, list = P::TAG, "clearing list undoably");
        let owner = self.owner_link();
        for mut node in self.drain_in_order() {
            node.set_owner(None);
            undo.delete_undoably(owner, node);
        }
    }

    /// Replace the children with deep copies of `source`'s children.
    ///
    /// Copies are appended in order and receive fresh identifiers. Children whose
    /// [`SceneNode::make_copy`] returns `None` are skipped.
    pub fn copy_from(&mut self, source: &Self, ids: &mut dyn IdAllocator) {
        self.clear();
        for child in source.iter() {
            let Some(copy) = child.make_copy(ids) else {
                tracing::debug!(type_name = child.type_name(), "child could not be copied");
                continue;
            };
            if let Err(e) = self.add(copy, None, ids) {
                tracing::debug!(error = %e, "copied child rejected");
            }
        }
    }

    /// A deep copy of this list with the same policy and no identifier of its own.
    #[must_use]
    pub fn duplicate(&self, ids: &mut dyn IdAllocator) -> Self {
        let mut copy = Self::with_policy(self.policy.clone());
        copy.copy_from(self, ids);
        copy
    }

    /// The child at position `index`, or `None` if out of range.
    ///
    /// Rebuilds the positional index first if a mutation has invalidated it.
    pub fn at_index(&mut self, index: usize) -> Option<&dyn SceneNode> {
        let slot = self.slot_at(index)?;
        self.slots[slot].as_ref().map(|e| &*e.node)
    }

    /// Mutable form of [`ObjList::at_index`].
    pub fn at_index_mut(&mut self, index: usize) -> Option<&mut dyn SceneNode> {
        let slot = self.slot_at(index)?;
        self.slots[slot].as_mut().map(|e| &mut *e.node)
    }

    /// Position of the child with identifier `id`.
    pub fn position(&mut self, id: ObjectId) -> Option<usize> {
        let slot = self.find(id)?;
        self.refresh_index();
        self.index.iter().position(|&s| s == slot)
    }

    /// The child with identifier `id`.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&dyn SceneNode> {
        let slot = self.find(id)?;
        self.slots[slot].as_ref().map(|e| &*e.node)
    }

    /// The child with identifier `id`, mutably.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut dyn SceneNode> {
        let slot = self.find(id)?;
        self.slots[slot].as_mut().map(|e| &mut *e.node)
    }

    /// Returns `true` if a child has identifier `id`.
    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.find(id).is_some()
    }

    /// Reset `cursor` to the first child and return it, or `None` if the list is empty.
    pub fn first_child(&self, cursor: &mut ChildCursor) -> Option<&dyn SceneNode> {
        cursor.at = None;
        let slot = self.head?;
        let entry = self.entry(slot);
        cursor.at = Some((slot, entry.generation));
        Some(&*entry.node)
    }

    /// Advance `cursor` and return the next child.
    ///
    /// Returns `None` once the end is passed, if the list was empty at the last
    /// [`ObjList::first_child`], or if the cursor's child has been removed since.
    pub fn next_child(&self, cursor: &mut ChildCursor) -> Option<&dyn SceneNode> {
        let (slot, generation) = cursor.at?;
        let current = match self.slots.get(slot) {
            Some(Some(entry)) if entry.generation == generation => entry,
            _ => {
                cursor.at = None;
                return None;
            }
        };
        let Some(next) = current.next else {
            cursor.at = None;
            return None;
        };
        let entry = self.entry(next);
        cursor.at = Some((next, entry.generation));
        Some(&*entry.node)
    }

    /// Iterate children in order.
    pub fn iter(&self) -> Children<'_, P> {
        Children {
            list: self,
            front: self.head,
            back: self.tail,
            remaining: self.len,
        }
    }

    /// Call `f` on every child, in order.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut dyn SceneNode)) {
        let mut current = self.head;
        while let Some(slot) = current {
            let Some(entry) = self.slots[slot].as_mut() else {
                unreachable!("linked slot is unoccupied");
            };
            f(&mut *entry.node);
            current = entry.next;
        }
    }

    /// Write every child, in order, as a child element of `parent`.
    pub fn write_base_xml(&self, parent: &mut Element) {
        for child in self.iter() {
            child.write_xml(parent);
        }
    }

    /// Append a node for every direct child element of `root` that the factory recognizes.
    ///
    /// Unrecognized elements, and nodes the policy rejects, are skipped.
    pub fn read_base_xml(&mut self, root: &Element, cx: &mut ReadContext<'_>) {
        for element in root.children() {
            let Some(node) = cx.read_element(element) else {
                tracing::debug!(tag = element.name(), "skipping unrecognized element");
                continue;
            };
            if let Err(e) = self.add(node, None, &mut *cx.ids) {
                tracing::debug!(tag = element.name(), error = %e, "skipping rejected element");
            }
        }
    }

    /// Reader for elements named [`ListPolicy::TAG`], for registration with a
    /// [`NodeFactory`](crate::NodeFactory).
    pub fn read_from_xml(element: &Element, cx: &mut ReadContext<'_>) -> Option<Box<dyn SceneNode>> {
        let mut list = Self::new();
        if let Some(id) = cx.stored_id(element, P::ID_GROUP) {
            list.base.id = Some(id);
        }
        list.read_base_xml(element, cx);
        Some(Box::new(list))
    }

    // --- internals ---

    fn entry(&self, slot: usize) -> &Entry {
        let Some(entry) = self.slots[slot].as_ref() else {
            unreachable!("linked slot is unoccupied");
        };
        entry
    }

    fn entry_mut(&mut self, slot: usize) -> &mut Entry {
        let Some(entry) = self.slots[slot].as_mut() else {
            unreachable!("linked slot is unoccupied");
        };
        entry
    }

    /// Walk the order front to back looking for `id`. Runs off the end when absent.
    fn find(&self, id: ObjectId) -> Option<usize> {
        let mut current = self.head;
        while let Some(slot) = current {
            let entry = self.entry(slot);
            if entry.node.id() == Some(id) {
                return Some(slot);
            }
            current = entry.next;
        }
        None
    }

    fn refresh_index(&mut self) {
        if self.index_valid {
            return;
        }
        self.index.clear();
        self.index.reserve(self.len);
        let mut current = self.head;
        while let Some(slot) = current {
            self.index.push(slot);
            current = self.entry(slot).next;
        }
        self.index_valid = true;
    }

    fn slot_at(&mut self, index: usize) -> Option<usize> {
        self.refresh_index();
        self.index.get(index).copied()
    }

    fn alloc_slot(&mut self, node: Box<dyn SceneNode>) -> usize {
        if let Some(slot) = self.free_list.pop() {
            let generation = self.generations[slot].wrapping_add(1);
            self.generations[slot] = generation;
            self.slots[slot] = Some(Entry {
                generation,
                prev: None,
                next: None,
                node,
            });
            slot
        } else {
            let generation = 1_u32;
            self.slots.push(Some(Entry {
                generation,
                prev: None,
                next: None,
                node,
            }));
            self.generations.push(generation);
            self.slots.len() - 1
        }
    }

    fn free_slot(&mut self, slot: usize) -> Box<dyn SceneNode> {
        let Some(entry) = self.slots[slot].take() else {
            unreachable!("freed slot is unoccupied");
        };
        self.free_list.push(slot);
        entry.node
    }

    fn link_back(&mut self, slot: usize) {
        let tail = self.tail;
        {
            let entry = self.entry_mut(slot);
            entry.prev = tail;
            entry.next = None;
        }
        match tail {
            Some(t) => self.entry_mut(t).next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
    }

    fn link_before(&mut self, slot: usize, next: usize) {
        let prev = self.entry(next).prev;
        {
            let entry = self.entry_mut(slot);
            entry.prev = prev;
            entry.next = Some(next);
        }
        self.entry_mut(next).prev = Some(slot);
        match prev {
            Some(p) => self.entry_mut(p).next = Some(slot),
            None => self.head = Some(slot),
        }
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = {
            let entry = self.entry(slot);
            (entry.prev, entry.next)
        };
        match prev {
            Some(p) => self.entry_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.entry_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }

    /// Take every child out in order, leaving the list empty with a valid, empty index.
    fn drain_in_order(&mut self) -> Vec<Box<dyn SceneNode>> {
        let mut nodes = Vec::with_capacity(self.len);
        let mut current = self.head;
        while let Some(slot) = current {
            current = self.entry(slot).next;
            nodes.push(self.free_slot(slot));
        }
        self.head = None;
        self.tail = None;
        self.len = 0;
        self.index.clear();
        self.index_valid = true;
        nodes
    }
}

impl<P: ListPolicy> SceneNode for ObjList<P> {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn kind(&self) -> NodeKinds {
        P::KIND
    }

    fn type_name(&self) -> &'static str {
        P::TAG
    }

    fn id_group(&self) -> IdGroup {
        P::ID_GROUP
    }

    fn set_id(&mut self, id: ObjectId) {
        self.base.id = Some(id);
        let owner = Some(Owner::Node(id));
        self.for_each_mut(|child| child.set_owner(owner));
    }

    fn bounds(&self, bounds: &mut BoundingBox) {
        for child in self.iter() {
            child.bounds(bounds);
        }
    }

    fn transform(&mut self, transform: Affine) {
        self.for_each_mut(|child| child.transform(transform));
    }

    fn invalidate_render(&mut self) {
        self.for_each_mut(|child| child.invalidate_render());
    }

    fn render(&mut self, renderer: &mut dyn Renderer, flags: RenderFlags, marked: &dyn MarkedSet) {
        let select = flags.contains(RenderFlags::SELECT);
        self.for_each_mut(|child| {
            let id = child.id();
            let mut child_flags = flags;
            child_flags.set(
                RenderFlags::MARKED,
                flags.contains(RenderFlags::MARKED) || id.is_some_and(|id| marked.is_marked(id)),
            );
            let name = id.filter(|_| select);
            if let Some(id) = name {
                renderer.push_name(id);
            }
            child.render(renderer, child_flags, marked);
            if name.is_some() {
                renderer.pop_name();
            }
        });
    }

    fn make_copy(&self, ids: &mut dyn IdAllocator) -> Option<Box<dyn SceneNode>> {
        Some(Box::new(self.duplicate(ids)))
    }

    fn write_xml(&self, parent: &mut Element) {
        let mut element = Element::new(P::TAG);
        if let Some(id) = self.base.id {
            element.set_attribute("id", id.get());
        }
        self.write_base_xml(&mut element);
        parent.push_child(element);
    }
}

/// Iterator over the children of an [`ObjList`], in order.
#[derive(Clone)]
pub struct Children<'a, P: ListPolicy> {
    list: &'a ObjList<P>,
    front: Option<usize>,
    back: Option<usize>,
    remaining: usize,
}

impl<P: ListPolicy> fmt::Debug for Children<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Children")
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

impl<'a, P: ListPolicy> Iterator for Children<'a, P> {
    type Item = &'a dyn SceneNode;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.front?;
        let entry = self.list.entry(slot);
        self.front = entry.next;
        self.remaining -= 1;
        Some(&*entry.node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<P: ListPolicy> DoubleEndedIterator for Children<'_, P> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.back?;
        let entry = self.list.entry(slot);
        self.back = entry.prev;
        self.remaining -= 1;
        Some(&*entry.node)
    }
}

impl<P: ListPolicy> ExactSizeIterator for Children<'_, P> {}

impl<P: ListPolicy> FusedIterator for Children<'_, P> {}

impl<'a, P: ListPolicy> IntoIterator for &'a ObjList<P> {
    type Item = &'a dyn SceneNode;
    type IntoIter = Children<'a, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
