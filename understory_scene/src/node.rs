// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The node contract every child of an [`ObjList`](crate::ObjList) satisfies.

use alloc::boxed::Box;
use core::any::Any;
use core::fmt;

use kurbo::Affine;

use crate::bounds::BoundingBox;
use crate::render::{RenderFlags, Renderer};
use crate::services::{IdAllocator, MarkedSet};
use crate::types::{IdGroup, NodeKinds, ObjectId, Owner};
use crate::xml::Element;

/// State every node carries: its identifier and the link to the list that owns it.
///
/// A fresh `NodeBase` has neither. Copies of a node should start from a fresh base so they
/// receive their own identifier when added.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeBase {
    pub(crate) id: Option<ObjectId>,
    pub(crate) owner: Option<Owner>,
}

impl NodeBase {
    /// Create a base with no identifier and no owner.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            id: None,
            owner: None,
        }
    }

    /// Create a base with a known identifier, for example one restored from a file.
    #[must_use]
    pub const fn with_id(id: ObjectId) -> Self {
        Self {
            id: Some(id),
            owner: None,
        }
    }
}

/// A node that can live in an [`ObjList`](crate::ObjList).
///
/// Lists only ever talk to their children through this trait: they ask for bounds, apply
/// transforms, drop cached render lists, render, copy, and serialize. Leaf geometry stays
/// behind the implementation.
///
/// Readers are not part of the trait; register a free function per element name with a
/// [`NodeFactory`](crate::NodeFactory).
pub trait SceneNode: Any + fmt::Debug + 'static {
    /// Shared identifier/owner state.
    fn base(&self) -> &NodeBase;

    /// Shared identifier/owner state, mutably.
    fn base_mut(&mut self) -> &mut NodeBase;

    /// Category of this node.
    fn kind(&self) -> NodeKinds;

    /// Human-readable type name.
    fn type_name(&self) -> &'static str;

    /// Group this node's identifier is allocated from.
    fn id_group(&self) -> IdGroup;

    /// The node's identifier, `None` until it is first added to a list.
    fn id(&self) -> Option<ObjectId> {
        self.base().id
    }

    /// Assign the identifier.
    fn set_id(&mut self, id: ObjectId) {
        self.base_mut().id = Some(id);
    }

    /// The list that owns this node, if any.
    fn owner(&self) -> Option<Owner> {
        self.base().owner
    }

    /// Set or clear the owner link. Called by lists on insertion and removal.
    fn set_owner(&mut self, owner: Option<Owner>) {
        self.base_mut().owner = owner;
    }

    /// Called after the node has been linked into a list.
    fn on_add(&mut self) {}

    /// Called after the node has been unlinked from a list.
    ///
    /// The default drops cached render lists once the node is detached.
    fn on_remove(&mut self) {
        if self.owner().is_none() {
            self.invalidate_render();
        }
    }

    /// Grow `bounds` by this node's extent.
    fn bounds(&self, bounds: &mut BoundingBox);

    /// Apply `transform` to the node's geometry.
    fn transform(&mut self, transform: Affine);

    /// Drop any cached render representation. Must not recompute geometry.
    fn invalidate_render(&mut self);

    /// Render into `renderer`.
    fn render(&mut self, renderer: &mut dyn Renderer, flags: RenderFlags, marked: &dyn MarkedSet);

    /// Deep copy. The copy has no identifier and no owner.
    ///
    /// `ids` is available to containers that add copied children to themselves.
    /// Returns `None` for nodes that cannot be copied.
    fn make_copy(&self, ids: &mut dyn IdAllocator) -> Option<Box<dyn SceneNode>>;

    /// Append this node's element under `parent`.
    fn write_xml(&self, parent: &mut Element);
}

impl dyn SceneNode {
    /// Returns `true` if the node is a `T`.
    pub fn is<T: SceneNode>(&self) -> bool {
        (self as &dyn Any).is::<T>()
    }

    /// Downcast to a concrete node type.
    pub fn downcast_ref<T: SceneNode>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    /// Downcast to a concrete node type, mutably.
    pub fn downcast_mut<T: SceneNode>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut::<T>()
    }
}
