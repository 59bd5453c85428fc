// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_scene --heading-base-level=0

//! Understory Scene: an owning composite node for scene graphs.
//!
//! Understory Scene is the container at the heart of a document model for CAD-style editors:
//! a node that owns an ordered list of child nodes and forwards geometry, rendering, and
//! serialization work to them.
//!
//! - Owns children as boxed [`SceneNode`]s; insertion moves ownership in, removal moves it out.
//! - Keeps insertion order, with insert-before-anchor, and O(1) positional reads through a
//!   lazily rebuilt index.
//! - Offers restartable cursors and a standard iterator for traversal.
//! - Forwards bounds, transforms, render-list invalidation, and rendering to every child.
//! - Writes and reads a markup [`Element`] tree, one element per node.
//!
//! ## Collaborators are passed in
//!
//! The list does not reach for global state. Operations that need a service take it as an
//! argument:
//! - [`IdAllocator`] assigns identifiers on insertion and releases them on removal
//!   ([`IdRegistry`] is a ready-made implementation).
//! - [`UndoLog`] receives children deleted by [`ObjList::clear_undoably`] ([`DeleteLog`]).
//! - [`MarkedSet`] answers which children render highlighted ([`MarkedList`], [`Unmarked`]).
//! - [`Renderer`] receives render calls ([`Recorder`] captures them).
//! - [`NodeFactory`] maps element names to readers for the read path.
//!
//! ## API overview
//!
//! - [`ObjList`]: the composite node, generic over a [`ListPolicy`] that decides what it
//!   accepts ([`Group`] accepts everything, [`Solids`] only solid bodies).
//! - [`SceneNode`]: the contract every child satisfies. `ObjList` implements it too, so lists
//!   nest.
//! - [`ObjectId`], [`IdGroup`], [`NodeKinds`], [`Owner`]: identity and categorization.
//! - [`BoundingBox`]: union accumulator for [`SceneNode::bounds`].
//! - [`RenderFlags`]: select / marked / no-color state forwarded while rendering.
//!
//! Key operations:
//! - [`ObjList::add`](ObjList::add) / [`ObjList::remove`](ObjList::remove) /
//!   [`ObjList::clear`](ObjList::clear) / [`ObjList::clear_undoably`](ObjList::clear_undoably)
//! - [`ObjList::at_index`](ObjList::at_index), [`ObjList::first_child`](ObjList::first_child) /
//!   [`ObjList::next_child`](ObjList::next_child), [`ObjList::iter`](ObjList::iter)
//! - [`ObjList::copy_from`](ObjList::copy_from) / [`ObjList::duplicate`](ObjList::duplicate)
//! - [`ObjList::write_base_xml`](ObjList::write_base_xml) /
//!   [`ObjList::read_base_xml`](ObjList::read_base_xml)
//!
//! ## Example
//!
//! ```rust
//! use understory_scene::{BoundingBox, Group, IdRegistry, ObjList, SceneNode};
//!
//! let mut ids = IdRegistry::new();
//! let mut root = ObjList::<Group>::new();
//!
//! let inner = root.add(Box::new(ObjList::<Group>::new()), None, &mut ids).unwrap();
//! assert_eq!(root.len(), 1);
//! assert_eq!(root.at_index(0).and_then(|n| n.id()), Some(inner));
//!
//! // Empty groups contribute nothing to the bounds.
//! let mut bounds = BoundingBox::new();
//! root.bounds(&mut bounds);
//! assert!(bounds.is_empty());
//! ```
//!
//! ## Features
//!
//! - `std` (default): enable `std` in dependencies.
//! - `libm`: `no_std` float support for `kurbo`.
//! - `xml` (default): [`Element::parse`] and [`Element::to_xml_string`] via `quick-xml`.
//!
//! Without `xml` this crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod bounds;
mod list;
mod node;
mod render;
mod services;
mod types;
mod xml;

#[cfg(test)]
mod testing;

pub use bounds::BoundingBox;
pub use list::{AddError, ChildCursor, Children, Group, ListPolicy, ObjList, Solids};
pub use node::{NodeBase, SceneNode};
pub use render::{Recorder, RenderCommand, RenderFlags, RenderList, Renderer};
pub use services::{
    DeleteLog, Deleted, IdAllocator, IdRegistry, MarkedList, MarkedSet, UndoLog, Unmarked,
};
pub use types::{Color, IdGroup, NodeKinds, ObjectId, Owner};
pub use xml::{Element, NodeFactory, ReadContext, ReadFn};

#[cfg(feature = "xml")]
pub use xml::XmlError;
