// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A small leaf used by the unit tests.

use alloc::boxed::Box;
use alloc::string::String;
use kurbo::{Affine, Rect};

use crate::{
    BoundingBox, Element, IdAllocator, IdGroup, MarkedSet, NodeBase, NodeKinds, ReadContext,
    RenderFlags, Renderer, SceneNode,
};

/// Leaf with a label and an optional rectangle; counts invalidations and renders.
#[derive(Clone, Debug, Default)]
pub(crate) struct TestLeaf {
    base: NodeBase,
    pub(crate) label: String,
    pub(crate) rect: BoundingBox,
    pub(crate) kind: Option<NodeKinds>,
    pub(crate) copyable: bool,
    pub(crate) invalidations: u32,
    pub(crate) last_flags: Option<RenderFlags>,
}

impl TestLeaf {
    pub(crate) const TAG: &'static str = "TestLeaf";

    pub(crate) fn new(label: &str) -> Self {
        Self {
            label: label.into(),
            copyable: true,
            ..Self::default()
        }
    }

    pub(crate) fn boxed(label: &str) -> Box<dyn SceneNode> {
        Box::new(Self::new(label))
    }

    pub(crate) fn with_rect(label: &str, rect: Rect) -> Box<dyn SceneNode> {
        Box::new(Self {
            rect: BoundingBox::from_rect(rect),
            ..Self::new(label)
        })
    }

    pub(crate) fn solid(label: &str) -> Box<dyn SceneNode> {
        Box::new(Self {
            kind: Some(NodeKinds::SOLID),
            ..Self::new(label)
        })
    }

    pub(crate) fn read_from_xml(
        element: &Element,
        cx: &mut ReadContext<'_>,
    ) -> Option<Box<dyn SceneNode>> {
        let mut leaf = Self::new(element.attribute("label")?);
        if let Some(id) = cx.stored_id(element, IdGroup::SKETCH) {
            leaf.base = NodeBase::with_id(id);
        }
        Some(Box::new(leaf))
    }
}

/// Label of a node that is expected to be a [`TestLeaf`].
pub(crate) fn label(node: &dyn SceneNode) -> &str {
    node.downcast_ref::<TestLeaf>()
        .map(|p| p.label.as_str())
        .unwrap_or("<not a test leaf>")
}

impl SceneNode for TestLeaf {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn kind(&self) -> NodeKinds {
        self.kind.unwrap_or(NodeKinds::SKETCH)
    }

    fn type_name(&self) -> &'static str {
        Self::TAG
    }

    fn id_group(&self) -> IdGroup {
        IdGroup::SKETCH
    }

    fn bounds(&self, bounds: &mut BoundingBox) {
        bounds.insert(&self.rect);
    }

    fn transform(&mut self, transform: Affine) {
        self.rect = self.rect.transformed(transform);
    }

    fn invalidate_render(&mut self) {
        self.invalidations += 1;
    }

    fn render(&mut self, _renderer: &mut dyn Renderer, flags: RenderFlags, _marked: &dyn MarkedSet) {
        self.last_flags = Some(flags);
    }

    fn make_copy(&self, _ids: &mut dyn IdAllocator) -> Option<Box<dyn SceneNode>> {
        if !self.copyable {
            return None;
        }
        Some(Box::new(Self {
            base: NodeBase::new(),
            invalidations: 0,
            last_flags: None,
            ..self.clone()
        }))
    }

    fn write_xml(&self, parent: &mut Element) {
        let element = parent.add_child(Self::TAG);
        element.set_attribute("label", &self.label);
        if let Some(id) = self.id() {
            element.set_attribute("id", id.get());
        }
    }
}
