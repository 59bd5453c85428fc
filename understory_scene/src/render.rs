// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render dispatch contract: flags, cached render lists, and the renderer sink.

use alloc::vec::Vec;
use kurbo::Point;

use crate::types::{Color, ObjectId};

bitflags::bitflags! {
    /// Per-call render state forwarded from a list to each child.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RenderFlags: u8 {
        /// Rendering for hit testing; children are wrapped in selection names.
        const SELECT   = 0b0000_0001;
        /// Draw as marked (highlighted).
        const MARKED   = 0b0000_0010;
        /// Do not emit colors.
        const NO_COLOR = 0b0000_0100;
    }
}

/// Handle to a compiled render list owned by a [`Renderer`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RenderList(pub u32);

/// Immediate-mode sink that nodes render into.
///
/// Leaves typically compile their geometry once between [`Renderer::begin_list`] and
/// [`Renderer::end_list`], keep the returned [`RenderList`], and replay it with
/// [`Renderer::call_list`] until they are invalidated.
pub trait Renderer {
    /// Push a selection name used for hit testing.
    fn push_name(&mut self, id: ObjectId);
    /// Pop the last selection name.
    fn pop_name(&mut self);
    /// Start recording a render list.
    fn begin_list(&mut self) -> RenderList;
    /// Finish the list started by [`Renderer::begin_list`].
    fn end_list(&mut self);
    /// Replay a previously recorded list.
    fn call_list(&mut self, list: RenderList);
    /// Set the current color.
    fn set_color(&mut self, color: Color);
    /// Emit one filled triangle.
    fn triangle(&mut self, points: [Point; 3]);
}

/// One call recorded by [`Recorder`].
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand {
    /// [`Renderer::push_name`].
    PushName(ObjectId),
    /// [`Renderer::pop_name`].
    PopName,
    /// [`Renderer::begin_list`].
    BeginList(RenderList),
    /// [`Renderer::end_list`].
    EndList,
    /// [`Renderer::call_list`].
    CallList(RenderList),
    /// [`Renderer::set_color`].
    Color(Color),
    /// [`Renderer::triangle`].
    Triangle([Point; 3]),
}

/// A [`Renderer`] that records every call, useful for tests and display-list capture.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    commands: Vec<RenderCommand>,
    next_list: u32,
}

impl Recorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded commands, oldest first.
    #[must_use]
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Number of render lists compiled so far.
    #[must_use]
    pub fn lists_compiled(&self) -> u32 {
        self.next_list
    }

    /// Forget recorded commands. List handles keep counting.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl Renderer for Recorder {
    fn push_name(&mut self, id: ObjectId) {
        self.commands.push(RenderCommand::PushName(id));
    }

    fn pop_name(&mut self) {
        self.commands.push(RenderCommand::PopName);
    }

    fn begin_list(&mut self) -> RenderList {
        self.next_list += 1;
        let list = RenderList(self.next_list);
        self.commands.push(RenderCommand::BeginList(list));
        list
    }

    fn end_list(&mut self) {
        self.commands.push(RenderCommand::EndList);
    }

    fn call_list(&mut self, list: RenderList) {
        self.commands.push(RenderCommand::CallList(list));
    }

    fn set_color(&mut self, color: Color) {
        self.commands.push(RenderCommand::Color(color));
    }

    fn triangle(&mut self, points: [Point; 3]) {
        self.commands.push(RenderCommand::Triangle(points));
    }
}
