// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the scene: identifiers, identifier groups, node kinds, owner links, and colors.

use core::fmt;
use core::num::NonZeroU32;

/// Partition key for identifier allocation.
///
/// Raw identifier values are unique within a group; two nodes of different groups may share a
/// raw value, but never an [`ObjectId`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdGroup(pub u16);

impl IdGroup {
    /// Lists and other pure containers.
    pub const GROUP: Self = Self(1);
    /// Solid bodies such as triangle meshes.
    pub const SOLID: Self = Self(2);
    /// Planar sketch geometry.
    pub const SKETCH: Self = Self(3);
}

/// Identifier of a node, handed out by an [`IdAllocator`](crate::IdAllocator).
///
/// An identifier is the pair of its [`IdGroup`] and a non-zero raw value. Lists match children
/// on the whole pair, so a sketch leaf and a sub-list that both hold raw value 1 stay distinct.
/// Only the raw value is written to markup; readers know their node's group.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId {
    group: IdGroup,
    raw: NonZeroU32,
}

impl ObjectId {
    /// Build an identifier in `group`. Returns `None` for a zero raw value.
    #[must_use]
    #[inline]
    pub const fn new(group: IdGroup, raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(raw) => Some(Self { group, raw }),
            None => None,
        }
    }

    /// The group this identifier was allocated from.
    #[must_use]
    #[inline]
    pub const fn group(self) -> IdGroup {
        self.group
    }

    /// The raw identifier value (never zero), as written to markup.
    #[must_use]
    #[inline]
    pub const fn get(self) -> u32 {
        self.raw.get()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group.0, self.raw)
    }
}

bitflags::bitflags! {
    /// Coarse node categories, used as a marking mask and by [`ListPolicy`](crate::ListPolicy)
    /// implementations to decide what a list accepts.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeKinds: u32 {
        /// A container of other nodes.
        const GROUP  = 0b0000_0001;
        /// A solid body.
        const SOLID  = 0b0000_0010;
        /// Planar sketch geometry.
        const SKETCH = 0b0000_0100;
    }
}

/// Non-owning back-reference from a child to the list that owns it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Owned by a list that has no identifier, typically the document root.
    Root,
    /// Owned by the list with this identifier.
    Node(ObjectId),
}

/// An 8-bit RGBA color.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Self = Self::from_rgba8(255, 255, 255, 255);
    /// Color used for marked (selected) geometry.
    pub const HIGHLIGHT: Self = Self::from_rgba8(0, 255, 0, 255);

    /// Create a color from its components.
    #[must_use]
    pub const fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Pack into `0xRRGGBBAA`.
    #[must_use]
    pub const fn to_rgba_u32(self) -> u32 {
        u32::from_be_bytes([self.r, self.g, self.b, self.a])
    }

    /// Unpack from `0xRRGGBBAA`.
    #[must_use]
    pub const fn from_rgba_u32(packed: u32) -> Self {
        let [r, g, b, a] = packed.to_be_bytes();
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_an_id() {
        assert_eq!(ObjectId::new(IdGroup::SOLID, 0), None, "zero means unidentified");
        assert_eq!(ObjectId::new(IdGroup::SOLID, 7).map(ObjectId::get), Some(7));
    }

    #[test]
    fn same_raw_value_in_different_groups_differs() {
        let solid = ObjectId::new(IdGroup::SOLID, 1).unwrap();
        let group = ObjectId::new(IdGroup::GROUP, 1).unwrap();
        assert_eq!(solid.get(), group.get());
        assert_ne!(solid, group, "identity includes the group");
        assert_eq!(alloc::format!("{solid}"), "2:1");
    }

    #[test]
    fn color_packing() {
        let c = Color::from_rgba8(0x12, 0x34, 0x56, 0x78);
        assert_eq!(c.to_rgba_u32(), 0x1234_5678);
        assert_eq!(Color::from_rgba_u32(0x1234_5678), c, "packing round trips");
    }
}
