// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounding-box accumulator passed through [`SceneNode::bounds`](crate::SceneNode::bounds).

use kurbo::{Affine, Point, Rect};

/// An axis-aligned box that starts out empty and grows by union.
///
/// Nodes contribute to a caller-supplied `BoundingBox`; the result does not depend on the order
/// in which contributions arrive.
///
/// ```rust
/// use kurbo::{Point, Rect};
/// use understory_scene::BoundingBox;
///
/// let mut bounds = BoundingBox::new();
/// assert!(bounds.is_empty());
///
/// bounds.insert_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
/// bounds.insert_point(Point::new(20.0, -5.0));
/// assert_eq!(bounds.rect(), Some(Rect::new(0.0, -5.0, 20.0, 10.0)));
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BoundingBox {
    rect: Option<Rect>,
}

impl BoundingBox {
    /// A box that contains nothing.
    pub const EMPTY: Self = Self { rect: None };

    /// Create an empty box.
    #[must_use]
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Create a box covering `rect`.
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            rect: Some(rect.abs()),
        }
    }

    /// Returns `true` if nothing has been inserted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rect.is_none()
    }

    /// The accumulated rectangle, or `None` when empty.
    #[must_use]
    pub const fn rect(&self) -> Option<Rect> {
        self.rect
    }

    /// Grow to contain `point`.
    pub fn insert_point(&mut self, point: Point) {
        self.rect = Some(match self.rect {
            Some(r) => r.union_pt(point),
            None => Rect::from_points(point, point),
        });
    }

    /// Grow to contain `rect`.
    pub fn insert_rect(&mut self, rect: Rect) {
        let rect = rect.abs();
        self.rect = Some(match self.rect {
            Some(r) => r.union(rect),
            None => rect,
        });
    }

    /// Grow to contain everything in `other`.
    pub fn insert(&mut self, other: &Self) {
        if let Some(r) = other.rect {
            self.insert_rect(r);
        }
    }

    /// Returns a conservative box around this one after applying `affine`.
    #[must_use]
    pub fn transformed(&self, affine: Affine) -> Self {
        Self {
            rect: self.rect.map(|r| affine.transform_rect_bbox(r)),
        }
    }
}
