// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_mesh --heading-base-level=0

//! Understory Mesh: a planar triangle-mesh leaf for Understory Scene.
//!
//! [`TriangleMesh`] is a solid body made of filled triangles, the kind of node an STL import
//! produces. It implements [`SceneNode`](understory_scene::SceneNode), so it can live in any
//! [`ObjList`](understory_scene::ObjList), including the solids-only
//! [`Solids`](understory_scene::Solids) policy.
//!
//! Geometry is two-dimensional. A mesh is the projection of a 3D STL solid onto the scene
//! plane: each [`Triangle`] keeps the `x` and `y` of its vertices as [`kurbo::Point`]s, the
//! `z` coordinate is dropped, and transforms are 2D [`kurbo::Affine`] maps.
//!
//! - Keeps its bounding box current on every geometry change.
//! - Compiles its triangles into a render list once and replays it until invalidated.
//! - Writes `<TriangleMesh id title col>` with one `<Tri x0 y0 x1 y1 x2 y2/>` per triangle,
//!   and reads the same back with [`TriangleMesh::read_from_xml`].
//!
//! ## Example
//!
//! ```rust
//! use kurbo::Point;
//! use understory_mesh::{Triangle, TriangleMesh};
//! use understory_scene::{IdRegistry, ObjList, SceneNode, Solids};
//!
//! let mut mesh = TriangleMesh::with_title("wedge");
//! mesh.add_triangle(Triangle::new(
//!     Point::new(0.0, 0.0),
//!     Point::new(4.0, 0.0),
//!     Point::new(0.0, 3.0),
//! ));
//!
//! let mut ids = IdRegistry::new();
//! let mut bodies = ObjList::<Solids>::new();
//! let id = bodies.add(Box::new(mesh), None, &mut ids).unwrap();
//!
//! let mesh = bodies.get(id).and_then(|n| n.downcast_ref::<TriangleMesh>()).unwrap();
//! assert_eq!(mesh.title(), "wedge");
//! assert_eq!(mesh.triangles().len(), 1);
//! ```
//!
//! ## Features
//!
//! - `std` (default): enable `std` in dependencies.
//! - `libm`: `no_std` float support for `kurbo`.
//! - `xml` (default): markup text support in `understory_scene`.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod mesh;

pub use mesh::{Triangle, TriangleMesh};
