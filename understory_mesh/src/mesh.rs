// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The triangle mesh leaf.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use kurbo::{Affine, Point};
use understory_scene::{
    BoundingBox, Color, Element, IdAllocator, IdGroup, MarkedSet, NodeBase, NodeKinds,
    ReadContext, RenderFlags, RenderList, Renderer, SceneNode,
};

/// One filled triangle, projected onto the scene plane.
///
/// STL facets are 3D; a mesh keeps only their `x` and `y` coordinates, so the `z`
/// coordinate of each vertex is dropped on import and transforms are 2D affine maps.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle {
    /// Vertices in winding order.
    pub points: [Point; 3],
}

impl Triangle {
    /// Element name of a written triangle.
    pub const TAG: &'static str = "Tri";

    const COORDS: [(&'static str, &'static str); 3] = [("x0", "y0"), ("x1", "y1"), ("x2", "y2")];

    /// Create a triangle from its three vertices.
    #[must_use]
    pub const fn new(a: Point, b: Point, c: Point) -> Self {
        Self { points: [a, b, c] }
    }

    fn transformed(self, affine: Affine) -> Self {
        Self {
            points: self.points.map(|p| affine * p),
        }
    }

    fn to_element(self) -> Element {
        let mut element = Element::new(Self::TAG);
        for (p, (x, y)) in self.points.iter().zip(Self::COORDS) {
            element.set_attribute(x, p.x);
            element.set_attribute(y, p.y);
        }
        element
    }

    /// `None` if any coordinate is missing or not a number.
    fn from_element(element: &Element) -> Option<Self> {
        let mut points = [Point::ZERO; 3];
        for (p, (x, y)) in points.iter_mut().zip(Self::COORDS) {
            *p = Point::new(element.parse_attribute(x)?, element.parse_attribute(y)?);
        }
        Some(Self { points })
    }
}

/// A solid body made of planar triangles.
///
/// This is the 2D projection of an STL solid: see [`Triangle`].
///
/// The bounding box is kept up to date as triangles are added or transformed. The compiled
/// render list is created on the first [`SceneNode::render`] and dropped whenever the geometry
/// or color changes, or when the mesh is detached from its list.
///
/// Equality compares title, color, and triangles only; identifier, owner, and caches are
/// ignored.
#[derive(Clone, Debug, Default)]
pub struct TriangleMesh {
    base: NodeBase,
    title: String,
    color: Color,
    triangles: Vec<Triangle>,
    extent: BoundingBox,
    list: Option<RenderList>,
}

impl PartialEq for TriangleMesh {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title && self.color == other.color && self.triangles == other.triangles
    }
}

impl TriangleMesh {
    /// Element name of a written mesh.
    pub const TAG: &'static str = "TriangleMesh";

    /// An empty, untitled, white mesh.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty white mesh with a title.
    #[must_use]
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Display title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Replace the display title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Fill color.
    #[must_use]
    pub fn color(&self) -> Color {
        self.color
    }

    /// Replace the fill color.
    pub fn set_color(&mut self, color: Color) {
        if self.color != color {
            self.color = color;
            self.list = None;
        }
    }

    /// The triangles, in insertion order.
    #[must_use]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// The cached bounding box of every vertex.
    #[must_use]
    pub fn extent(&self) -> BoundingBox {
        self.extent
    }

    /// Returns `true` while a compiled render list is cached.
    #[must_use]
    pub fn has_render_list(&self) -> bool {
        self.list.is_some()
    }

    /// Append a triangle.
    pub fn add_triangle(&mut self, triangle: Triangle) {
        for p in triangle.points {
            self.extent.insert_point(p);
        }
        self.triangles.push(triangle);
        self.list = None;
    }

    /// Reader for `<TriangleMesh>` elements, for registration with a
    /// [`NodeFactory`](understory_scene::NodeFactory).
    ///
    /// Reading is best-effort: a missing title or color keeps the default, and triangles with
    /// missing or malformed coordinates are skipped.
    pub fn read_from_xml(element: &Element, cx: &mut ReadContext<'_>) -> Option<Box<dyn SceneNode>> {
        let mut mesh = Self::new();
        if let Some(title) = element.attribute("title") {
            mesh.title = title.into();
        }
        if let Some(packed) = element.parse_attribute::<u32>("col") {
            mesh.color = Color::from_rgba_u32(packed);
        }
        for child in element.children() {
            let triangle = (child.name() == Triangle::TAG)
                .then(|| Triangle::from_element(child))
                .flatten();
            match triangle {
                Some(triangle) => mesh.add_triangle(triangle),
                None => tracing::debug!(tag = child.name(), "skipping malformed triangle"),
            }
        }
        if let Some(id) = cx.stored_id(element, IdGroup::SOLID) {
            mesh.base = NodeBase::with_id(id);
        }
        tracing::trace!(title = %mesh.title, triangles = mesh.triangles.len(), "mesh read");
        Some(Box::new(mesh))
    }

    fn recompute_extent(&mut self) {
        let mut extent = BoundingBox::new();
        for p in self.triangles.iter().flat_map(|t| t.points) {
            extent.insert_point(p);
        }
        self.extent = extent;
    }
}

impl Extend<Triangle> for TriangleMesh {
    fn extend<I: IntoIterator<Item = Triangle>>(&mut self, iter: I) {
        for triangle in iter {
            self.add_triangle(triangle);
        }
    }
}

impl SceneNode for TriangleMesh {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn kind(&self) -> NodeKinds {
        NodeKinds::SOLID
    }

    fn type_name(&self) -> &'static str {
        "Triangle Mesh"
    }

    fn id_group(&self) -> IdGroup {
        IdGroup::SOLID
    }

    fn bounds(&self, bounds: &mut BoundingBox) {
        bounds.insert(&self.extent);
    }

    fn transform(&mut self, transform: Affine) {
        for triangle in &mut self.triangles {
            *triangle = triangle.transformed(transform);
        }
        self.recompute_extent();
        self.list = None;
    }

    fn invalidate_render(&mut self) {
        self.list = None;
    }

    fn render(&mut self, renderer: &mut dyn Renderer, flags: RenderFlags, _marked: &dyn MarkedSet) {
        if !flags.contains(RenderFlags::NO_COLOR) {
            let color = if flags.contains(RenderFlags::MARKED) {
                Color::HIGHLIGHT
            } else {
                self.color
            };
            renderer.set_color(color);
        }

        let list = match self.list {
            Some(list) => list,
            None => {
                let list = renderer.begin_list();
                for triangle in &self.triangles {
                    renderer.triangle(triangle.points);
                }
                renderer.end_list();
                self.list = Some(list);
                list
            }
        };
        renderer.call_list(list);
    }

    fn make_copy(&self, _ids: &mut dyn IdAllocator) -> Option<Box<dyn SceneNode>> {
        Some(Box::new(Self {
            base: NodeBase::new(),
            list: None,
            ..self.clone()
        }))
    }

    fn write_xml(&self, parent: &mut Element) {
        let element = parent.add_child(Self::TAG);
        if let Some(id) = self.id() {
            element.set_attribute("id", id.get());
        }
        element.set_attribute("title", &self.title);
        element.set_attribute("col", self.color.to_rgba_u32());
        for triangle in &self.triangles {
            element.push_child(triangle.to_element());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Rect, Vec2};
    use understory_scene::{
        IdRegistry, MarkedList, NodeFactory, ObjList, ObjectId, Recorder, RenderCommand, Solids,
        Unmarked,
    };

    fn wedge() -> TriangleMesh {
        let mut mesh = TriangleMesh::with_title("wedge");
        mesh.add_triangle(Triangle::new(
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(0.0, 3.0),
        ));
        mesh.add_triangle(Triangle::new(
            Point::new(4.0, 0.0),
            Point::new(4.0, 3.0),
            Point::new(0.0, 3.0),
        ));
        mesh
    }

    #[test]
    fn extent_follows_triangles() {
        let mut mesh = TriangleMesh::new();
        assert!(mesh.extent().is_empty(), "no triangles, no extent");
        mesh.add_triangle(Triangle::new(
            Point::new(1.0, 1.0),
            Point::new(2.0, -1.0),
            Point::new(0.5, 0.0),
        ));
        assert_eq!(mesh.extent().rect(), Some(Rect::new(0.5, -1.0, 2.0, 1.0)));

        let mut bounds = BoundingBox::from_rect(Rect::new(10.0, 10.0, 11.0, 11.0));
        mesh.bounds(&mut bounds);
        assert_eq!(
            bounds.rect(),
            Some(Rect::new(0.5, -1.0, 11.0, 11.0)),
            "bounds grows the caller's box"
        );
    }

    #[test]
    fn transform_moves_vertices_and_drops_list() {
        let mut mesh = wedge();
        let mut recorder = Recorder::new();
        mesh.render(&mut recorder, RenderFlags::empty(), &Unmarked);
        assert!(mesh.has_render_list(), "first render compiles a list");

        mesh.transform(Affine::translate(Vec2::new(1.0, 2.0)));
        assert!(!mesh.has_render_list(), "moving the geometry drops the list");
        assert_eq!(mesh.triangles()[0].points[1], Point::new(5.0, 2.0));
        assert_eq!(mesh.extent().rect(), Some(Rect::new(1.0, 2.0, 5.0, 5.0)));
    }

    #[test]
    fn render_compiles_once() {
        let mut mesh = wedge();
        let mut recorder = Recorder::new();
        mesh.render(&mut recorder, RenderFlags::empty(), &Unmarked);
        let list = RenderList(1);
        assert_eq!(recorder.commands().len(), 6, "color, begin, two triangles, end, call");
        assert_eq!(recorder.commands()[0], RenderCommand::Color(Color::WHITE));
        assert_eq!(recorder.commands()[1], RenderCommand::BeginList(list));
        assert_eq!(recorder.commands()[5], RenderCommand::CallList(list));

        recorder.clear();
        mesh.render(&mut recorder, RenderFlags::empty(), &Unmarked);
        assert_eq!(
            recorder.commands(),
            [
                RenderCommand::Color(Color::WHITE),
                RenderCommand::CallList(list)
            ]
        );
        assert_eq!(recorder.lists_compiled(), 1, "second render replays the list");

        mesh.invalidate_render();
        mesh.render(&mut recorder, RenderFlags::empty(), &Unmarked);
        assert_eq!(recorder.lists_compiled(), 2, "invalidation forces a recompile");
    }

    #[test]
    fn render_flags_pick_color() {
        let mut mesh = wedge();
        mesh.set_color(Color::from_rgba8(10, 20, 30, 255));
        let mut recorder = Recorder::new();

        mesh.render(&mut recorder, RenderFlags::MARKED, &MarkedList::new());
        assert_eq!(
            recorder.commands()[0],
            RenderCommand::Color(Color::HIGHLIGHT),
            "marked overrides the mesh color"
        );

        recorder.clear();
        mesh.render(&mut recorder, RenderFlags::NO_COLOR | RenderFlags::MARKED, &Unmarked);
        assert_eq!(
            recorder.commands(),
            [RenderCommand::CallList(RenderList(1))],
            "no-color suppresses every color change"
        );
    }

    #[test]
    fn set_color_drops_list_only_on_change() {
        let mut mesh = wedge();
        let mut recorder = Recorder::new();
        mesh.render(&mut recorder, RenderFlags::empty(), &Unmarked);
        mesh.set_color(Color::WHITE);
        assert!(mesh.has_render_list(), "same color keeps the list");
        mesh.set_color(Color::HIGHLIGHT);
        assert!(!mesh.has_render_list(), "new color drops the list");
    }

    #[test]
    fn copy_is_content_equal_without_identity() {
        let mut ids = IdRegistry::new();
        let mut mesh = wedge();
        mesh.set_id(ObjectId::new(IdGroup::SOLID, 3).unwrap());
        let copy = mesh.make_copy(&mut ids).unwrap();
        assert_eq!(copy.id(), None, "copies carry no identifier");
        let copy = copy.downcast_ref::<TriangleMesh>().unwrap();
        assert_eq!(copy, &mesh, "equality ignores identity");
        assert!(!copy.has_render_list(), "caches are not copied");

        let mut other = wedge();
        other.set_title("other");
        assert_ne!(other, mesh, "title takes part in equality");
    }

    #[test]
    fn write_xml_layout() {
        let mut mesh = wedge();
        mesh.set_id(ObjectId::new(IdGroup::SOLID, 12).unwrap());
        let mut doc = Element::new("Solids");
        mesh.write_xml(&mut doc);

        let element = &doc.children()[0];
        assert_eq!(element.name(), "TriangleMesh");
        assert_eq!(element.attribute("id"), Some("12"), "only the raw value is written");
        assert_eq!(element.attribute("title"), Some("wedge"));
        assert_eq!(element.parse_attribute::<u32>("col"), Some(0xFFFF_FFFF));
        assert_eq!(element.children().len(), 2, "one element per triangle");
        let tri = &element.children()[0];
        assert_eq!(tri.name(), "Tri");
        assert_eq!(tri.parse_attribute::<f64>("x1"), Some(4.0));
        assert_eq!(tri.parse_attribute::<f64>("y2"), Some(3.0));
    }

    #[test]
    fn read_skips_malformed_triangles() {
        let mut element = Element::new("TriangleMesh");
        element.set_attribute("id", 8);
        element.set_attribute("title", "partial");
        element.set_attribute("col", 0x0000_FFFF_u32);
        element.push_child(
            Triangle::new(Point::ZERO, Point::new(1.0, 0.0), Point::new(0.0, 1.0)).to_element(),
        );
        element
            .add_child("Tri")
            .set_attribute("x0", "not a number");
        element.add_child("Quad");

        let mut factory = NodeFactory::new();
        factory.register(TriangleMesh::TAG, TriangleMesh::read_from_xml);
        let mut ids = IdRegistry::new();
        let mut cx = ReadContext::new(&factory, &mut ids);
        let node = cx.read_element(&element).unwrap();

        let stored = ObjectId::new(IdGroup::SOLID, 8).unwrap();
        assert_eq!(node.id(), Some(stored), "stored id is read in the solid group");
        assert!(!ids.is_used(stored), "reading alone claims nothing");
        let mesh = node.downcast_ref::<TriangleMesh>().unwrap();
        assert_eq!(mesh.title(), "partial");
        assert_eq!(mesh.color(), Color::from_rgba8(0, 0, 255, 255));
        assert_eq!(mesh.triangles().len(), 1, "malformed and foreign children skipped");

        let mut bodies = ObjList::<Solids>::new();
        assert_eq!(bodies.add(node, None, &mut ids).ok(), Some(stored));
        assert!(ids.is_used(stored), "adding claims the stored id");
    }

    #[test]
    fn extend_adds_in_order() {
        let mut mesh = TriangleMesh::new();
        let a = Triangle::new(Point::ZERO, Point::new(1.0, 0.0), Point::new(0.0, 1.0));
        let b = Triangle::new(Point::ZERO, Point::new(-1.0, 0.0), Point::new(0.0, -1.0));
        mesh.extend([a, b]);
        assert_eq!(mesh.triangles(), [a, b], "triangles keep insertion order");
        assert_eq!(mesh.extent().rect(), Some(Rect::new(-1.0, -1.0, 1.0, 1.0)));
    }
}
