// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Meshes living in scene lists: copying, rendering, and markup round trips.

use kurbo::{Affine, Point, Rect};
use understory_mesh::{Triangle, TriangleMesh};
use understory_scene::{
    BoundingBox, Color, DeleteLog, Element, Group, IdGroup, IdRegistry, MarkedList, NodeFactory,
    ObjList, ObjectId, ReadContext, Recorder, RenderCommand, RenderFlags, SceneNode, Solids,
};

fn mesh(title: &str, offset: f64) -> Box<dyn SceneNode> {
    let mut mesh = TriangleMesh::with_title(title);
    mesh.add_triangle(Triangle::new(
        Point::new(offset, 0.0),
        Point::new(offset + 1.0, 0.0),
        Point::new(offset, 1.0),
    ));
    Box::new(mesh)
}

fn factory() -> NodeFactory {
    let mut factory = NodeFactory::new();
    factory.register("Group", ObjList::<Group>::read_from_xml);
    factory.register("Solids", ObjList::<Solids>::read_from_xml);
    factory.register(TriangleMesh::TAG, TriangleMesh::read_from_xml);
    factory
}

fn meshes<'a>(nodes: impl Iterator<Item = &'a dyn SceneNode>) -> Vec<&'a TriangleMesh> {
    nodes
        .map(|n| n.downcast_ref::<TriangleMesh>().expect("child is a mesh"))
        .collect()
}

#[test]
fn solids_accept_meshes_and_reject_groups() {
    let mut ids = IdRegistry::new();
    let mut bodies = ObjList::<Solids>::new();
    bodies.add(mesh("a", 0.0), None, &mut ids).unwrap();

    let rejected = bodies
        .add(Box::new(ObjList::<Group>::new()), None, &mut ids)
        .unwrap_err();
    assert_eq!(rejected.node().type_name(), "Group");
    assert_eq!(bodies.len(), 1, "rejected node must not be linked");
}

#[test]
fn copy_from_preserves_content_and_order() {
    let mut ids = IdRegistry::new();
    let mut source = ObjList::<Solids>::new();
    let a = source.add(mesh("a", 0.0), None, &mut ids).unwrap();
    let c = source.add(mesh("c", 4.0), None, &mut ids).unwrap();
    source.add(mesh("b", 2.0), Some(c), &mut ids).unwrap();

    let copy = source.duplicate(&mut ids);
    assert_eq!(copy.len(), source.len());
    assert_eq!(meshes(copy.iter()), meshes(source.iter()));
    assert!(!copy.contains(a), "copies get fresh identifiers");

    let titles: Vec<_> = meshes(copy.iter()).into_iter().map(TriangleMesh::title).collect();
    assert_eq!(titles, ["a", "b", "c"], "anchored insert lands before c");
}

#[test]
fn bounds_cover_every_mesh() {
    let mut ids = IdRegistry::new();
    let mut root = ObjList::<Group>::new();
    let mut bodies = ObjList::<Solids>::new();
    bodies.add(mesh("far", 10.0), None, &mut ids).unwrap();
    root.add(mesh("near", 0.0), None, &mut ids).unwrap();
    root.add(Box::new(bodies), None, &mut ids).unwrap();

    let mut bounds = BoundingBox::new();
    root.bounds(&mut bounds);
    assert_eq!(
        bounds.rect(),
        Some(Rect::new(0.0, 0.0, 11.0, 1.0)),
        "nested meshes count toward the root"
    );

    root.transform(Affine::scale(2.0));
    let mut scaled = BoundingBox::new();
    root.bounds(&mut scaled);
    assert_eq!(
        scaled.rect(),
        Some(Rect::new(0.0, 0.0, 22.0, 2.0)),
        "transform reaches nested meshes"
    );
}

#[test]
fn render_highlights_marked_mesh_by_name() {
    let mut ids = IdRegistry::new();
    let mut bodies = ObjList::<Solids>::new();
    let a = bodies.add(mesh("a", 0.0), None, &mut ids).unwrap();
    let b = bodies.add(mesh("b", 2.0), None, &mut ids).unwrap();
    let mut marked = MarkedList::new();
    marked.insert(b);

    let mut recorder = Recorder::new();
    bodies.render(&mut recorder, RenderFlags::SELECT, &marked);
    let colors: Vec<_> = recorder
        .commands()
        .iter()
        .filter_map(|c| match c {
            RenderCommand::Color(color) => Some(*color),
            _ => None,
        })
        .collect();
    assert_eq!(colors, [Color::WHITE, Color::HIGHLIGHT], "only the marked mesh is highlighted");
    assert_eq!(recorder.commands().first(), Some(&RenderCommand::PushName(a)));
    assert_eq!(recorder.commands().last(), Some(&RenderCommand::PopName));
    assert_eq!(recorder.lists_compiled(), 2, "one list per mesh");
}

#[test]
fn undoable_clear_keeps_meshes_for_reversal() {
    let mut ids = IdRegistry::new();
    let mut bodies = ObjList::<Solids>::new();
    bodies.add(mesh("a", 0.0), None, &mut ids).unwrap();
    bodies.add(mesh("b", 2.0), None, &mut ids).unwrap();

    let mut log = DeleteLog::new();
    bodies.clear_undoably(&mut log);
    assert!(bodies.is_empty());
    assert_eq!(log.len(), 2);

    let restored = log.undo_last().expect("log holds the last deletion");
    bodies.add(restored.node, None, &mut ids).unwrap();
    assert_eq!(meshes(bodies.iter())[0].title(), "b", "last deletion comes back first");

    log.purge();
    assert!(log.is_empty());
}

#[test]
fn element_round_trip() {
    let mut ids = IdRegistry::new();
    let mut root = ObjList::<Group>::new();
    let mut bodies = ObjList::<Solids>::new();
    let a = bodies.add(mesh("a", 0.0), None, &mut ids).unwrap();
    bodies.add(mesh("b", 3.0), None, &mut ids).unwrap();
    let bodies_id = root.add(Box::new(bodies), None, &mut ids).unwrap();
    let loose = root.add(mesh("loose", -2.0), None, &mut ids).unwrap();
    assert_eq!(a.get(), bodies_id.get(), "first solid and first group share a raw id");
    assert_ne!(a, bodies_id);

    let mut doc = Element::new("Document");
    root.write_base_xml(&mut doc);

    let factory = factory();
    let mut fresh = IdRegistry::new();
    let mut cx = ReadContext::new(&factory, &mut fresh);
    let mut read = ObjList::<Group>::new();
    read.read_base_xml(&doc, &mut cx);

    assert_eq!(read.len(), 2);
    let bodies = read
        .get(bodies_id)
        .and_then(|n| n.downcast_ref::<ObjList<Solids>>())
        .expect("solids list keeps its identifier");
    assert!(bodies.contains(a));
    assert!(
        !bodies.contains(bodies_id),
        "the list's own id does not match a mesh with the same raw value"
    );
    assert!(
        read.get(loose).is_some_and(|n| n.is::<TriangleMesh>()),
        "loose mesh keeps its identifier"
    );
    assert!(read.get(a).is_none(), "nested meshes are not direct children");
    let original = root
        .get(bodies_id)
        .and_then(|n| n.downcast_ref::<ObjList<Solids>>())
        .unwrap();
    assert_eq!(meshes(bodies.iter()), meshes(original.iter()));
    assert_eq!(
        meshes(read.iter().skip(1)),
        meshes(root.iter().skip(1)),
        "loose mesh follows the list"
    );
}

#[cfg(feature = "xml")]
#[test]
fn text_round_trip() {
    let mut ids = IdRegistry::new();
    let mut bodies = ObjList::<Solids>::new();
    let mut colored = TriangleMesh::with_title("tinted <part>");
    colored.set_color(Color::from_rgba8(200, 100, 50, 255));
    colored.add_triangle(Triangle::new(
        Point::new(0.25, -1.5),
        Point::new(3.0, 0.0),
        Point::new(1.0, 2.75),
    ));
    bodies.add(Box::new(colored), None, &mut ids).unwrap();
    bodies.add(mesh("plain", 1.0), None, &mut ids).unwrap();

    let mut doc = Element::new("Document");
    bodies.write_base_xml(&mut doc);
    let text = doc.to_xml_string().expect("element tree serializes");
    let parsed = Element::parse(&text).expect("written text parses");
    assert_eq!(parsed, doc, "text form is lossless");

    let factory = factory();
    let mut fresh = IdRegistry::new();
    let mut cx = ReadContext::new(&factory, &mut fresh);
    let mut read = ObjList::<Solids>::new();
    read.read_base_xml(&parsed, &mut cx);
    assert_eq!(meshes(read.iter()), meshes(bodies.iter()));
    assert_eq!(
        read.at_index(0).and_then(|n| n.id()),
        ObjectId::new(IdGroup::SOLID, 1),
        "stored identifier is restored"
    );
}
