// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Markup element tree and the element-to-node factory used by the read path.
//!
//! [`Element`] is always available. Converting it to and from text needs the `xml` feature,
//! which uses `quick-xml`.

use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::node::SceneNode;
use crate::services::IdAllocator;
use crate::types::{IdGroup, ObjectId};

/// One markup element: a name, ordered attributes, text, and child elements.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: SmallVec<[(String, String); 4]>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    /// Create an element with no attributes or children.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Element name (tag).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of attribute `key`.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Parse attribute `key` with [`FromStr`]. Missing or malformed values give `None`.
    #[must_use]
    pub fn parse_attribute<T: FromStr>(&self, key: &str) -> Option<T> {
        self.attribute(key)?.trim().parse().ok()
    }

    /// Set attribute `key`, replacing an existing value and otherwise appending.
    pub fn set_attribute(&mut self, key: &str, value: impl fmt::Display) {
        let value = value.to_string();
        if let Some((_, v)) = self.attributes.iter_mut().find(|(k, _)| k == key) {
            *v = value;
        } else {
            self.attributes.push((key.to_owned(), value));
        }
    }

    /// Builder form of [`Element::set_attribute`].
    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Attributes in document order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Text content directly inside this element.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the text content.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Direct child elements, in document order.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Append a child element.
    pub fn push_child(&mut self, child: Self) {
        self.children.push(child);
    }

    /// Append a child element and return it for further editing.
    pub fn add_child(&mut self, name: impl Into<String>) -> &mut Self {
        self.children.push(Self::new(name));
        let last = self.children.len() - 1;
        &mut self.children[last]
    }
}

/// Reader registered with a [`NodeFactory`] for one element name.
pub type ReadFn = fn(&Element, &mut ReadContext<'_>) -> Option<Box<dyn SceneNode>>;

/// Maps element names to node readers.
///
/// ```rust
/// use understory_scene::{Element, Group, IdRegistry, NodeFactory, ObjList, ReadContext};
///
/// let mut factory = NodeFactory::new();
/// factory.register("Group", ObjList::<Group>::read_from_xml);
///
/// let mut ids = IdRegistry::new();
/// let mut cx = ReadContext::new(&factory, &mut ids);
/// assert!(cx.read_element(&Element::new("Group")).is_some());
/// assert!(cx.read_element(&Element::new("Unknown")).is_none());
/// ```
#[derive(Clone, Default)]
pub struct NodeFactory {
    readers: HashMap<String, ReadFn>,
}

impl fmt::Debug for NodeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeFactory")
            .field("tags", &self.readers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl NodeFactory {
    /// Create an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `read` for elements named `tag`, replacing any previous reader.
    pub fn register(&mut self, tag: impl Into<String>, read: ReadFn) {
        self.readers.insert(tag.into(), read);
    }

    /// Reader for `tag`, if registered.
    #[must_use]
    pub fn reader(&self, tag: &str) -> Option<ReadFn> {
        self.readers.get(tag).copied()
    }

    /// Returns `true` if a reader is registered for `tag`.
    #[must_use]
    pub fn recognizes(&self, tag: &str) -> bool {
        self.readers.contains_key(tag)
    }
}

/// Everything the read path needs: the factory and the identifier allocator.
pub struct ReadContext<'a> {
    factory: &'a NodeFactory,
    /// Allocator used for restored and freshly assigned identifiers.
    pub ids: &'a mut dyn IdAllocator,
}

impl fmt::Debug for ReadContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadContext")
            .field("factory", &self.factory)
            .finish_non_exhaustive()
    }
}

impl<'a> ReadContext<'a> {
    /// Create a context.
    pub fn new(factory: &'a NodeFactory, ids: &'a mut dyn IdAllocator) -> Self {
        Self { factory, ids }
    }

    /// The factory in use.
    #[must_use]
    pub fn factory(&self) -> &'a NodeFactory {
        self.factory
    }

    /// Build a node from `element` using the reader registered for its name.
    ///
    /// Returns `None` for unrecognized names or when the reader declines the element.
    pub fn read_element(&mut self, element: &Element) -> Option<Box<dyn SceneNode>> {
        let read = self.factory.reader(element.name())?;
        read(element, self)
    }

    /// The identifier stored in the `id` attribute of `element`, qualified by `group`.
    ///
    /// Returns `None` when the attribute is missing or malformed. Nothing is claimed here;
    /// [`ObjList::add`](crate::ObjList::add) reserves the identifier when the node is linked, and
    /// assigns a fresh one if it is already taken.
    #[must_use]
    pub fn stored_id(&self, element: &Element, group: IdGroup) -> Option<ObjectId> {
        ObjectId::new(group, element.parse_attribute("id")?)
    }
}

#[cfg(feature = "xml")]
pub use text::XmlError;

#[cfg(feature = "xml")]
mod text {
    use alloc::string::String;
    use alloc::vec::Vec;
    use core::fmt;

    use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
    use quick_xml::{Reader, Writer};

    use super::Element;

    /// Errors converting markup text to and from [`Element`]s.
    #[derive(Debug)]
    pub enum XmlError {
        /// The tokenizer rejected the input.
        Xml(quick_xml::Error),
        /// Writing failed.
        Io(std::io::Error),
        /// A name, attribute, or text was not valid UTF-8.
        InvalidUtf8,
        /// An end tag had no matching start tag.
        UnbalancedEnd,
        /// Input ended inside an element.
        UnexpectedEof,
        /// Input contained no element.
        MissingRoot,
        /// Input contained more than one top-level element.
        MultipleRoots,
    }

    impl fmt::Display for XmlError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Xml(e) => write!(f, "malformed markup: {e}"),
                Self::Io(e) => write!(f, "failed to write markup: {e}"),
                Self::InvalidUtf8 => f.write_str("markup is not valid UTF-8"),
                Self::UnbalancedEnd => f.write_str("end tag without a matching start tag"),
                Self::UnexpectedEof => f.write_str("markup ended inside an element"),
                Self::MissingRoot => f.write_str("markup contains no element"),
                Self::MultipleRoots => f.write_str("markup contains more than one root element"),
            }
        }
    }

    impl core::error::Error for XmlError {
        fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
            match self {
                Self::Xml(e) => Some(e),
                Self::Io(e) => Some(e),
                _ => None,
            }
        }
    }

    impl From<quick_xml::Error> for XmlError {
        fn from(e: quick_xml::Error) -> Self {
            Self::Xml(e)
        }
    }

    impl From<quick_xml::events::attributes::AttrError> for XmlError {
        fn from(e: quick_xml::events::attributes::AttrError) -> Self {
            Self::Xml(e.into())
        }
    }

    impl From<std::io::Error> for XmlError {
        fn from(e: std::io::Error) -> Self {
            Self::Io(e)
        }
    }

    fn utf8(bytes: &[u8]) -> Result<&str, XmlError> {
        core::str::from_utf8(bytes).map_err(|_| XmlError::InvalidUtf8)
    }

    fn element_from_start(start: &BytesStart<'_>) -> Result<Element, XmlError> {
        let mut element = Element::new(utf8(start.name().as_ref())?);
        for attr in start.attributes() {
            let attr = attr?;
            let key = utf8(attr.key.as_ref())?;
            let value = attr.unescape_value()?;
            element.set_attribute(key, value);
        }
        Ok(element)
    }

    fn attach(
        stack: &mut [Element],
        root: &mut Option<Element>,
        element: Element,
    ) -> Result<(), XmlError> {
        if let Some(parent) = stack.last_mut() {
            parent.push_child(element);
            Ok(())
        } else if root.is_none() {
            *root = Some(element);
            Ok(())
        } else {
            Err(XmlError::MultipleRoots)
        }
    }

    impl Element {
        /// Parse markup text into its root element.
        ///
        /// Declarations, comments, and processing instructions are skipped. Text is trimmed.
        pub fn parse(input: &str) -> Result<Self, XmlError> {
            let mut reader = Reader::from_str(input);
            reader.config_mut().trim_text(true);

            let mut stack: Vec<Self> = Vec::new();
            let mut root: Option<Self> = None;
            loop {
                match reader.read_event()? {
                    Event::Start(start) => stack.push(element_from_start(&start)?),
                    Event::Empty(start) => {
                        let element = element_from_start(&start)?;
                        attach(&mut stack, &mut root, element)?;
                    }
                    Event::End(_) => {
                        let element = stack.pop().ok_or(XmlError::UnbalancedEnd)?;
                        attach(&mut stack, &mut root, element)?;
                    }
                    Event::Text(text) => {
                        if let Some(top) = stack.last_mut() {
                            top.text.push_str(&text.unescape()?);
                        }
                    }
                    Event::CData(data) => {
                        if let Some(top) = stack.last_mut() {
                            top.text.push_str(utf8(&data)?);
                        }
                    }
                    Event::Eof => break,
                    _ => {}
                }
            }
            if !stack.is_empty() {
                return Err(XmlError::UnexpectedEof);
            }
            root.ok_or(XmlError::MissingRoot)
        }

        /// Write this element and its subtree as indented markup text.
        pub fn to_xml_string(&self) -> Result<String, XmlError> {
            let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
            self.write_events(&mut writer)?;
            String::from_utf8(writer.into_inner()).map_err(|_| XmlError::InvalidUtf8)
        }

        fn write_events(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), XmlError> {
            let mut start = BytesStart::new(self.name.as_str());
            for (key, value) in &self.attributes {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            if self.children.is_empty() && self.text.is_empty() {
                writer.write_event(Event::Empty(start))?;
                return Ok(());
            }
            writer.write_event(Event::Start(start))?;
            if !self.text.is_empty() {
                writer.write_event(Event::Text(BytesText::new(&self.text)))?;
            }
            for child in &self.children {
                child.write_events(writer)?;
            }
            writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
            Ok(())
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_attribute_replaces_in_place() {
        let mut e = Element::new("Leaf")
            .with_attribute("a", 1)
            .with_attribute("b", 2);
        e.set_attribute("a", 3);
        let attrs: Vec<_> = e.attributes().collect();
        assert_eq!(attrs, [("a", "3"), ("b", "2")]);
        assert_eq!(e.parse_attribute::<i32>("a"), Some(3));
        assert_eq!(e.parse_attribute::<i32>("missing"), None);
    }
}
