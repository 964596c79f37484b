//! Arena-based document tree.
//!
//! All nodes of a [`Document`] live in a single `indextree` arena owned by the
//! document. Parent, child and sibling links are arena indices, so the tree
//! has no reference cycles and dropping the document frees everything at once.
//!
//! Callers never touch the arena directly: they navigate with the borrowed
//! views [`ElementRef`] and [`NodeRef`], which pair a `&Document` with a
//! [`NodeId`].

use compact_str::CompactString;
use indexmap::IndexMap;
use indextree::{Arena, NodeId};
use std::fmt;
use std::ptr;
use std::str::FromStr;

use crate::debug;
use crate::error::{Location, Result};
use crate::options::ParseOptions;

/// Element attributes, in source order. Keys are unique.
pub type Attributes = IndexMap<String, String>;

/// A parsed XML document.
///
/// The document *is* its root element: element accessors such as
/// [`name`](Document::name) or [`children`](Document::children) answer for the
/// root. On top of that it carries the doctype and the options it was parsed
/// with.
#[derive(Debug, Clone)]
pub struct Document {
    /// THE tree - all nodes live here
    pub(crate) arena: Arena<NodeData>,

    /// Root element, `None` once the document has been destroyed
    pub(crate) root: Option<NodeId>,

    /// Every doctype fragment seen, concatenated
    pub(crate) doctype: String,

    pub(crate) options: ParseOptions,
}

/// What goes in each arena slot
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
}

/// Node types
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Element with name, attributes and source position
    Element(ElementData),
    /// Character data, entities already resolved
    Text(CompactString),
    /// Content of a `<![CDATA[ ... ]]>` section
    CData(CompactString),
    /// Content of a `<!-- ... -->` comment
    Comment(CompactString),
}

impl NodeKind {
    pub fn is_element(&self) -> bool {
        matches!(self, NodeKind::Element(_))
    }
}

/// Element payload.
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Qualified name as written in the source (`ns:tag` stays `ns:tag`)
    pub name: CompactString,

    /// IndexMap preserves insertion order for serialization
    pub attrs: Attributes,

    /// Text and CDATA of the direct children, concatenated in document order
    pub value: String,

    /// Position just after the opening tag's `>`
    pub location: Location,

    /// Byte offset just past the opening tag's `<`
    pub start_tag_offset: usize,
}

impl Document {
    /// Parse `raw` with default options (strict, whitespace preserved).
    pub fn parse(raw: &str) -> Result<Self> {
        crate::parser::parse(raw, ParseOptions::default())
    }

    /// Parse `raw` with the given options.
    pub fn parse_with_options(raw: &str, options: ParseOptions) -> Result<Self> {
        crate::parser::parse(raw, options)
    }

    pub(crate) fn from_parts(
        arena: Arena<NodeData>,
        root: NodeId,
        doctype: String,
        options: ParseOptions,
    ) -> Self {
        Document {
            arena,
            root: Some(root),
            doctype,
            options,
        }
    }

    /// The root element, or `None` after [`destroy`](Document::destroy).
    pub fn root(&self) -> Option<ElementRef<'_>> {
        self.root.and_then(|id| NodeRef::new(self, id).as_element())
    }

    /// Look up a node by id. Ids from a destroyed document resolve to `None`.
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.root?;
        self.arena.get(id).map(|_| NodeRef::new(self, id))
    }

    /// Doctype declaration text (everything between `<!DOCTYPE` and `>`),
    /// `""` if the source had none.
    pub fn doctype(&self) -> &str {
        &self.doctype
    }

    /// Options this document was parsed with.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Root element name, `""` after destroy.
    pub fn name(&self) -> &str {
        self.root().map_or("", |root| root.name())
    }

    /// Root element attributes, `None` after destroy.
    pub fn attributes(&self) -> Option<&Attributes> {
        self.root().map(|root| root.attributes())
    }

    /// Value of one root attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.root().and_then(|root| root.attribute(name))
    }

    /// Concatenated direct text and CDATA of the root element.
    pub fn value(&self) -> &str {
        self.root().map_or("", |root| root.value())
    }

    /// Children of the root element, in document order.
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'_>> + '_ {
        self.root().into_iter().flat_map(|root| root.children())
    }

    /// Element children of the root element, in document order.
    pub fn child_elements(&self) -> impl Iterator<Item = ElementRef<'_>> + '_ {
        self.root().into_iter().flat_map(|root| root.child_elements())
    }

    pub fn first_child(&self) -> Option<NodeRef<'_>> {
        self.root().and_then(|root| root.first_child())
    }

    pub fn last_child(&self) -> Option<NodeRef<'_>> {
        self.root().and_then(|root| root.last_child())
    }

    /// Always `None`: the root has no parent.
    pub fn parent(&self) -> Option<ElementRef<'_>> {
        self.root().and_then(|root| root.parent())
    }

    /// Source position of the root element.
    pub fn location(&self) -> Option<Location> {
        self.root().map(|root| root.location())
    }

    /// Number of nodes (elements, text, CDATA, comments) in the tree.
    pub fn node_count(&self) -> usize {
        if self.root.is_some() {
            self.arena.count()
        } else {
            0
        }
    }

    /// Tear the whole tree down.
    ///
    /// Afterwards the document has no root, no children, no attributes and an
    /// empty name and value. Calling this again is a no-op. Dropping the
    /// document releases the same memory, so this only exists for callers
    /// that want to free a large tree early while keeping the value around.
    pub fn destroy(&mut self) {
        if self.root.take().is_some() {
            debug!("destroying document with {} nodes", self.arena.count());
            self.arena = Arena::new();
            self.doctype.clear();
        }
    }

    /// Whether [`destroy`](Document::destroy) has been called.
    pub fn is_destroyed(&self) -> bool {
        self.root.is_none()
    }
}

impl FromStr for Document {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Document::parse(s)
    }
}

/// Borrowed view of any node in a [`Document`].
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub(crate) fn new(doc: &'a Document, id: NodeId) -> Self {
        NodeRef { doc, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn kind(&self) -> &'a NodeKind {
        &self.doc.arena[self.id].get().kind
    }

    /// View this node as an element, if it is one.
    pub fn as_element(&self) -> Option<ElementRef<'a>> {
        match self.kind() {
            NodeKind::Element(data) => Some(ElementRef {
                doc: self.doc,
                id: self.id,
                data,
            }),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        self.kind().is_element()
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind(), NodeKind::Text(_))
    }

    pub fn is_cdata(&self) -> bool {
        matches!(self.kind(), NodeKind::CData(_))
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind(), NodeKind::Comment(_))
    }

    /// Content of a text, CDATA or comment node. `None` for elements.
    pub fn content(&self) -> Option<&'a str> {
        match self.kind() {
            NodeKind::Element(_) => None,
            NodeKind::Text(s) | NodeKind::CData(s) | NodeKind::Comment(s) => Some(s.as_str()),
        }
    }

    pub fn parent(&self) -> Option<ElementRef<'a>> {
        let parent = self.doc.arena[self.id].parent()?;
        NodeRef::new(self.doc, parent).as_element()
    }

    pub fn next_sibling(&self) -> Option<NodeRef<'a>> {
        let id = self.doc.arena[self.id].next_sibling()?;
        Some(NodeRef::new(self.doc, id))
    }

    pub fn previous_sibling(&self) -> Option<NodeRef<'a>> {
        let id = self.doc.arena[self.id].previous_sibling()?;
        Some(NodeRef::new(self.doc, id))
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            NodeKind::Element(data) => f
                .debug_struct("Element")
                .field("id", &self.id)
                .field("name", &data.name)
                .finish(),
            NodeKind::Text(s) => f.debug_tuple("Text").field(s).finish(),
            NodeKind::CData(s) => f.debug_tuple("CData").field(s).finish(),
            NodeKind::Comment(s) => f.debug_tuple("Comment").field(s).finish(),
        }
    }
}

/// Borrowed view of an element in a [`Document`].
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    id: NodeId,
    data: &'a ElementData,
}

impl<'a> ElementRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn data(&self) -> &'a ElementData {
        self.data
    }

    pub fn as_node(&self) -> NodeRef<'a> {
        NodeRef::new(self.doc, self.id)
    }

    pub fn name(&self) -> &'a str {
        &self.data.name
    }

    pub fn attributes(&self) -> &'a Attributes {
        &self.data.attrs
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.data.attrs.get(name).map(String::as_str)
    }

    /// Text and CDATA of the direct children, concatenated. Comments and
    /// grandchildren do not contribute.
    pub fn value(&self) -> &'a str {
        &self.data.value
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let doc = self.doc;
        self.id
            .children(&doc.arena)
            .map(move |id| NodeRef::new(doc, id))
    }

    pub fn child_elements(&self) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.children().filter_map(|child| child.as_element())
    }

    pub fn first_child(&self) -> Option<NodeRef<'a>> {
        let id = self.doc.arena[self.id].first_child()?;
        Some(NodeRef::new(self.doc, id))
    }

    pub fn last_child(&self) -> Option<NodeRef<'a>> {
        let id = self.doc.arena[self.id].last_child()?;
        Some(NodeRef::new(self.doc, id))
    }

    pub fn has_children(&self) -> bool {
        self.doc.arena[self.id].first_child().is_some()
    }

    pub fn parent(&self) -> Option<ElementRef<'a>> {
        self.as_node().parent()
    }

    /// Walk parent links up to the root element.
    pub fn root_element(&self) -> ElementRef<'a> {
        let mut node = *self;
        while let Some(parent) = node.parent() {
            node = parent;
        }
        node
    }

    pub fn location(&self) -> Location {
        self.data.location
    }

    /// 0-based line of the end of the opening tag.
    pub fn line(&self) -> usize {
        self.data.location.line
    }

    /// 0-based column of the end of the opening tag.
    pub fn column(&self) -> usize {
        self.data.location.column
    }

    /// Byte offset just after the opening tag.
    pub fn byte_offset(&self) -> usize {
        self.data.location.byte_offset
    }

    /// Byte offset just past the opening tag's `<`.
    pub fn start_tag_offset(&self) -> usize {
        self.data.start_tag_offset
    }
}

impl PartialEq for ElementRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_node() == other.as_node()
    }
}

impl Eq for ElementRef<'_> {}

impl fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRef")
            .field("id", &self.id)
            .field("name", &self.data.name)
            .field("attrs", &self.data.attrs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_xml() {
        let doc = Document::parse("<hello>world</hello>").unwrap();
        assert_eq!(doc.name(), "hello");
        assert_eq!(doc.value(), "world");

        let text = doc.first_child().expect("root should have text");
        assert!(text.is_text());
        assert_eq!(text.content(), Some("world"));
        assert_eq!(text.parent(), doc.root());
    }

    #[test]
    fn test_first_last_child_track_children() {
        let doc = Document::parse("<list><a/>text<b/><!--c--></list>").unwrap();
        let children: Vec<_> = doc.children().collect();
        assert_eq!(children.len(), 4);
        assert_eq!(doc.first_child(), children.first().copied());
        assert_eq!(doc.last_child(), children.last().copied());
        assert!(doc.last_child().is_some_and(|c| c.is_comment()));

        let a = children[0].as_element().unwrap();
        assert!(!a.has_children());
        assert_eq!(a.first_child(), None);
        assert_eq!(a.last_child(), None);
    }

    #[test]
    fn test_siblings() {
        let doc = Document::parse("<r><a/><b/><c/></r>").unwrap();
        let b = doc.child_elements().nth(1).unwrap().as_node();
        assert_eq!(
            b.previous_sibling().and_then(|n| n.as_element()).map(|e| e.name()),
            Some("a")
        );
        assert_eq!(
            b.next_sibling().and_then(|n| n.as_element()).map(|e| e.name()),
            Some("c")
        );
    }

    #[test]
    fn test_root_element_from_deep_node() {
        let doc =
            Document::parse(r#"<books><book title="Twilight"/><book><name></name></book></books>"#)
                .unwrap();
        let root = doc.root().unwrap();
        let first = doc.child_elements().next().unwrap();
        let name = doc
            .child_elements()
            .nth(1)
            .and_then(|b| b.child_elements().next())
            .unwrap();

        assert_eq!(first.root_element(), root);
        assert_eq!(name.root_element(), root);
        assert_eq!(root.root_element(), root);
        assert_eq!(doc.parent(), None);
    }

    #[test]
    fn test_node_lookup_by_id() {
        let doc = Document::parse("<a><b/></a>").unwrap();
        let b = doc.child_elements().next().unwrap();
        let found = doc.node(b.id()).and_then(|n| n.as_element());
        assert_eq!(found, Some(b));
        assert_eq!(doc.node_count(), 2);
    }

    #[test]
    fn test_destroy_is_repeatable() {
        let mut doc = Document::parse(r#"<books><book title="Twilight"/></books>"#).unwrap();
        let book_id = doc.child_elements().next().unwrap().id();

        doc.destroy();
        assert!(doc.is_destroyed());
        assert_eq!(doc.children().count(), 0);
        assert_eq!(doc.parent(), None);
        assert_eq!(doc.first_child(), None);
        assert_eq!(doc.last_child(), None);
        assert!(doc.attributes().is_none());
        assert_eq!(doc.name(), "");
        assert_eq!(doc.value(), "");
        assert!(doc.node(book_id).is_none());
        assert_eq!(doc.node_count(), 0);

        doc.destroy();
        assert!(doc.is_destroyed());
    }

    #[test]
    fn test_document_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Document>();
    }

    #[test]
    fn test_from_str() {
        let doc: Document = "<a x=\"1\"/>".parse().unwrap();
        assert_eq!(doc.attribute("x"), Some("1"));
        assert!(" \n ".parse::<Document>().is_err());
    }
}
