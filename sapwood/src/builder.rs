//! Event-driven tree construction.
//!
//! [`TreeSink`] is the seam between a streaming parser and whatever consumes
//! its events. [`TreeBuilder`] is the sink that builds a [`Document`]: it keeps
//! a stack of the elements that are currently open and attaches every new node
//! to the element on top of it.

use compact_str::CompactString;
use indextree::{Arena, NodeId};
use smallvec::SmallVec;

use crate::arena_dom::{Attributes, Document, ElementData, NodeData, NodeKind};
use crate::error::{Error, Location, Result};
use crate::options::ParseOptions;
use crate::{debug, trace};

/// An opening tag as reported by the parser.
#[derive(Debug, Clone)]
pub struct OpenTag {
    pub name: CompactString,
    pub attributes: Attributes,
    /// Position just after the tag's `>`
    pub location: Location,
    /// Byte offset just past the tag's `<`
    pub start_tag_offset: usize,
}

/// Receives parser events in document order.
///
/// Each callback may fail; the driver stops at the first error and hands it
/// back to the caller.
pub trait TreeSink {
    type Output;

    fn open_tag(&mut self, tag: OpenTag) -> Result<()>;

    fn close_tag(&mut self, name: &str, location: Location) -> Result<()>;

    fn text(&mut self, text: &str, location: Location) -> Result<()>;

    fn cdata(&mut self, data: &str, location: Location) -> Result<()>;

    fn comment(&mut self, comment: &str) -> Result<()>;

    fn doctype(&mut self, fragment: &str, location: Location) -> Result<()>;

    /// Called with a parser error before it is returned to the caller.
    fn parse_error(&mut self, error: Error) -> Error {
        error
    }

    /// End of input.
    fn finish(self, end: Location) -> Result<Self::Output>;
}

/// Builds a [`Document`] from parser events.
///
/// One builder serves exactly one parse; the open-element stack lives here and
/// nowhere else.
pub struct TreeBuilder {
    arena: Arena<NodeData>,

    /// Elements currently open, outermost first
    open: SmallVec<[NodeId; 16]>,

    /// First element seen; the document root
    root: Option<NodeId>,

    doctype: String,

    options: ParseOptions,

    /// Depth inside an ignored extra top-level element (loose mode only)
    skipped_depth: usize,
}

impl TreeBuilder {
    pub fn new(options: ParseOptions) -> Self {
        TreeBuilder {
            arena: Arena::new(),
            open: SmallVec::new(),
            root: None,
            doctype: String::new(),
            options,
            skipped_depth: 0,
        }
    }

    fn current(&self) -> Option<NodeId> {
        self.open.last().copied()
    }

    fn element_name(&self, id: NodeId) -> &str {
        match &self.arena[id].get().kind {
            NodeKind::Element(elem) => &elem.name,
            _ => "",
        }
    }

    fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let node = self.arena.new_node(NodeData { kind });
        parent.append(node, &mut self.arena);
        node
    }

    /// Append a text or CDATA child and extend the parent's value.
    fn append_character_data(&mut self, parent: NodeId, content: &str, kind: NodeKind) {
        if let NodeKind::Element(elem) = &mut self.arena[parent].get_mut().kind {
            elem.value.push_str(content);
        }
        self.append(parent, kind);
    }

    /// Character data with no open element: before the root or after it closed.
    fn outside_root(&self, what: &str, content: &str, location: Location) -> Result<()> {
        if content.trim().is_empty() || !self.options.strict_parsing {
            trace!("ignoring {} outside of root element", what);
            return Ok(());
        }
        Err(Error::malformed(
            format!("{what} outside of root element"),
            location,
        ))
    }
}

impl TreeSink for TreeBuilder {
    type Output = Document;

    fn open_tag(&mut self, tag: OpenTag) -> Result<()> {
        if self.skipped_depth > 0 {
            self.skipped_depth += 1;
            return Ok(());
        }

        let parent = self.current();
        if parent.is_none() && self.root.is_some() {
            if self.options.strict_parsing {
                return Err(Error::malformed(
                    format!("multiple root elements: <{}>", tag.name),
                    tag.location,
                ));
            }
            debug!("ignoring extra top-level element <{}>", tag.name);
            self.skipped_depth = 1;
            return Ok(());
        }

        trace!("open <{}> depth={}", tag.name, self.open.len());
        let kind = NodeKind::Element(ElementData {
            name: tag.name,
            attrs: tag.attributes,
            value: String::new(),
            location: tag.location,
            start_tag_offset: tag.start_tag_offset,
        });
        let node = match parent {
            Some(parent) => self.append(parent, kind),
            None => {
                let root = self.arena.new_node(NodeData { kind });
                self.root = Some(root);
                root
            }
        };
        self.open.push(node);
        Ok(())
    }

    fn close_tag(&mut self, name: &str, location: Location) -> Result<()> {
        if self.skipped_depth > 0 {
            self.skipped_depth -= 1;
            return Ok(());
        }

        let Some(top) = self.current() else {
            if self.options.strict_parsing {
                return Err(Error::malformed(
                    format!("unexpected close tag </{name}>"),
                    location,
                ));
            }
            return Ok(());
        };

        if self.element_name(top) == name {
            trace!("close </{}> depth={}", name, self.open.len());
            self.open.pop();
            return Ok(());
        }

        if self.options.strict_parsing {
            return Err(Error::malformed(
                format!(
                    "mismatched close tag: expected </{}>, found </{name}>",
                    self.element_name(top)
                ),
                location,
            ));
        }

        // Loose: close everything up to the nearest element with this name.
        match self.open.iter().rposition(|&id| self.element_name(id) == name) {
            Some(depth) => {
                debug!(
                    "implicitly closing {} element(s) at </{}>",
                    self.open.len() - depth - 1,
                    name
                );
                self.open.truncate(depth);
            }
            None => {
                debug!("ignoring stray close tag </{}>", name);
            }
        }
        Ok(())
    }

    fn text(&mut self, text: &str, location: Location) -> Result<()> {
        if self.skipped_depth > 0 {
            return Ok(());
        }
        let Some(parent) = self.current() else {
            return self.outside_root("text", text, location);
        };
        self.append_character_data(parent, text, NodeKind::Text(CompactString::new(text)));
        Ok(())
    }

    fn cdata(&mut self, data: &str, location: Location) -> Result<()> {
        if self.skipped_depth > 0 {
            return Ok(());
        }
        let Some(parent) = self.current() else {
            return self.outside_root("CDATA", data, location);
        };
        self.append_character_data(parent, data, NodeKind::CData(CompactString::new(data)));
        Ok(())
    }

    fn comment(&mut self, comment: &str) -> Result<()> {
        if self.options.trim_whitespace || self.skipped_depth > 0 {
            return Ok(());
        }
        if let Some(parent) = self.current() {
            self.append(parent, NodeKind::Comment(CompactString::new(comment)));
        }
        Ok(())
    }

    fn doctype(&mut self, fragment: &str, location: Location) -> Result<()> {
        if self.options.strict_parsing && self.root.is_some() {
            return Err(Error::malformed(
                "inappropriately located doctype declaration",
                location,
            ));
        }
        self.doctype.push_str(fragment);
        Ok(())
    }

    fn parse_error(&mut self, error: Error) -> Error {
        debug!("parse aborted: {}", error);
        error
    }

    fn finish(self, end: Location) -> Result<Document> {
        if self.options.strict_parsing
            && let Some(top) = self.current()
        {
            return Err(Error::malformed(
                format!("unclosed tag <{}>", self.element_name(top)),
                end,
            ));
        }
        let root = self
            .root
            .ok_or_else(|| Error::malformed("document has no root element", end))?;
        debug!("built document with {} nodes", self.arena.count());
        Ok(Document::from_parts(
            self.arena,
            root,
            self.doctype,
            self.options,
        ))
    }
}
