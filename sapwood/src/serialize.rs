//! Render trees back to markup.
//!
//! Output is indented two spaces per level unless
//! [`RenderOptions::compressed`] is set. An element whose only child is not
//! an element renders that child inline. Text and comments are escaped;
//! CDATA is written as-is.
//!
//! The doctype is not rendered.

use std::borrow::Cow;
use std::fmt::{self, Write};

use crate::arena_dom::{Document, ElementRef, NodeKind, NodeRef};
use crate::options::RenderOptions;

/// Elements that render as `<name/>` in HTML mode when empty.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "frame", "hr", "img", "input", "keygen", "link",
    "menuitem", "meta", "param", "source", "track", "wbr",
];

/// Character count past which [`RenderOptions::trimmed`] cuts text.
const TRIMMED_LENGTH: usize = 25;

const INDENT: &str = "  ";

fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Serialize a document's root element. Destroyed documents render as `""`.
pub fn serialize_document(doc: &Document, options: &RenderOptions) -> String {
    let mut out = String::new();
    if let Some(root) = doc.root() {
        let _ = Serializer::new(&mut out, options).write_node(root.as_node(), "");
    }
    out
}

/// Serialize an element and its subtree, starting at `indent`.
pub fn serialize_element(elem: ElementRef<'_>, indent: &str, options: &RenderOptions) -> String {
    serialize_node(elem.as_node(), indent, options)
}

/// Serialize any node, starting at `indent`.
pub fn serialize_node(node: NodeRef<'_>, indent: &str, options: &RenderOptions) -> String {
    let mut out = String::new();
    let _ = Serializer::new(&mut out, options).write_node(node, indent);
    out
}

/// Escape the five XML special characters.
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '\'', '"']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

struct Serializer<'a, W: Write> {
    out: &'a mut W,
    options: &'a RenderOptions,
}

impl<'a, W: Write> Serializer<'a, W> {
    fn new(out: &'a mut W, options: &'a RenderOptions) -> Self {
        Self { out, options }
    }

    fn linebreak(&self) -> &'static str {
        if self.options.compressed { "" } else { "\n" }
    }

    fn write_node(&mut self, node: NodeRef<'_>, indent: &str) -> fmt::Result {
        self.out.write_str(indent)?;
        match node.as_element() {
            Some(elem) => self.write_element(elem, indent),
            None => self.write_character_data(node),
        }
    }

    fn write_character_data(&mut self, node: NodeRef<'_>) -> fmt::Result {
        match node.kind() {
            NodeKind::Element(_) => Ok(()),
            NodeKind::Text(text) => {
                let text = self.format_text(&escape(text));
                self.out.write_str(&text)
            }
            NodeKind::CData(data) => {
                let data = self.format_text(data);
                write!(self.out, "<![CDATA[{data}]]>")
            }
            NodeKind::Comment(comment) => {
                let comment = self.format_text(&escape(comment));
                write!(self.out, "<!--{comment}-->")
            }
        }
    }

    /// `indent` has already been written; it prefixes the closing tag.
    fn write_element(&mut self, elem: ElementRef<'_>, indent: &str) -> fmt::Result {
        let name = elem.name();
        write!(self.out, "<{name}")?;
        for (key, value) in elem.attributes() {
            write!(self.out, " {key}=\"{}\"", escape(value))?;
        }

        let mut children = elem.children();
        let first = children.next();
        let second = children.next();

        match (first, second) {
            (Some(only), None) if !only.is_element() => {
                self.out.write_char('>')?;
                self.write_character_data(only)?;
                write!(self.out, "</{name}>")
            }
            (Some(_), _) => {
                let linebreak = self.linebreak();
                self.out.write_char('>')?;
                self.out.write_str(linebreak)?;

                let child_indent = if self.options.compressed {
                    indent.to_string()
                } else {
                    format!("{indent}{INDENT}")
                };
                for child in elem.children() {
                    self.write_node(child, &child_indent)?;
                    self.out.write_str(linebreak)?;
                }
                write!(self.out, "{indent}</{name}>")
            }
            (None, _) if self.options.html && !is_void_element(name) => {
                write!(self.out, "></{name}>")
            }
            (None, _) => self.out.write_str("/>"),
        }
    }

    fn format_text<'t>(&self, text: &'t str) -> Cow<'t, str> {
        let mut text = Cow::Borrowed(text);
        if self.options.trimmed && text.chars().count() > TRIMMED_LENGTH {
            let cut: String = text.chars().take(TRIMMED_LENGTH).collect();
            text = Cow::Owned(format!("{}…", cut.trim()));
        }
        if self.options.preserve_whitespace {
            return text;
        }
        match text {
            Cow::Borrowed(text) => Cow::Borrowed(text.trim()),
            Cow::Owned(text) => Cow::Owned(text.trim().to_string()),
        }
    }
}

impl Document {
    /// Render the root element.
    pub fn render(&self, options: &RenderOptions) -> String {
        serialize_document(self, options)
    }

    /// Render the root element with every line prefixed by `indent`.
    pub fn render_indented(&self, indent: &str, options: &RenderOptions) -> String {
        self.root()
            .map(|root| root.render_indented(indent, options))
            .unwrap_or_default()
    }

    /// Render into any [`fmt::Write`] sink.
    pub fn render_to<W: Write>(&self, out: &mut W, options: &RenderOptions) -> fmt::Result {
        match self.root() {
            Some(root) => root.render_to(out, options),
            None => Ok(()),
        }
    }
}

impl ElementRef<'_> {
    pub fn render(&self, options: &RenderOptions) -> String {
        serialize_element(*self, "", options)
    }

    pub fn render_indented(&self, indent: &str, options: &RenderOptions) -> String {
        serialize_element(*self, indent, options)
    }

    pub fn render_to<W: Write>(&self, out: &mut W, options: &RenderOptions) -> fmt::Result {
        Serializer::new(out, options).write_node(self.as_node(), "")
    }
}

impl NodeRef<'_> {
    pub fn render(&self, options: &RenderOptions) -> String {
        serialize_node(*self, "", options)
    }

    pub fn render_indented(&self, indent: &str, options: &RenderOptions) -> String {
        serialize_node(*self, indent, options)
    }

    pub fn render_to<W: Write>(&self, out: &mut W, options: &RenderOptions) -> fmt::Result {
        Serializer::new(out, options).write_node(*self, "")
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render_to(f, &RenderOptions::default())
    }
}

impl fmt::Display for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render_to(f, &RenderOptions::default())
    }
}

impl fmt::Display for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render_to(f, &RenderOptions::default())
    }
}
