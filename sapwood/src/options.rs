//! Parse and render configuration.
//!
//! Both option structs derive [`Facet`], so they can be loaded from any facet
//! format (JSON, TOML, ...) as well as built in code.

use facet::Facet;

/// Options fixed for the whole of one parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Facet)]
pub struct ParseOptions {
    /// Trim text runs, drop whitespace-only text, and ignore comments.
    #[facet(default)]
    pub trim_whitespace: bool,
    /// Reject structurally broken input (mismatched or unclosed tags, text or
    /// extra elements outside the root, misplaced doctypes, unknown entities,
    /// invalid character references).
    ///
    /// Element and attribute names keep their source case in both modes;
    /// loose parsing does not fold them to upper case.
    #[facet(default = true)]
    pub strict_parsing: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            trim_whitespace: false,
            strict_parsing: true,
        }
    }
}

impl ParseOptions {
    /// Create new default options (strict, whitespace preserved).
    pub fn new() -> Self {
        Self::default()
    }

    /// Trim text and ignore comments.
    pub fn trim_whitespace(mut self) -> Self {
        self.trim_whitespace = true;
        self
    }

    /// Tolerate structural problems instead of failing. Names are still
    /// kept as written.
    pub fn loose(mut self) -> Self {
        self.strict_parsing = false;
        self
    }
}

/// Options for rendering a tree back to markup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Facet)]
pub struct RenderOptions {
    /// No newlines and no indentation.
    #[facet(default)]
    pub compressed: bool,
    /// Keep leading and trailing whitespace of text, CDATA and comments.
    #[facet(default)]
    pub preserve_whitespace: bool,
    /// Cut text longer than 25 characters and mark the cut with `…`.
    #[facet(default)]
    pub trimmed: bool,
    /// Render childless elements the HTML way: void elements self-close,
    /// everything else gets an explicit end tag.
    #[facet(default)]
    pub html: bool,
}

impl RenderOptions {
    /// Create new default options (indented XML).
    pub fn new() -> Self {
        Self::default()
    }

    /// Render on a single line without indentation.
    pub fn compressed(mut self) -> Self {
        self.compressed = true;
        self
    }

    /// Keep whitespace around text content.
    pub fn preserve_whitespace(mut self) -> Self {
        self.preserve_whitespace = true;
        self
    }

    /// Shorten long text content.
    pub fn trimmed(mut self) -> Self {
        self.trimmed = true;
        self
    }

    /// Use HTML rules for childless elements.
    pub fn html(mut self) -> Self {
        self.html = true;
        self
    }
}
