//! XML document trees on an arena, built from quick-xml events.
//!
//! sapwood provides:
//! - **Parsing**: strict or loose tree construction, with source positions on
//!   every element
//! - **Querying**: slash-separated paths with `*` wildcards and `[n]` indices
//! - **Rendering**: indented, compressed, or HTML-flavored markup
//!
//! # Example
//!
//! ```rust
//! use sapwood::{Document, RenderOptions};
//!
//! let doc = Document::parse(
//!     r#"<books><book title="Twilight"/><book title="Twister"/></books>"#,
//! )?;
//!
//! let titles: Vec<_> = doc
//!     .get_all("book")?
//!     .iter()
//!     .filter_map(|book| book.attribute("title"))
//!     .collect();
//! assert_eq!(titles, ["Twilight", "Twister"]);
//!
//! let second = doc.get("book[2]")?.expect("two books");
//! assert_eq!(second.start_tag_offset(), 32);
//!
//! assert_eq!(
//!     doc.render(&RenderOptions::new().compressed()),
//!     r#"<books><book title="Twilight"/><book title="Twister"/></books>"#,
//! );
//! # Ok::<(), sapwood::Error>(())
//! ```

mod tracing_macros;
pub(crate) use tracing_macros::{debug, trace};

pub mod arena_dom;
pub mod builder;
mod error;
mod options;
pub mod parser;
pub mod query;
pub mod serialize;

pub use indextree::{self, NodeId};

pub use arena_dom::{Attributes, Document, ElementData, ElementRef, NodeData, NodeKind, NodeRef};
pub use builder::{OpenTag, TreeBuilder, TreeSink};
pub use error::{Error, Location, Result};
pub use options::{ParseOptions, RenderOptions};
pub use parser::{drive, parse};
pub use query::{NameTest, Path, Step};
pub use serialize::{escape, serialize_document, serialize_element, serialize_node};
