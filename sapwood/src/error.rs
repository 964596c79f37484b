//! Error types for parsing and querying.

use facet::Facet;
use std::fmt::{self, Display};

/// A point in the (trimmed) source text.
///
/// `line` and `column` are 0-based; `column` counts characters since the last
/// line feed. `byte_offset` counts bytes from the start of the input.
#[derive(Facet, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub byte_offset: usize,
}

impl Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {} (byte {})",
            self.line, self.column, self.byte_offset
        )
    }
}

/// Everything that can go wrong while building or querying a document.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum Error {
    /// no XML to parse
    EmptyInput,

    /// malformed markup at {location}: {message}
    MalformedMarkup { message: String, location: Location },

    /// invalid path `{path}`: {reason}
    InvalidPath { path: String, reason: &'static str },
}

impl Error {
    pub(crate) fn malformed(message: impl Into<String>, location: Location) -> Self {
        Error::MalformedMarkup {
            message: message.into(),
            location,
        }
    }

    pub(crate) fn invalid_path(path: &str, reason: &'static str) -> Self {
        Error::InvalidPath {
            path: path.to_string(),
            reason,
        }
    }

    /// Source location for markup errors, `None` for everything else.
    pub fn location(&self) -> Option<Location> {
        match self {
            Error::MalformedMarkup { location, .. } => Some(*location),
            _ => None,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
