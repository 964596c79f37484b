//! Slash-separated element paths.
//!
//! A path is a list of [`Step`]s such as `book/chapter[2]/*`. Each step selects
//! child elements by name (or any name with `*`), optionally narrowed to the
//! n-th match under each parent. A leading `/` anchors the path at the root
//! element, whose name must match the first segment.
//!
//! Results come back in document order.

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::arena_dom::{Document, ElementRef};
use crate::error::{Error, Result};
use crate::trace;

/// What a step matches against an element name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTest {
    /// `*`
    Any,
    Name(String),
}

impl NameTest {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameTest::Any => true,
            NameTest::Name(expected) => expected == name,
        }
    }
}

/// One path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub test: NameTest,
    /// 1-based position among the matching children of one parent.
    pub index: Option<usize>,
}

impl Step {
    fn parse(path: &str, segment: &str) -> Result<Step> {
        if segment.is_empty() {
            return Err(Error::invalid_path(path, "empty path segment"));
        }

        // `[2]` has an empty name and matches no element
        let (name, index) = split_index(segment);
        let test = if name == "*" {
            NameTest::Any
        } else {
            NameTest::Name(name.to_string())
        };
        Ok(Step { test, index })
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.test {
            NameTest::Any => f.write_str("*")?,
            NameTest::Name(name) => f.write_str(name)?,
        }
        if let Some(index) = self.index {
            write!(f, "[{index}]")?;
        }
        Ok(())
    }
}

/// Split `name[digits]` into its parts. Anything else is all name.
fn split_index(segment: &str) -> (&str, Option<usize>) {
    let Some(inner) = segment.strip_suffix(']') else {
        return (segment, None);
    };
    let Some(open) = inner.rfind('[') else {
        return (segment, None);
    };
    let digits = &inner[open + 1..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return (segment, None);
    }
    let index = digits.parse().unwrap_or(usize::MAX);
    (&inner[..open], Some(index))
}

/// A parsed path, reusable across queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    /// First segment of an absolute path, compared verbatim to the root name.
    root: Option<String>,
    steps: Vec<Step>,
}

impl Path {
    pub fn parse(path: &str) -> Result<Path> {
        let (absolute, rest) = match path.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, path),
        };

        let mut segments = rest.split('/');
        let root = if absolute {
            let first = segments.next().unwrap_or_default();
            Step::parse(path, first)?;
            Some(first.to_string())
        } else {
            None
        };

        let steps = segments
            .map(|segment| Step::parse(path, segment))
            .collect::<Result<Vec<_>>>()?;

        Ok(Path { root, steps })
    }

    pub fn is_absolute(&self) -> bool {
        self.root.is_some()
    }

    /// Steps after the root segment of an absolute path.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    fn start<'a>(&self, context: ElementRef<'a>) -> Option<ElementRef<'a>> {
        match &self.root {
            None => Some(context),
            Some(root_name) => {
                let root = context.root_element();
                (root.name() == root_name).then_some(root)
            }
        }
    }

    fn evaluate<'a>(&self, context: ElementRef<'a>) -> SmallVec<[ElementRef<'a>; 8]> {
        let mut frontier: SmallVec<[ElementRef<'a>; 8]> = self.start(context).into_iter().collect();

        for step in &self.steps {
            let mut next = SmallVec::new();
            for node in &frontier {
                let mut matches = node
                    .child_elements()
                    .filter(|child| step.test.matches(child.name()));
                match step.index {
                    None => next.extend(matches),
                    // positions are 1-based, `[0]` selects nothing
                    Some(0) => {}
                    Some(index) => next.extend(matches.nth(index - 1)),
                }
            }
            trace!("step {} -> {} element(s)", step, next.len());
            frontier = next;
            if frontier.is_empty() {
                break;
            }
        }

        frontier
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Path> {
        Path::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        if let Some(root) = &self.root {
            write!(f, "/{root}")?;
            first = false;
        }
        for step in &self.steps {
            if !first {
                f.write_str("/")?;
            }
            write!(f, "{step}")?;
            first = false;
        }
        Ok(())
    }
}

impl<'a> ElementRef<'a> {
    /// Every element `path` selects, in document order.
    pub fn get_all(&self, path: &str) -> Result<Vec<ElementRef<'a>>> {
        Ok(self.select_all(&Path::parse(path)?))
    }

    /// The first element `path` selects.
    pub fn get(&self, path: &str) -> Result<Option<ElementRef<'a>>> {
        Ok(self.select(&Path::parse(path)?))
    }

    pub fn select_all(&self, path: &Path) -> Vec<ElementRef<'a>> {
        path.evaluate(*self).into_vec()
    }

    pub fn select(&self, path: &Path) -> Option<ElementRef<'a>> {
        path.evaluate(*self).into_iter().next()
    }
}

impl Document {
    /// Query relative to the root element.
    ///
    /// The path is validated even when the document has been destroyed.
    pub fn get_all(&self, path: &str) -> Result<Vec<ElementRef<'_>>> {
        let path = Path::parse(path)?;
        Ok(self.select_all(&path))
    }

    pub fn get(&self, path: &str) -> Result<Option<ElementRef<'_>>> {
        let path = Path::parse(path)?;
        Ok(self.select(&path))
    }

    pub fn select_all(&self, path: &Path) -> Vec<ElementRef<'_>> {
        self.root()
            .map(|root| root.select_all(path))
            .unwrap_or_default()
    }

    pub fn select(&self, path: &Path) -> Option<ElementRef<'_>> {
        self.root().and_then(|root| root.select(path))
    }

    /// Same as [`Document::root`]; kept next to the query methods.
    pub fn root_element(&self) -> Option<ElementRef<'_>> {
        self.root()
    }
}
