//! quick-xml driver.
//!
//! [`drive`] pulls events out of a [`quick_xml::Reader`] and feeds them to a
//! [`TreeSink`]. It owns the parts of parsing the reader leaves to its caller:
//! entity resolution, merging text split around references, source positions,
//! and the raw doctype fragment.

use std::borrow::Cow;

use compact_str::CompactString;
use quick_xml::Reader;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::{BytesStart, Event};

use crate::arena_dom::{Attributes, Document};
use crate::builder::{OpenTag, TreeBuilder, TreeSink};
use crate::error::{Error, Location, Result};
use crate::options::ParseOptions;
use crate::{debug, trace};

const DOCTYPE_OPEN: &str = "<!DOCTYPE";

/// Parse `raw` into a [`Document`].
///
/// Leading and trailing whitespace is removed first; positions in the tree
/// are relative to the trimmed text.
pub fn parse(raw: &str, options: ParseOptions) -> Result<Document> {
    let source = raw.trim();
    if source.is_empty() {
        return Err(Error::EmptyInput);
    }
    debug!(
        "parsing {} bytes (strict={}, trim={})",
        source.len(),
        options.strict_parsing,
        options.trim_whitespace
    );
    drive(source, options, TreeBuilder::new(options))
}

/// Tokenize `source` and deliver its events to `sink`.
///
/// Stops at the first error, whether it came from the tokenizer or from the
/// sink. Tokenizer errors pass through [`TreeSink::parse_error`] on the way
/// out.
pub fn drive<S: TreeSink>(source: &str, options: ParseOptions, mut sink: S) -> Result<S::Output> {
    let strict = options.strict_parsing;

    let mut reader = Reader::from_str(source);
    let config = reader.config_mut();
    config.check_end_names = strict;
    config.allow_unmatched_ends = !strict;
    config.check_comments = strict;

    let mut lines = LineTracker::new(source);
    let mut pending = PendingText::default();

    loop {
        let before = reader.buffer_position() as usize;
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(err) => {
                let offset = reader.error_position() as usize;
                let error = Error::malformed(err.to_string(), lines.locate(offset));
                return Err(sink.parse_error(error));
            }
        };
        let after = reader.buffer_position() as usize;

        // Text and references accumulate; anything else flushes them first.
        match &event {
            Event::Text(text) => {
                let text = text
                    .decode()
                    .map_err(|err| Error::malformed(err.to_string(), lines.locate(before)))?;
                pending.push(&text, || lines.locate(before));
                continue;
            }
            Event::GeneralRef(reference) => {
                let name = reference
                    .decode()
                    .map_err(|err| Error::malformed(err.to_string(), lines.locate(before)))?;
                let resolved = resolve_reference(&name, strict)
                    .map_err(|message| Error::malformed(message, lines.locate(before)))?;
                pending.push(&resolved, || lines.locate(before));
                continue;
            }
            _ => pending.flush(&mut sink, options.trim_whitespace)?,
        }

        match event {
            Event::Start(start) => {
                let tag = open_tag(&start, source, before, after, strict, &mut lines)?;
                sink.open_tag(tag)?;
            }
            Event::Empty(start) => {
                let tag = open_tag(&start, source, before, after, strict, &mut lines)?;
                let name = tag.name.clone();
                let location = tag.location;
                sink.open_tag(tag)?;
                sink.close_tag(&name, location)?;
            }
            Event::End(end) => {
                let name = utf8(end.name().as_ref()).into_owned();
                sink.close_tag(&name, lines.locate(after))?;
            }
            Event::CData(data) => {
                sink.cdata(&utf8(&data), lines.locate(after))?;
            }
            Event::Comment(comment) => {
                sink.comment(&utf8(&comment))?;
            }
            Event::DocType(doctype) => {
                let fragment = doctype_fragment(source, before, after)
                    .map(Cow::Borrowed)
                    .unwrap_or_else(|| Cow::Owned(format!(" {}", utf8(&doctype))));
                sink.doctype(&fragment, lines.locate(after))?;
            }
            Event::Decl(_) | Event::PI(_) => {
                trace!("skipping declaration at byte {}", before);
            }
            Event::Eof => break,
            Event::Text(_) | Event::GeneralRef(_) => {}
        }
    }

    pending.flush(&mut sink, options.trim_whitespace)?;
    sink.finish(lines.locate(source.len()))
}

fn open_tag(
    start: &BytesStart<'_>,
    source: &str,
    before: usize,
    after: usize,
    strict: bool,
    lines: &mut LineTracker<'_>,
) -> Result<OpenTag> {
    let name = CompactString::from(utf8(start.name().as_ref()));
    let location = lines.locate(after);

    let mut attributes = Attributes::new();
    for attr in start.attributes().with_checks(strict) {
        let attr = match attr {
            Ok(attr) => attr,
            Err(err) if strict => {
                return Err(Error::malformed(
                    format!("bad attribute in <{name}>: {err}"),
                    location,
                ));
            }
            Err(_) => {
                debug!("dropping unparseable attributes of <{}>", name);
                break;
            }
        };
        let key = utf8(attr.key.as_ref()).into_owned();
        let value = match attr.unescape_value() {
            Ok(value) if strict && !value.chars().all(is_xml_char) => {
                return Err(Error::malformed(
                    format!("bad value for attribute `{key}`: character outside the XML range"),
                    location,
                ));
            }
            Ok(value) => value.into_owned(),
            Err(err) if strict => {
                return Err(Error::malformed(
                    format!("bad value for attribute `{key}`: {err}"),
                    location,
                ));
            }
            Err(_) => utf8(&attr.value).into_owned(),
        };
        attributes.insert(key, value);
    }

    Ok(OpenTag {
        name,
        attributes,
        location,
        start_tag_offset: markup_start(source, before) + 1,
    })
}

fn utf8(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// Expand the name of a general reference (`amp`, `#38`, `#x26`).
///
/// Unknown names and character references outside the XML `Char` range are an
/// error in strict mode and are kept verbatim otherwise.
fn resolve_reference(name: &str, strict: bool) -> Result<Cow<'static, str>, String> {
    if let Some(resolved) = resolve_xml_entity(name) {
        return Ok(Cow::Borrowed(resolved));
    }

    if let Some(rest) = name.strip_prefix('#') {
        let code = match rest.strip_prefix('x').or_else(|| rest.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => rest.parse::<u32>().ok(),
        };
        match code.and_then(char::from_u32).filter(|&ch| is_xml_char(ch)) {
            Some(ch) => return Ok(Cow::Owned(ch.to_string())),
            None if strict => return Err(format!("invalid character reference &{name};")),
            None => {}
        }
    } else if strict {
        return Err(format!("unknown entity &{name};"));
    }

    Ok(Cow::Owned(format!("&{name};")))
}

/// The XML `Char` production: no NUL, no C0 controls besides tab, line feed
/// and carriage return, no `U+FFFE`/`U+FFFF`. Surrogates never reach here.
fn is_xml_char(ch: char) -> bool {
    matches!(ch, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..)
}

/// Byte offset of the `<` that opens the markup read starting at `from`.
fn markup_start(source: &str, from: usize) -> usize {
    let bytes = source.as_bytes();
    if bytes.get(from) == Some(&b'<') {
        return from;
    }
    if from > 0 && bytes.get(from - 1) == Some(&b'<') {
        return from - 1;
    }
    bytes
        .get(from..)
        .and_then(|rest| rest.iter().position(|&b| b == b'<'))
        .map_or(from, |pos| from + pos)
}

/// Everything between `<!DOCTYPE` and the closing `>`, leading space included.
fn doctype_fragment(source: &str, before: usize, after: usize) -> Option<&str> {
    let start = markup_start(source, before);
    let raw = source.get(start..after)?;
    let head = raw.get(..DOCTYPE_OPEN.len())?;
    if !head.eq_ignore_ascii_case(DOCTYPE_OPEN) {
        return None;
    }
    raw.get(DOCTYPE_OPEN.len()..)?.strip_suffix('>')
}

/// Text collected across `Text` and `GeneralRef` events.
#[derive(Default)]
struct PendingText {
    buf: String,
    location: Option<Location>,
}

impl PendingText {
    fn push(&mut self, text: &str, location: impl FnOnce() -> Location) {
        if self.location.is_none() {
            self.location = Some(location());
        }
        self.buf.push_str(text);
    }

    fn flush<S: TreeSink>(&mut self, sink: &mut S, trim: bool) -> Result<()> {
        let Some(location) = self.location.take() else {
            return Ok(());
        };
        let text = if trim { self.buf.trim() } else { &self.buf };
        let result = if text.is_empty() {
            Ok(())
        } else {
            sink.text(text, location)
        };
        self.buf.clear();
        result
    }
}

/// Maps byte offsets to line and column, scanning forward incrementally.
struct LineTracker<'a> {
    source: &'a [u8],
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> LineTracker<'a> {
    fn new(source: &'a str) -> Self {
        LineTracker {
            source: source.as_bytes(),
            offset: 0,
            line: 0,
            column: 0,
        }
    }

    fn locate(&mut self, offset: usize) -> Location {
        let offset = offset.min(self.source.len());
        if offset < self.offset {
            self.offset = 0;
            self.line = 0;
            self.column = 0;
        }
        for &byte in &self.source[self.offset..offset] {
            if byte == b'\n' {
                self.line += 1;
                self.column = 0;
            } else if byte & 0xC0 != 0x80 {
                self.column += 1;
            }
        }
        self.offset = offset;
        Location {
            line: self.line,
            column: self.column,
            byte_offset: offset,
        }
    }
}
