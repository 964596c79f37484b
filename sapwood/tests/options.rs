use facet_testhelpers::test;
use sapwood::{
    Document, Error, Location, OpenTag, ParseOptions, RenderOptions, Result, TreeSink, drive,
};

#[test]
fn test_trim_ignores_whitespace_and_comments() {
    let xml = "<xml> <a1> </a1>\n<!--comment--><a2 /> <a3> </a3><a4> x </a4></xml>";
    let doc = Document::parse_with_options(xml, ParseOptions::new().trim_whitespace()).unwrap();

    assert!(doc.options().trim_whitespace);
    let children: Vec<_> = doc.children().collect();
    assert_eq!(children.len(), 4);
    assert!(children.iter().all(|c| c.is_element()));

    let elements: Vec<_> = doc.child_elements().collect();
    assert_eq!(elements[0].value(), "");
    assert_eq!(elements[2].value(), "");
    assert_eq!(elements[3].value(), "x");
}

#[test]
fn test_whitespace_kept_by_default() {
    let xml = "<xml> <a1> </a1>\n<!--comment--><a2 /></xml>";
    let doc = Document::parse(xml).unwrap();
    // " ", <a1>, "\n", comment, <a2>
    assert_eq!(doc.children().count(), 5);
    assert_eq!(doc.child_elements().next().unwrap().value(), " ");
}

#[test]
fn test_loose_parsing() {
    let xml = "<xml><a1> </a1>\n<a2 /> <a3> </a3></xml>";
    let doc = Document::parse_with_options(xml, ParseOptions::new().loose()).unwrap();
    assert!(!doc.options().strict_parsing);
    assert_eq!(doc.child_elements().count(), 3);
}

#[test]
fn test_loose_recovers_from_broken_structure() {
    let loose = ParseOptions::new().loose();

    let doc = Document::parse_with_options("<hello><unclosed-tag></hello>", loose).unwrap();
    assert_eq!(doc.child_elements().next().map(|e| e.name()), Some("unclosed-tag"));

    let doc = Document::parse_with_options("<a>1</a>stray<b>2</b>", loose).unwrap();
    assert_eq!(doc.name(), "a");
    assert_eq!(doc.value(), "1");

    let doc = Document::parse_with_options("<a><b>text", loose).unwrap();
    assert_eq!(doc.get("b").unwrap().map(|b| b.value()), Some("text"));

    let doc = Document::parse_with_options("<a></b></a>", loose).unwrap();
    assert_eq!(doc.name(), "a");
}

#[test]
fn test_loose_keeps_name_case() {
    let xml = r#"<Root Lang="en"><Child dataId="7"/><child/></Root>"#;
    for options in [ParseOptions::new(), ParseOptions::new().loose()] {
        let doc = Document::parse_with_options(xml, options).unwrap();
        assert_eq!(doc.name(), "Root");
        assert_eq!(doc.attribute("Lang"), Some("en"));
        assert_eq!(doc.attribute("LANG"), None);

        let children: Vec<_> = doc.child_elements().map(|e| e.name()).collect();
        assert_eq!(children, ["Child", "child"]);
        assert_eq!(doc.get("Child").unwrap().and_then(|c| c.attribute("dataId")), Some("7"));
    }
}

#[test]
fn test_strict_rejects_broken_structure() {
    for xml in [
        "<a>1</a>stray",
        "<a/><b/>",
        "<a><b>text",
        "<a>&bogus;</a>",
        r#"<a x="1" x="2"/>"#,
    ] {
        let err = Document::parse(xml).unwrap_err();
        assert!(matches!(err, Error::MalformedMarkup { .. }), "{xml:?}: {err}");
    }
}

#[test]
fn test_options_from_json() {
    let opts: ParseOptions = facet_json::from_str(r#"{"trim_whitespace": true}"#).unwrap();
    assert_eq!(opts, ParseOptions::new().trim_whitespace());

    let opts: ParseOptions = facet_json::from_str("{}").unwrap();
    assert_eq!(opts, ParseOptions::default());

    let opts: RenderOptions =
        facet_json::from_str(r#"{"compressed": true, "html": true}"#).unwrap();
    assert_eq!(opts, RenderOptions::new().compressed().html());
}

/// Counts events instead of building a tree.
#[derive(Default)]
struct Counter {
    depth: usize,
    max_depth: usize,
    elements: usize,
    text_bytes: usize,
    comments: usize,
}

impl TreeSink for Counter {
    type Output = (usize, usize, usize, usize);

    fn open_tag(&mut self, _tag: OpenTag) -> Result<()> {
        self.elements += 1;
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        Ok(())
    }

    fn close_tag(&mut self, _name: &str, _location: Location) -> Result<()> {
        self.depth -= 1;
        Ok(())
    }

    fn text(&mut self, text: &str, _location: Location) -> Result<()> {
        self.text_bytes += text.len();
        Ok(())
    }

    fn cdata(&mut self, data: &str, _location: Location) -> Result<()> {
        self.text_bytes += data.len();
        Ok(())
    }

    fn comment(&mut self, _comment: &str) -> Result<()> {
        self.comments += 1;
        Ok(())
    }

    fn doctype(&mut self, _fragment: &str, _location: Location) -> Result<()> {
        Ok(())
    }

    fn finish(self, _end: Location) -> Result<Self::Output> {
        Ok((self.elements, self.max_depth, self.text_bytes, self.comments))
    }
}

#[test]
fn test_custom_sink() {
    let counts = drive(
        "<a>ab<b><c/>&amp;</b><!--x--><![CDATA[cd]]></a>",
        ParseOptions::default(),
        Counter::default(),
    )
    .unwrap();
    assert_eq!(counts, (3, 3, 5, 1));
}

#[test]
fn test_custom_sink_sees_tokenizer_errors() {
    struct Failing;

    impl TreeSink for Failing {
        type Output = ();

        fn open_tag(&mut self, _tag: OpenTag) -> Result<()> {
            Ok(())
        }
        fn close_tag(&mut self, _name: &str, _location: Location) -> Result<()> {
            Ok(())
        }
        fn text(&mut self, _text: &str, _location: Location) -> Result<()> {
            Ok(())
        }
        fn cdata(&mut self, _data: &str, _location: Location) -> Result<()> {
            Ok(())
        }
        fn comment(&mut self, _comment: &str) -> Result<()> {
            Ok(())
        }
        fn doctype(&mut self, _fragment: &str, _location: Location) -> Result<()> {
            Ok(())
        }
        fn parse_error(&mut self, _error: Error) -> Error {
            Error::EmptyInput
        }
        fn finish(self, _end: Location) -> Result<()> {
            Ok(())
        }
    }

    let err = drive("<a></b>", ParseOptions::default(), Failing).unwrap_err();
    assert_eq!(err, Error::EmptyInput);
}
