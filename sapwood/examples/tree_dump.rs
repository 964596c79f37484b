//! Print the element tree of XML read from stdin, with source positions.
//!
//! Pass `--loose` to tolerate broken structure and `--trim` to drop
//! whitespace-only text.

use sapwood::{Document, ElementRef, NodeKind, ParseOptions};
use std::io::{self, Read};

fn main() {
    let mut options = ParseOptions::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--loose" => options = options.loose(),
            "--trim" => options = options.trim_whitespace(),
            other => {
                eprintln!("unknown flag: {other}");
                std::process::exit(2);
            }
        }
    }

    let mut input = String::new();
    io::stdin().read_to_string(&mut input).unwrap();

    let doc = match Document::parse_with_options(&input, options) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    if !doc.doctype().is_empty() {
        println!("DOCTYPE:{}", doc.doctype());
    }

    fn print_element(elem: ElementRef<'_>, depth: usize) {
        let indent = "  ".repeat(depth);
        println!(
            "{}<{}> @{}:{} (tag at byte {})",
            indent,
            elem.name(),
            elem.line(),
            elem.column(),
            elem.start_tag_offset()
        );
        for (key, value) in elem.attributes() {
            println!("{indent}  @{key}={value:?}");
        }
        for child in elem.children() {
            match child.kind() {
                NodeKind::Element(_) => {
                    if let Some(child) = child.as_element() {
                        print_element(child, depth + 1);
                    }
                }
                NodeKind::Text(t) => {
                    if !t.trim().is_empty() {
                        println!("{indent}  TEXT: {:?}", t.as_str());
                    }
                }
                NodeKind::CData(c) => println!("{indent}  CDATA: {:?}", c.as_str()),
                NodeKind::Comment(c) => println!("{indent}  COMMENT: {:?}", c.as_str()),
            }
        }
    }

    fn max_depth(elem: ElementRef<'_>) -> usize {
        1 + elem.child_elements().map(max_depth).max().unwrap_or(0)
    }

    if let Some(root) = doc.root() {
        print_element(root, 0);
        println!("\nMax element depth: {}", max_depth(root));
        println!("Total nodes: {}", doc.node_count());
    }
}
