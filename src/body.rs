//! Document body abstraction.
//!
//! The body is treated as an ordered sequence of opaque block handles
//! (paragraphs, tables) carrying their byte range in `word/document.xml`
//! and their flattened text. Mutation is planned as byte-range [`Edit`]s
//! against the original XML string and applied in descending order, so
//! earlier edits never shift the ranges of edits still pending.

use std::ops::Range;

use roxmltree::{Document, Node};

use crate::error::FillError;

pub const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// One planned byte-range replacement.
#[derive(Debug, Clone)]
pub struct Edit {
    pub range: Range<usize>,
    pub replacement: String,
}

/// Apply edits back-to-front. Ranges must not overlap.
pub fn apply_edits(xml: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.range.start.cmp(&a.range.start));
    let mut out = xml.to_string();
    for edit in edits {
        out.replace_range(edit.range, &edit.replacement);
    }
    out
}

pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn escape_attr(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}

/// Collect all `w:t` text content from descendants of a node, inserting a
/// space between adjacent runs so table cells read naturally.
pub fn collect_text(node: &Node) -> String {
    let mut text = String::new();
    for desc in node.descendants() {
        if desc.has_tag_name((WML_NS, "t")) {
            if let Some(t) = desc.text() {
                if !text.is_empty() && !text.ends_with(' ') {
                    text.push(' ');
                }
                text.push_str(t);
            }
        }
    }
    text
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Table,
    Other,
}

/// Snapshot of one top-level body block.
#[derive(Debug, Clone)]
pub struct Block {
    pub range: Range<usize>,
    pub text: String,
    pub kind: BlockKind,
}

/// Snapshot the top-level child blocks of `w:body`, excluding the trailing
/// section properties. Returns `None` when the document has no body.
pub fn body_blocks(xml: &str) -> Result<Option<Vec<Block>>, FillError> {
    let doc = Document::parse(xml)?;
    let Some(body) = doc
        .root_element()
        .children()
        .find(|n| n.has_tag_name((WML_NS, "body")))
    else {
        return Ok(None);
    };

    let mut blocks = Vec::new();
    for child in body.children().filter(Node::is_element) {
        if child.has_tag_name((WML_NS, "sectPr")) {
            continue;
        }
        let kind = match child.tag_name().name() {
            "p" => BlockKind::Paragraph,
            "tbl" => BlockKind::Table,
            _ => BlockKind::Other,
        };
        blocks.push(Block {
            range: child.range(),
            text: collect_text(&child),
            kind,
        });
    }
    Ok(Some(blocks))
}

/// Plan run-preserving edits that set the visible text of a block
/// (paragraph or table cell) to `text`.
///
/// The first `w:t` is overwritten, every later one is blanked; run
/// properties stay untouched so the block keeps its formatting while
/// presenting one logical string. A block with no text run gets a fresh
/// run appended to its last paragraph.
pub fn plan_set_text(xml: &str, node: &Node, text: &str) -> Vec<Edit> {
    let ts: Vec<Node> = node
        .descendants()
        .filter(|n| n.has_tag_name((WML_NS, "t")))
        .collect();

    let mut edits = Vec::new();
    if let Some((first, rest)) = ts.split_first() {
        edits.push(Edit {
            range: first.range(),
            replacement: format!(
                "<w:t xml:space=\"preserve\">{}</w:t>",
                escape_text(text)
            ),
        });
        for t in rest {
            edits.push(Edit {
                range: t.range(),
                replacement: "<w:t/>".to_string(),
            });
        }
        return edits;
    }

    // No text run anywhere in the block: append one to the last paragraph.
    let run = format!(
        "<w:r><w:t xml:space=\"preserve\">{}</w:t></w:r>",
        escape_text(text)
    );
    let paragraph = node
        .descendants()
        .filter(|n| n.has_tag_name((WML_NS, "p")))
        .last();
    match paragraph {
        Some(p) => {
            let range = p.range();
            if xml[range.clone()].ends_with("/>") {
                edits.push(Edit {
                    range,
                    replacement: format!("<w:p>{run}</w:p>"),
                });
            } else {
                let close = range.end - "</w:p>".len();
                edits.push(Edit {
                    range: close..range.end,
                    replacement: format!("{run}</w:p>"),
                });
            }
        }
        None => {
            // A cell without any paragraph is not schema-valid; synthesize one.
            let range = node.range();
            let name = node.tag_name().name();
            if xml[range.clone()].ends_with("/>") {
                edits.push(Edit {
                    range,
                    replacement: format!("<w:{name}><w:p>{run}</w:p></w:{name}>"),
                });
            } else {
                let close_tag = format!("</w:{name}>");
                let close = range.end - close_tag.len();
                edits.push(Edit {
                    range: close..range.end,
                    replacement: format!("<w:p>{run}</w:p>{close_tag}"),
                });
            }
        }
    }
    edits
}
