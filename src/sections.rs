//! Section removal.
//!
//! Scans the body for heading-like blocks, matches them against the
//! canonical topic list to build the document's heading skeleton, then
//! deletes every block between a removed heading and the next recognized
//! one. Table-of-contents entries (PAGEREF fields) never count as
//! headings.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::body::{apply_edits, body_blocks, Edit};
use crate::error::FillError;
use crate::headings::{match_heading, normalize};

/// Blocks longer than this are body content, not headings.
const MAX_HEADING_LEN: usize = 220;

/// Marker carried by table-of-contents entries in the document field layer.
const TOC_MARKER: &str = "PAGEREF";

/// Remove every section named in `names_to_remove` from the body.
///
/// Returns the updated XML and the number of blocks removed. Names that
/// never match a recognized heading are silently ignored; an empty removal
/// set is a no-op.
pub fn clear_sections(
    xml: &str,
    names_to_remove: &[String],
) -> Result<(String, usize), FillError> {
    if names_to_remove.is_empty() {
        return Ok((xml.to_string(), 0));
    }
    let Some(blocks) = body_blocks(xml)? else {
        return Ok((xml.to_string(), 0));
    };

    let remove: HashSet<String> = names_to_remove.iter().map(|n| normalize(n)).collect();

    // Heading skeleton: ordered (block index, canonical name) pairs.
    let mut skeleton: Vec<(usize, &'static str)> = Vec::new();
    for (index, block) in blocks.iter().enumerate() {
        let text = block.text.trim();
        if text.is_empty() || text.chars().count() > MAX_HEADING_LEN || text.contains(TOC_MARKER) {
            continue;
        }
        if let Some(name) = match_heading(text) {
            skeleton.push((index, name));
        }
    }
    debug!(headings = skeleton.len(), "built heading skeleton");

    let mut marked: Vec<usize> = Vec::new();
    for (pos, (start, name)) in skeleton.iter().enumerate() {
        if !remove.contains(&normalize(name)) {
            continue;
        }
        let end = skeleton
            .get(pos + 1)
            .map(|(next, _)| *next)
            .unwrap_or(blocks.len());
        marked.extend(*start..end);
    }

    if marked.is_empty() {
        return Ok((xml.to_string(), 0));
    }
    let removed = marked.len();
    let edits: Vec<Edit> = marked
        .into_iter()
        .map(|index| Edit {
            range: blocks[index].range.clone(),
            replacement: String::new(),
        })
        .collect();
    info!(blocks = removed, "removed deselected sections");
    Ok((apply_edits(xml, edits), removed))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::body::WML_NS;

    fn document(body: &str) -> String {
        format!("<w:document xmlns:w=\"{WML_NS}\"><w:body>{body}<w:sectPr/></w:body></w:document>")
    }

    fn p(text: &str) -> String {
        format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>")
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn removes_exactly_the_span_between_headings() {
        let xml = document(&format!(
            "{}{}{}{}{}{}{}",
            p("Worksets"),
            p("Workset ownership rules."),
            p("Phasing"),
            p("Phase mapping for the project."),
            p("Demolition phases are modeled separately."),
            p("Levels"),
            p("Level naming follows the survey datum.")
        ));
        let (out, removed) = clear_sections(&xml, &names(&["Phasing"])).unwrap();
        assert_eq!(removed, 3);
        assert!(!out.contains("Phasing"));
        assert!(!out.contains("Demolition"));
        assert!(out.contains("Worksets"));
        assert!(out.contains("Workset ownership rules."));
        assert!(out.contains("Levels"));
        assert!(out.contains("survey datum"));
    }

    #[test]
    fn last_section_extends_to_end_of_body() {
        let xml = document(&format!(
            "{}{}{}{}",
            p("Worksets"),
            p("Body."),
            p("Levels"),
            p("Trailing level notes.")
        ));
        let (out, removed) = clear_sections(&xml, &names(&["Levels"])).unwrap();
        assert_eq!(removed, 2);
        assert!(out.contains("Worksets"));
        assert!(!out.contains("Levels"));
        assert!(!out.contains("Trailing"));
    }

    #[test]
    fn unknown_names_leave_the_body_unchanged() {
        let xml = document(&format!("{}{}", p("Worksets"), p("Body.")));
        let (out, removed) = clear_sections(&xml, &names(&["Phasing"])).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(out, xml);
    }

    #[test]
    fn empty_removal_set_is_a_no_op() {
        let xml = document(&p("Worksets"));
        let (out, removed) = clear_sections(&xml, &[]).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(out, xml);
    }

    #[test]
    fn toc_entries_are_never_treated_as_headings() {
        // The TOC lists "Phasing" with a PAGEREF field; only the real
        // heading further down starts a removable span.
        let xml = document(&format!(
            "{}{}{}{}",
            p("Phasing\u{9}PAGEREF _Toc1234 5"),
            p("Worksets"),
            p("Phasing"),
            p("Phase content.")
        ));
        let (out, removed) = clear_sections(&xml, &names(&["Phasing"])).unwrap();
        assert_eq!(removed, 2);
        assert!(out.contains("PAGEREF"));
        assert!(out.contains("Worksets"));
        assert!(!out.contains("Phase content."));
    }

    #[test]
    fn numbered_headings_match_and_section_spans_follow_them() {
        let xml = document(&format!(
            "{}{}{}{}",
            p("4.7 Worksets"),
            p("Central model worksets."),
            p("4.8 Phasing"),
            p("Phase notes.")
        ));
        let (out, removed) = clear_sections(&xml, &names(&["Worksets"])).unwrap();
        assert_eq!(removed, 2);
        assert!(!out.contains("Central model"));
        assert!(out.contains("4.8 Phasing"));
    }

    #[test]
    fn overlapping_headings_resolve_to_the_longest_match() {
        let xml = document(&format!(
            "{}{}{}{}",
            p("Clash Detection Sessions"),
            p("Session matrix."),
            p("Worksets"),
            p("Workset body.")
        ));
        // Removing "Clash Detection" must NOT remove the more specific
        // "Clash Detection Sessions" heading's span.
        let (out, removed) = clear_sections(&xml, &names(&["Clash Detection"])).unwrap();
        assert_eq!(removed, 0);
        assert!(out.contains("Session matrix."));

        let (out, removed) =
            clear_sections(&xml, &names(&["Clash Detection Sessions"])).unwrap();
        assert_eq!(removed, 2);
        assert!(!out.contains("Session matrix."));
        assert!(out.contains("Workset body."));
    }
}
