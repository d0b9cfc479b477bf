//! Label/value field filling.
//!
//! Templates carry labeled fields either as table rows ("Project Name:" in
//! one cell, the value in the next) or as a label paragraph followed by a
//! short placeholder paragraph. Both shapes are handled here; the first
//! strategy that writes wins.

use roxmltree::{Document, Node};
use tracing::debug;

use crate::body::{apply_edits, collect_text, plan_set_text, Edit, WML_NS};
use crate::error::FillError;

/// Placeholder paragraphs longer than this are treated as real content and
/// never overwritten by the paragraph strategy.
const MAX_PLACEHOLDER_LEN: usize = 120;

/// Write `value` into the best matching location for `label`.
///
/// Returns the updated XML and whether a write occurred. Only the first
/// matching table cell (or, failing that, the first matching paragraph)
/// is acted on per call.
pub fn fill_field(xml: &str, label: &str, value: &str) -> Result<(String, bool), FillError> {
    let doc = Document::parse(xml)?;

    if let Some(edits) = plan_table_fill(xml, &doc, label, value) {
        debug!(label, "filled field via table cell");
        return Ok((apply_edits(xml, edits), true));
    }
    if let Some(edits) = plan_paragraph_fill(xml, &doc, label, value) {
        debug!(label, "filled field via paragraph");
        return Ok((apply_edits(xml, edits), true));
    }
    Ok((xml.to_string(), false))
}

/// Scan every row of every table in document order; act on the first cell
/// whose text contains `label` case-insensitively.
///
/// A label cell that carries extra text (a sample value baked into the
/// template, e.g. "Project Name:160 John Street") is first normalized back
/// to exactly the label.
fn plan_table_fill(xml: &str, doc: &Document, label: &str, value: &str) -> Option<Vec<Edit>> {
    let label_lower = label.to_lowercase();
    for table in doc
        .descendants()
        .filter(|n| n.has_tag_name((WML_NS, "tbl")))
    {
        for row in table.children().filter(|n| n.has_tag_name((WML_NS, "tr"))) {
            let cells: Vec<Node> = row
                .children()
                .filter(|n| n.has_tag_name((WML_NS, "tc")))
                .collect();
            for (i, cell) in cells.iter().enumerate() {
                let cell_text = collect_text(cell);
                if !cell_text.to_lowercase().contains(&label_lower) {
                    continue;
                }
                match cells.get(i + 1) {
                    Some(next_cell) => {
                        let mut edits = Vec::new();
                        if cell_text.trim() != label {
                            edits.extend(plan_set_text(xml, cell, label));
                        }
                        edits.extend(plan_set_text(xml, next_cell, value));
                        return Some(edits);
                    }
                    None => {
                        return Some(plan_set_text(xml, cell, &format!("{label} {value}")));
                    }
                }
            }
        }
    }
    None
}

/// Fallback: scan body paragraphs in document order. A label paragraph
/// followed by a short non-blank placeholder gets the value written into
/// the placeholder; any other match is rewritten to `label value` in place.
fn plan_paragraph_fill(xml: &str, doc: &Document, label: &str, value: &str) -> Option<Vec<Edit>> {
    let label_lower = label.to_lowercase();
    let body = doc
        .root_element()
        .children()
        .find(|n| n.has_tag_name((WML_NS, "body")))?;
    let paragraphs: Vec<Node> = body
        .children()
        .filter(|n| n.has_tag_name((WML_NS, "p")))
        .collect();

    for (i, paragraph) in paragraphs.iter().enumerate() {
        let text = collect_text(paragraph);
        let trimmed = text.trim();
        if !trimmed.to_lowercase().contains(&label_lower) {
            continue;
        }

        if trimmed.to_lowercase().starts_with(&label_lower) {
            if let Some(next) = paragraphs.get(i + 1) {
                let placeholder = collect_text(next);
                let placeholder = placeholder.trim();
                if !placeholder.is_empty() && placeholder.chars().count() < MAX_PLACEHOLDER_LEN {
                    return Some(plan_set_text(xml, next, value));
                }
            }
        }
        return Some(plan_set_text(xml, paragraph, &format!("{label} {value}")));
    }
    None
}
