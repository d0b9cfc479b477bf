//! Fill orchestration: copy the template, write field values, apply the
//! literal template fixes, strip deselected sections, inject the
//! watermark, save.
//!
//! The output is a full copy of the template mutated in place. The copy is
//! intentionally not transactional: a failure mid-fill propagates to the
//! caller and leaves the partially written file on disk for inspection.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::Local;
use regex::Regex;
use roxmltree::Document;
use tracing::{info, warn};

use crate::body::{apply_edits, escape_text, Edit, WML_NS};
use crate::error::FillError;
use crate::fields::fill_field;
use crate::package::{DocxPackage, CORE_PROPS_PART, DOCUMENT_PART};
use crate::payload::Payload;
use crate::sections::clear_sections;
use crate::watermark::apply_watermark;

/// Known artifacts in the shipped template: text nodes where the sample
/// address was fused with a numeric code during template authoring.
const LITERAL_FIXES: &[(&str, &str)] = &[("160 John Street160", "160 John Street")];

/// Result of one fill run.
#[derive(Debug)]
pub struct FillOutcome {
    pub path: PathBuf,
    pub changes: usize,
}

/// The fixed, ordered label table driven by the form payload. Blank values
/// are skipped entirely: never attempted, never counted.
fn field_labels(payload: &Payload) -> [(&'static str, &str); 20] {
    [
        ("Project Number:", payload.project_number.as_str()),
        ("Project Name:", payload.project_name.as_str()),
        ("Project Address:", payload.project_address.as_str()),
        ("Client:", payload.client.as_str()),
        ("Project Type:", payload.project_type.as_str()),
        ("Contract Type:", payload.contract_type.as_str()),
        ("Project Description:", payload.project_description.as_str()),
        ("BIM Lead:", payload.bim_lead.as_str()),
        (
            "Coordination Meeting Cadence:",
            payload.coordination_meeting_cadence.as_str(),
        ),
        ("Collaboration Method:", payload.package_method.as_str()),
        ("Auto-Publish Cadence:", payload.auto_publish_cadence.as_str()),
        ("Package Sharing Timeline:", payload.sharing_frequency.as_str()),
        (
            "Package Naming Convention:",
            payload.package_naming_convention.as_str(),
        ),
        ("Geocoordinate System:", payload.geo_coordinate_system.as_str()),
        (
            "Coordinates Acquired From Model:",
            payload.acquire_coordinates_from_model.as_str(),
        ),
        ("Autodesk Revit:", payload.revit_version.as_str()),
        ("Autodesk AutoCAD:", payload.auto_cad_version.as_str()),
        ("Autodesk Civil 3D:", payload.civil_3d_version.as_str()),
        (
            "Autodesk Desktop Connector:",
            payload.desktop_connector_version.as_str(),
        ),
        ("Bluebeam Revu:", payload.bluebeam_version.as_str()),
    ]
}

/// Copy the template and fill it from the payload.
///
/// The change count is: one per non-blank field successfully written, one
/// per text node fixed by the literal pass, one per block removed with a
/// deselected section, plus exactly one when the watermark is applied.
/// Core-property updates are a side effect and do not count.
pub fn fill_template(
    template: &Path,
    payload: &Payload,
    sections_to_remove: &[String],
    out_dir: &Path,
) -> Result<FillOutcome, FillError> {
    if !template.is_file() {
        return Err(FillError::TemplateNotFound {
            path: template.to_path_buf(),
        });
    }
    fs::create_dir_all(out_dir)?;
    let out_path = out_dir.join(format!(
        "{}_BEP_FILLED_{}.docx",
        sanitize_name(&payload.project_name),
        timestamp()
    ));
    fs::copy(template, &out_path)?;

    let mut pkg = DocxPackage::open(&out_path)?;
    let Some(mut doc_xml) = pkg.part_text(DOCUMENT_PART)? else {
        warn!(template = %template.display(), "template has no document body, nothing to fill");
        return Ok(FillOutcome {
            path: out_path,
            changes: 0,
        });
    };
    if !has_body(&doc_xml)? {
        warn!(template = %template.display(), "template has no document body, nothing to fill");
        return Ok(FillOutcome {
            path: out_path,
            changes: 0,
        });
    }

    set_core_properties(&mut pkg, payload)?;

    let mut changes = 0usize;
    for (label, value) in field_labels(payload) {
        if value.trim().is_empty() {
            continue;
        }
        let (updated, wrote) = fill_field(&doc_xml, label, value)?;
        doc_xml = updated;
        if wrote {
            changes += 1;
        }
    }

    let (updated, fixed) = apply_literal_fixes(&doc_xml)?;
    doc_xml = updated;
    changes += fixed;

    let (updated, removed) = clear_sections(&doc_xml, sections_to_remove)?;
    doc_xml = updated;
    changes += removed;

    pkg.set_part_text(DOCUMENT_PART, doc_xml);

    if payload.enable_watermark {
        apply_watermark(&mut pkg, payload.watermark_text())?;
        changes += 1;
    }

    pkg.save(&out_path)?;
    info!(path = %out_path.display(), changes, "filled template");
    Ok(FillOutcome {
        path: out_path,
        changes,
    })
}

fn has_body(doc_xml: &str) -> Result<bool, FillError> {
    let doc = Document::parse(doc_xml)?;
    Ok(doc
        .root_element()
        .children()
        .any(|n| n.has_tag_name((WML_NS, "body"))))
}

/// Apply the fixed literal substitutions; each distinct text node changed
/// counts once regardless of how many occurrences it held.
fn apply_literal_fixes(xml: &str) -> Result<(String, usize), FillError> {
    let doc = Document::parse(xml)?;
    let mut edits = Vec::new();
    for node in doc
        .descendants()
        .filter(|n| n.has_tag_name((WML_NS, "t")))
    {
        // Entity references split a node's character data; gather all of it
        // so the rewrite never drops a chunk.
        let text: String = node
            .children()
            .filter(|c| c.is_text())
            .filter_map(|c| c.text())
            .collect();
        if text.is_empty() {
            continue;
        }
        let mut fixed = text.clone();
        for (from, to) in LITERAL_FIXES {
            fixed = fixed.replace(from, to);
        }
        if fixed != text {
            edits.push(Edit {
                range: node.range(),
                replacement: format!(
                    "<w:t xml:space=\"preserve\">{}</w:t>",
                    escape_text(&fixed)
                ),
            });
        }
    }
    let count = edits.len();
    if count == 0 {
        return Ok((xml.to_string(), 0));
    }
    Ok((apply_edits(xml, edits), count))
}

static CORE_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<dc:title\s*/>|<dc:title>.*?</dc:title>").expect("invalid regex"));
static CORE_DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<dc:description\s*/>|<dc:description>.*?</dc:description>").expect("invalid regex"));
static CORE_CREATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<dc:creator\s*/>|<dc:creator>.*?</dc:creator>").expect("invalid regex"));

/// Stamp title/description/creator into docProps/core.xml for each
/// non-blank payload field. A template without core properties is left
/// alone; this is cosmetic and never fails the fill.
fn set_core_properties(pkg: &mut DocxPackage, payload: &Payload) -> Result<(), FillError> {
    let Some(mut core) = pkg.part_text(CORE_PROPS_PART)? else {
        return Ok(());
    };
    let fields: [(&Regex, &str, &str); 3] = [
        (&CORE_TITLE, "dc:title", payload.project_name.trim()),
        (
            &CORE_DESCRIPTION,
            "dc:description",
            payload.project_description.trim(),
        ),
        (&CORE_CREATOR, "dc:creator", payload.bim_lead.trim()),
    ];
    let mut touched = false;
    for (pattern, tag, value) in fields {
        if value.is_empty() {
            continue;
        }
        let element = format!("<{tag}>{}</{tag}>", escape_text(value));
        if pattern.is_match(&core) {
            core = pattern
                .replace(&core, regex::NoExpand(element.as_str()))
                .into_owned();
        } else if let Some(pos) = core.rfind("</cp:coreProperties>") {
            core.insert_str(pos, &element);
        }
        touched = true;
    }
    if touched {
        pkg.set_part_text(CORE_PROPS_PART, core);
    }
    Ok(())
}

/// File-system-safe project name: alphanumerics, dash and underscore
/// survive; everything else becomes an underscore. Blank names fall back
/// to "Project".
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.chars().all(|c| c == '_') || cleaned.is_empty() {
        "Project".to_string()
    } else {
        cleaned
    }
}

fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Output path for generated prose, alongside the filled documents.
pub fn generated_text_path(out_dir: &Path, project_name: &str) -> PathBuf {
    out_dir.join(format!(
        "{}_BEP_{}.md",
        sanitize_name(project_name),
        timestamp()
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn sanitizes_project_names_for_filenames() {
        assert_eq!(sanitize_name("160 John Street"), "160_John_Street");
        assert_eq!(sanitize_name("Phase 2: East Wing"), "Phase_2__East_Wing");
        assert_eq!(sanitize_name("   "), "Project");
        assert_eq!(sanitize_name("///"), "Project");
    }

    #[test]
    fn literal_fixes_count_distinct_text_nodes() {
        let xml = format!(
            "<w:document xmlns:w=\"{WML_NS}\"><w:body>\
             <w:p><w:r><w:t>160 John Street160</w:t></w:r></w:p>\
             <w:p><w:r><w:t>160 John Street160 and 160 John Street160</w:t></w:r></w:p>\
             <w:p><w:r><w:t>clean</w:t></w:r></w:p>\
             </w:body></w:document>"
        );
        let (out, count) = apply_literal_fixes(&xml).unwrap();
        assert_eq!(count, 2);
        assert!(!out.contains("160 John Street160"));
        assert!(out.contains("160 John Street and 160 John Street"));
    }

    #[test]
    fn missing_template_is_reported_not_thrown_past() {
        let err = fill_template(
            Path::new("/nonexistent/template.docx"),
            &Payload::default(),
            &[],
            Path::new("/tmp"),
        )
        .unwrap_err();
        assert!(matches!(err, FillError::TemplateNotFound { .. }));
    }
}
