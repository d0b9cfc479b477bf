//! Header watermark injection.
//!
//! Headers are per-section in WordprocessingML, so the watermark is
//! re-applied once per `w:sectPr`: existing default headers are rewritten,
//! missing ones are minted (part + relationship + content-type override +
//! reference). The shape itself is the classic VML text-path diagonal,
//! silver at half opacity, sized to span the page.

use std::sync::LazyLock;

use regex::Regex;
use roxmltree::{Document, Node};
use tracing::{debug, info};

use crate::body::{apply_edits, escape_attr, Edit, REL_NS, WML_NS};
use crate::error::FillError;
use crate::package::{
    DocxPackage, CONTENT_TYPES_PART, DOCUMENT_PART, DOCUMENT_RELS_PART, SETTINGS_PART,
};

const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const HEADER_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
const SETTINGS_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings";
const HEADER_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";
const SETTINGS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml";

static REL_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"Id="rId(\d+)""#).expect("invalid regex"));

/// Inject the watermark into every section's default header.
///
/// A document without a body is left untouched. Re-invocation replaces the
/// previous watermark rather than stacking a second one.
pub fn apply_watermark(pkg: &mut DocxPackage, text: &str) -> Result<(), FillError> {
    let Some(mut doc_xml) = pkg.part_text(DOCUMENT_PART)? else {
        return Ok(());
    };
    {
        let doc = Document::parse(&doc_xml)?;
        let has_body = doc
            .root_element()
            .children()
            .any(|n| n.has_tag_name((WML_NS, "body")));
        if !has_body {
            return Ok(());
        }
    }

    ensure_display_background_shapes(pkg)?;

    // The format only renders header watermarks when a section exists to
    // hang the header on; synthesize one for body-only templates.
    if !doc_xml.contains("<w:sectPr") {
        if let Some(pos) = doc_xml.rfind("</w:body>") {
            doc_xml.insert_str(pos, "<w:sectPr/>");
        }
    }

    let mut rels_xml = match pkg.part_text(DOCUMENT_RELS_PART)? {
        Some(xml) => xml,
        None => format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <Relationships xmlns=\"{PKG_REL_NS}\"></Relationships>"
        ),
    };
    let mut next_rid = 1 + REL_ID
        .captures_iter(&rels_xml)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .max()
        .unwrap_or(0);

    let mut doc_edits: Vec<Edit> = Vec::new();
    let mut new_rels = String::new();
    let mut header_parts: Vec<(String, usize)> = Vec::new();
    let mut next_header_index = 1usize;

    {
        let doc = Document::parse(&doc_xml)?;
        let rel_targets = relationship_targets(&rels_xml)?;
        let sections: Vec<Node> = doc
            .descendants()
            .filter(|n| n.has_tag_name((WML_NS, "sectPr")))
            .collect();

        for (i, sect) in sections.iter().enumerate() {
            let section_index = i + 1;
            let existing = default_header_rid(sect)
                .and_then(|rid| rel_targets.get(rid))
                .map(|target| part_name_for_target(target));

            match existing {
                Some(part) => {
                    debug!(section = section_index, part, "rewriting existing header");
                    header_parts.push((part, section_index));
                }
                None => {
                    let part = loop {
                        let candidate = format!("word/header{next_header_index}.xml");
                        next_header_index += 1;
                        let pending = header_parts.iter().any(|(name, _)| *name == candidate);
                        if !pkg.has_part(&candidate) && !pending {
                            break candidate;
                        }
                    };
                    let rid = format!("rId{next_rid}");
                    next_rid += 1;
                    let target = part.trim_start_matches("word/");
                    new_rels.push_str(&format!(
                        "<Relationship Id=\"{rid}\" Type=\"{HEADER_REL_TYPE}\" Target=\"{target}\"/>"
                    ));
                    doc_edits.push(insert_header_reference(&doc_xml, sect, &rid));
                    debug!(section = section_index, part, "created header reference");
                    header_parts.push((part, section_index));
                }
            }
        }
    }

    if !doc_edits.is_empty() {
        doc_xml = apply_edits(&doc_xml, doc_edits);
    }
    pkg.set_part_text(DOCUMENT_PART, doc_xml);

    if !new_rels.is_empty() {
        if let Some(pos) = rels_xml.rfind("</Relationships>") {
            rels_xml.insert_str(pos, &new_rels);
        }
        pkg.set_part_text(DOCUMENT_RELS_PART, rels_xml);
    }

    let section_count = header_parts.len();
    for (part, section_index) in header_parts {
        ensure_content_type_override(pkg, &part, HEADER_CONTENT_TYPE)?;
        pkg.set_part_text(&part, watermark_header_xml(text, section_index));
    }
    info!(sections = section_count, text, "applied watermark");
    Ok(())
}

/// Record the document-wide "display background shapes" flag the format
/// requires for header watermarks to render behind content. The flag is
/// never duplicated on re-invocation.
fn ensure_display_background_shapes(pkg: &mut DocxPackage) -> Result<(), FillError> {
    match pkg.part_text(SETTINGS_PART)? {
        Some(mut settings) => {
            if settings.contains("<w:displayBackgroundShape") {
                return Ok(());
            }
            if let Some(open) = settings.find("<w:settings") {
                if let Some(close) = settings[open..].find('>') {
                    settings.insert_str(open + close + 1, "<w:displayBackgroundShape/>");
                    pkg.set_part_text(SETTINGS_PART, settings);
                }
            }
            Ok(())
        }
        None => {
            let settings = format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
                 <w:settings xmlns:w=\"{WML_NS}\"><w:displayBackgroundShape/></w:settings>"
            );
            pkg.set_part_text(SETTINGS_PART, settings);
            ensure_content_type_override(pkg, SETTINGS_PART, SETTINGS_CONTENT_TYPE)?;
            ensure_relationship(pkg, SETTINGS_REL_TYPE, "settings.xml")?;
            Ok(())
        }
    }
}

fn relationship_targets(rels_xml: &str) -> Result<std::collections::HashMap<String, String>, FillError> {
    let doc = Document::parse(rels_xml)?;
    let mut map = std::collections::HashMap::new();
    for node in doc.descendants() {
        if node.tag_name().name() == "Relationship" {
            if let (Some(id), Some(target)) = (node.attribute("Id"), node.attribute("Target")) {
                map.insert(id.to_string(), target.to_string());
            }
        }
    }
    Ok(map)
}

fn part_name_for_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("word/{target}"),
    }
}

fn default_header_rid<'a>(sect: &Node<'a, 'a>) -> Option<&'a str> {
    sect.children()
        .find(|n| {
            n.has_tag_name((WML_NS, "headerReference"))
                && n.attribute((WML_NS, "type")) == Some("default")
        })
        .and_then(|n| n.attribute((REL_NS, "id")))
}

/// Plan the edit that links a freshly minted header into a section.
/// `headerReference` leads the `sectPr` content model, so it goes right
/// after the opening tag.
fn insert_header_reference(xml: &str, sect: &Node, rid: &str) -> Edit {
    let range = sect.range();
    let slice = &xml[range.clone()];
    let reference = format!("<w:headerReference w:type=\"default\" r:id=\"{rid}\"/>");
    if slice.ends_with("/>") {
        let open = &slice[..slice.len() - 2];
        Edit {
            range,
            replacement: format!("{open}>{reference}</w:sectPr>"),
        }
    } else {
        let after_open = slice.find('>').map(|p| p + 1).unwrap_or(0);
        Edit {
            range: range.start + after_open..range.start + after_open,
            replacement: reference,
        }
    }
}

fn ensure_content_type_override(
    pkg: &mut DocxPackage,
    part: &str,
    content_type: &str,
) -> Result<(), FillError> {
    let mut types = pkg.required_part_text(CONTENT_TYPES_PART)?;
    let part_name = format!("/{part}");
    if types.contains(&format!("PartName=\"{part_name}\"")) {
        return Ok(());
    }
    if let Some(pos) = types.rfind("</Types>") {
        types.insert_str(
            pos,
            &format!("<Override PartName=\"{part_name}\" ContentType=\"{content_type}\"/>"),
        );
        pkg.set_part_text(CONTENT_TYPES_PART, types);
    }
    Ok(())
}

fn ensure_relationship(
    pkg: &mut DocxPackage,
    rel_type: &str,
    target: &str,
) -> Result<(), FillError> {
    let mut rels = match pkg.part_text(DOCUMENT_RELS_PART)? {
        Some(xml) => xml,
        None => format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <Relationships xmlns=\"{PKG_REL_NS}\"></Relationships>"
        ),
    };
    if rels.contains(rel_type) {
        return Ok(());
    }
    let next = 1 + REL_ID
        .captures_iter(&rels)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    if let Some(pos) = rels.rfind("</Relationships>") {
        rels.insert_str(
            pos,
            &format!("<Relationship Id=\"rId{next}\" Type=\"{rel_type}\" Target=\"{target}\"/>"),
        );
    }
    pkg.set_part_text(DOCUMENT_RELS_PART, rels);
    Ok(())
}

/// Full header part: one paragraph holding the diagonal text-path shape.
/// `section_index` keeps shape identifiers document-unique.
fn watermark_header_xml(text: &str, section_index: usize) -> String {
    let escaped = escape_attr(text);
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<w:hdr xmlns:w=\"{WML_NS}\" xmlns:r=\"{REL_NS}\" \
xmlns:v=\"urn:schemas-microsoft-com:vml\" \
xmlns:o=\"urn:schemas-microsoft-com:office:office\">\
<w:p><w:pPr><w:pStyle w:val=\"Header\"/></w:pPr>\
<w:r><w:rPr><w:noProof/></w:rPr><w:pict>\
<v:shapetype id=\"_x0000_t136\" coordsize=\"21600,21600\" o:spt=\"136\" \
adj=\"10800\" path=\"m@7,l@8,m@5,21600l@6,21600e\">\
<v:formulas>\
<v:f eqn=\"sum #0 0 10800\"/><v:f eqn=\"prod #0 2 1\"/>\
<v:f eqn=\"sum 21600 0 @1\"/><v:f eqn=\"sum 0 0 @2\"/>\
<v:f eqn=\"sum 21600 0 @3\"/><v:f eqn=\"if @0 @3 0\"/>\
<v:f eqn=\"if @0 21600 @1\"/><v:f eqn=\"if @0 0 @2\"/>\
<v:f eqn=\"if @0 @4 21600\"/><v:f eqn=\"mid @5 @6\"/>\
<v:f eqn=\"mid @8 @5\"/><v:f eqn=\"mid @7 @8\"/>\
<v:f eqn=\"mid @6 @7\"/><v:f eqn=\"sum @6 0 @5\"/>\
</v:formulas>\
<v:path textpathok=\"t\" o:connecttype=\"custom\" \
o:connectlocs=\"@9,0;@10,10800;@11,21600;@12,10800\" \
o:connectangles=\"270,180,90,0\"/>\
<v:textpath on=\"t\" fitshape=\"t\"/>\
</v:shapetype>\
<v:shape id=\"PowerPlusWaterMarkObject{section_index}\" \
o:spid=\"_x0000_s{spid}\" type=\"#_x0000_t136\" \
style=\"position:absolute;margin-left:0;margin-top:0;width:468pt;height:117pt;\
rotation:315;z-index:-251654144;\
mso-position-horizontal:center;mso-position-horizontal-relative:margin;\
mso-position-vertical:center;mso-position-vertical-relative:margin\" \
o:allowincell=\"f\" fillcolor=\"silver\" stroked=\"f\">\
<v:fill opacity=\".5\"/>\
<v:textpath style=\"font-family:&quot;Calibri&quot;;font-size:1pt\" \
string=\"{escaped}\"/>\
</v:shape>\
</w:pict></w:r></w:p></w:hdr>",
        spid = 2048 + section_index,
    )
}
