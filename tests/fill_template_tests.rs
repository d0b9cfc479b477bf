use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use bep_designer::fill_template;
use bep_designer::package::DocxPackage;
use bep_designer::watermark::apply_watermark;
use bep_designer::Payload;

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
</Relationships>"#;

const CORE_PROPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/">
<dc:title></dc:title>
<dc:creator>Template Author</dc:creator>
</cp:coreProperties>"#;

fn p(text: &str) -> String {
    format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>")
}

fn row(cells: &[&str]) -> String {
    let tcs: String = cells
        .iter()
        .map(|c| format!("<w:tc>{}</w:tc>", p(c)))
        .collect();
    format!("<w:tr>{tcs}</w:tr>")
}

fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{WML_NS}" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{body}</w:body></w:document>"#
    )
}

/// Write a minimal but valid template package to `path`.
fn write_template(path: &Path, document: &str) {
    let file = File::create(path).unwrap();
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("word/document.xml", document),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS),
        ("docProps/core.xml", CORE_PROPS),
    ];
    for (name, content) in parts {
        writer.start_file(name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

fn standard_template(dir: &Path) -> PathBuf {
    let body = format!(
        "<w:tbl>{}{}{}</w:tbl>{}{}{}{}{}{}{}{}{}{}<w:sectPr/>",
        row(&["Project Name:160 John Street", "160 John Street"]),
        row(&["Client:", "TBD"]),
        row(&["Autodesk Revit:", ""]),
        p("Project Description:"),
        p("TBD"),
        p("Worksets"),
        p("Workset ownership notes."),
        p("Phasing"),
        p("Phase mapping."),
        p("Demolition sequence."),
        p("Levels"),
        p("Survey datum notes."),
        p("Sample block: 160 John Street160"),
    );
    let path = dir.join("template.docx");
    write_template(&path, &document_xml(&body));
    path
}

fn sample_payload() -> Payload {
    Payload {
        project_name: "118 Project Avenue".to_string(),
        client: "Acme Holdings".to_string(),
        project_description: "Six-storey mixed-use block".to_string(),
        enable_watermark: true,
        ..Payload::default()
    }
}

#[test]
fn end_to_end_fill_counts_every_change_source() {
    let dir = TempDir::new().unwrap();
    let template = standard_template(dir.path());
    let out_dir = dir.path().join("generated");

    let outcome = fill_template(
        &template,
        &sample_payload(),
        &["Phasing".to_string()],
        &out_dir,
    )
    .unwrap();

    // 3 matched non-blank fields + 1 literal fix + 3 blocks in the
    // Phasing section + 1 watermark.
    assert_eq!(outcome.changes, 8);
    assert!(outcome.path.exists());
    let file_name = outcome.path.file_name().unwrap().to_str().unwrap();
    assert!(file_name.starts_with("118_Project_Avenue_BEP_FILLED_"));
    assert!(file_name.ends_with(".docx"));

    let pkg = DocxPackage::open(&outcome.path).unwrap();
    let doc = pkg.part_text("word/document.xml").unwrap().unwrap();

    // Field writes
    assert!(doc.contains("118 Project Avenue"));
    assert!(doc.contains("Acme Holdings"));
    assert!(doc.contains("Six-storey mixed-use block"));
    assert!(!doc.contains("Project Name:160 John Street"));

    // Section removal: the Phasing span is gone, its neighbors stay.
    assert!(!doc.contains("Phasing"));
    assert!(!doc.contains("Demolition sequence."));
    assert!(doc.contains("Workset ownership notes."));
    assert!(doc.contains("Survey datum notes."));

    // Literal template fix
    assert!(!doc.contains("160 John Street160"));

    // Watermark plumbing
    assert!(doc.contains("<w:headerReference"));
    let header = pkg.part_text("word/header1.xml").unwrap().unwrap();
    assert!(header.contains("string=\"DRAFT\""));
    let settings = pkg.part_text("word/settings.xml").unwrap().unwrap();
    assert!(settings.contains("<w:displayBackgroundShape/>"));

    // Core properties are stamped but never counted.
    let core = pkg.part_text("docProps/core.xml").unwrap().unwrap();
    assert!(core.contains("<dc:title>118 Project Avenue</dc:title>"));
    assert!(core.contains("<dc:description>Six-storey mixed-use block</dc:description>"));
}

#[test]
fn unknown_section_names_remove_nothing() {
    let dir = TempDir::new().unwrap();
    let template = standard_template(dir.path());

    let mut payload = sample_payload();
    payload.enable_watermark = false;
    let outcome = fill_template(
        &template,
        &payload,
        &["Quality Assurance".to_string()],
        &dir.path().join("generated"),
    )
    .unwrap();

    // Only the field writes and the literal fix remain.
    assert_eq!(outcome.changes, 4);
    let pkg = DocxPackage::open(&outcome.path).unwrap();
    let doc = pkg.part_text("word/document.xml").unwrap().unwrap();
    assert!(doc.contains("Phase mapping."));
}

#[test]
fn blank_fields_are_never_attempted() {
    let dir = TempDir::new().unwrap();
    let template = standard_template(dir.path());

    let payload = Payload::default();
    let outcome = fill_template(&template, &payload, &[], &dir.path().join("out")).unwrap();

    // No fields, no removals, no watermark; the literal fix still runs.
    assert_eq!(outcome.changes, 1);
    let pkg = DocxPackage::open(&outcome.path).unwrap();
    let doc = pkg.part_text("word/document.xml").unwrap().unwrap();
    // The blank Revit value must not have produced an empty overwrite:
    // the sample row keeps its baked-in label text.
    assert!(doc.contains("Project Name:160 John Street"));
}

#[test]
fn template_without_body_is_a_zero_change_no_op() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.docx");
    write_template(
        &path,
        &format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{WML_NS}"/>"#),
    );

    let outcome = fill_template(
        &path,
        &sample_payload(),
        &["Phasing".to_string()],
        &dir.path().join("out"),
    )
    .unwrap();
    assert_eq!(outcome.changes, 0);
    assert!(outcome.path.exists());
}

#[test]
fn watermark_covers_every_section_with_unique_shape_ids() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("two_sections.docx");
    let body = format!(
        "{}<w:p><w:pPr><w:sectPr/></w:pPr><w:r><w:t>End of first section</w:t></w:r></w:p>{}<w:sectPr/>",
        p("Section one content"),
        p("Section two content"),
    );
    write_template(&path, &document_xml(&body));

    let mut pkg = DocxPackage::open(&path).unwrap();
    apply_watermark(&mut pkg, "DRAFT").unwrap();

    let headers: Vec<String> = pkg
        .part_names()
        .filter(|name| name.starts_with("word/header"))
        .map(str::to_string)
        .collect();
    assert_eq!(headers.len(), 2);

    let mut ids = Vec::new();
    for name in &headers {
        let header = pkg.part_text(name).unwrap().unwrap();
        assert_eq!(header.matches("<v:shape ").count(), 1);
        assert!(header.contains("string=\"DRAFT\""));
        let id_start = header.find("PowerPlusWaterMarkObject").unwrap();
        ids.push(header[id_start..id_start + 25].to_string());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 2, "shape ids must be document-unique");

    // Re-applying must not duplicate headers or the settings flag.
    apply_watermark(&mut pkg, "DRAFT").unwrap();
    let headers_after: Vec<&str> = pkg
        .part_names()
        .filter(|name| name.starts_with("word/header"))
        .collect();
    assert_eq!(headers_after.len(), 2);
    let settings = pkg.part_text("word/settings.xml").unwrap().unwrap();
    assert_eq!(settings.matches("displayBackgroundShape").count(), 1);
}

#[rstest]
#[case("", "DRAFT")]
#[case("   ", "DRAFT")]
#[case("CONFIDENTIAL", "CONFIDENTIAL")]
fn watermark_text_defaults_flow_into_the_header(#[case] configured: &str, #[case] expected: &str) {
    let dir = TempDir::new().unwrap();
    let template = standard_template(dir.path());

    let mut payload = sample_payload();
    payload.watermark_text = configured.to_string();
    let outcome = fill_template(&template, &payload, &[], &dir.path().join("out")).unwrap();

    let pkg = DocxPackage::open(&outcome.path).unwrap();
    let header = pkg.part_text("word/header1.xml").unwrap().unwrap();
    assert!(header.contains(&format!("string=\"{expected}\"")));
}
