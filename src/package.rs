//! DOCX package I/O.
//!
//! A `.docx` file is a ZIP of XML parts. The engine holds the archive as an
//! ordered list of `(entry_name, bytes)`, mutates individual parts as
//! strings, and writes the whole archive back. Entry order is preserved so
//! untouched parts round-trip byte-for-byte.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::FillError;

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const SETTINGS_PART: &str = "word/settings.xml";
pub const CORE_PROPS_PART: &str = "docProps/core.xml";
pub const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

pub struct DocxPackage {
    entries: Vec<(String, Vec<u8>)>,
}

impl DocxPackage {
    /// Read a package from disk, preserving entry order.
    pub fn open(path: &Path) -> Result<Self, FillError> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            entries.push((name, data));
        }
        Ok(Self { entries })
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.entries.iter().any(|(entry, _)| entry == name)
    }

    /// UTF-8 text of a part, or `None` when the part does not exist.
    pub fn part_text(&self, name: &str) -> Result<Option<String>, FillError> {
        match self.entries.iter().find(|(entry, _)| entry == name) {
            Some((_, data)) => String::from_utf8(data.clone())
                .map(Some)
                .map_err(|_| FillError::NonTextPart {
                    name: name.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Text of a part that must exist.
    pub fn required_part_text(&self, name: &str) -> Result<String, FillError> {
        self.part_text(name)?.ok_or_else(|| FillError::MissingPart {
            name: name.to_string(),
        })
    }

    /// Replace a part's content, or append the part when it is new.
    pub fn set_part_text(&mut self, name: &str, xml: String) {
        match self.entries.iter_mut().find(|(entry, _)| entry == name) {
            Some((_, data)) => *data = xml.into_bytes(),
            None => self.entries.push((name.to_string(), xml.into_bytes())),
        }
    }

    /// Entry names, in archive order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Write the package back to disk. Media entries are STORED, XML parts
    /// DEFLATED, matching the layout Word produces.
    pub fn save(&self, path: &Path) -> Result<(), FillError> {
        let file = File::create(path)?;
        let mut writer = ZipWriter::new(file);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, data) in &self.entries {
            let options = if name.starts_with("word/media/") {
                stored
            } else {
                deflated
            };
            writer.start_file(name.as_str(), options)?;
            writer.write_all(data)?;
        }
        writer.finish()?;
        info!(path = %path.display(), parts = self.entries.len(), "saved document package");
        Ok(())
    }
}
