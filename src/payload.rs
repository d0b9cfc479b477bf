//! Form answers and topic keep/remove choices.
//!
//! A [`Payload`] is built fresh per generation request (or restored from a
//! saved state/preset) and consumed once by the fill orchestrator. Wire
//! field names are the PascalCase names the generation collaborator reads
//! from its stdin.

use serde::{Deserialize, Serialize};

use crate::headings::{group_of, CANONICAL_TOPICS};

pub const DEFAULT_WATERMARK_TEXT: &str = "DRAFT";

/// One clash detection session row from the form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ClashSession {
    pub name: String,
    pub discipline_pair: String,
    pub keep: bool,
}

/// The flat record of project-setup answers.
///
/// Every string field defaults to empty, never null; absent JSON fields
/// deserialize to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Payload {
    // Project identity
    pub project_number: String,
    pub project_name: String,
    pub project_address: String,
    pub client: String,
    pub project_type: String,
    pub contract_type: String,
    pub project_description: String,
    pub bim_lead: String,

    // Collaboration settings
    pub coordination_meeting_cadence: String,
    pub package_method: String,
    pub auto_publish_cadence: String,
    pub sharing_frequency: String,
    pub package_naming_convention: String,

    // Geo-referencing
    pub geo_coordinate_system: String,
    pub acquire_coordinates_from_model: String,

    // Approved software versions
    pub revit_version: String,
    pub auto_cad_version: String,
    #[serde(rename = "Civil3DVersion")]
    pub civil_3d_version: String,
    pub desktop_connector_version: String,
    pub bluebeam_version: String,

    // Watermark
    pub enable_watermark: bool,
    pub watermark_text: String,

    // Clash sessions
    pub start_fresh: bool,
    pub sessions: Vec<ClashSession>,
}

impl Payload {
    /// Watermark text with the documented fallback: blank resolves to
    /// [`DEFAULT_WATERMARK_TEXT`].
    pub fn watermark_text(&self) -> &str {
        let trimmed = self.watermark_text.trim();
        if trimmed.is_empty() {
            DEFAULT_WATERMARK_TEXT
        } else {
            trimmed
        }
    }
}

/// One removable document section, tagged with its display group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicEntry {
    pub name: String,
    pub group: String,
    pub keep: bool,
}

/// Ordered keep/remove selection over the canonical topic list.
///
/// Names are case-insensitively unique because the list is seeded from
/// [`CANONICAL_TOPICS`] and only the keep flags mutate afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSelection {
    entries: Vec<TopicEntry>,
}

impl Default for TopicSelection {
    fn default() -> Self {
        Self::all_kept()
    }
}

impl TopicSelection {
    /// Selection with every canonical topic kept.
    pub fn all_kept() -> Self {
        let entries = CANONICAL_TOPICS
            .iter()
            .enumerate()
            .map(|(index, name)| TopicEntry {
                name: (*name).to_string(),
                group: group_of(index).to_string(),
                keep: true,
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[TopicEntry] {
        &self.entries
    }

    /// Flip one topic's keep flag; returns false when the name is not on
    /// the canonical list (lookup is case-insensitive).
    pub fn set_keep(&mut self, name: &str, keep: bool) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
        {
            Some(entry) => {
                entry.keep = keep;
                true
            }
            None => false,
        }
    }

    /// Names currently marked for removal, in canonical order.
    pub fn removed_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| !entry.keep)
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// Selection with the given names (and only those) marked for removal.
    /// Unknown names are ignored.
    pub fn with_removed<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selection = Self::all_kept();
        for name in names {
            selection.set_keep(name.as_ref(), false);
        }
        selection
    }
}
