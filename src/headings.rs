//! Heading normalization and the canonical topic list.
//!
//! Template headings vary in numbering ("3.2 Worksets" vs "Worksets") and
//! punctuation; [`normalize`] maps all spellings of the same heading to one
//! comparable form while keeping genuinely different headings apart.

use std::sync::LazyLock;

use regex::Regex;

/// Numbering tokens stripped from headings: decimal-dotted ("3", "3.2",
/// "3.2.1") and letter-dot-number ("a.1", "b.2.3") forms.
static NUMBERING_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+(?:\.\d+)*|[a-z]\.\d+(?:\.\d+)*)$").expect("invalid regex"));

static NON_ALNUM_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("invalid regex"));

/// Canonical comparable form of a free-text heading: lowercased, numbering
/// tokens removed, runs of punctuation collapsed to a single space.
///
/// Total and idempotent; empty input yields empty output.
pub fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();
    let kept: Vec<&str> = lower
        .split_whitespace()
        .filter(|token| !NUMBERING_TOKEN.is_match(token))
        .collect();
    NON_ALNUM_RUN
        .replace_all(&kept.join(" "), " ")
        .trim()
        .to_string()
}

/// The fixed table of contents the shipped BEP template conforms to.
/// Order matters: it defines both section boundaries during removal and the
/// group boundaries below. Only names on this list can be selectively
/// removed from a document.
pub const CANONICAL_TOPICS: [&str; 44] = [
    // Project Setup
    "Project Information",
    "Project Description",
    "Project Goals and BIM Uses",
    "Key Project Contacts",
    "Roles and Responsibilities",
    "Contract and Delivery Method",
    "Project Milestones",
    "Coordination Meetings",
    "Communication Protocols",
    "Dispute Resolution",
    "Training Requirements",
    // Collaboration and Information Exchange
    "Common Data Environment",
    "Collaboration Method",
    "Package Sharing Workflow",
    "Auto-Publish Settings",
    "Package Naming Convention",
    "Sharing Frequency",
    "Model Exchange Formats",
    "File Storage Structure",
    "Access and Security",
    "Review and Approval Workflow",
    "Issue Management",
    // Model Management
    "Model Setup",
    "Geo-Referencing",
    "Shared Coordinates",
    "Worksets",
    "Model Ownership",
    "Linked Models",
    "Phasing",
    "Levels",
    "Grids",
    "Naming Standards",
    "Model Health Checks",
    "Clash Detection",
    "Clash Detection Sessions",
    "Clash Resolution Workflow",
    // Software and Standards
    "Approved Software Versions",
    "Hardware and IT Requirements",
    "Recommended Views for Publishing",
    "Drawing Production Standards",
    "Quality Assurance",
    "Model Archiving",
    "Deliverables Schedule",
    "Revision History",
];

/// Display groups over [`CANONICAL_TOPICS`], as half-open index ranges.
pub const TOPIC_GROUPS: [(&str, usize, usize); 4] = [
    ("Project Setup", 0, 11),
    ("Collaboration and Information Exchange", 11, 22),
    ("Model Management", 22, 36),
    ("Software and Standards", 36, 44),
];

/// Group name for a canonical topic index.
pub fn group_of(index: usize) -> &'static str {
    TOPIC_GROUPS
        .iter()
        .find(|(_, start, end)| (*start..*end).contains(&index))
        .map(|(name, _, _)| *name)
        .unwrap_or("Other")
}

/// Match a block's text against the canonical list.
///
/// A block matches heading H when its normalized text equals or contains
/// H's normalized form. When several headings match, the one with the
/// greatest raw (un-normalized) length wins; equal lengths fall back to the
/// earlier canonical entry. This favors "Clash Detection Sessions" over
/// "Clash Detection" for a block that spells out the longer heading.
pub fn match_heading(block_text: &str) -> Option<&'static str> {
    let norm = normalize(block_text);
    if norm.is_empty() {
        return None;
    }
    let mut best: Option<&'static str> = None;
    for name in CANONICAL_TOPICS {
        let canon = normalize(name);
        if !canon.is_empty() && norm.contains(&canon) {
            let beaten = best.map(|b| name.len() > b.len()).unwrap_or(true);
            if beaten {
                best = Some(name);
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn strips_numbering_and_punctuation() {
        assert_eq!(normalize("3.2 Worksets"), "worksets");
        assert_eq!(normalize("Worksets:"), "worksets");
        assert_eq!(normalize("a.1.2 Geo-Referencing"), "geo referencing");
        assert_eq!(normalize("  PHASING  "), "phasing");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalize_is_idempotent_over_canonical_list() {
        for name in CANONICAL_TOPICS {
            let once = normalize(name);
            assert_eq!(normalize(&once), once, "not idempotent for {name:?}");
        }
    }

    #[test]
    fn canonical_topics_stay_distinct_after_normalization() {
        let mut seen = HashSet::new();
        for name in CANONICAL_TOPICS {
            let norm = normalize(name);
            assert!(!norm.is_empty(), "{name:?} normalized to empty");
            assert!(seen.insert(norm.clone()), "collision on {norm:?}");
        }
    }

    #[test]
    fn every_topic_belongs_to_a_group() {
        for index in 0..CANONICAL_TOPICS.len() {
            assert_ne!(group_of(index), "Other", "index {index} unassigned");
        }
        assert_eq!(group_of(0), "Project Setup");
        assert_eq!(group_of(25), "Model Management");
        assert_eq!(group_of(43), "Software and Standards");
    }

    #[test]
    fn matches_numbered_headings() {
        assert_eq!(match_heading("4.7 Worksets"), Some("Worksets"));
        assert_eq!(match_heading("Phasing"), Some("Phasing"));
        assert_eq!(match_heading("Not a known heading"), None);
    }

    #[test]
    fn longer_raw_heading_wins_on_overlap() {
        // "Clash Detection Sessions" contains "Clash Detection" after
        // normalization; the longer canonical entry must win.
        assert_eq!(
            match_heading("5.2 Clash Detection Sessions"),
            Some("Clash Detection Sessions")
        );
        assert_eq!(match_heading("5.1 Clash Detection"), Some("Clash Detection"));
    }
}
