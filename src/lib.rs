//! Template-filling engine for BIM Execution Plan documents.
//!
//! The engine takes the structured answers collected by a project-setup
//! form and either fills a pre-existing `.docx` template (writing labeled
//! field values in place, stripping deselected sections, stamping a
//! diagonal watermark into every page header) or hands the payload to an
//! external generator that produces narrative prose.
//!
//! The interactive form itself is not here; this crate is the part the
//! form calls.

pub mod body;
pub mod error;
pub mod fields;
pub mod fill;
pub mod generate;
pub mod headings;
pub mod package;
pub mod payload;
pub mod sections;
pub mod state;
pub mod watermark;

pub use error::FillError;
pub use fill::{fill_template, FillOutcome};
pub use generate::{run_generator, GenerationResult};
pub use payload::{ClashSession, Payload, TopicEntry, TopicSelection};
pub use state::AppState;
