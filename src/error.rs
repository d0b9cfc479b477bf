use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the template-filling engine.
///
/// Everything here is fatal to the operation that produced it; recoverable
/// conditions (missing body, unknown section names, absent core properties)
/// are handled in place and never surface as an error.
#[derive(Debug, Error)]
pub enum FillError {
    #[error("template not found: {path}")]
    TemplateNotFound { path: PathBuf },

    #[error("required part missing from package: {name}")]
    MissingPart { name: String },

    #[error("part {name} is not valid UTF-8 XML")]
    NonTextPart { name: String },

    #[error("malformed document XML")]
    Xml(#[from] roxmltree::Error),

    #[error("document package error")]
    Package(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to run generator `{program}`")]
    Generator {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("state serialization error")]
    State(#[from] serde_json::Error),
}
