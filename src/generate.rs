//! Boundary to the external prose generator.
//!
//! The generator is a stdin/stdout filter: it reads the serialized payload
//! as JSON and prints the planning-document prose. A non-zero exit is not
//! an error here; its stderr text becomes the visible result so the
//! caller can show what went wrong instead of failing silently.

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::{info, warn};

use crate::error::FillError;
use crate::payload::Payload;

/// Outcome of one generator invocation.
#[derive(Debug)]
pub struct GenerationResult {
    /// The text to display: prose on success, the generator's error detail
    /// otherwise.
    pub text: String,
    pub success: bool,
}

/// Run the generator with the payload on its stdin.
///
/// Only spawn and pipe failures are errors; the generator's own failure is
/// carried in the result.
pub fn run_generator(
    program: &str,
    args: &[String],
    payload: &Payload,
) -> Result<GenerationResult, FillError> {
    let input = serde_json::to_string(payload)?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| FillError::Generator {
            program: program.to_string(),
            source,
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .map_err(|source| FillError::Generator {
                program: program.to_string(),
                source,
            })?;
    }

    let output = child
        .wait_with_output()
        .map_err(|source| FillError::Generator {
            program: program.to_string(),
            source,
        })?;

    if output.status.success() {
        info!(program, "generator completed");
        Ok(GenerationResult {
            text: String::from_utf8_lossy(&output.stdout).into_owned(),
            success: true,
        })
    } else {
        let detail = if output.stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).into_owned()
        } else {
            String::from_utf8_lossy(&output.stderr).into_owned()
        };
        warn!(program, status = ?output.status.code(), "generator failed");
        Ok(GenerationResult {
            text: detail,
            success: false,
        })
    }
}
