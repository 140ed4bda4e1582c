//! Terminal output for command results and errors.
//!
//! Results go to stdout, either as human text or pretty JSON. Errors always
//! go to stderr with their machine code and remediation hint.

use std::io::{self, Write};

use modgraph_core::error::ErrorCode;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Human,
    Json,
}

impl OutputMode {
    pub const fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Human }
    }
}

/// Error payload shown to operators.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }

    /// Attach the code and hint of `code`.
    #[must_use]
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.error_code = Some(code.code().to_string());
        self.suggestion = code.hint().map(ToString::to_string);
        self
    }
}

/// Render a serializable value to stdout in the requested format.
///
/// # Errors
///
/// Fails if stdout cannot be written.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Human => human_fn(value, &mut out)?,
    }
    Ok(())
}

/// Write `error` in human form.
///
/// # Errors
///
/// Fails if `w` cannot be written.
pub fn write_error(w: &mut dyn Write, error: &CliError) -> io::Result<()> {
    match &error.error_code {
        Some(code) => writeln!(w, "error[{code}]: {}", error.message)?,
        None => writeln!(w, "error: {}", error.message)?,
    }
    if let Some(suggestion) = &error.suggestion {
        writeln!(w, "  hint: {suggestion}")?;
    }
    Ok(())
}

/// Render an error to stderr, as JSON when `mode` asks for it.
pub fn render_error(mode: OutputMode, error: &CliError) {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    // Nothing sensible is left to do if stderr itself is gone.
    let _ = match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({ "error": error });
            serde_json::to_writer_pretty(&mut out, &wrapper)
                .map_err(io::Error::from)
                .and_then(|()| writeln!(out))
        }
        OutputMode::Human => write_error(&mut out, error),
    };
}
