//! Line parser for compiler dependency reports.
//!
//! # Format
//!
//! ```text
//! <module> (<file>) : <kind> : <module> (<file>)[ : <renamings>]
//! ```
//!
//! - Module names are runs of `[A-Za-z0-9._]`.
//! - The dependent file extends to the first `) : `.
//! - `<kind>` is free text (`private`, `public`, `private static`, ...). It is
//!   kept for diagnostics only.
//! - The imported file extends to the next `)`. Anything after it is ignored,
//!   which covers the selective-import suffix newer compilers append.
//!
//! Blank lines are skipped. Every other line must parse; a single malformed
//! line fails the whole listing.

use std::fmt;
use std::path::PathBuf;

use super::DependencyEdge;

const FILE_OPEN: &str = " (";
const DEPENDENT_CLOSE: &str = ") : ";
const KIND_SEPARATOR: &str = " : ";

/// Which half of a dependency line an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Dependent,
    Imported,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dependent => write!(f, "dependent"),
            Self::Imported => write!(f, "imported"),
        }
    }
}

/// A single line does not match the dependency grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected {side} module name at column {column}")]
    ModuleName { side: Side, column: usize },

    #[error("expected `(<file>)` after {side} module at column {column}")]
    FilePath { side: Side, column: usize },

    #[error("missing ` : <kind> : <module> (<file>)` after dependent file")]
    MissingImport,
}

/// A malformed line inside a listing, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {source} in {text:?}")]
pub struct LineError {
    pub line: usize,
    pub text: String,
    #[source]
    pub source: ParseError,
}

fn is_module_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '_'
}

/// Split a leading module name off `s`.
fn take_module(s: &str) -> Option<(&str, &str)> {
    let end = s.find(|c: char| !is_module_char(c)).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    Some(s.split_at(end))
}

/// Parse `" (<file>)..."` up to the first `)`, returning the file and the rest.
fn take_file(s: &str) -> Option<(&str, &str)> {
    let body = s.strip_prefix(FILE_OPEN)?;
    let close = body.find(')')?;
    if close == 0 {
        return None;
    }
    Some((&body[..close], &body[close + 1..]))
}

/// Find the `" : <module> ("` that starts the imported half of a line.
///
/// The kind may itself contain ` : ` (`private : static`), so the first
/// separator followed by something shaped like `<module> (<file>)` wins.
fn split_kind(rest: &str) -> Option<(&str, &str, &str, &str)> {
    for (idx, _) in rest.match_indices(KIND_SEPARATOR) {
        let candidate = &rest[idx + KIND_SEPARATOR.len()..];
        let Some((module, after)) = take_module(candidate) else {
            continue;
        };
        if let Some((file, tail)) = take_file(after) {
            return Some((&rest[..idx], module, file, tail));
        }
    }
    None
}

/// Parse one dependency line into a [`DependencyEdge`].
///
/// # Errors
///
/// Returns a [`ParseError`] describing the first part of the line that does
/// not match the grammar.
pub fn parse_line(line: &str) -> Result<DependencyEdge, ParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let column = |rest: &str| line.len() - rest.len() + 1;

    let (from_module, rest) = take_module(line).ok_or(ParseError::ModuleName {
        side: Side::Dependent,
        column: 1,
    })?;

    let body = rest.strip_prefix(FILE_OPEN).ok_or(ParseError::FilePath {
        side: Side::Dependent,
        column: column(rest),
    })?;
    let close = body.find(DEPENDENT_CLOSE).ok_or(ParseError::MissingImport)?;
    if close == 0 {
        return Err(ParseError::FilePath {
            side: Side::Dependent,
            column: column(rest),
        });
    }
    let from_file = &body[..close];
    let rest = &body[close + DEPENDENT_CLOSE.len()..];

    let Some((kind, to_module, to_file, _tail)) = split_kind(rest) else {
        return Err(import_error(rest, column(rest)));
    };

    Ok(DependencyEdge {
        from_module: from_module.to_string(),
        from_file: PathBuf::from(from_file),
        kind: kind.trim().to_string(),
        to_module: to_module.to_string(),
        to_file: PathBuf::from(to_file),
    })
}

/// Classify why the imported half of a line failed to parse.
fn import_error(rest: &str, base_column: usize) -> ParseError {
    let Some(idx) = rest.rfind(KIND_SEPARATOR) else {
        return ParseError::MissingImport;
    };
    let candidate = &rest[idx + KIND_SEPARATOR.len()..];
    let column = base_column + idx + KIND_SEPARATOR.len();
    match take_module(candidate) {
        None => ParseError::ModuleName {
            side: Side::Imported,
            column,
        },
        Some((module, _)) => ParseError::FilePath {
            side: Side::Imported,
            column: column + module.len(),
        },
    }
}

/// Parse a whole listing, skipping blank lines.
///
/// # Errors
///
/// Returns a [`LineError`] for the first malformed line. No partial result
/// is returned.
pub fn parse_listing(input: &str) -> Result<Vec<DependencyEdge>, LineError> {
    let mut edges = Vec::new();
    for (i, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let edge = parse_line(line).map_err(|source| LineError {
            line: i + 1,
            text: line.to_string(),
            source,
        })?;
        edges.push(edge);
    }
    Ok(edges)
}
