//! Dependency listings emitted by the compiler (`-deps=<file>`).
//!
//! A listing is a text file with one import relation per line. This module
//! owns the record type and reading listings from disk; the line grammar
//! lives in [`parser`].

pub mod parser;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::error::ErrorCode;

pub use parser::{LineError, ParseError, parse_line, parse_listing};

/// One import relation: `from_module` (in `from_file`) imports `to_module`
/// (in `to_file`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub from_module: String,
    pub from_file: PathBuf,
    /// Import kind as reported by the compiler. Never used for analysis.
    pub kind: String,
    pub to_module: String,
    pub to_file: PathBuf,
}

/// Errors reading a dependency listing from disk.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("failed to read dependency listing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed dependency listing {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: LineError,
    },
}

impl ListingError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::ListingUnreadable,
            Self::Malformed { .. } => ErrorCode::MalformedListing,
        }
    }
}

/// Read and parse the listing at `path`.
///
/// # Errors
///
/// Fails if the file cannot be read or any line is malformed.
#[instrument]
pub fn read_listing(path: &Path) -> Result<Vec<DependencyEdge>, ListingError> {
    let text = fs::read_to_string(path).map_err(|source| ListingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let edges = parse_listing(&text).map_err(|source| ListingError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(edges = edges.len(), "parsed dependency listing");
    Ok(edges)
}

/// Like [`read_listing`], but a missing file is `Ok(None)`.
///
/// # Errors
///
/// Fails on any I/O error other than `NotFound`, or on a malformed line.
pub fn try_read_listing(path: &Path) -> Result<Option<Vec<DependencyEdge>>, ListingError> {
    match read_listing(path) {
        Ok(edges) => Ok(Some(edges)),
        Err(ListingError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_listing_from_disk() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("deps.txt");
        fs::write(&path, "a (a.d) : private : b (b.d)\n").expect("write");

        let edges = read_listing(&path).expect("read");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].to_module, "b");
    }

    #[test]
    fn malformed_listing_maps_to_code() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("deps.txt");
        fs::write(&path, "a (a.d) : private : b (b.d)\nnope\n").expect("write");

        let err = read_listing(&path).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedListing);
        assert!(err.to_string().contains("deps.txt"));
    }

    #[test]
    fn missing_listing_is_none_for_try_read() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("absent.txt");

        assert!(try_read_listing(&missing).expect("no error").is_none());
        assert_eq!(
            read_listing(&missing).unwrap_err().code(),
            ErrorCode::ListingUnreadable
        );
    }
}
