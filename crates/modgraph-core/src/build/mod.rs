//! Incremental build driver.
//!
//! # Overview
//!
//! A build of one root file runs in its own target directory:
//!
//! ```text
//! <build_dir>/<stem>/
//!   .lock          advisory lock held by the CLI
//!   depfile.txt    dependency snapshot from the last build
//!   dep.rsp ...    response files, one per phase
//!   obj/           object files
//! ```
//!
//! The snapshot's mtime is the reference point: if no listed source is newer
//! and the artifact is not older, nothing is compiled. Otherwise objects are
//! cleared, the snapshot is regenerated, and every surviving source is
//! compiled and linked. There is no per-file incremental compilation.

pub mod driver;
pub mod layout;
pub mod staleness;
pub mod toolchain;

use std::io;
use std::path::PathBuf;

use crate::deps::ListingError;
use crate::error::ErrorCode;
use crate::lock::LockError;

pub use driver::{BuildDriver, BuildOutcome, clean_build_dir};
pub use layout::{SNAPSHOT_FILE, TargetLayout};
pub use staleness::{BuildState, RebuildReason, Staleness, compile_units, listed_files};
pub use toolchain::{BuildProfile, CompilerChoice, DmdToolchain, Phase, Toolchain};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid build configuration: {0}")]
    Config(String),

    #[error("{phase} failed ({status})")]
    ToolFailed { phase: Phase, status: String },

    #[error("{phase} failed: could not run {program}: {source}")]
    Spawn {
        phase: Phase,
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("compiler did not produce a dependency snapshot at {}", .path.display())]
    MissingSnapshot { path: PathBuf },

    #[error(transparent)]
    Listing(#[from] ListingError),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Lock(#[from] LockError),
}

impl BuildError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::ToolFailed { phase, .. } | Self::Spawn { phase, .. } => match phase {
                Phase::Dependencies => ErrorCode::DependencyGenerationFailed,
                Phase::Compile => ErrorCode::CompilationFailed,
                Phase::Link => ErrorCode::LinkFailed,
            },
            Self::MissingSnapshot { .. } => ErrorCode::SnapshotMissing,
            Self::Listing(err) => err.code(),
            Self::Io { .. } => ErrorCode::WorkspaceIo,
            Self::Lock(err) => err.code(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
