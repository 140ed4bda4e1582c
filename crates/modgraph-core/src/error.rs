use std::fmt;

/// Machine-readable error codes for scripts and CI wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalid,
    ConfigParse,
    MalformedListing,
    ListingUnreadable,
    DependencyGenerationFailed,
    CompilationFailed,
    LinkFailed,
    SnapshotMissing,
    WorkspaceIo,
    LockContention,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigInvalid => "E1001",
            Self::ConfigParse => "E1002",
            Self::MalformedListing => "E2001",
            Self::ListingUnreadable => "E2002",
            Self::DependencyGenerationFailed => "E3001",
            Self::CompilationFailed => "E3002",
            Self::LinkFailed => "E3003",
            Self::SnapshotMissing => "E3004",
            Self::WorkspaceIo => "E5001",
            Self::LockContention => "E5002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigInvalid => "Invalid or conflicting arguments",
            Self::ConfigParse => "Config file parse error",
            Self::MalformedListing => "Malformed dependency listing",
            Self::ListingUnreadable => "Dependency listing unreadable",
            Self::DependencyGenerationFailed => "Compiler failed to emit dependencies",
            Self::CompilationFailed => "Compilation failed",
            Self::LinkFailed => "Linking failed",
            Self::SnapshotMissing => "Dependency snapshot missing after regeneration",
            Self::WorkspaceIo => "Target directory I/O failed",
            Self::LockContention => "Lock contention",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigInvalid => Some("Check the command line; see `modgraph --help`."),
            Self::ConfigParse => Some("Fix syntax in modgraph.toml and retry."),
            Self::MalformedListing => {
                Some("Regenerate the listing with the compiler's -deps option; do not edit it.")
            }
            Self::ListingUnreadable => Some("Check that the dependency file exists and is readable."),
            Self::DependencyGenerationFailed => {
                Some("Fix the compiler errors above, then rerun the build.")
            }
            Self::CompilationFailed => Some("Fix the compiler errors above, then rerun the build."),
            Self::LinkFailed => Some("Check linker flags and missing symbols, then rerun the build."),
            Self::SnapshotMissing => {
                Some("Verify the compiler supports -deps=<file>; run `modgraph build clean`.")
            }
            Self::WorkspaceIo => Some("Check disk space and write permissions."),
            Self::LockContention => {
                Some("Another build of this target is running; retry after it finishes.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
