//! Optional project configuration (`modgraph.toml`).
//!
//! Every key has a default, so a missing file and an empty file behave the
//! same. Command-line flags are applied on top of the loaded values.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

use crate::build::{BuildProfile, CompilerChoice};
use crate::error::ErrorCode;
use crate::filter::ModuleFilter;

/// File name looked up in the project root.
pub const CONFIG_FILE: &str = "modgraph.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub analyze: AnalyzeConfig,
    #[serde(default)]
    pub build: BuildConfig,
}

/// Module filtering shared by `graph`, `cycles` and `build`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeConfig {
    /// Start from the runtime/standard-library ignore list.
    #[serde(default = "default_true")]
    pub default_ignores: bool,
    /// Additional ignore patterns (`name` or `prefix.`).
    #[serde(default)]
    pub ignore: Vec<String>,
    /// When non-empty, only modules matching one of these take part.
    #[serde(default)]
    pub include: Vec<String>,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            default_ignores: default_true(),
            ignore: Vec::new(),
            include: Vec::new(),
        }
    }
}

impl AnalyzeConfig {
    /// Build the filter described by this section.
    #[must_use]
    pub fn module_filter(&self) -> ModuleFilter {
        ModuleFilter::new(self.default_ignores)
            .with_ignores(self.ignore.iter().cloned())
            .with_includes(self.include.iter().cloned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Root of all per-target working directories. Defaults to
    /// `<user cache dir>/modgraph`.
    #[serde(default)]
    pub build_dir: Option<PathBuf>,
    /// Where linked executables go, relative to the project root.
    #[serde(default = "default_exe_dir")]
    pub exe_dir: PathBuf,
    #[serde(default)]
    pub compiler: CompilerChoice,
    /// Explicit compiler binary; overrides the one implied by `compiler`.
    #[serde(default)]
    pub compiler_path: Option<PathBuf>,
    #[serde(default)]
    pub profile: BuildProfile,
    /// Flags passed to every compiler invocation after the profile flags.
    #[serde(default = "default_extra_flags")]
    pub extra_flags: Vec<String>,
    /// Pass arguments through `<phase>.rsp` files instead of argv.
    #[serde(default = "default_true")]
    pub response_files: bool,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            build_dir: None,
            exe_dir: default_exe_dir(),
            compiler: CompilerChoice::default(),
            compiler_path: None,
            profile: BuildProfile::default(),
            extra_flags: default_extra_flags(),
            response_files: default_true(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl BuildConfig {
    /// Build directory, falling back to the user cache dir, then the system
    /// temp dir.
    #[must_use]
    pub fn resolved_build_dir(&self) -> PathBuf {
        if let Some(dir) = &self.build_dir {
            return dir.clone();
        }
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("modgraph")
    }

    /// Compiler binary to run.
    #[must_use]
    pub fn resolved_compiler(&self) -> PathBuf {
        self.compiler_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.compiler.program()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } => ErrorCode::WorkspaceIo,
            Self::Parse { .. } => ErrorCode::ConfigParse,
        }
    }
}

/// Load `modgraph.toml` from `project_root`, or defaults if absent.
///
/// # Errors
///
/// Fails if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig, ConfigError> {
    let path = project_root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;

    toml::from_str::<ProjectConfig>(&content).map_err(|source| ConfigError::Parse { path, source })
}

const fn default_true() -> bool {
    true
}

fn default_exe_dir() -> PathBuf {
    PathBuf::from("bin")
}

fn default_extra_flags() -> Vec<String> {
    vec!["-L-lz".to_string(), "-L-ldl".to_string()]
}

const fn default_lock_timeout_ms() -> u64 {
    2_000
}
