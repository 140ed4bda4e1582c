//! Compiler invocation behind the [`Toolchain`] seam.
//!
//! The driver only ever asks for three things: emit a dependency listing,
//! compile a set of sources into an object directory, and link objects into
//! an executable. [`DmdToolchain`] does this with any dmd-compatible driver
//! (`dmd`, `ldmd2`, `gdmd`); tests substitute a fake.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::BuildError;

/// Build step that invoked the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Dependencies,
    Compile,
    Link,
}

impl Phase {
    /// Short name used for response files (`dep.rsp`, `compile.rsp`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dependencies => "dep",
            Self::Compile => "compile",
            Self::Link => "link",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dependencies => write!(f, "dependency generation"),
            Self::Compile => write!(f, "compilation"),
            Self::Link => write!(f, "linking"),
        }
    }
}

/// Which D compiler front end to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerChoice {
    #[default]
    Dmd,
    Ldc,
    Gdc,
}

impl CompilerChoice {
    /// dmd-compatible driver binary for this compiler.
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::Dmd => "dmd",
            Self::Ldc => "ldmd2",
            Self::Gdc => "gdmd",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildProfile {
    #[default]
    Debug,
    Release,
}

impl BuildProfile {
    #[must_use]
    pub const fn flags(self) -> &'static [&'static str] {
        match self {
            Self::Debug => &["-gc", "-unittest", "-debug"],
            Self::Release => &["-gc", "-inline", "-release", "-O"],
        }
    }
}

/// The external compiler, as seen by the build driver.
pub trait Toolchain {
    /// Write the dependency listing for `root` to `snapshot` without
    /// producing objects.
    ///
    /// # Errors
    ///
    /// Fails with a [`Phase::Dependencies`] error if the compiler fails.
    fn emit_dependencies(
        &mut self,
        root: &Path,
        obj_dir: &Path,
        snapshot: &Path,
    ) -> Result<(), BuildError>;

    /// Compile every file in `sources` into `obj_dir`.
    ///
    /// # Errors
    ///
    /// Fails with a [`Phase::Compile`] error if the compiler fails.
    fn compile(&mut self, sources: &[PathBuf], obj_dir: &Path) -> Result<(), BuildError>;

    /// Link `objects` into `artifact`.
    ///
    /// # Errors
    ///
    /// Fails with a [`Phase::Link`] error if the linker fails.
    fn link(&mut self, objects: &[PathBuf], artifact: &Path) -> Result<(), BuildError>;
}

/// A dmd-style command-line compiler.
#[derive(Debug, Clone)]
pub struct DmdToolchain {
    program: PathBuf,
    profile: BuildProfile,
    extra_flags: Vec<String>,
    /// Directory for `<phase>.rsp` files; `None` passes arguments directly.
    response_dir: Option<PathBuf>,
    /// Compiler working directory; `None` inherits ours.
    work_dir: Option<PathBuf>,
}

impl DmdToolchain {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, profile: BuildProfile) -> Self {
        Self {
            program: program.into(),
            profile,
            extra_flags: Vec::new(),
            response_dir: None,
            work_dir: None,
        }
    }

    #[must_use]
    pub fn with_extra_flags(mut self, flags: Vec<String>) -> Self {
        self.extra_flags = flags;
        self
    }

    #[must_use]
    pub fn with_response_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.response_dir = dir;
        self
    }

    /// Run the compiler from `dir`. Relative source paths in the listing it
    /// writes are relative to this directory, so it should match the
    /// driver's work root.
    #[must_use]
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Full argument list for one phase: profile flags, extra flags, then
    /// the phase's own arguments.
    fn arguments(&self, phase_args: Vec<String>) -> Vec<String> {
        let mut args: Vec<String> = self.profile.flags().iter().map(ToString::to_string).collect();
        args.extend(self.extra_flags.iter().cloned());
        args.extend(phase_args);
        args
    }

    #[instrument(skip(self, phase_args), fields(program = %self.program.display()))]
    fn invoke(&self, phase: Phase, phase_args: Vec<String>) -> Result<(), BuildError> {
        let args = self.arguments(phase_args);
        let mut command = Command::new(&self.program);
        if let Some(dir) = &self.work_dir {
            command.current_dir(dir);
        }
        match &self.response_dir {
            Some(dir) => {
                let rsp = dir.join(format!("{}.rsp", phase.as_str()));
                write_response_file(&rsp, &args)?;
                command.arg(format!("@{}", rsp.display()));
            }
            None => {
                command.args(&args);
            }
        }

        debug!(?command, "running compiler");
        let status = command.status().map_err(|source| BuildError::Spawn {
            phase,
            program: self.program.display().to_string(),
            source,
        })?;
        if !status.success() {
            return Err(BuildError::ToolFailed {
                phase,
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

impl Toolchain for DmdToolchain {
    fn emit_dependencies(
        &mut self,
        root: &Path,
        obj_dir: &Path,
        snapshot: &Path,
    ) -> Result<(), BuildError> {
        info!("Getting dependencies...");
        self.invoke(
            Phase::Dependencies,
            vec![
                root.display().to_string(),
                "-oq".to_string(),
                format!("-od{}", obj_dir.display()),
                "-o-".to_string(),
                format!("-deps={}", snapshot.display()),
            ],
        )
    }

    fn compile(&mut self, sources: &[PathBuf], obj_dir: &Path) -> Result<(), BuildError> {
        info!(files = sources.len(), "Compiling...");
        let mut args = vec![
            "-oq".to_string(),
            format!("-od{}", obj_dir.display()),
            "-c".to_string(),
        ];
        args.extend(sources.iter().map(|p| p.display().to_string()));
        self.invoke(Phase::Compile, args)
    }

    fn link(&mut self, objects: &[PathBuf], artifact: &Path) -> Result<(), BuildError> {
        // Linking separately: combining -oq/-od with -of confuses dmd.
        info!(objects = objects.len(), "Linking...");
        let mut args = vec![format!("-of{}", artifact.display())];
        args.extend(objects.iter().map(|p| p.display().to_string()));
        self.invoke(Phase::Link, args)
    }
}

/// Write one argument per line, as dmd expects in `@file` arguments.
fn write_response_file(path: &Path, args: &[String]) -> Result<(), BuildError> {
    let io_err = |source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::File::create(path).map_err(io_err)?;
    for arg in args {
        writeln!(file, "{arg}").map_err(io_err)?;
    }
    Ok(())
}
