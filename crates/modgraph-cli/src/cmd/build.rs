//! `modgraph build` — incrementally compile and link one D program.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, ValueEnum};
use modgraph_core::build::{
    BuildDriver, BuildError, BuildOutcome, BuildProfile, CompilerChoice, DmdToolchain,
    TargetLayout, clean_build_dir,
};
use modgraph_core::config::{BuildConfig, load_project_config};
use modgraph_core::lock::TargetLock;
use tracing::info;

/// Target name that removes the whole build directory.
const CLEAN_TARGET: &str = "clean";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompilerArg {
    Dmd,
    Ldc,
    Gdc,
}

impl From<CompilerArg> for CompilerChoice {
    fn from(arg: CompilerArg) -> Self {
        match arg {
            CompilerArg::Dmd => Self::Dmd,
            CompilerArg::Ldc => Self::Ldc,
            CompilerArg::Gdc => Self::Gdc,
        }
    }
}

/// Arguments for `modgraph build`.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Root source file (`name.d`), or `clean` to delete the build directory.
    pub target: String,

    /// Empty the target's working directory before building.
    #[arg(long)]
    pub clean: bool,

    /// Optimized build without unittests and debug code.
    #[arg(long)]
    pub release: bool,

    /// Compiler front end to drive.
    #[arg(long, value_enum)]
    pub compiler: Option<CompilerArg>,

    /// Override the build directory from modgraph.toml.
    #[arg(long, value_name = "DIR")]
    pub build_dir: Option<PathBuf>,
}

impl BuildArgs {
    /// Apply command-line overrides to the configured values.
    fn apply(&self, mut config: BuildConfig) -> BuildConfig {
        if self.release {
            config.profile = BuildProfile::Release;
        }
        if let Some(compiler) = self.compiler {
            config.compiler = compiler.into();
            config.compiler_path = None;
        }
        if let Some(dir) = &self.build_dir {
            config.build_dir = Some(dir.clone());
        }
        config
    }
}

/// Execute `modgraph build`.
pub fn run_build(args: &BuildArgs, project_root: &Path) -> anyhow::Result<()> {
    let project = load_project_config(project_root)?;
    let config = args.apply(project.build);
    let build_dir = config.resolved_build_dir();

    if args.target == CLEAN_TARGET {
        if clean_build_dir(&build_dir)? {
            println!("Removed {}", build_dir.display());
        } else {
            println!("Nothing to clean at {}", build_dir.display());
        }
        return Ok(());
    }

    let layout = TargetLayout::for_root(
        Path::new(&args.target),
        &build_dir,
        &project_root.join(&config.exe_dir),
    )?;

    let lock = TargetLock::acquire(
        &layout.lock_path(),
        Duration::from_millis(config.lock_timeout_ms),
    )
    .map_err(BuildError::from)?;

    let toolchain = DmdToolchain::new(config.resolved_compiler(), config.profile)
        .with_extra_flags(config.extra_flags.clone())
        .with_response_dir(config.response_files.then(|| layout.target_dir.clone()))
        .with_work_dir(project_root);
    let filter = project.analyze.module_filter();

    let outcome = BuildDriver::new(&layout, &filter, project_root, toolchain)
        .force_clean(args.clean)
        .run()
        .with_context(|| format!("build of {} failed", args.target))?;
    lock.release();

    match outcome {
        BuildOutcome::UpToDate => {
            println!("{} is up to date", layout.artifact.display());
        }
        BuildOutcome::Built {
            sources, objects, ..
        } => {
            info!(sources, objects, "build finished");
            println!("Built {}", layout.artifact.display());
        }
    }
    Ok(())
}
