pub mod build;
pub mod cycles;
pub mod graph;

use std::path::Path;

use clap::Args;
use modgraph_core::build::BuildError;
use modgraph_core::config::{AnalyzeConfig, ConfigError};
use modgraph_core::deps::{ListingError, read_listing};
use modgraph_core::error::ErrorCode;
use modgraph_core::filter::ModuleFilter;
use modgraph_core::graph::{Granularity, ModuleGraph};
use modgraph_core::lock::LockError;
use tracing::debug;

use crate::output::CliError;

/// Invalid combination of command-line arguments.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct UsageError(pub String);

/// Module selection shared by `graph` and `cycles`.
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// Leave out modules matching PATTERN (`name` or `package.`).
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Only keep modules matching PATTERN.
    #[arg(long = "include", value_name = "PATTERN")]
    pub include: Vec<String>,

    /// Do not ignore `object`, `std.`, `core.` and `tango.` by default.
    #[arg(long)]
    pub no_default_ignores: bool,

    /// Collapse modules into their packages.
    #[arg(long)]
    pub packages: bool,

    /// Only keep MODULE and the modules importing it (repeatable).
    #[arg(long = "imports", value_name = "MODULE")]
    pub imports: Vec<String>,

    /// Limit `--imports` to N hops (0 = unlimited).
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub depth: usize,
}

impl FilterArgs {
    /// Combine config file patterns with command-line patterns.
    pub fn module_filter(&self, config: &AnalyzeConfig) -> ModuleFilter {
        ModuleFilter::new(config.default_ignores && !self.no_default_ignores)
            .with_ignores(config.ignore.iter().chain(&self.exclude).cloned())
            .with_includes(config.include.iter().chain(&self.include).cloned())
    }

    pub const fn granularity(&self) -> Granularity {
        if self.packages {
            Granularity::Package
        } else {
            Granularity::Module
        }
    }

    /// Read `depfile` and build the selected graph, without cycle annotations.
    pub fn load_graph(&self, depfile: &Path, config: &AnalyzeConfig) -> anyhow::Result<ModuleGraph> {
        if self.depth > 0 && self.imports.is_empty() {
            return Err(UsageError("--depth requires --imports".to_string()).into());
        }

        let edges = read_listing(depfile)?;
        let filter = self.module_filter(config);
        let graph = ModuleGraph::from_edges(&edges, &filter, self.granularity());
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "graph built"
        );

        if self.imports.is_empty() {
            return Ok(graph);
        }
        Ok(graph.retain_importers(&self.imports, self.depth))
    }
}

/// Machine code for the first error in the chain that carries one.
pub fn error_code(err: &anyhow::Error) -> Option<ErrorCode> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<BuildError>() {
            Some(e.code())
        } else if let Some(e) = cause.downcast_ref::<ListingError>() {
            Some(e.code())
        } else if let Some(e) = cause.downcast_ref::<LockError>() {
            Some(e.code())
        } else if let Some(e) = cause.downcast_ref::<ConfigError>() {
            Some(e.code())
        } else if cause.downcast_ref::<UsageError>().is_some() {
            Some(ErrorCode::ConfigInvalid)
        } else {
            None
        }
    })
}

/// Operator-facing form of a command failure.
pub fn cli_error(err: &anyhow::Error) -> CliError {
    let error = CliError::new(format!("{err:#}"));
    match error_code(err) {
        Some(code) => error.with_code(code),
        None => error,
    }
}
