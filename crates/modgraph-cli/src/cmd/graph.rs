//! `modgraph graph` — render the import graph in graphviz format.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use modgraph_core::config::load_project_config;
use modgraph_core::graph::{ExportFilter, ExportSummary, ModuleGraph, detect_cycles, write_dot};
use tracing::info;

use super::FilterArgs;

/// Arguments for `modgraph graph`.
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Dependency listing written by the compiler (`-deps=<file>`).
    pub depfile: PathBuf,

    /// Output file, or `-` for stdout.
    pub output: PathBuf,

    /// Only show modules that are part of an import cycle.
    #[arg(long)]
    pub cycles_only: bool,

    /// Only show edges between members of the same cycle.
    #[arg(long)]
    pub cycle_edges_only: bool,

    #[command(flatten)]
    pub filter: FilterArgs,
}

impl GraphArgs {
    const fn export_filter(&self) -> ExportFilter {
        ExportFilter {
            cycles_only: self.cycles_only,
            cycle_edges_only: self.cycle_edges_only,
        }
    }
}

/// Execute `modgraph graph`.
pub fn run_graph(args: &GraphArgs, project_root: &Path) -> anyhow::Result<()> {
    let config = load_project_config(project_root)?;
    let mut graph = args.filter.load_graph(&args.depfile, &config.analyze)?;
    let report = detect_cycles(&mut graph);

    let written = if args.output == Path::new("-") {
        let stdout = io::stdout();
        emit(&graph, args.export_filter(), &mut stdout.lock())
    } else {
        let file = File::create(&args.output)
            .with_context(|| format!("failed to create {}", args.output.display()))?;
        emit(&graph, args.export_filter(), &mut BufWriter::new(file))
    };
    let summary = written.with_context(|| format!("failed to write {}", args.output.display()))?;

    info!(
        nodes = summary.nodes,
        edges = summary.edges,
        cycles = report.cycle_count(),
        "wrote graph"
    );
    Ok(())
}

fn emit<W: Write>(graph: &ModuleGraph, filter: ExportFilter, w: &mut W) -> io::Result<ExportSummary> {
    let summary = write_dot(graph, filter, w)?;
    w.flush()?;
    Ok(summary)
}
