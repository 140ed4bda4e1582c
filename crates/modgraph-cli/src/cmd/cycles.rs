//! `modgraph cycles` — list import cycles (strongly connected components).

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use modgraph_core::config::load_project_config;
use modgraph_core::graph::detect_cycles;
use serde::Serialize;

use super::FilterArgs;
use crate::output::{OutputMode, render};

/// Arguments for `modgraph cycles`.
#[derive(Args, Debug)]
pub struct CyclesArgs {
    /// Dependency listing written by the compiler (`-deps=<file>`).
    pub depfile: PathBuf,

    /// Emit JSON instead of human-readable text.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Debug, Serialize)]
struct CyclesOutput {
    /// Strongly connected components, singletons included.
    components: usize,
    cycles: Vec<CycleEntry>,
}

#[derive(Debug, Serialize)]
struct CycleEntry {
    id: usize,
    members: Vec<String>,
}

/// Execute `modgraph cycles`.
pub fn run_cycles(args: &CyclesArgs, project_root: &Path) -> anyhow::Result<()> {
    let config = load_project_config(project_root)?;
    let mut graph = args.filter.load_graph(&args.depfile, &config.analyze)?;
    let report = detect_cycles(&mut graph);

    let payload = CyclesOutput {
        components: report.components.len(),
        cycles: report
            .cycle_names(&graph)
            .into_iter()
            .enumerate()
            .map(|(id, members)| CycleEntry {
                id,
                members: members.into_iter().map(ToString::to_string).collect(),
            })
            .collect(),
    };

    render(OutputMode::from_json_flag(args.json), &payload, render_cycles_human)
}

fn render_cycles_human(payload: &CyclesOutput, w: &mut dyn Write) -> std::io::Result<()> {
    if payload.cycles.is_empty() {
        writeln!(w, "No import cycles found.")?;
        return Ok(());
    }

    writeln!(w, "Import cycles ({})", payload.cycles.len())?;
    for cycle in &payload.cycles {
        writeln!(w, "\nCycle {}:", cycle.id)?;
        for member in &cycle.members {
            writeln!(w, "  - {member}")?;
        }
    }
    Ok(())
}
