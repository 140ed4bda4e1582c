//! Graphviz `digraph` emission.
//!
//! ```text
//! digraph "a" {
//!   0 [label="app.main"];
//!   0 -> 1 [weight=0]
//!   1 [label="app.util [0]"];
//!   1 -> 2 [weight=1 color=red]
//! }
//! ```
//!
//! Nodes are written in id order, each followed by its outgoing edges.
//! Intra-cycle edges get `weight=1` and are drawn red so that dot keeps
//! cycle members close together.

use std::io::{self, Write};

use super::{ModuleGraph, Node};

/// Which parts of the graph to emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportFilter {
    /// Emit only nodes that belong to a cycle (and edges between them).
    pub cycles_only: bool,
    /// Emit only edges whose endpoints are in the same cycle.
    pub cycle_edges_only: bool,
}

/// Number of node and edge statements emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub nodes: usize,
    pub edges: usize,
}

impl ExportFilter {
    fn shows_node(self, node: &Node) -> bool {
        !self.cycles_only || node.cycle().is_some()
    }

    /// `Some(same_cycle)` if the edge is emitted.
    fn shows_edge(self, from: &Node, to: &Node) -> Option<bool> {
        if self.cycles_only && to.cycle().is_none() {
            return None;
        }
        let same_cycle = from.cycle().is_some() && from.cycle() == to.cycle();
        if self.cycle_edges_only && !same_cycle {
            return None;
        }
        Some(same_cycle)
    }
}

fn label(node: &Node) -> String {
    match node.cycle() {
        Some(cycle) => format!("{} [{cycle}]", node.name()),
        None => node.name().to_string(),
    }
}

impl ModuleGraph {
    /// Visible `(from, to, same_cycle)` edges leaving `node`.
    fn visible_edges<'a>(
        &'a self,
        node: &'a Node,
        filter: ExportFilter,
    ) -> impl Iterator<Item = (&'a Node, bool)> + 'a {
        node.adjacency().iter().filter_map(move |&idx| {
            let target = self.node(idx);
            filter.shows_edge(node, target).map(|same| (target, same))
        })
    }

    /// Counts [`write_dot`] would emit for `filter`, without rendering.
    #[must_use]
    pub fn visible_counts(&self, filter: ExportFilter) -> ExportSummary {
        let mut summary = ExportSummary::default();
        for node in self.nodes().filter(|n| filter.shows_node(n)) {
            summary.nodes += 1;
            summary.edges += self.visible_edges(node, filter).count();
        }
        summary
    }
}

/// Write `graph` as a `digraph` to `w`.
///
/// # Errors
///
/// Propagates write errors from `w`.
pub fn write_dot<W: Write>(
    graph: &ModuleGraph,
    filter: ExportFilter,
    w: &mut W,
) -> io::Result<ExportSummary> {
    let mut summary = ExportSummary::default();
    writeln!(w, "digraph \"a\" {{")?;
    for node in graph.nodes().filter(|n| filter.shows_node(n)) {
        writeln!(w, "  {} [label=\"{}\"];", node.id(), label(node))?;
        summary.nodes += 1;
        for (target, same_cycle) in graph.visible_edges(node, filter) {
            if same_cycle {
                writeln!(
                    w,
                    "  {} -> {} [weight=1 color=red]",
                    node.id(),
                    target.id()
                )?;
            } else {
                writeln!(w, "  {} -> {} [weight=0]", node.id(), target.id())?;
            }
            summary.edges += 1;
        }
    }
    writeln!(w, "}}")?;
    Ok(summary)
}

/// Render `graph` to a `String`.
///
/// # Errors
///
/// Propagates errors from [`write_dot`].
pub fn to_dot(graph: &ModuleGraph, filter: ExportFilter) -> io::Result<String> {
    let mut buf = Vec::new();
    write_dot(graph, filter, &mut buf)?;
    String::from_utf8(buf).map_err(io::Error::other)
}
