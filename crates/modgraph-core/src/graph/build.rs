//! Graph construction from parsed dependency edges.
//!
//! [`ModuleGraph::add_edge`] is the only mutator of the edge set. It is called
//! once per surviving listing line, in file order, which fixes node ids and
//! adjacency order for everything downstream.
//!
//! ## Package granularity
//!
//! In [`Granularity::Package`] mode each module is replaced by its package
//! (the name minus its last dotted segment). Modules without a dot belong to
//! [`ROOT_PACKAGE`]. Imports between modules of the same package collapse to
//! a self-loop and are dropped.
//!
//! ## Self-loops
//!
//! Self-loops are never inserted, in either mode. Single-node components are
//! therefore never cycles, and the cycle detector relies on that.

use tracing::{debug, instrument};

use super::ModuleGraph;
use crate::deps::DependencyEdge;
use crate::filter::ModuleFilter;

/// Synthetic package for modules whose name has no dot.
pub const ROOT_PACKAGE: &str = "(root)";

/// Whether nodes stand for modules or for packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    #[default]
    Module,
    Package,
}

/// Package containing `module`: everything before the last `.`.
#[must_use]
pub fn package_of(module: &str) -> &str {
    module.rsplit_once('.').map_or(ROOT_PACKAGE, |(package, _)| package)
}

impl ModuleGraph {
    /// Build a graph from `edges`, dropping edges with an excluded endpoint.
    #[instrument(skip_all, fields(edges = edges.len(), granularity = ?granularity))]
    pub fn from_edges(
        edges: &[DependencyEdge],
        filter: &ModuleFilter,
        granularity: Granularity,
    ) -> Self {
        let mut graph = Self::new(granularity);
        let mut filtered = 0usize;
        for edge in edges {
            if filter.admits_edge(&edge.from_module, &edge.to_module) {
                graph.add_edge(edge);
            } else {
                filtered += 1;
            }
        }
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            filtered,
            "built import graph"
        );
        graph
    }

    /// Record one parsed dependency. Returns `true` if a new edge was added.
    pub fn add_edge(&mut self, edge: &DependencyEdge) -> bool {
        self.add_import(&edge.from_module, &edge.to_module)
    }

    /// Record that module `from` imports module `to`, applying package
    /// collapsing. Returns `true` if a new edge was added.
    pub fn add_import(&mut self, from: &str, to: &str) -> bool {
        let (from, to) = match self.granularity() {
            Granularity::Module => (from, to),
            Granularity::Package => (package_of(from), package_of(to)),
        };
        if from == to {
            return false;
        }
        let source = self.get_or_insert(from);
        let target = self.get_or_insert(to);
        self.nodes[source.index()].link(target)
    }
}
