//! Import graph over modules or packages.
//!
//! # Overview
//!
//! The graph is built from a parsed dependency listing and then analyzed in
//! place:
//!
//! ```text
//! Vec<DependencyEdge>
//!        ↓  ModuleGraph::from_edges()     (filter, package collapsing, dedup)
//! ModuleGraph
//!        ↓  ModuleGraph::retain_importers() (optional: who imports X?)
//! ModuleGraph
//!        ↓  cycles::detect_cycles()         (Tarjan SCC, assigns CycleIds)
//! ModuleGraph (annotated)
//!        ↓  export::write_dot()
//! digraph text
//! ```
//!
//! ## Determinism
//!
//! Nodes are stored in creation order and adjacency lists in first-seen edge
//! order. Every traversal walks these vectors, never a hash map, so the same
//! listing always yields the same node ids, cycle ids and output bytes.
//!
//! ## Edge Direction
//!
//! An edge `A → B` means "A imports B".

pub mod build;
pub mod cycles;
pub mod export;
pub mod reach;

use std::collections::{HashMap, HashSet};
use std::fmt;

pub use build::{Granularity, ROOT_PACKAGE, package_of};
pub use cycles::{CycleReport, detect_cycles, strongly_connected_components};
pub use export::{ExportFilter, ExportSummary, to_dot, write_dot};

/// Position of a node inside one [`ModuleGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl NodeIndex {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Identifier of one import cycle. The first cycle found is `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CycleId(pub usize);

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One module (or package) in the import graph.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    id: usize,
    adjacency: Vec<NodeIndex>,
    targets: HashSet<NodeIndex>,
    cycle: Option<CycleId>,
}

impl Node {
    fn new(name: String, id: usize) -> Self {
        Self {
            name,
            id,
            adjacency: Vec::new(),
            targets: HashSet::new(),
            cycle: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Output id, assigned on first creation and kept through pruning.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Imported nodes, in first-seen order, without duplicates.
    pub fn adjacency(&self) -> &[NodeIndex] {
        &self.adjacency
    }

    #[must_use]
    pub const fn cycle(&self) -> Option<CycleId> {
        self.cycle
    }

    /// Append `target` unless already present. Returns `true` if added.
    fn link(&mut self, target: NodeIndex) -> bool {
        if !self.targets.insert(target) {
            return false;
        }
        self.adjacency.push(target);
        true
    }
}

/// Directed import graph keyed by module (or package) name.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    nodes: Vec<Node>,
    by_name: HashMap<String, NodeIndex>,
    granularity: Granularity,
    next_id: usize,
}

impl ModuleGraph {
    #[must_use]
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn granularity(&self) -> Granularity {
        self.granularity
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.adjacency.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Node indices in creation order.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + use<> {
        (0..self.nodes.len()).map(NodeIndex)
    }

    /// # Panics
    ///
    /// Panics if `idx` came from a different graph.
    #[must_use]
    pub fn node(&self, idx: NodeIndex) -> &Node {
        &self.nodes[idx.0]
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.index_of(name).map(|idx| self.node(idx))
    }

    /// Cycle id of the named node, `None` if absent or acyclic.
    #[must_use]
    pub fn cycle_of(&self, name: &str) -> Option<CycleId> {
        self.get(name).and_then(Node::cycle)
    }

    /// Returns `true` if `from` directly imports `to`.
    #[must_use]
    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.index_of(from), self.index_of(to)) {
            (Some(f), Some(t)) => self.nodes[f.0].targets.contains(&t),
            _ => false,
        }
    }

    /// Names of the nodes `name` imports, in adjacency order.
    #[must_use]
    pub fn imports_of(&self, name: &str) -> Vec<&str> {
        self.get(name)
            .map(|node| {
                node.adjacency
                    .iter()
                    .map(|&idx| self.node(idx).name())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Single get-or-insert primitive: at most one node per name.
    fn get_or_insert(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.by_name.get(name) {
            return idx;
        }
        let idx = NodeIndex(self.nodes.len());
        self.nodes.push(Node::new(name.to_string(), self.next_id));
        self.next_id += 1;
        self.by_name.insert(name.to_string(), idx);
        idx
    }

    fn set_cycle(&mut self, idx: NodeIndex, cycle: Option<CycleId>) {
        self.nodes[idx.0].cycle = cycle;
    }

    /// Copy of the graph restricted to nodes with `keep[i]`, preserving ids,
    /// order and cycle annotations. Edges to dropped nodes are removed.
    fn retain_nodes(&self, keep: &[bool]) -> Self {
        let mut remap: Vec<Option<NodeIndex>> = vec![None; self.nodes.len()];
        let mut kept = 0;
        for (old, slot) in remap.iter_mut().enumerate() {
            if keep[old] {
                *slot = Some(NodeIndex(kept));
                kept += 1;
            }
        }

        let mut nodes = Vec::with_capacity(kept);
        let mut by_name = HashMap::with_capacity(kept);
        for (old, node) in self.nodes.iter().enumerate() {
            let Some(new_idx) = remap[old] else {
                continue;
            };
            let mut copy = Node::new(node.name.clone(), node.id);
            copy.cycle = node.cycle;
            for target in node.adjacency.iter().filter_map(|t| remap[t.0]) {
                copy.link(target);
            }
            by_name.insert(node.name.clone(), new_idx);
            nodes.push(copy);
        }

        Self {
            nodes,
            by_name,
            granularity: self.granularity,
            next_id: self.next_id,
        }
    }
}
