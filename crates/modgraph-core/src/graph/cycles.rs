//! Import-cycle detection via Tarjan's strongly connected components.
//!
//! # Design
//!
//! - **Iterative**: the classic recursive `visit` is replayed on an explicit
//!   work stack of `(node, next adjacency index)` frames, so long import
//!   chains cannot overflow the thread stack.
//! - **Low-link sentinel**: when a component is popped, every member's
//!   low-link is raised to `node_count`, so finished components never lower
//!   another node's low-link. This stands in for the usual on-stack flag.
//! - **Deterministic**: roots are tried in node creation order and successors
//!   in adjacency order, so components come out in the same order every run.
//! - **Cycles are components with more than one member.** Self-loops never
//!   enter the graph (see [`super::build`]), so a singleton is never a cycle.
//!
//! O(V+E): every node is entered once and every edge inspected once.

use std::fmt;

use tracing::{debug, instrument};

use super::{CycleId, ModuleGraph, NodeIndex};

// ---------------------------------------------------------------------------
// CycleReport
// ---------------------------------------------------------------------------

/// Result of running cycle detection on a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Every strongly connected component, in discovery order. Members keep
    /// the order in which they were pushed on the Tarjan stack.
    pub components: Vec<Vec<NodeIndex>>,
}

impl CycleReport {
    /// Components with more than one member; the `n`-th one has `CycleId(n)`.
    pub fn cycles(&self) -> impl Iterator<Item = &[NodeIndex]> {
        self.components
            .iter()
            .filter(|c| c.len() > 1)
            .map(Vec::as_slice)
    }

    #[must_use]
    pub fn cycle_count(&self) -> usize {
        self.cycles().count()
    }

    /// Member names of each cycle, indexed by cycle id.
    #[must_use]
    pub fn cycle_names<'g>(&self, graph: &'g ModuleGraph) -> Vec<Vec<&'g str>> {
        self.cycles()
            .map(|members| members.iter().map(|&idx| graph.node(idx).name()).collect())
            .collect()
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} components, {} cycles",
            self.components.len(),
            self.cycle_count()
        )
    }
}

// ---------------------------------------------------------------------------
// Core detection
// ---------------------------------------------------------------------------

/// Compute SCCs and annotate every node with its cycle id.
///
/// Nodes in a component with more than one member get the id of that
/// component among cyclic components; all others are reset to `None`.
/// Running it twice yields the same annotations.
#[instrument(skip_all, fields(nodes = graph.node_count()))]
pub fn detect_cycles(graph: &mut ModuleGraph) -> CycleReport {
    let components = strongly_connected_components(graph);

    for idx in graph.node_indices() {
        graph.set_cycle(idx, None);
    }
    let mut next = 0;
    for component in components.iter().filter(|c| c.len() > 1) {
        for &member in component {
            graph.set_cycle(member, Some(CycleId(next)));
        }
        next += 1;
    }

    let report = CycleReport { components };
    debug!(%report, "cycle detection finished");
    report
}

/// Tarjan's SCC over `graph`, without touching annotations.
#[must_use]
pub fn strongly_connected_components(graph: &ModuleGraph) -> Vec<Vec<NodeIndex>> {
    let mut tarjan = Tarjan::new(graph.node_count());
    for root in graph.node_indices() {
        tarjan.run_from(graph, root);
    }
    tarjan.components
}

// ---------------------------------------------------------------------------
// Tarjan internals
// ---------------------------------------------------------------------------

/// One suspended `visit(node)` call.
#[derive(Debug, Clone, Copy)]
struct Frame {
    node: NodeIndex,
    /// Discovery index assigned on entry.
    num: usize,
    /// Height of the component stack when `node` was pushed.
    stack_pos: usize,
    /// Next adjacency entry to visit.
    next: usize,
}

struct Tarjan {
    /// `None` until a node is entered.
    low: Vec<Option<usize>>,
    entered: usize,
    stack: Vec<NodeIndex>,
    components: Vec<Vec<NodeIndex>>,
    /// Low-link given to members of finished components.
    sentinel: usize,
}

impl Tarjan {
    fn new(node_count: usize) -> Self {
        Self {
            low: vec![None; node_count],
            entered: 0,
            stack: Vec::new(),
            components: Vec::new(),
            sentinel: node_count,
        }
    }

    fn low(&self, node: NodeIndex) -> usize {
        self.low[node.index()].unwrap_or(self.sentinel)
    }

    fn lower(&mut self, node: NodeIndex, candidate: usize) {
        let current = self.low(node);
        self.low[node.index()] = Some(current.min(candidate));
    }

    fn enter(&mut self, node: NodeIndex) -> Frame {
        let num = self.entered;
        self.entered += 1;
        self.low[node.index()] = Some(num);
        let stack_pos = self.stack.len();
        self.stack.push(node);
        Frame {
            node,
            num,
            stack_pos,
            next: 0,
        }
    }

    fn run_from(&mut self, graph: &ModuleGraph, root: NodeIndex) {
        if self.low[root.index()].is_some() {
            return;
        }

        let first = self.enter(root);
        let mut work = vec![first];

        while let Some(top) = work.last_mut() {
            let node = top.node;
            if let Some(&succ) = graph.node(node).adjacency().get(top.next) {
                top.next += 1;
                if self.low[succ.index()].is_none() {
                    let frame = self.enter(succ);
                    work.push(frame);
                } else {
                    // Already entered: the recursive call would return at
                    // once, leaving only the low-link update.
                    let succ_low = self.low(succ);
                    self.lower(node, succ_low);
                }
                continue;
            }

            let Some(done) = work.pop() else { break };
            if self.low(done.node) == done.num {
                let component = self.stack.split_off(done.stack_pos);
                for &member in &component {
                    self.low[member.index()] = Some(self.sentinel);
                }
                self.components.push(component);
            }
            if let Some(parent) = work.last() {
                let child_low = self.low(done.node);
                self.lower(parent.node, child_low);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
