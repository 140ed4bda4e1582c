//! "Who depends on X?": restrict a graph to the importers of seed modules.
//!
//! Marks propagate backwards along import edges one layer per pass: a pass
//! marks every unmarked node that directly imports a node marked before the
//! pass began. Evaluating against the previous layer keeps the hop bound
//! exact regardless of node order.

use tracing::{debug, instrument};

use super::ModuleGraph;

impl ModuleGraph {
    /// Keep only `seeds` and the nodes that import one of them, directly or
    /// transitively within `depth` hops (`0` = unbounded).
    ///
    /// Seeds missing from the graph are ignored; if none is present the
    /// result is empty. Ids, node order and existing cycle annotations are
    /// preserved.
    #[must_use]
    #[instrument(skip(self, seeds), fields(seeds = seeds.len()))]
    pub fn retain_importers<S: AsRef<str>>(&self, seeds: &[S], depth: usize) -> Self {
        let mut marked = vec![false; self.node_count()];
        for seed in seeds {
            if let Some(idx) = self.index_of(seed.as_ref()) {
                marked[idx.index()] = true;
            }
        }

        let mut passes = 0;
        while depth == 0 || passes < depth {
            let layer: Vec<usize> = self
                .nodes
                .iter()
                .enumerate()
                .filter(|(i, node)| {
                    !marked[*i] && node.adjacency.iter().any(|t| marked[t.index()])
                })
                .map(|(i, _)| i)
                .collect();
            passes += 1;
            if layer.is_empty() {
                break;
            }
            for i in layer {
                marked[i] = true;
            }
        }

        let pruned = self.retain_nodes(&marked);
        debug!(
            passes,
            kept = pruned.node_count(),
            total = self.node_count(),
            "restricted graph to importers"
        );
        pruned
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{Granularity, ModuleGraph};

    fn chain() -> ModuleGraph {
        let mut graph = ModuleGraph::new(Granularity::Module);
        graph.add_import("A", "B");
        graph.add_import("B", "C");
        graph.add_import("C", "D");
        graph
    }

    fn names(graph: &ModuleGraph) -> Vec<&str> {
        graph.nodes().map(|n| n.name()).collect()
    }

    #[test]
    fn unbounded_marks_whole_chain() {
        let pruned = chain().retain_importers(&["D"], 0);
        assert_eq!(names(&pruned), vec!["A", "B", "C", "D"]);
        assert_eq!(pruned.edge_count(), 3);
    }

    #[test]
    fn depth_one_marks_direct_importers_only() {
        let pruned = chain().retain_importers(&["D"], 1);
        assert_eq!(names(&pruned), vec!["C", "D"]);
        assert!(pruned.has_edge("C", "D"));
        assert_eq!(pruned.edge_count(), 1);
    }

    #[test]
    fn depth_two_marks_two_layers() {
        let pruned = chain().retain_importers(&["D"], 2);
        assert_eq!(names(&pruned), vec!["B", "C", "D"]);
    }

    #[test]
    fn depth_is_exact_when_importers_are_created_last() {
        // Creation order C, D, B, A: a single in-place sweep would reach A.
        let mut graph = ModuleGraph::new(Granularity::Module);
        graph.add_import("C", "D");
        graph.add_import("B", "C");
        graph.add_import("A", "B");

        let one = graph.retain_importers(&["D"], 1);
        assert_eq!(names(&one), vec!["C", "D"]);
        assert_eq!(one.edge_count(), 1);

        let two = graph.retain_importers(&["D"], 2);
        assert_eq!(names(&two), vec!["C", "D", "B"]);
    }

    #[test]
    fn ids_survive_pruning() {
        let pruned = chain().retain_importers(&["D"], 1);
        let ids: Vec<usize> = pruned.nodes().map(|n| n.id()).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn missing_seed_yields_empty_graph() {
        let pruned = chain().retain_importers(&["nope"], 0);
        assert!(pruned.is_empty());
    }

    #[test]
    fn edges_to_unmarked_nodes_are_pruned() {
        let mut graph = chain();
        graph.add_import("B", "X");
        let pruned = graph.retain_importers(&["D"], 0);
        assert!(pruned.get("X").is_none());
        assert_eq!(pruned.imports_of("B"), vec!["C"]);
    }

    #[test]
    fn terminates_on_cycles() {
        let mut graph = ModuleGraph::new(Granularity::Module);
        graph.add_import("a", "b");
        graph.add_import("b", "a");
        graph.add_import("b", "t");
        graph.add_import("u", "v");
        let pruned = graph.retain_importers(&["t"], 0);
        assert_eq!(names(&pruned), vec!["a", "b", "t"]);
    }
}
