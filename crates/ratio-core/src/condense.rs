use crate::bipartite::BipartiteGraph;
use crate::id::*;
use crate::scc::SccInfo;
use slotmap::{SecondaryMap, SlotMap};
use std::collections::{HashMap, VecDeque};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while ordering the condensed graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("cycle detected in condensed graph")]
    CycleDetected,
}

// ---------------------------------------------------------------------------
// Core data structures
// ---------------------------------------------------------------------------

/// A node of the condensed DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondensedNode {
    /// Index into the SCC list the graph was condensed with.
    Scc(usize),
    Item(ItemId),
    Recipe(RecipeId),
}

/// The bipartite graph with every SCC collapsed into a single node.
///
/// Nodes are inserted SCCs first (in detection order), then items outside
/// any SCC, then recipes outside any SCC. Nothing is ever removed, so
/// slotmap iteration follows insertion order.
#[derive(Debug, Default)]
pub struct CondensedGraph {
    nodes: SlotMap<CondensedId, CondensedNode>,
    /// Distinct successors per node, in first-seen edge order.
    outputs: SecondaryMap<CondensedId, Vec<CondensedId>>,
    edge_count: usize,
}

impl CondensedGraph {
    pub fn build(graph: &BipartiteGraph, sccs: &[SccInfo]) -> Self {
        let mut condensed = Self::default();
        let mut lookup: HashMap<NodeKey, CondensedId> = HashMap::new();

        for (index, scc) in sccs.iter().enumerate() {
            let id = condensed.add_node(CondensedNode::Scc(index));
            for &item in &scc.items {
                lookup.insert(NodeKey::Item(item), id);
            }
            for &recipe in &scc.recipes {
                lookup.insert(NodeKey::Recipe(recipe), id);
            }
        }
        for node in graph.item_nodes() {
            let key = NodeKey::Item(node.item);
            if !lookup.contains_key(&key) {
                let id = condensed.add_node(CondensedNode::Item(node.item));
                lookup.insert(key, id);
            }
        }
        for node in graph.recipe_nodes() {
            let key = NodeKey::Recipe(node.recipe);
            if !lookup.contains_key(&key) {
                let id = condensed.add_node(CondensedNode::Recipe(node.recipe));
                lookup.insert(key, id);
            }
        }

        let consume = graph
            .consumption_edges()
            .map(|(i, r)| (NodeKey::Item(i), NodeKey::Recipe(r)));
        let produce = graph
            .production_edges()
            .map(|(r, i)| (NodeKey::Recipe(r), NodeKey::Item(i)));
        for (from, to) in consume.chain(produce) {
            if let (Some(&a), Some(&b)) = (lookup.get(&from), lookup.get(&to)) {
                condensed.connect(a, b);
            }
        }

        condensed
    }

    fn add_node(&mut self, node: CondensedNode) -> CondensedId {
        let id = self.nodes.insert(node);
        self.outputs.insert(id, Vec::new());
        id
    }

    /// Add `from -> to` unless it is a self edge or already present.
    fn connect(&mut self, from: CondensedId, to: CondensedId) {
        if from == to {
            return;
        }
        if let Some(out) = self.outputs.get_mut(from) {
            if !out.contains(&to) {
                out.push(to);
                self.edge_count += 1;
            }
        }
    }

    pub fn get_node(&self, id: CondensedId) -> Option<CondensedNode> {
        self.nodes.get(id).copied()
    }

    pub fn get_outputs(&self, id: CondensedId) -> &[CondensedId] {
        self.outputs.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn nodes(&self) -> impl Iterator<Item = (CondensedId, CondensedNode)> + '_ {
        self.nodes.iter().map(|(id, &node)| (id, node))
    }

    /// Kahn's algorithm with a FIFO queue seeded in node insertion order.
    pub fn topological_order(&self) -> Result<Vec<CondensedId>, GraphError> {
        let mut in_degree: SecondaryMap<CondensedId, usize> = SecondaryMap::new();
        for (id, _) in &self.nodes {
            in_degree.insert(id, 0);
        }
        for (_, outs) in &self.outputs {
            for &dest in outs {
                if let Some(deg) = in_degree.get_mut(dest) {
                    *deg += 1;
                }
            }
        }

        let mut queue: VecDeque<CondensedId> = in_degree
            .iter()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(id, _)| id)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &dest in self.get_outputs(node) {
                if let Some(deg) = in_degree.get_mut(dest) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(dest);
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            return Err(GraphError::CycleDetected);
        }
        Ok(order)
    }

    /// Node kinds along the topological order.
    pub fn ordered_nodes(&self) -> Result<Vec<CondensedNode>, GraphError> {
        Ok(self
            .topological_order()?
            .into_iter()
            .filter_map(|id| self.get_node(id))
            .collect())
    }
}
