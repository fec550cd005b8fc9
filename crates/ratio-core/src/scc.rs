//! Strongly-connected components of the bipartite graph (iterative Tarjan).

use crate::bipartite::BipartiteGraph;
use crate::catalog::Catalog;
use crate::id::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A production cycle: an SCC with more than one member node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SccInfo {
    /// `scc-` followed by the sorted member item keys joined by `-`.
    pub id: String,
    /// Member items, in the order Tarjan popped them.
    pub items: Vec<ItemId>,
    pub recipes: Vec<RecipeId>,
    /// Inputs of member recipes that are not member items.
    pub external_inputs: Vec<ItemId>,
}

impl SccInfo {
    pub fn contains_item(&self, item: ItemId) -> bool {
        self.items.contains(&item)
    }

    pub fn contains_recipe(&self, recipe: RecipeId) -> bool {
        self.recipes.contains(&recipe)
    }
}

fn successor(graph: &BipartiteGraph, node: NodeKey, index: usize) -> Option<NodeKey> {
    match node {
        NodeKey::Item(item) => graph
            .consumers_of(item)
            .get(index)
            .map(|&r| NodeKey::Recipe(r)),
        NodeKey::Recipe(recipe) => graph
            .recipe_outputs(recipe)
            .get(index)
            .map(|&i| NodeKey::Item(i)),
    }
}

#[derive(Default)]
struct Tarjan {
    next_index: usize,
    index: HashMap<NodeKey, usize>,
    lowlink: HashMap<NodeKey, usize>,
    stack: Vec<NodeKey>,
    on_stack: HashSet<NodeKey>,
}

impl Tarjan {
    fn open(&mut self, node: NodeKey) {
        self.index.insert(node, self.next_index);
        self.lowlink.insert(node, self.next_index);
        self.next_index += 1;
        self.stack.push(node);
        self.on_stack.insert(node);
    }

    fn lower(&mut self, node: NodeKey, value: usize) {
        if let Some(low) = self.lowlink.get_mut(&node) {
            *low = (*low).min(value);
        }
    }

    /// Pop the component rooted at `root`, members in pop order.
    fn pop_component(&mut self, root: NodeKey) -> Vec<NodeKey> {
        let mut members = Vec::new();
        while let Some(w) = self.stack.pop() {
            self.on_stack.remove(&w);
            members.push(w);
            if w == root {
                break;
            }
        }
        members
    }
}

/// Detect production cycles. Roots are taken in item-node insertion order;
/// components are returned in the order Tarjan completes them.
pub fn detect_cycles(graph: &BipartiteGraph, catalog: &Catalog) -> Vec<SccInfo> {
    let mut t = Tarjan::default();
    let mut sccs = Vec::new();
    // (node, next successor index)
    let mut call: Vec<(NodeKey, usize)> = Vec::new();

    for root in graph.item_nodes().iter().map(|n| NodeKey::Item(n.item)) {
        if t.index.contains_key(&root) {
            continue;
        }
        t.open(root);
        call.push((root, 0));

        while let Some(frame) = call.last_mut() {
            let node = frame.0;
            if let Some(succ) = successor(graph, node, frame.1) {
                frame.1 += 1;
                match t.index.get(&succ) {
                    None => {
                        t.open(succ);
                        call.push((succ, 0));
                    }
                    Some(&succ_index) => {
                        if t.on_stack.contains(&succ) {
                            t.lower(node, succ_index);
                        }
                    }
                }
                continue;
            }

            call.pop();
            let low = t.lowlink.get(&node).copied().unwrap_or(usize::MAX);
            if let Some(&(parent, _)) = call.last() {
                t.lower(parent, low);
            }
            if t.index.get(&node) == Some(&low) {
                let members = t.pop_component(node);
                if members.len() > 1 {
                    sccs.push(describe(graph, catalog, &members));
                }
            }
        }
    }

    debug!(count = sccs.len(), "cycle detection finished");
    sccs
}

fn describe(graph: &BipartiteGraph, catalog: &Catalog, members: &[NodeKey]) -> SccInfo {
    let items: Vec<ItemId> = members.iter().filter_map(|k| k.as_item()).collect();
    let recipes: Vec<RecipeId> = members.iter().filter_map(|k| k.as_recipe()).collect();

    let mut external_inputs = Vec::new();
    for &recipe in &recipes {
        for &input in graph.recipe_inputs(recipe) {
            if !items.contains(&input) && !external_inputs.contains(&input) {
                external_inputs.push(input);
            }
        }
    }

    let mut keys: Vec<String> = items.iter().map(|&i| catalog.item_key(i)).collect();
    keys.sort();
    let id = format!("scc-{}", keys.join("-"));

    debug!(
        id = %id,
        items = items.len(),
        recipes = recipes.len(),
        external_inputs = external_inputs.len(),
        "detected cycle"
    );

    SccInfo {
        id,
        items,
        recipes,
        external_inputs,
    }
}
