use crate::bipartite::BipartiteGraph;
use crate::catalog::Catalog;
use crate::flow::{FlowData, InvalidCycle};
use crate::id::*;
use crate::scc::SccInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ===========================================================================
// Node and edge types
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPlanNode {
    pub item: ItemId,
    /// Units per minute.
    pub production_rate: f64,
    pub is_raw: bool,
    pub is_target: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipePlanNode {
    pub recipe: RecipeId,
    pub facility: FacilityId,
    pub facility_count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlanNode {
    Item(ItemPlanNode),
    Recipe(RecipePlanNode),
}

/// `Item -> Recipe` is consumption, `Recipe -> Item` is production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEdge {
    pub from: NodeKey,
    pub to: NodeKey,
}

/// One output entry of a recipe inside a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleNode {
    pub item: ItemId,
    pub rate: f64,
    pub recipe: RecipeId,
    pub facility: FacilityId,
    pub facility_count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedCycle {
    pub id: String,
    pub items: Vec<ItemId>,
    /// First member item.
    pub break_point: Option<ItemId>,
    pub nodes: Vec<CycleNode>,
}

// ===========================================================================
// ProductionDependencyGraph
// ===========================================================================

/// The finished plan: facility counts per recipe and rates per item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductionDependencyGraph {
    pub nodes: BTreeMap<NodeKey, PlanNode>,
    pub edges: Vec<PlanEdge>,
    pub targets: Vec<ItemId>,
    pub cycles: Vec<DetectedCycle>,
    /// Cycles left unbalanced in a best-effort result.
    pub invalid_cycles: Vec<InvalidCycle>,
    /// Number of build/solve iterations used.
    pub iterations: usize,
}

impl ProductionDependencyGraph {
    /// Build the plan from one iteration's graph and flow.
    pub fn assemble(
        catalog: &Catalog,
        graph: &BipartiteGraph,
        flow: &FlowData,
        sccs: &[SccInfo],
        invalid_cycles: Vec<InvalidCycle>,
        iterations: usize,
    ) -> Self {
        let mut nodes = BTreeMap::new();

        for node in graph.item_nodes() {
            let production_rate = match graph.producer_of(node.item) {
                Some(recipe) => catalog.get_recipe(recipe).map_or(0.0, |def| {
                    let amount = def.output_amount(node.item).unwrap_or(0);
                    def.per_minute(amount) * flow.facility_count(recipe)
                }),
                None if node.is_raw => flow.demand(node.item),
                None => 0.0,
            };
            nodes.insert(
                NodeKey::Item(node.item),
                PlanNode::Item(ItemPlanNode {
                    item: node.item,
                    production_rate,
                    is_raw: node.is_raw,
                    is_target: graph.is_target(node.item),
                }),
            );
        }

        for node in graph.recipe_nodes() {
            nodes.insert(
                NodeKey::Recipe(node.recipe),
                PlanNode::Recipe(RecipePlanNode {
                    recipe: node.recipe,
                    facility: node.facility,
                    facility_count: flow.facility_count(node.recipe),
                }),
            );
        }

        let edges = graph
            .consumption_edges()
            .map(|(i, r)| PlanEdge {
                from: NodeKey::Item(i),
                to: NodeKey::Recipe(r),
            })
            .chain(graph.production_edges().map(|(r, i)| PlanEdge {
                from: NodeKey::Recipe(r),
                to: NodeKey::Item(i),
            }))
            .collect();

        let cycles = sccs
            .iter()
            .map(|scc| DetectedCycle {
                id: scc.id.clone(),
                items: scc.items.clone(),
                break_point: scc.items.first().copied(),
                nodes: scc
                    .recipes
                    .iter()
                    .filter_map(|&r| catalog.get_recipe(r).map(|def| (r, def)))
                    .flat_map(|(r, def)| {
                        let count = flow.facility_count(r);
                        def.outputs.iter().map(move |out| CycleNode {
                            item: out.item,
                            rate: def.per_minute(out.amount) * count,
                            recipe: r,
                            facility: def.facility,
                            facility_count: count,
                        })
                    })
                    .collect(),
            })
            .collect();

        Self {
            nodes,
            edges,
            targets: graph.targets().to_vec(),
            cycles,
            invalid_cycles,
            iterations,
        }
    }

    /// True when every cycle was balanced.
    pub fn is_complete(&self) -> bool {
        self.invalid_cycles.is_empty()
    }

    pub fn item(&self, item: ItemId) -> Option<&ItemPlanNode> {
        match self.nodes.get(&NodeKey::Item(item)) {
            Some(PlanNode::Item(node)) => Some(node),
            _ => None,
        }
    }

    pub fn recipe(&self, recipe: RecipeId) -> Option<&RecipePlanNode> {
        match self.nodes.get(&NodeKey::Recipe(recipe)) {
            Some(PlanNode::Recipe(node)) => Some(node),
            _ => None,
        }
    }

    pub fn item_nodes(&self) -> impl Iterator<Item = &ItemPlanNode> {
        self.nodes.values().filter_map(|n| match n {
            PlanNode::Item(node) => Some(node),
            PlanNode::Recipe(_) => None,
        })
    }

    pub fn recipe_nodes(&self) -> impl Iterator<Item = &RecipePlanNode> {
        self.nodes.values().filter_map(|n| match n {
            PlanNode::Recipe(node) => Some(node),
            PlanNode::Item(_) => None,
        })
    }

    pub fn production_rate(&self, item: ItemId) -> f64 {
        self.item(item).map_or(0.0, |n| n.production_rate)
    }

    pub fn facility_count(&self, recipe: RecipeId) -> f64 {
        self.recipe(recipe).map_or(0.0, |n| n.facility_count)
    }

    /// First recipe with a production edge into `item`.
    pub fn producer_of(&self, item: ItemId) -> Option<RecipeId> {
        self.edges.iter().find_map(|e| match (e.from, e.to) {
            (NodeKey::Recipe(r), NodeKey::Item(i)) if i == item => Some(r),
            _ => None,
        })
    }

    /// Items with a consumption edge into `recipe`, in edge order.
    pub fn inputs_of(&self, recipe: RecipeId) -> Vec<ItemId> {
        self.edges
            .iter()
            .filter_map(|e| match (e.from, e.to) {
                (NodeKey::Item(i), NodeKey::Recipe(r)) if r == recipe => Some(i),
                _ => None,
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
