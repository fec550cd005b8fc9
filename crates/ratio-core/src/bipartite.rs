//! Bipartite item/recipe dependency graph built from the requested targets.
//!
//! The builder walks depth-first from each target with an explicit stack,
//! selecting one recipe per non-raw item. Every container keeps insertion
//! order so that the later stages (cycle detection, condensation, flow
//! propagation) see the graph in the same order on every run.

use crate::catalog::Catalog;
use crate::id::*;
use crate::select::select_recipe;
use crate::solver::{SolveError, SolveRequest};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

// ---------------------------------------------------------------------------
// Graph data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ItemNode {
    pub item: ItemId,
    pub is_raw: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeNode {
    pub recipe: RecipeId,
    pub facility: FacilityId,
    /// Distinct input items, in first-seen order.
    pub inputs: Vec<ItemId>,
    /// Distinct output items, in recipe order.
    pub outputs: Vec<ItemId>,
}

/// Solve-scoped bipartite graph. Rebuilt on every backtracking iteration.
#[derive(Debug, Clone, Default)]
pub struct BipartiteGraph {
    item_nodes: Vec<ItemNode>,
    item_index: HashMap<ItemId, usize>,
    recipe_nodes: Vec<RecipeNode>,
    recipe_index: HashMap<RecipeId, usize>,
    /// Items in the order they were first consumed.
    consumed_order: Vec<ItemId>,
    consumed_by: HashMap<ItemId, Vec<RecipeId>>,
    produced_by: HashMap<ItemId, RecipeId>,
    targets: Vec<ItemId>,
}

impl BipartiteGraph {
    pub fn item_nodes(&self) -> &[ItemNode] {
        &self.item_nodes
    }

    pub fn recipe_nodes(&self) -> &[RecipeNode] {
        &self.recipe_nodes
    }

    pub fn item_node(&self, item: ItemId) -> Option<&ItemNode> {
        self.item_index.get(&item).map(|&i| &self.item_nodes[i])
    }

    pub fn recipe_node(&self, recipe: RecipeId) -> Option<&RecipeNode> {
        self.recipe_index.get(&recipe).map(|&i| &self.recipe_nodes[i])
    }

    pub fn contains_item(&self, item: ItemId) -> bool {
        self.item_index.contains_key(&item)
    }

    /// Recipes consuming `item`, in the order the edges were added.
    pub fn consumers_of(&self, item: ItemId) -> &[RecipeId] {
        self.consumed_by.get(&item).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn producer_of(&self, item: ItemId) -> Option<RecipeId> {
        self.produced_by.get(&item).copied()
    }

    pub fn recipe_inputs(&self, recipe: RecipeId) -> &[ItemId] {
        self.recipe_node(recipe)
            .map(|n| n.inputs.as_slice())
            .unwrap_or(&[])
    }

    pub fn recipe_outputs(&self, recipe: RecipeId) -> &[ItemId] {
        self.recipe_node(recipe)
            .map(|n| n.outputs.as_slice())
            .unwrap_or(&[])
    }

    /// `item -> recipe` edges, grouped by item in first-consumed order.
    pub fn consumption_edges(&self) -> impl Iterator<Item = (ItemId, RecipeId)> + '_ {
        self.consumed_order
            .iter()
            .flat_map(move |&item| self.consumers_of(item).iter().map(move |&r| (item, r)))
    }

    /// `recipe -> item` edges, grouped by recipe in registration order.
    pub fn production_edges(&self) -> impl Iterator<Item = (RecipeId, ItemId)> + '_ {
        self.recipe_nodes
            .iter()
            .flat_map(|node| node.outputs.iter().map(move |&item| (node.recipe, item)))
    }

    /// Distinct target items, in request order.
    pub fn targets(&self) -> &[ItemId] {
        &self.targets
    }

    pub fn is_target(&self, item: ItemId) -> bool {
        self.targets.contains(&item)
    }

    pub fn raw_materials(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.item_nodes
            .iter()
            .filter(|n| n.is_raw)
            .map(|n| n.item)
    }

    fn upsert_item(&mut self, item: ItemId, is_raw: bool) {
        match self.item_index.get(&item) {
            Some(&i) => self.item_nodes[i].is_raw = is_raw,
            None => {
                self.item_index.insert(item, self.item_nodes.len());
                self.item_nodes.push(ItemNode { item, is_raw });
            }
        }
    }

    fn ensure_item(&mut self, item: ItemId, is_raw: bool) {
        if !self.item_index.contains_key(&item) {
            self.upsert_item(item, is_raw);
        }
    }

    fn is_raw(&self, item: ItemId) -> bool {
        self.item_node(item).is_some_and(|n| n.is_raw)
    }

    fn add_consumption(&mut self, item: ItemId, recipe: RecipeId) {
        if !self.consumed_by.contains_key(&item) {
            self.consumed_order.push(item);
        }
        let consumers = self.consumed_by.entry(item).or_default();
        if !consumers.contains(&recipe) {
            consumers.push(recipe);
        }
        if let Some(&i) = self.recipe_index.get(&recipe) {
            let inputs = &mut self.recipe_nodes[i].inputs;
            if !inputs.contains(&item) {
                inputs.push(item);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Choices and constraints
// ---------------------------------------------------------------------------

/// A choice point: an item with more than one eligible recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeChoice {
    pub item: ItemId,
    /// Eligible recipes in catalog order, after exclusions.
    pub candidates: Vec<RecipeId>,
    /// Index of the recipe used this iteration.
    pub current_index: usize,
}

impl RecipeChoice {
    pub fn has_untried(&self) -> bool {
        self.current_index + 1 < self.candidates.len()
    }
}

/// Recipes excluded per item. The only state carried between iterations;
/// it only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeConstraints {
    excluded: BTreeMap<ItemId, BTreeSet<RecipeId>>,
}

impl RecipeConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_excluded(&self, item: ItemId, recipe: RecipeId) -> bool {
        self.excluded
            .get(&item)
            .is_some_and(|set| set.contains(&recipe))
    }

    pub fn excluded(&self, item: ItemId) -> impl Iterator<Item = RecipeId> + '_ {
        self.excluded.get(&item).into_iter().flatten().copied()
    }

    pub fn exclude(&mut self, item: ItemId, recipes: impl IntoIterator<Item = RecipeId>) {
        self.excluded.entry(item).or_default().extend(recipes);
    }

    pub fn is_empty(&self) -> bool {
        self.excluded.values().all(BTreeSet::is_empty)
    }

    /// Total number of excluded (item, recipe) pairs.
    pub fn len(&self) -> usize {
        self.excluded.values().map(BTreeSet::len).sum()
    }
}

/// Output of one graph build.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub graph: BipartiteGraph,
    /// Choice points in traversal order.
    pub choices: Vec<RecipeChoice>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

enum Frame {
    /// Resolve an item.
    Visit(ItemId),
    /// Record `item -> recipe`, then resolve `item`.
    Consume { item: ItemId, recipe: RecipeId },
    /// All inputs of `item` are resolved; drop it from the path.
    Leave(ItemId),
}

/// Builds the bipartite graph for one iteration.
pub struct GraphBuilder<'a> {
    catalog: &'a Catalog,
    request: &'a SolveRequest,
    constraints: &'a RecipeConstraints,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        catalog: &'a Catalog,
        request: &'a SolveRequest,
        constraints: &'a RecipeConstraints,
    ) -> Self {
        Self {
            catalog,
            request,
            constraints,
        }
    }

    pub fn build(&self) -> Result<BuildResult, SolveError> {
        let mut graph = BipartiteGraph::default();
        for target in &self.request.targets {
            if !graph.targets.contains(&target.item) {
                graph.targets.push(target.item);
            }
        }

        let mut choices = Vec::new();
        let mut visited: HashSet<ItemId> = HashSet::new();
        // Items between the current target and the item being resolved.
        let mut path: BTreeSet<ItemId> = BTreeSet::new();
        let mut stack: Vec<Frame> = self
            .request
            .targets
            .iter()
            .rev()
            .map(|t| Frame::Visit(t.item))
            .collect();

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Consume { item, recipe } => {
                    graph.add_consumption(item, recipe);
                    stack.push(Frame::Visit(item));
                }
                Frame::Visit(item) => {
                    if !visited.insert(item) {
                        continue;
                    }
                    if self.visit(&mut graph, &mut choices, &mut stack, item, &path)? {
                        path.insert(item);
                    }
                }
                Frame::Leave(item) => {
                    path.remove(&item);
                }
            }
        }

        Ok(BuildResult { graph, choices })
    }

    /// Resolve one item. Returns `true` when a recipe was selected and its
    /// inputs were queued, i.e. the item joins the path.
    fn visit(
        &self,
        graph: &mut BipartiteGraph,
        choices: &mut Vec<RecipeChoice>,
        stack: &mut Vec<Frame>,
        item: ItemId,
        path: &BTreeSet<ItemId>,
    ) -> Result<bool, SolveError> {
        let def = self.catalog.get_item(item).ok_or(SolveError::NotFound {
            kind: "item",
            id: item.0,
        })?;

        if def.forced_raw || self.request.manual_raw.contains(&item) {
            graph.upsert_item(item, true);
            graph.produced_by.remove(&item);
            return Ok(false);
        }

        let candidates: Vec<RecipeId> = self
            .catalog
            .producers_of(item)
            .iter()
            .copied()
            .filter(|&r| !self.constraints.is_excluded(item, r))
            .collect();

        if candidates.is_empty() {
            graph.upsert_item(item, true);
            graph.produced_by.remove(&item);
            return Ok(false);
        }
        graph.upsert_item(item, false);

        let (selected, current_index) = match self.request.overrides.get(&item) {
            Some(&forced) => {
                let index = candidates.iter().position(|&r| r == forced).unwrap_or(0);
                (forced, index)
            }
            None => {
                let picked = select_recipe(self.catalog, &candidates, path).ok_or(
                    SolveError::NotFound {
                        kind: "recipe",
                        id: candidates[0].0,
                    },
                )?;
                let index = candidates.iter().position(|&r| r == picked).unwrap_or(0);
                (picked, index)
            }
        };

        if candidates.len() > 1 {
            choices.push(RecipeChoice {
                item,
                candidates: candidates.clone(),
                current_index,
            });
        }

        let recipe = self.catalog.get_recipe(selected).ok_or(SolveError::NotFound {
            kind: "recipe",
            id: selected.0,
        })?;
        if self.catalog.get_facility(recipe.facility).is_none() {
            return Err(SolveError::NotFound {
                kind: "facility",
                id: recipe.facility.0,
            });
        }

        if !graph.recipe_index.contains_key(&selected) {
            graph.recipe_index.insert(selected, graph.recipe_nodes.len());
            graph.recipe_nodes.push(RecipeNode {
                recipe: selected,
                facility: recipe.facility,
                inputs: Vec::new(),
                outputs: Vec::new(),
            });
        }

        for out in &recipe.outputs {
            let byproduct_raw = self
                .catalog
                .get_item(out.item)
                .is_some_and(|d| d.forced_raw)
                || self.request.manual_raw.contains(&out.item);
            graph.ensure_item(out.item, byproduct_raw);
            if let Some(&i) = graph.recipe_index.get(&selected) {
                let outputs = &mut graph.recipe_nodes[i].outputs;
                if !outputs.contains(&out.item) {
                    outputs.push(out.item);
                }
            }
            if !graph.is_raw(out.item) {
                graph.produced_by.insert(out.item, selected);
            }
        }
        graph.produced_by.insert(item, selected);

        stack.push(Frame::Leave(item));
        for input in recipe.inputs.iter().rev() {
            stack.push(Frame::Consume {
                item: input.item,
                recipe: selected,
            });
        }

        Ok(true)
    }
}
