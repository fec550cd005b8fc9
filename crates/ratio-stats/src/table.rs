//! Per-item production table.
//!
//! Each item in the plan becomes one [`ProductionRow`]. Rows carry a depth
//! level: 0 for items with no in-plan dependencies, otherwise one more than
//! the deepest dependency. Rows are ordered by level (deepest first), then by
//! item tier (highest first).

use ratio_core::catalog::Catalog;
use ratio_core::id::*;
use ratio_core::plan::ProductionDependencyGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// One line of the production table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRow {
    pub item: ItemId,
    pub output_rate: f64,
    /// Recipe with a production edge into the item, if any.
    pub producer: Option<RecipeId>,
    /// Every catalog recipe that can produce the item.
    pub available_recipes: Vec<RecipeId>,
    /// The override if one was requested, otherwise the producer.
    pub selected_recipe: Option<RecipeId>,
    pub facility: Option<FacilityId>,
    pub facility_count: f64,
    pub is_raw: bool,
    pub is_target: bool,
    pub is_manual_raw: bool,
    /// Items consumed by the producer, in edge order.
    pub dependencies: Vec<ItemId>,
    pub level: u32,
}

/// Build the table rows for `plan`. An empty plan yields no rows.
pub fn build_production_table(
    plan: &ProductionDependencyGraph,
    catalog: &Catalog,
    overrides: &BTreeMap<ItemId, RecipeId>,
    manual_raw: &BTreeSet<ItemId>,
) -> Vec<ProductionRow> {
    // First production edge per item, consumption edges per recipe.
    let mut producers: HashMap<ItemId, RecipeId> = HashMap::new();
    let mut inputs: HashMap<RecipeId, Vec<ItemId>> = HashMap::new();
    for edge in &plan.edges {
        match (edge.from, edge.to) {
            (NodeKey::Recipe(recipe), NodeKey::Item(item)) => {
                producers.entry(item).or_insert(recipe);
            }
            (NodeKey::Item(item), NodeKey::Recipe(recipe)) => {
                let list = inputs.entry(recipe).or_default();
                if !list.contains(&item) {
                    list.push(item);
                }
            }
            _ => {}
        }
    }

    let mut rows: Vec<ProductionRow> = plan
        .item_nodes()
        .map(|node| {
            let producer = producers.get(&node.item).copied();
            let recipe_node = producer.and_then(|r| plan.recipe(r));
            let dependencies = producer
                .and_then(|r| inputs.get(&r).cloned())
                .unwrap_or_default();

            ProductionRow {
                item: node.item,
                output_rate: node.production_rate,
                producer,
                available_recipes: catalog.producers_of(node.item).to_vec(),
                selected_recipe: overrides.get(&node.item).copied().or(producer),
                facility: recipe_node.map(|r| r.facility),
                facility_count: recipe_node.map_or(0.0, |r| r.facility_count),
                is_raw: node.is_raw,
                is_target: node.is_target,
                is_manual_raw: manual_raw.contains(&node.item),
                dependencies,
                level: 0,
            }
        })
        .collect();

    let levels = compute_levels(&rows);
    for row in &mut rows {
        row.level = levels.get(&row.item).copied().unwrap_or(0);
    }

    let tier = |item: ItemId| catalog.get_item(item).map_or(0, |def| def.tier);
    rows.sort_by(|a, b| {
        b.level
            .cmp(&a.level)
            .then_with(|| tier(b.item).cmp(&tier(a.item)))
    });

    debug!(rows = rows.len(), "built production table");
    rows
}

/// Memoized depth levels over the dependency lists. Re-entering an item that
/// is still being resolved counts as level 0, which cuts cycles.
fn compute_levels(rows: &[ProductionRow]) -> HashMap<ItemId, u32> {
    let by_item: HashMap<ItemId, &ProductionRow> = rows.iter().map(|r| (r.item, r)).collect();
    let mut levels: HashMap<ItemId, u32> = HashMap::new();
    let mut entered: HashSet<ItemId> = HashSet::new();

    // (item, next dependency index, deepest dependency level so far)
    let mut stack: Vec<(ItemId, usize, Option<u32>)> = Vec::new();

    for row in rows {
        if !entered.insert(row.item) {
            continue;
        }
        stack.push((row.item, 0, None));

        while let Some(frame) = stack.last_mut() {
            let deps = &by_item[&frame.0].dependencies;
            if let Some(&dep) = deps.get(frame.1) {
                frame.1 += 1;
                if !by_item.contains_key(&dep) {
                    continue;
                }
                if let Some(&level) = levels.get(&dep) {
                    frame.2 = Some(frame.2.map_or(level, |m| m.max(level)));
                } else if !entered.insert(dep) {
                    // Still on the stack: a cycle.
                    frame.2 = Some(frame.2.unwrap_or(0));
                } else {
                    stack.push((dep, 0, None));
                }
                continue;
            }

            let (item, _, deepest) = *frame;
            stack.pop();
            let level = deepest.map_or(0, |d| d + 1);
            levels.insert(item, level);
            if let Some(parent) = stack.last_mut() {
                parent.2 = Some(parent.2.map_or(level, |m| m.max(level)));
            }
        }
    }

    levels
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
