//! Demand propagation over the condensed order.

use crate::bipartite::BipartiteGraph;
use crate::catalog::Catalog;
use crate::condense::CondensedNode;
use crate::cycle::CycleFlowSolver;
use crate::id::*;
use crate::scc::SccInfo;
use crate::solver::{SolveError, Target};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Per-item demand and per-recipe facility counts for one iteration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowData {
    pub item_demands: BTreeMap<ItemId, f64>,
    pub facility_counts: BTreeMap<RecipeId, f64>,
    /// Requested rate per target item, kept apart from accumulated demand.
    pub target_rates: BTreeMap<ItemId, f64>,
}

impl FlowData {
    pub fn demand(&self, item: ItemId) -> f64 {
        self.item_demands.get(&item).copied().unwrap_or(0.0)
    }

    pub fn target_rate(&self, item: ItemId) -> f64 {
        self.target_rates.get(&item).copied().unwrap_or(0.0)
    }

    pub fn facility_count(&self, recipe: RecipeId) -> f64 {
        self.facility_counts.get(&recipe).copied().unwrap_or(0.0)
    }

    pub fn add_demand(&mut self, item: ItemId, amount: f64) {
        *self.item_demands.entry(item).or_insert(0.0) += amount;
    }

    /// Seed demand for a requested target. A repeated target replaces the
    /// earlier rate.
    pub fn set_target(&mut self, item: ItemId, rate: f64) {
        self.item_demands.insert(item, rate);
        self.target_rates.insert(item, rate);
    }

    pub fn set_facility_count(&mut self, recipe: RecipeId, count: f64) {
        self.facility_counts.insert(recipe, count);
    }
}

/// Why a cycle could not be balanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum CycleFailure {
    #[error("no member item has external demand")]
    NoExternalDemand,
    #[error("flow-balance system has no unique solution")]
    NoSolution,
}

/// A cycle left unresolved by an iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidCycle {
    pub id: String,
    pub items: Vec<ItemId>,
    pub reason: CycleFailure,
}

#[derive(Debug, Clone, Default)]
pub struct FlowResult {
    pub flow: FlowData,
    pub invalid_cycles: Vec<InvalidCycle>,
}

/// Walks the condensed order from sinks to sources, turning demand into
/// facility counts.
pub struct FlowPropagator<'a> {
    catalog: &'a Catalog,
    graph: &'a BipartiteGraph,
    sccs: &'a [SccInfo],
    cycles: CycleFlowSolver<'a>,
}

impl<'a> FlowPropagator<'a> {
    pub fn new(
        catalog: &'a Catalog,
        graph: &'a BipartiteGraph,
        sccs: &'a [SccInfo],
        pivot_tolerance: f64,
    ) -> Self {
        Self {
            catalog,
            graph,
            sccs,
            cycles: CycleFlowSolver::new(catalog, graph, pivot_tolerance),
        }
    }

    /// `order` is a topological order of the condensed graph. It is walked
    /// in reverse, so every consumer is settled before its producers.
    pub fn propagate(
        &self,
        order: &[CondensedNode],
        targets: &[Target],
    ) -> Result<FlowResult, SolveError> {
        let mut result = FlowResult::default();
        for target in targets {
            result.flow.set_target(target.item, target.rate);
        }

        for node in order.iter().rev() {
            match *node {
                CondensedNode::Item(_) => {}
                CondensedNode::Recipe(recipe) => self.propagate_recipe(recipe, &mut result.flow)?,
                CondensedNode::Scc(index) => {
                    let Some(scc) = self.sccs.get(index) else {
                        continue;
                    };
                    if let Err(reason) = self.cycles.solve(scc, &mut result.flow) {
                        debug!(id = %scc.id, %reason, "cycle unresolved");
                        result.invalid_cycles.push(InvalidCycle {
                            id: scc.id.clone(),
                            items: scc.items.clone(),
                            reason,
                        });
                    }
                }
            }
        }

        Ok(result)
    }

    fn propagate_recipe(&self, recipe: RecipeId, flow: &mut FlowData) -> Result<(), SolveError> {
        let def = self.catalog.get_recipe(recipe).ok_or(SolveError::NotFound {
            kind: "recipe",
            id: recipe.0,
        })?;

        let mut count: f64 = 0.0;
        for &item in self.graph.recipe_outputs(recipe) {
            let Some(amount) = def.output_amount(item) else {
                continue;
            };
            let rate = def.per_minute(amount);
            if rate > 0.0 {
                count = count.max(flow.demand(item) / rate);
            }
        }
        flow.set_facility_count(recipe, count);

        for input in &def.inputs {
            flow.add_demand(input.item, def.per_minute(input.amount) * count);
        }

        debug!(recipe = %def.key, count, "recipe facility count");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bipartite::{GraphBuilder, RecipeConstraints};
    use crate::condense::CondensedGraph;
    use crate::linear::DEFAULT_PIVOT_TOLERANCE;
    use crate::scc::detect_cycles;
    use crate::solver::SolveRequest;
    use crate::test_utils::*;

    fn propagate(catalog: &Catalog, targets: Vec<Target>) -> FlowResult {
        let request = SolveRequest::new(targets);
        let built = GraphBuilder::new(catalog, &request, &RecipeConstraints::new())
            .build()
            .unwrap();
        let sccs = detect_cycles(&built.graph, catalog);
        let order = CondensedGraph::build(&built.graph, &sccs)
            .ordered_nodes()
            .unwrap();
        FlowPropagator::new(catalog, &built.graph, &sccs, DEFAULT_PIVOT_TOLERANCE)
            .propagate(&order, &request.targets)
            .unwrap()
    }

    // -----------------------------------------------------------------------
    // Test 1: Iron chain demand flows down to ore
    // -----------------------------------------------------------------------
    #[test]
    fn iron_chain_counts() {
        let c = iron_chain_catalog();
        let result = propagate(&c, vec![Target::new(item(&c, "iron_component"), 60.0)]);
        let flow = &result.flow;

        assert!(result.invalid_cycles.is_empty());
        assert_close(flow.facility_count(recipe(&c, "component_iron_cmpt")), 2.0);
        assert_close(flow.demand(item(&c, "iron_nugget")), 60.0);
        assert_close(flow.facility_count(recipe(&c, "furnace_iron_nugget")), 2.0);
        assert_close(flow.demand(item(&c, "iron_ore")), 60.0);
    }

    // -----------------------------------------------------------------------
    // Test 2: Two branches merge their demand
    // -----------------------------------------------------------------------
    #[test]
    fn battery_branches() {
        let c = complex_catalog();
        let result = propagate(&c, vec![Target::new(item(&c, "battery"), 6.0)]);
        let flow = &result.flow;

        assert_close(flow.facility_count(recipe(&c, "tools_battery")), 1.0);
        assert_close(flow.facility_count(recipe(&c, "component_glass_cmpt")), 1.0);
        assert_close(flow.facility_count(recipe(&c, "component_iron_cmpt")), 2.0);
        assert_close(flow.facility_count(recipe(&c, "furnace_quartz_glass")), 1.0);
        assert_close(flow.facility_count(recipe(&c, "furnace_iron_nugget")), 2.0);
        assert_close(flow.demand(item(&c, "quartz_sand")), 30.0);
        assert_close(flow.demand(item(&c, "iron_ore")), 60.0);
    }

    // -----------------------------------------------------------------------
    // Test 3: Shared intermediate accumulates demand from two targets
    // -----------------------------------------------------------------------
    #[test]
    fn demand_accumulates_across_targets() {
        let c = iron_chain_catalog();
        let result = propagate(
            &c,
            vec![
                Target::new(item(&c, "iron_component"), 30.0),
                Target::new(item(&c, "iron_nugget"), 15.0),
            ],
        );
        // 30 from the component recipe plus the 15 requested directly.
        assert_close(result.flow.demand(item(&c, "iron_nugget")), 45.0);
        assert_close(result.flow.facility_count(recipe(&c, "furnace_iron_nugget")), 1.5);
    }

    // -----------------------------------------------------------------------
    // Test 4: Cycles are delegated and failures recorded
    // -----------------------------------------------------------------------
    #[test]
    fn bottle_cycle_with_target_demand() {
        let c = bottle_cycle_catalog();
        let result = propagate(&c, vec![Target::new(item(&c, "filled_bottle"), 60.0)]);
        assert!(result.invalid_cycles.is_empty());
        assert_close(result.flow.facility_count(recipe(&c, "fill_bottle")), 2.0);
        assert_close(result.flow.facility_count(recipe(&c, "dismantle_bottle")), 2.0);
        assert_close(result.flow.demand(item(&c, "water")), 60.0);
    }

    #[test]
    fn bottle_cycle_without_external_demand_is_invalid() {
        let c = bottle_cycle_catalog();
        let result = propagate(&c, vec![Target::new(item(&c, "grass_liquid"), 60.0)]);
        assert_eq!(result.invalid_cycles.len(), 1);
        let invalid = &result.invalid_cycles[0];
        assert_eq!(invalid.id, "scc-bottle-filled_bottle");
        assert_eq!(invalid.reason, CycleFailure::NoExternalDemand);
    }
}
