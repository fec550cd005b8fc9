//! Flow balance for a single production cycle.
//!
//! Each member item contributes one equation: what the member recipes make
//! of it minus what they consume equals the demand from outside the cycle.
//! The unknowns are the member recipes' facility counts.

use crate::bipartite::BipartiteGraph;
use crate::catalog::{Catalog, RecipeDef};
use crate::flow::{CycleFailure, FlowData};
use crate::id::*;
use crate::linear::solve_linear_system_with_tolerance;
use crate::scc::SccInfo;
use tracing::debug;

pub struct CycleFlowSolver<'a> {
    catalog: &'a Catalog,
    graph: &'a BipartiteGraph,
    pivot_tolerance: f64,
}

impl<'a> CycleFlowSolver<'a> {
    pub fn new(catalog: &'a Catalog, graph: &'a BipartiteGraph, pivot_tolerance: f64) -> Self {
        Self {
            catalog,
            graph,
            pivot_tolerance,
        }
    }

    /// Demand on `item` from outside the cycle: consumption by non-member
    /// recipes at their current facility counts, plus the requested rate when
    /// the item is itself a target.
    pub fn external_demand(&self, scc: &SccInfo, item: ItemId, flow: &FlowData) -> f64 {
        let mut demand: f64 = self
            .graph
            .consumers_of(item)
            .iter()
            .filter(|&&r| !scc.contains_recipe(r))
            .filter_map(|&r| {
                let def = self.catalog.get_recipe(r)?;
                let amount = def.input_amount(item)?;
                Some(def.per_minute(amount) * flow.facility_count(r))
            })
            .sum();
        if self.graph.is_target(item) {
            demand += flow.target_rate(item);
        }
        demand
    }

    /// Solve the cycle, writing facility counts and external-input demand
    /// into `flow`. On failure `flow` is left untouched.
    pub fn solve(&self, scc: &SccInfo, flow: &mut FlowData) -> Result<(), CycleFailure> {
        let constants: Vec<f64> = scc
            .items
            .iter()
            .map(|&item| {
                let d = self.external_demand(scc, item, flow);
                if d > 0.0 { d } else { 0.0 }
            })
            .collect();

        if constants.iter().all(|&d| d <= 0.0) {
            return Err(CycleFailure::NoExternalDemand);
        }

        let recipes: Vec<(RecipeId, &RecipeDef)> = scc
            .recipes
            .iter()
            .filter_map(|&r| self.catalog.get_recipe(r).map(|def| (r, def)))
            .collect();
        if scc.items.is_empty() || recipes.is_empty() {
            return Err(CycleFailure::NoSolution);
        }

        let matrix: Vec<Vec<f64>> = scc
            .items
            .iter()
            .map(|&item| {
                recipes
                    .iter()
                    .map(|(_, def)| {
                        let out = def.output_amount(item).unwrap_or(0);
                        let inp = def.input_amount(item).unwrap_or(0);
                        def.per_minute(out) - def.per_minute(inp)
                    })
                    .collect()
            })
            .collect();

        debug!(
            id = %scc.id,
            equations = matrix.len(),
            unknowns = recipes.len(),
            "solving cycle"
        );

        let solution = solve_linear_system_with_tolerance(&matrix, &constants, self.pivot_tolerance)
            .ok_or(CycleFailure::NoSolution)?;

        for ((recipe, def), count) in recipes.iter().zip(solution) {
            let count = count.max(0.0);
            debug!(recipe = %def.key, count, "cycle facility count");
            flow.set_facility_count(*recipe, count);
        }

        for &input in &scc.external_inputs {
            let consumed: f64 = recipes
                .iter()
                .filter_map(|(r, def)| {
                    def.input_amount(input)
                        .map(|amount| def.per_minute(amount) * flow.facility_count(*r))
                })
                .sum();
            if consumed > 0.0 {
                flow.add_demand(input, consumed);
            }
        }

        Ok(())
    }
}
