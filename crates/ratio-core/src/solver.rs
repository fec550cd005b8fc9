//! Request types and the backtracking solve loop.
//!
//! Each iteration rebuilds everything from the catalog and the current
//! [`RecipeConstraints`]: graph, cycles, condensed order, flow. When some
//! cycle cannot be balanced, the controller excludes the recipes already
//! tried for one of the cycle's choice points and runs again.

use crate::bipartite::{BuildResult, GraphBuilder, RecipeChoice, RecipeConstraints};
use crate::catalog::Catalog;
use crate::condense::{CondensedGraph, GraphError};
use crate::flow::{FlowPropagator, InvalidCycle};
use crate::id::*;
use crate::linear::DEFAULT_PIVOT_TOLERANCE;
use crate::plan::ProductionDependencyGraph;
use crate::scc::detect_cycles;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A requested output rate, in units per minute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub item: ItemId,
    pub rate: f64,
}

impl Target {
    pub fn new(item: ItemId, rate: f64) -> Self {
        Self { item, rate }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveRequest {
    pub targets: Vec<Target>,
    /// Recipe forced for an item, bypassing selection and exclusions.
    pub overrides: BTreeMap<ItemId, RecipeId>,
    /// Items treated as raw for this request only.
    pub manual_raw: BTreeSet<ItemId>,
}

impl SolveRequest {
    pub fn new(targets: Vec<Target>) -> Self {
        Self {
            targets,
            ..Self::default()
        }
    }

    pub fn with_override(mut self, item: ItemId, recipe: RecipeId) -> Self {
        self.overrides.insert(item, recipe);
        self
    }

    pub fn with_manual_raw(mut self, item: ItemId) -> Self {
        self.manual_raw.insert(item);
        self
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub max_iterations: usize,
    /// Pivots below this magnitude make a cycle's system singular.
    pub pivot_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            pivot_tolerance: DEFAULT_PIVOT_TOLERANCE,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error("no targets specified")]
    NoTargets,
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: u32 },
    #[error("maximum iterations ({0}) reached without resolving all cycles")]
    MaxIterations(usize),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

struct Iteration {
    plan: ProductionDependencyGraph,
    choices: Vec<RecipeChoice>,
    invalid_cycles: Vec<InvalidCycle>,
}

pub struct Solver<'a> {
    catalog: &'a Catalog,
    config: SolverConfig,
}

impl<'a> Solver<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self::with_config(catalog, SolverConfig::default())
    }

    pub fn with_config(catalog: &'a Catalog, config: SolverConfig) -> Self {
        Self { catalog, config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve `request`. A plan whose cycles could not all be balanced, and
    /// for which no alternative recipe remains, is still returned as `Ok`
    /// with its `invalid_cycles` filled in.
    #[instrument(skip_all, fields(targets = request.targets.len()))]
    pub fn solve(&self, request: &SolveRequest) -> Result<ProductionDependencyGraph, SolveError> {
        if request.targets.is_empty() {
            return Err(SolveError::NoTargets);
        }

        let mut constraints = RecipeConstraints::new();
        for iteration in 1..=self.config.max_iterations {
            let Iteration {
                plan,
                choices,
                invalid_cycles,
            } = self.run_iteration(request, &constraints, iteration)?;

            if invalid_cycles.is_empty() {
                info!(iteration, "solved");
                return Ok(plan);
            }

            info!(
                iteration,
                invalid = invalid_cycles.len(),
                "unresolved cycles, backtracking"
            );
            match next_constraints(&choices, &invalid_cycles, &constraints) {
                Some(next) => constraints = next,
                None => {
                    warn!(
                        iteration,
                        invalid = invalid_cycles.len(),
                        "no alternative recipes left, returning best-effort plan"
                    );
                    return Ok(plan);
                }
            }
        }

        Err(SolveError::MaxIterations(self.config.max_iterations))
    }

    fn run_iteration(
        &self,
        request: &SolveRequest,
        constraints: &RecipeConstraints,
        iteration: usize,
    ) -> Result<Iteration, SolveError> {
        let BuildResult { graph, choices } =
            GraphBuilder::new(self.catalog, request, constraints).build()?;
        let sccs = detect_cycles(&graph, self.catalog);
        let order = CondensedGraph::build(&graph, &sccs).ordered_nodes()?;
        debug!(
            iteration,
            items = graph.item_nodes().len(),
            recipes = graph.recipe_nodes().len(),
            cycles = sccs.len(),
            choices = choices.len(),
            "graph built"
        );

        let flow = FlowPropagator::new(self.catalog, &graph, &sccs, self.config.pivot_tolerance)
            .propagate(&order, &request.targets)?;

        let plan = ProductionDependencyGraph::assemble(
            self.catalog,
            &graph,
            &flow.flow,
            &sccs,
            flow.invalid_cycles.clone(),
            iteration,
        );
        Ok(Iteration {
            plan,
            choices,
            invalid_cycles: flow.invalid_cycles,
        })
    }
}

/// Pick the next constraint set, or `None` when no choice point inside an
/// invalid cycle has an untried recipe.
///
/// Choices are considered by descending current index (stable over their
/// traversal order). The first one with an untried candidate gets every
/// candidate up to and including its current one excluded.
pub fn next_constraints(
    choices: &[RecipeChoice],
    invalid_cycles: &[InvalidCycle],
    constraints: &RecipeConstraints,
) -> Option<RecipeConstraints> {
    let problem: BTreeSet<ItemId> = invalid_cycles
        .iter()
        .flat_map(|c| c.items.iter().copied())
        .collect();

    let mut relevant: Vec<&RecipeChoice> = choices
        .iter()
        .filter(|c| problem.contains(&c.item))
        .collect();
    relevant.sort_by(|a, b| b.current_index.cmp(&a.current_index));

    let choice = relevant.into_iter().find(|c| c.has_untried())?;
    debug!(
        item = choice.item.0,
        next = choice.current_index + 1,
        candidates = choice.candidates.len(),
        "excluding tried recipes"
    );

    let mut next = constraints.clone();
    next.exclude(
        choice.item,
        choice.candidates[..=choice.current_index].iter().copied(),
    );
    Some(next)
}

/// Solve with the default [`SolverConfig`].
pub fn solve(
    catalog: &Catalog,
    request: &SolveRequest,
) -> Result<ProductionDependencyGraph, SolveError> {
    Solver::new(catalog).solve(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::CycleFailure;
    use crate::test_utils::*;

    // -----------------------------------------------------------------------
    // Test 1: Empty request
    // -----------------------------------------------------------------------
    #[test]
    fn no_targets_is_an_error() {
        let c = iron_chain_catalog();
        let err = solve(&c, &SolveRequest::default()).unwrap_err();
        assert!(matches!(err, SolveError::NoTargets));
        assert_eq!(err.to_string(), "no targets specified");
    }

    // -----------------------------------------------------------------------
    // Test 2: Acyclic plans solve in one iteration
    // -----------------------------------------------------------------------
    #[test]
    fn acyclic_plan_single_iteration() {
        let c = complex_catalog();
        let plan = solve(
            &c,
            &SolveRequest::new(vec![Target::new(item(&c, "battery"), 6.0)]),
        )
        .unwrap();
        assert_eq!(plan.iterations, 1);
        assert!(plan.is_complete());
        assert_close(plan.facility_count(recipe(&c, "tools_battery")), 1.0);
    }

    // -----------------------------------------------------------------------
    // Test 3: Backtracking swaps out the recipe that closes a singular cycle
    // -----------------------------------------------------------------------
    #[test]
    fn backtracking_breaks_singular_cycle() {
        let c = backtrack_catalog();
        let alloy = item(&c, "alloy");
        let plan = solve(&c, &SolveRequest::new(vec![Target::new(alloy, 60.0)])).unwrap();

        assert_eq!(plan.iterations, 2);
        assert!(plan.is_complete());
        assert!(plan.cycles.is_empty());
        assert_eq!(plan.producer_of(alloy), Some(recipe(&c, "alloy_from_ore")));
        assert_close(plan.facility_count(recipe(&c, "alloy_from_ore")), 2.0);
        assert!(plan.recipe(recipe(&c, "alloy_from_scrap")).is_none());
    }

    // -----------------------------------------------------------------------
    // Test 4: No alternatives gives a best-effort plan
    // -----------------------------------------------------------------------
    #[test]
    fn best_effort_without_alternatives() {
        let c = bottle_cycle_catalog();
        let plan = solve(
            &c,
            &SolveRequest::new(vec![Target::new(item(&c, "grass_liquid"), 60.0)]),
        )
        .unwrap();

        assert_eq!(plan.iterations, 1);
        assert!(!plan.is_complete());
        assert_eq!(plan.invalid_cycles.len(), 1);
        assert_eq!(plan.invalid_cycles[0].reason, CycleFailure::NoExternalDemand);
    }

    // -----------------------------------------------------------------------
    // Test 5: Iteration cap
    // -----------------------------------------------------------------------
    #[test]
    fn endless_alternatives_hit_the_cap() {
        let c = self_loop_catalog(120);
        let err = solve(
            &c,
            &SolveRequest::new(vec![Target::new(item(&c, "bottle"), 60.0)]),
        )
        .unwrap_err();
        assert!(matches!(err, SolveError::MaxIterations(100)));
    }

    #[test]
    fn custom_cap_is_respected() {
        let c = self_loop_catalog(20);
        let config = SolverConfig {
            max_iterations: 5,
            ..SolverConfig::default()
        };
        let err = Solver::with_config(&c, config)
            .solve(&SolveRequest::new(vec![Target::new(item(&c, "bottle"), 60.0)]))
            .unwrap_err();
        assert!(matches!(err, SolveError::MaxIterations(5)));
        assert!(err.to_string().contains("maximum iterations (5)"));
    }

    #[test]
    fn exhausted_alternatives_before_cap_is_best_effort() {
        let c = self_loop_catalog(3);
        let plan = solve(
            &c,
            &SolveRequest::new(vec![Target::new(item(&c, "bottle"), 60.0)]),
        )
        .unwrap();
        // refill_0, refill_1, then refill_2 is the only candidate left.
        assert_eq!(plan.iterations, 3);
        assert_eq!(plan.invalid_cycles[0].reason, CycleFailure::NoSolution);
    }

    // -----------------------------------------------------------------------
    // Test 6: Backtracking order
    // -----------------------------------------------------------------------
    #[test]
    fn highest_index_choice_is_tried_first() {
        let a = ItemId(0);
        let b = ItemId(1);
        let choices = vec![
            RecipeChoice {
                item: a,
                candidates: vec![RecipeId(0), RecipeId(1), RecipeId(2)],
                current_index: 0,
            },
            RecipeChoice {
                item: b,
                candidates: vec![RecipeId(3), RecipeId(4), RecipeId(5)],
                current_index: 1,
            },
        ];
        let invalid = vec![InvalidCycle {
            id: "scc-a-b".to_string(),
            items: vec![a, b],
            reason: CycleFailure::NoSolution,
        }];

        let next = next_constraints(&choices, &invalid, &RecipeConstraints::new()).unwrap();
        assert_eq!(
            next.excluded(b).collect::<Vec<_>>(),
            vec![RecipeId(3), RecipeId(4)]
        );
        assert_eq!(next.excluded(a).count(), 0);
    }

    #[test]
    fn choices_outside_invalid_cycles_are_ignored() {
        let choices = vec![RecipeChoice {
            item: ItemId(7),
            candidates: vec![RecipeId(0), RecipeId(1)],
            current_index: 0,
        }];
        let invalid = vec![InvalidCycle {
            id: "scc-x".to_string(),
            items: vec![ItemId(1)],
            reason: CycleFailure::NoSolution,
        }];
        assert!(next_constraints(&choices, &invalid, &RecipeConstraints::new()).is_none());
    }

    #[test]
    fn default_config() {
        let config = SolverConfig::default();
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.pivot_tolerance, 1e-10);
    }
}
