//! Ratio Core -- production-dependency resolver for factory-building games.
//!
//! Given a catalog of items, recipes, and facilities plus a set of target
//! output rates, the solver works out how many facilities each recipe needs
//! and how fast every item flows, including recipes that feed back into
//! their own inputs.
//!
//! # Solve Pipeline
//!
//! Each call to [`solver::Solver::solve`] runs up to `max_iterations` of:
//!
//! 1. **Build** -- Walk from the targets, selecting one recipe per item, into
//!    a bipartite item/recipe graph ([`bipartite`]).
//! 2. **Detect** -- Find production cycles as strongly-connected components
//!    ([`scc`]).
//! 3. **Condense** -- Collapse each cycle to one node and order the result
//!    topologically ([`condense`]).
//! 4. **Propagate** -- Push demand from targets down to raw materials; solve a
//!    flow-balance system for each cycle ([`flow`], [`cycle`]).
//! 5. **Backtrack** -- If a cycle could not be balanced, exclude the recipe
//!    choices that led to it and go again.
//!
//! ```rust,ignore
//! let catalog = builder.build()?;
//! let request = SolveRequest::new(vec![Target::new(battery, 6.0)]);
//! let plan = Solver::new(&catalog).solve(&request)?;
//! ```
//!
//! # Key Types
//!
//! - [`catalog::Catalog`] -- Immutable item/recipe/facility catalog (frozen
//!   after build).
//! - [`solver::SolveRequest`] -- Targets, recipe overrides, and manual raw
//!   materials.
//! - [`plan::ProductionDependencyGraph`] -- The finished plan.
//! - [`serialize`] -- Versioned plan snapshots via bitcode.

pub mod bipartite;
pub mod catalog;
pub mod condense;
pub mod cycle;
#[cfg(feature = "data-loader")]
pub mod data_loader;
pub mod flow;
pub mod id;
pub mod linear;
pub mod plan;
pub mod scc;
pub mod select;
pub mod serialize;
pub mod solver;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
