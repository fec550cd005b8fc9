//! Summary statistics and table rows for a solved production plan.
//!
//! Both views are pure functions of a [`ProductionDependencyGraph`] and the
//! catalog it was solved against:
//!
//! - [`collect_stats`] -- power draw, raw material demand, and facility
//!   totals for the whole plan.
//! - [`table::build_production_table`] -- one row per item, ordered from
//!   final products down to raw materials.
//!
//! # Usage
//!
//! ```ignore
//! let plan = Solver::new(&catalog).solve(&request)?;
//! let stats = collect_stats(&plan, &catalog, &request.manual_raw);
//! let rows = build_production_table(&plan, &catalog, &request.overrides, &request.manual_raw);
//! ```

pub mod table;

use ratio_core::catalog::Catalog;
use ratio_core::id::{FacilityId, ItemId};
use ratio_core::plan::{PlanNode, ProductionDependencyGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub use table::{ProductionRow, build_production_table};

/// Facility counts below this are not reported as requirements.
pub const MIN_REPORTED_FACILITY_COUNT: f64 = 0.01;

// ---------------------------------------------------------------------------
// ProductionStats
// ---------------------------------------------------------------------------

/// Plan-wide totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductionStats {
    /// Sum of facility power times facility count over every recipe.
    pub total_power: f64,
    /// Per-minute demand for each raw (or manually raw) item.
    pub raw_materials: BTreeMap<ItemId, f64>,
    /// Items produced in-plan at a positive rate.
    pub unique_production_steps: usize,
    /// Facility instances needed per facility type.
    pub facility_requirements: BTreeMap<FacilityId, f64>,
}

impl ProductionStats {
    pub fn raw_material(&self, item: ItemId) -> f64 {
        self.raw_materials.get(&item).copied().unwrap_or(0.0)
    }

    pub fn facilities_required(&self, facility: FacilityId) -> f64 {
        self.facility_requirements
            .get(&facility)
            .copied()
            .unwrap_or(0.0)
    }
}

/// Collect plan-wide totals. An empty plan yields zeroed stats.
pub fn collect_stats(
    plan: &ProductionDependencyGraph,
    catalog: &Catalog,
    manual_raw: &BTreeSet<ItemId>,
) -> ProductionStats {
    let mut stats = ProductionStats::default();
    if plan.nodes.is_empty() {
        return stats;
    }

    for node in plan.nodes.values() {
        match node {
            PlanNode::Item(node) => {
                if node.is_raw || manual_raw.contains(&node.item) {
                    *stats.raw_materials.entry(node.item).or_insert(0.0) += node.production_rate;
                } else if node.production_rate > 0.0 {
                    stats.unique_production_steps += 1;
                }
            }
            PlanNode::Recipe(node) => {
                let power = catalog
                    .get_facility(node.facility)
                    .map_or(0.0, |f| f.power);
                stats.total_power += power * node.facility_count;

                if node.facility_count >= MIN_REPORTED_FACILITY_COUNT {
                    *stats
                        .facility_requirements
                        .entry(node.facility)
                        .or_insert(0.0) += node.facility_count;
                }
            }
        }
    }

    stats
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
