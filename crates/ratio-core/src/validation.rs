//! Plan comparison and determinism checking.
//!
//! Provides a structural diff between two plans, an FNV fingerprint for
//! cheap comparison, and a helper that solves the same request twice and
//! reports whether both runs agree.

use crate::catalog::Catalog;
use crate::id::NodeKey;
use crate::plan::{PlanNode, ProductionDependencyGraph};
use crate::serialize::SerializeError;
use crate::solver::{SolveError, SolveRequest, Solver, SolverConfig};

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// FNV-1a hasher over plan contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanHash(pub u64);

impl PlanHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    /// Bit pattern of `v`, so `0.1 + 0.2` and `0.3` hash differently.
    pub fn write_f64(&mut self, v: f64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn write_key(&mut self, key: NodeKey) {
        match key {
            NodeKey::Item(id) => {
                self.write(&[0]);
                self.write_u32(id.0);
            }
            NodeKey::Recipe(id) => {
                self.write(&[1]);
                self.write_u32(id.0);
            }
        }
    }

    pub fn finish(&self) -> u64 {
        self.0
    }
}

impl Default for PlanHash {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash of nodes, edges, cycles, and invalid cycles.
pub fn plan_fingerprint(plan: &ProductionDependencyGraph) -> u64 {
    let mut h = PlanHash::new();
    for (&key, node) in &plan.nodes {
        h.write_key(key);
        match node {
            PlanNode::Item(n) => {
                h.write_f64(n.production_rate);
                h.write(&[n.is_raw as u8, n.is_target as u8]);
            }
            PlanNode::Recipe(n) => {
                h.write_u32(n.facility.0);
                h.write_f64(n.facility_count);
            }
        }
    }
    for edge in &plan.edges {
        h.write_key(edge.from);
        h.write_key(edge.to);
    }
    for cycle in &plan.cycles {
        h.write(cycle.id.as_bytes());
        for node in &cycle.nodes {
            h.write_u32(node.recipe.0);
            h.write_u32(node.item.0);
            h.write_f64(node.facility_count);
        }
    }
    for invalid in &plan.invalid_cycles {
        h.write(invalid.id.as_bytes());
    }
    h.write_u64(plan.iterations as u64);
    h.finish()
}

// ---------------------------------------------------------------------------
// Plan diff
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum NodeDiff {
    OnlyInA(NodeKey),
    OnlyInB(NodeKey),
    Mismatch { node: NodeKey, description: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanDiff {
    pub is_identical: bool,
    pub node_diffs: Vec<NodeDiff>,
    pub edges_match: bool,
    pub cycles_match: bool,
    pub invalid_cycles_match: bool,
    pub iterations_match: bool,
}

fn describe_mismatch(a: &PlanNode, b: &PlanNode) -> Option<String> {
    let mut fields = Vec::new();
    match (a, b) {
        (PlanNode::Item(x), PlanNode::Item(y)) => {
            if x.production_rate.to_bits() != y.production_rate.to_bits() {
                fields.push("production_rate");
            }
            if x.is_raw != y.is_raw {
                fields.push("is_raw");
            }
            if x.is_target != y.is_target {
                fields.push("is_target");
            }
        }
        (PlanNode::Recipe(x), PlanNode::Recipe(y)) => {
            if x.facility != y.facility {
                fields.push("facility");
            }
            if x.facility_count.to_bits() != y.facility_count.to_bits() {
                fields.push("facility_count");
            }
        }
        _ => fields.push("kind"),
    }
    (!fields.is_empty()).then(|| fields.join(", "))
}

/// Compare two plans node by node. Rates are compared bit for bit.
pub fn diff_plans(a: &ProductionDependencyGraph, b: &ProductionDependencyGraph) -> PlanDiff {
    let mut node_diffs = Vec::new();

    for (&key, node_a) in &a.nodes {
        match b.nodes.get(&key) {
            None => node_diffs.push(NodeDiff::OnlyInA(key)),
            Some(node_b) => {
                if let Some(description) = describe_mismatch(node_a, node_b) {
                    node_diffs.push(NodeDiff::Mismatch {
                        node: key,
                        description,
                    });
                }
            }
        }
    }
    for &key in b.nodes.keys() {
        if !a.nodes.contains_key(&key) {
            node_diffs.push(NodeDiff::OnlyInB(key));
        }
    }

    let edges_match = a.edges == b.edges;
    let cycles_match = a.cycles == b.cycles;
    let invalid_cycles_match = a.invalid_cycles == b.invalid_cycles;
    let iterations_match = a.iterations == b.iterations;

    PlanDiff {
        is_identical: node_diffs.is_empty()
            && edges_match
            && cycles_match
            && invalid_cycles_match
            && iterations_match,
        node_diffs,
        edges_match,
        cycles_match,
        invalid_cycles_match,
        iterations_match,
    }
}

// ---------------------------------------------------------------------------
// Determinism validation
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

#[derive(Debug)]
pub struct DeterminismResult {
    pub is_deterministic: bool,
    pub fingerprints: (u64, u64),
    /// Whether both plans encode to the same snapshot bytes.
    pub snapshots_match: bool,
    pub diff: PlanDiff,
}

/// Solve `request` twice and compare the results.
pub fn validate_determinism(
    catalog: &Catalog,
    request: &SolveRequest,
    config: SolverConfig,
) -> Result<DeterminismResult, ValidationError> {
    let solver = Solver::with_config(catalog, config);
    let a = solver.solve(request)?;
    let b = solver.solve(request)?;

    let fingerprints = (plan_fingerprint(&a), plan_fingerprint(&b));
    let snapshots_match = a.serialize()? == b.serialize()?;
    let diff = diff_plans(&a, &b);

    Ok(DeterminismResult {
        is_deterministic: diff.is_identical && fingerprints.0 == fingerprints.1 && snapshots_match,
        fingerprints,
        snapshots_match,
        diff,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::*;
    use crate::solver::{Target, solve};
    use crate::test_utils::*;

    fn battery_plan() -> (Catalog, ProductionDependencyGraph) {
        let c = complex_catalog();
        let plan = solve(
            &c,
            &SolveRequest::new(vec![Target::new(item(&c, "battery"), 6.0)]),
        )
        .unwrap();
        (c, plan)
    }

    // -----------------------------------------------------------------------
    // Test 1: Identical plans have an empty diff
    // -----------------------------------------------------------------------
    #[test]
    fn identical_plans() {
        let (_, a) = battery_plan();
        let (_, b) = battery_plan();
        let diff = diff_plans(&a, &b);
        assert!(diff.is_identical);
        assert!(diff.node_diffs.is_empty());
        assert_eq!(plan_fingerprint(&a), plan_fingerprint(&b));
    }

    // -----------------------------------------------------------------------
    // Test 2: Changed facility count is reported
    // -----------------------------------------------------------------------
    #[test]
    fn facility_count_mismatch_detected() {
        let (c, a) = battery_plan();
        let mut b = a.clone();
        let key = NodeKey::Recipe(recipe(&c, "tools_battery"));
        if let Some(PlanNode::Recipe(node)) = b.nodes.get_mut(&key) {
            node.facility_count = 3.0;
        }

        let diff = diff_plans(&a, &b);
        assert!(!diff.is_identical);
        assert_eq!(
            diff.node_diffs,
            vec![NodeDiff::Mismatch {
                node: key,
                description: "facility_count".to_string(),
            }]
        );
        assert_ne!(plan_fingerprint(&a), plan_fingerprint(&b));
    }

    // -----------------------------------------------------------------------
    // Test 3: Missing nodes on either side
    // -----------------------------------------------------------------------
    #[test]
    fn missing_nodes_detected() {
        let (c, a) = battery_plan();
        let mut b = a.clone();
        let sand = NodeKey::Item(item(&c, "quartz_sand"));
        b.nodes.remove(&sand);

        let diff = diff_plans(&a, &b);
        assert_eq!(diff.node_diffs, vec![NodeDiff::OnlyInA(sand)]);
        let reverse = diff_plans(&b, &a);
        assert_eq!(reverse.node_diffs, vec![NodeDiff::OnlyInB(sand)]);
    }

    #[test]
    fn edge_order_matters() {
        let (_, a) = battery_plan();
        let mut b = a.clone();
        b.edges.reverse();
        let diff = diff_plans(&a, &b);
        assert!(!diff.edges_match);
        assert!(!diff.is_identical);
    }

    // -----------------------------------------------------------------------
    // Test 4: Solving twice is deterministic
    // -----------------------------------------------------------------------
    #[test]
    fn solver_is_deterministic() {
        let c = bottle_cycle_catalog();
        let request = SolveRequest::new(vec![Target::new(item(&c, "filled_bottle"), 60.0)]);
        let result = validate_determinism(&c, &request, SolverConfig::default()).unwrap();
        assert!(result.is_deterministic);
        assert!(result.snapshots_match);
        assert_eq!(result.fingerprints.0, result.fingerprints.1);
    }

    #[test]
    fn validation_propagates_solve_errors() {
        let c = iron_chain_catalog();
        let err =
            validate_determinism(&c, &SolveRequest::default(), SolverConfig::default()).unwrap_err();
        assert!(matches!(err, ValidationError::Solve(SolveError::NoTargets)));
    }

    #[test]
    fn hash_is_order_sensitive() {
        let mut h1 = PlanHash::new();
        h1.write_u32(1);
        h1.write_u32(2);
        let mut h2 = PlanHash::new();
        h2.write_u32(2);
        h2.write_u32(1);
        assert_ne!(h1.finish(), h2.finish());
    }
}
