//! Versioned binary snapshots of finished plans.
//!
//! A snapshot is a `bitcode` encoding of the plan behind a small header
//! carrying a magic number and format version, so stale or foreign blobs
//! are rejected with an error instead of decoding into garbage.

use crate::plan::ProductionDependencyGraph;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a plan snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x5241_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Backtracking iterations the plan took.
    pub iterations: u32,
}

impl SnapshotHeader {
    pub fn new(iterations: u32) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            iterations,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PlanSnapshot {
    header: SnapshotHeader,
    plan: ProductionDependencyGraph,
}

/// Decode only far enough to return the header, without validating it.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    let snapshot: PlanSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

// ---------------------------------------------------------------------------
// Plan serialization
// ---------------------------------------------------------------------------

impl ProductionDependencyGraph {
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let iterations = u32::try_from(self.iterations).unwrap_or(u32::MAX);
        let snapshot = PlanSnapshot {
            header: SnapshotHeader::new(iterations),
            plan: self.clone(),
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Decode a plan, validating the header before returning it.
    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        let snapshot: PlanSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;
        Ok(snapshot.plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{SolveRequest, Target, solve};
    use crate::test_utils::*;

    fn bottle_plan() -> ProductionDependencyGraph {
        let c = bottle_cycle_catalog();
        solve(
            &c,
            &SolveRequest::new(vec![Target::new(item(&c, "filled_bottle"), 60.0)]),
        )
        .unwrap()
    }

    fn encode_with_header(header: SnapshotHeader) -> Vec<u8> {
        bitcode::serialize(&PlanSnapshot {
            header,
            plan: ProductionDependencyGraph::default(),
        })
        .unwrap()
    }

    // -----------------------------------------------------------------------
    // Test 1: Round trip preserves the plan
    // -----------------------------------------------------------------------
    #[test]
    fn round_trip_preserves_plan() {
        let plan = bottle_plan();
        let bytes = plan.serialize().unwrap();
        let restored = ProductionDependencyGraph::deserialize(&bytes).unwrap();
        assert_eq!(restored, plan);
        assert_eq!(restored.cycles.len(), 1);
    }

    // -----------------------------------------------------------------------
    // Test 2: Header is readable on its own
    // -----------------------------------------------------------------------
    #[test]
    fn header_carries_iterations() {
        let plan = bottle_plan();
        let header = read_snapshot_header(&plan.serialize().unwrap()).unwrap();
        assert_eq!(header.magic, SNAPSHOT_MAGIC);
        assert_eq!(header.version, FORMAT_VERSION);
        assert_eq!(header.iterations, 1);
    }

    // -----------------------------------------------------------------------
    // Test 3: Version checks
    // -----------------------------------------------------------------------
    #[test]
    fn future_version_rejected() {
        let mut header = SnapshotHeader::new(1);
        header.version = FORMAT_VERSION + 1;
        let err = ProductionDependencyGraph::deserialize(&encode_with_header(header)).unwrap_err();
        assert!(matches!(err, DeserializeError::FutureVersion(v) if v == FORMAT_VERSION + 1));
    }

    #[test]
    fn past_version_rejected() {
        let mut header = SnapshotHeader::new(1);
        header.version = 0;
        let err = ProductionDependencyGraph::deserialize(&encode_with_header(header)).unwrap_err();
        assert!(matches!(err, DeserializeError::UnsupportedVersion(0)));
    }

    #[test]
    fn bad_magic_rejected() {
        let mut header = SnapshotHeader::new(1);
        header.magic = 0xDEAD_BEEF;
        let err = ProductionDependencyGraph::deserialize(&encode_with_header(header)).unwrap_err();
        assert!(matches!(err, DeserializeError::InvalidMagic(0xDEAD_BEEF)));
    }

    // -----------------------------------------------------------------------
    // Test 4: Garbage input
    // -----------------------------------------------------------------------
    #[test]
    fn empty_data_is_decode_error() {
        let err = ProductionDependencyGraph::deserialize(&[]).unwrap_err();
        assert!(matches!(err, DeserializeError::Decode(_)));
    }

    #[test]
    fn truncated_data_is_decode_error() {
        let bytes = bottle_plan().serialize().unwrap();
        let err = ProductionDependencyGraph::deserialize(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, DeserializeError::Decode(_)));
        assert!(read_snapshot_header(&[0xFF]).is_err());
    }

    #[test]
    fn identical_plans_encode_identically() {
        assert_eq!(
            bottle_plan().serialize().unwrap(),
            bottle_plan().serialize().unwrap()
        );
    }
}
