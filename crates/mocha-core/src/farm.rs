use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// SnapshotSource
// ---------------------------------------------------------------------------

/// Where a snapshot's numbers came from. Only `Ledger` is trustworthy for
/// investment preconditions; `Cache` is a fresh read through the HTTP layer;
/// `Fallback` marks caller-supplied defaults used when no read was possible
/// and is display-only degraded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    Ledger,
    Cache,
    Fallback,
}

impl SnapshotSource {
    /// True when the numbers were actually observed on the ledger (directly
    /// or through the no-cache HTTP layer) rather than fabricated.
    pub fn is_observed(self) -> bool {
        !matches!(self, SnapshotSource::Fallback)
    }
}

impl fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SnapshotSource::Ledger => "ledger",
            SnapshotSource::Cache => "cache",
            SnapshotSource::Fallback => "fallback",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// FarmSnapshot
// ---------------------------------------------------------------------------

/// Point-in-time view of one farm, read fresh before every request. Never
/// mutated locally — capacity only changes by re-fetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmSnapshot {
    pub farm_id: u64,
    pub name: String,
    pub location: String,
    pub active: bool,
    pub current_trees: u64,
    pub tree_capacity: u64,
    pub farmer: Address,
    #[serde(default)]
    pub metadata_uri: String,
    pub fetched_at: DateTime<Utc>,
    pub source: SnapshotSource,
}

impl FarmSnapshot {
    /// Tree slots still open on this farm.
    pub fn available_capacity(&self) -> u64 {
        self.tree_capacity.saturating_sub(self.current_trees)
    }

    /// A snapshot whose counters contradict each other (more trees planted
    /// than capacity) is corrupt and must not back any decision.
    pub fn is_consistent(&self) -> bool {
        self.current_trees <= self.tree_capacity
    }

    /// Display-only stand-in when no read is possible. Visibly degraded:
    /// `source` is `Fallback` and the validator refuses it.
    pub fn fallback(farm_id: u64) -> Self {
        Self {
            farm_id,
            name: format!("Coffee Farm #{farm_id}"),
            location: "unknown".to_string(),
            active: false,
            current_trees: 0,
            tree_capacity: 0,
            farmer: Address::ZERO,
            metadata_uri: String::new(),
            fetched_at: Utc::now(),
            source: SnapshotSource::Fallback,
        }
    }
}

// ---------------------------------------------------------------------------
// FarmInvestment
// ---------------------------------------------------------------------------

/// One recorded purchase on a farm, as reported by the farm manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmInvestment {
    pub farm_id: u64,
    pub investor: Address,
    pub tree_count: u64,
    pub total_paid: U256,
    pub timestamp: DateTime<Utc>,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(current: u64, capacity: u64) -> FarmSnapshot {
        FarmSnapshot {
            farm_id: 1,
            name: "Ethiopian Highlands Farm".into(),
            location: "Yirgacheffe, Ethiopia".into(),
            active: true,
            current_trees: current,
            tree_capacity: capacity,
            farmer: Address::ZERO,
            metadata_uri: String::new(),
            fetched_at: Utc::now(),
            source: SnapshotSource::Ledger,
        }
    }

    #[test]
    fn available_capacity_subtracts() {
        assert_eq!(snapshot(1500, 2000).available_capacity(), 500);
        assert_eq!(snapshot(2000, 2000).available_capacity(), 0);
    }

    #[test]
    fn overplanted_snapshot_is_inconsistent() {
        let s = snapshot(2001, 2000);
        assert!(!s.is_consistent());
        assert_eq!(s.available_capacity(), 0);
    }

    #[test]
    fn fallback_is_not_observed() {
        let s = FarmSnapshot::fallback(9);
        assert_eq!(s.source, SnapshotSource::Fallback);
        assert!(!s.source.is_observed());
        assert!(!s.active);
    }
}
