//! Precondition validation. Runs before any transaction is considered:
//! request bounds first (no reads), then the farm snapshot, then the
//! ledger-side dependency graph — pause flags and the authorized-manager
//! pointer the purchase call will traverse.

use crate::config::ProtocolConfig;
use crate::error::{InvestFailure, Result};
use crate::farm::FarmSnapshot;
use crate::ledger::{ContractRef, LedgerReader};
use crate::session::InvestRequest;

/// Bounds check on the raw request. Must reject before any read occurs.
pub fn check_request(config: &ProtocolConfig, request: &InvestRequest) -> Result<()> {
    if request.tree_count == 0 || request.tree_count > config.max_trees_per_purchase {
        return Err(InvestFailure::InvalidTreeCount {
            given: request.tree_count,
            max: config.max_trees_per_purchase,
        });
    }
    Ok(())
}

/// Full precondition pass. Returns the validated snapshot so the session
/// can cache what was actually decided on.
pub fn check_preconditions<R: LedgerReader>(
    reader: &R,
    config: &ProtocolConfig,
    request: &InvestRequest,
) -> Result<FarmSnapshot> {
    check_request(config, request)?;

    let snapshot = reader
        .farm_snapshot(request.farm_id)
        .map_err(|e| InvestFailure::ReadFailure(format!("farm snapshot: {e}")))?
        .ok_or(InvestFailure::FarmNotFound(request.farm_id))?;

    // Fabricated or corrupt capacity numbers never pass validation.
    if !snapshot.source.is_observed() {
        return Err(InvestFailure::ReadFailure(
            "snapshot is fallback data, not a ledger read".into(),
        ));
    }
    if !snapshot.is_consistent() {
        return Err(InvestFailure::FarmNotFound(request.farm_id));
    }

    if !snapshot.active {
        return Err(InvestFailure::FarmInactive(request.farm_id));
    }

    let projected = snapshot.current_trees.saturating_add(request.tree_count);
    if projected > snapshot.tree_capacity {
        return Err(InvestFailure::CapacityExceeded {
            available: snapshot.available_capacity(),
        });
    }

    for contract in [ContractRef::BeanToken, ContractRef::FarmManager] {
        let paused = reader
            .paused(contract)
            .map_err(|e| InvestFailure::ReadFailure(format!("pause flag: {e}")))?;
        if paused {
            return Err(InvestFailure::LedgerPaused(contract));
        }
    }

    // The land token only accepts tree mints from its registered manager;
    // a stale pointer means every purchase would revert on-chain.
    let manager = reader
        .authorized_manager(ContractRef::LandToken)
        .map_err(|e| InvestFailure::ReadFailure(format!("authorized manager: {e}")))?;
    if manager != config.contracts.farm_manager {
        return Err(InvestFailure::CallerUnauthorized(ContractRef::LandToken));
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::MemoryLedger;
    use alloy_primitives::Address;

    fn request(farm_id: u64, tree_count: u64) -> InvestRequest {
        InvestRequest {
            farm_id,
            tree_count,
            actor: Address::repeat_byte(0x11),
        }
    }

    fn ready_ledger(config: &ProtocolConfig) -> MemoryLedger {
        MemoryLedger::builder()
            .farm(1, "Ethiopian Highlands Farm", 1500, 2000, true)
            .authorized_manager(config.contracts.farm_manager)
            .build()
    }

    #[test]
    fn zero_trees_rejected_before_any_read() {
        let config = ProtocolConfig::default();
        let ledger = ready_ledger(&config);

        let err = check_preconditions(&ledger, &config, &request(1, 0)).unwrap_err();
        assert!(matches!(err, InvestFailure::InvalidTreeCount { .. }));
        assert_eq!(ledger.read_count(), 0);
    }

    #[test]
    fn over_cap_rejected_before_any_read() {
        let config = ProtocolConfig::default();
        let ledger = ready_ledger(&config);

        let err = check_preconditions(&ledger, &config, &request(1, 501)).unwrap_err();
        assert!(matches!(err, InvestFailure::InvalidTreeCount { given: 501, .. }));
        assert_eq!(ledger.read_count(), 0);
    }

    #[test]
    fn unknown_farm_is_not_found() {
        let config = ProtocolConfig::default();
        let ledger = ready_ledger(&config);

        let err = check_preconditions(&ledger, &config, &request(99, 10)).unwrap_err();
        assert_eq!(err, InvestFailure::FarmNotFound(99));
    }

    #[test]
    fn inactive_farm_fails_regardless_of_capacity() {
        let config = ProtocolConfig::default();
        let ledger = MemoryLedger::builder()
            .farm(1, "Dormant Farm", 0, 2000, false)
            .authorized_manager(config.contracts.farm_manager)
            .build();

        let err = check_preconditions(&ledger, &config, &request(1, 1)).unwrap_err();
        assert_eq!(err, InvestFailure::FarmInactive(1));
    }

    #[test]
    fn capacity_overflow_reports_available_slots() {
        let config = ProtocolConfig::default();
        let ledger = ready_ledger(&config);

        // 1500 planted of 2000; asking for 501 would overflow by one.
        let err = check_preconditions(&ledger, &config, &request(1, 500)).unwrap_err();
        assert_eq!(err, InvestFailure::CapacityExceeded { available: 500 });
    }

    #[test]
    fn exact_fit_passes() {
        let config = ProtocolConfig::default();
        let ledger = MemoryLedger::builder()
            .farm(1, "Full Fit Farm", 1900, 2000, true)
            .authorized_manager(config.contracts.farm_manager)
            .build();

        let snapshot = check_preconditions(&ledger, &config, &request(1, 100)).unwrap();
        assert_eq!(snapshot.available_capacity(), 100);
    }

    #[test]
    fn paused_token_is_terminal() {
        let config = ProtocolConfig::default();
        let ledger = MemoryLedger::builder()
            .farm(1, "Farm", 0, 2000, true)
            .authorized_manager(config.contracts.farm_manager)
            .paused(ContractRef::BeanToken)
            .build();

        let err = check_preconditions(&ledger, &config, &request(1, 10)).unwrap_err();
        assert_eq!(err, InvestFailure::LedgerPaused(ContractRef::BeanToken));
    }

    #[test]
    fn stale_manager_pointer_is_unauthorized() {
        let config = ProtocolConfig::default();
        let ledger = MemoryLedger::builder()
            .farm(1, "Farm", 0, 2000, true)
            .authorized_manager(Address::repeat_byte(0xAA))
            .build();

        let err = check_preconditions(&ledger, &config, &request(1, 10)).unwrap_err();
        assert_eq!(err, InvestFailure::CallerUnauthorized(ContractRef::LandToken));
    }

    #[test]
    fn corrupt_snapshot_is_treated_as_missing() {
        let config = ProtocolConfig::default();
        let ledger = MemoryLedger::builder()
            .farm(1, "Corrupt Farm", 3000, 2000, true)
            .authorized_manager(config.contracts.farm_manager)
            .build();

        let err = check_preconditions(&ledger, &config, &request(1, 10)).unwrap_err();
        assert_eq!(err, InvestFailure::FarmNotFound(1));
    }
}
