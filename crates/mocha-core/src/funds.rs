use crate::config::ProtocolConfig;
use crate::error::{InvestFailure, Result};
use crate::ledger::LedgerReader;
use alloy_primitives::{Address, U256};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Funds
// ---------------------------------------------------------------------------

/// The actor's spendable balance and the allowance currently granted to the
/// farm manager. Both are re-read before every purchase attempt — an
/// allowance can change out-of-band at any time, so the read is the only
/// source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Funds {
    pub balance: U256,
    pub allowance: U256,
}

impl Funds {
    pub fn sufficient_balance(&self, cost: U256) -> bool {
        self.balance >= cost
    }

    pub fn sufficient_allowance(&self, cost: U256) -> bool {
        self.allowance >= cost
    }
}

/// Read both numbers for `actor`. Either read failing is fatal for this
/// attempt and surfaced as `ReadFailure` — never retried automatically,
/// never discovered late via an on-chain revert that would waste the
/// actor's execution fee.
pub fn resolve<R: LedgerReader>(
    reader: &R,
    config: &ProtocolConfig,
    actor: Address,
) -> Result<Funds> {
    let balance = reader
        .balance_of(actor)
        .map_err(|e| InvestFailure::ReadFailure(format!("balance: {e}")))?;
    let allowance = reader
        .allowance(actor, config.contracts.farm_manager)
        .map_err(|e| InvestFailure::ReadFailure(format!("allowance: {e}")))?;
    Ok(Funds { balance, allowance })
}
