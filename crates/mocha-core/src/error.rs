use crate::ledger::ContractRef;
use crate::revert::RevertKind;
use alloy_primitives::U256;
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// InvestFailure — the closed failure taxonomy surfaced to callers
// ---------------------------------------------------------------------------

/// Every way an investment session can terminate unsuccessfully.
///
/// Each variant carries enough structured context to render an actionable
/// message without string-parsing ledger errors in the presentation layer.
/// A `TimedOut` kind means the on-ledger outcome is *unknown*, not failed —
/// callers must re-check rather than assume the transaction was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum InvestFailure {
    #[error("tree count {given} is invalid: must be between 1 and {max}")]
    InvalidTreeCount { given: u64, max: u64 },

    #[error("farm not found: {0}")]
    FarmNotFound(u64),

    #[error("farm {0} is not accepting investments")]
    FarmInactive(u64),

    #[error("farm capacity exceeded: {available} tree slot(s) available")]
    CapacityExceeded { available: u64 },

    #[error("{0} is paused")]
    LedgerPaused(ContractRef),

    #[error("{0} does not authorize the configured farm manager")]
    CallerUnauthorized(ContractRef),

    #[error("insufficient balance: need {needed}, have {balance}")]
    InsufficientBalance { needed: U256, balance: U256 },

    #[error("ledger read failed: {0}")]
    ReadFailure(String),

    #[error("approval rejected before broadcast: {0}")]
    ApprovalRejected(String),

    #[error("approval transaction reverted on the ledger")]
    ApprovalReverted,

    #[error("approval not confirmed in time; its on-ledger outcome is unknown")]
    ApprovalTimedOut,

    #[error("purchase rejected before broadcast: {0}")]
    PurchaseRejected(String),

    #[error("purchase transaction reverted on the ledger")]
    PurchaseReverted,

    #[error("purchase not confirmed in time; its on-ledger outcome is unknown")]
    PurchaseTimedOut,

    #[error("gas estimation failed at every configured tier")]
    GasEstimationExhausted,

    #[error("purchase simulation reverted: {0}")]
    SimulationFailed(RevertKind),

    #[error("receipt source unavailable: {0}")]
    WatcherUnavailable(String),

    #[error("session already has a request in flight")]
    SessionBusy,
}

impl InvestFailure {
    /// True when the on-ledger outcome of a submitted transaction is unknown
    /// rather than known-failed.
    pub fn outcome_unknown(&self) -> bool {
        matches!(
            self,
            InvestFailure::ApprovalTimedOut | InvestFailure::PurchaseTimedOut
        )
    }
}

// ---------------------------------------------------------------------------
// LedgerError — transport-level failures from external collaborators
// ---------------------------------------------------------------------------

/// I/O-level failure talking to the ledger or a cache in front of it.
/// Never carries revert semantics; those travel through receipt statuses
/// and simulation results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("could not decode ledger response: {0}")]
    Decode(String),

    #[error("wallet is not connected")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, InvestFailure>;

impl From<LedgerError> for InvestFailure {
    fn from(err: LedgerError) -> Self {
        InvestFailure::ReadFailure(err.to_string())
    }
}
