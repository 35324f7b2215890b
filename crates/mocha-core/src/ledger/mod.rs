//! Trait seams for the external collaborators the orchestrator depends on:
//! the wallet, the ledger reader, the transaction submitter, and the receipt
//! source. The ledger itself is an opaque dependency reached only through
//! these traits; the orchestrator never signs and never talks RPC directly.

pub mod memory;

use crate::error::LedgerError;
use crate::farm::{FarmInvestment, FarmSnapshot};
use alloy_primitives::{keccak256, Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ContractRef
// ---------------------------------------------------------------------------

/// The on-ledger contracts the protocol touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractRef {
    BeanToken,
    FarmManager,
    LandToken,
}

impl ContractRef {
    pub fn as_str(self) -> &'static str {
        match self {
            ContractRef::BeanToken => "bean token",
            ContractRef::FarmManager => "farm manager",
            ContractRef::LandToken => "land token",
        }
    }
}

impl fmt::Display for ContractRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TxHandle
// ---------------------------------------------------------------------------

/// Pending handle for a submitted transaction (its hash). Holding a handle
/// does not imply inclusion; only a receipt decides the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHandle(pub B256);

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CallSpec
// ---------------------------------------------------------------------------

/// One signed call to be submitted or simulated. Arguments are already
/// ABI-widened to 256-bit words; the submitter owns the final encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSpec {
    pub target: Address,
    pub selector: [u8; 4],
    pub args: Vec<U256>,
    pub gas_limit: Option<u64>,
}

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn word(address: Address) -> U256 {
    U256::from_be_bytes(address.into_word().0)
}

impl CallSpec {
    /// `approve(spender, amount)` on the bean token.
    pub fn approve(token: Address, spender: Address, amount: U256) -> Self {
        Self {
            target: token,
            selector: selector("approve(address,uint256)"),
            args: vec![word(spender), amount],
            gas_limit: None,
        }
    }

    /// `purchaseTrees(farmId, treeCount)` on the farm manager.
    pub fn purchase_trees(manager: Address, farm_id: u64, tree_count: u64) -> Self {
        Self {
            target: manager,
            selector: selector("purchaseTrees(uint256,uint256)"),
            args: vec![U256::from(farm_id), U256::from(tree_count)],
            gas_limit: None,
        }
    }

    pub fn with_gas_limit(mut self, limit: u64) -> Self {
        self.gas_limit = Some(limit);
        self
    }

    pub fn is_approve(&self) -> bool {
        self.selector == selector("approve(address,uint256)")
    }

    pub fn is_purchase(&self) -> bool {
        self.selector == selector("purchaseTrees(uint256,uint256)")
    }
}

// ---------------------------------------------------------------------------
// Submission / simulation outcomes
// ---------------------------------------------------------------------------

/// Why a submission never reached the mempool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The submitter (wallet) declined the call — signature refused, nonce
    /// conflict, malformed spec.
    Rejected(String),
    /// The node refused the requested gas limit or could not estimate one.
    /// This is the only class the purchase gas-tier fallback retries.
    GasEstimation(String),
    /// Transport failure before the node answered either way.
    Transport(String),
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Rejected(msg) => write!(f, "rejected: {msg}"),
            SubmitError::GasEstimation(msg) => write!(f, "gas estimation: {msg}"),
            SubmitError::Transport(msg) => write!(f, "transport: {msg}"),
        }
    }
}

/// Outcome of an off-chain simulation of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulateError {
    /// The call would revert; carries the raw revert reason string.
    Reverted(String),
    Transport(String),
}

// ---------------------------------------------------------------------------
// TerminalStatus
// ---------------------------------------------------------------------------

/// Terminal status of one submitted transaction. `TimedOut` is local: the
/// session stopped watching, the ledger may still include the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Success,
    Reverted,
    TimedOut,
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminalStatus::Success => "success",
            TerminalStatus::Reverted => "reverted",
            TerminalStatus::TimedOut => "timed_out",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Wallet/account provider. Consumed read-only.
pub trait AccountProvider {
    fn account(&self) -> std::result::Result<Address, LedgerError>;
    fn connected(&self) -> bool;
}

/// Read side of the ledger: snapshots, balances, allowances, and the
/// dependency graph the preconditions walk (pause flags, authorized-caller
/// pointers).
pub trait LedgerReader {
    fn all_farms(&self) -> std::result::Result<Vec<u64>, LedgerError>;

    /// `Ok(None)` means the farm id is unknown to the ledger. Corrupt farm
    /// records (missing or inconsistent numeric fields) must also decode to
    /// `Ok(None)` rather than defaulted values.
    fn farm_snapshot(&self, farm_id: u64)
        -> std::result::Result<Option<FarmSnapshot>, LedgerError>;

    fn farm_investments(
        &self,
        farm_id: u64,
    ) -> std::result::Result<Vec<FarmInvestment>, LedgerError>;

    fn balance_of(&self, owner: Address) -> std::result::Result<U256, LedgerError>;

    fn allowance(
        &self,
        owner: Address,
        spender: Address,
    ) -> std::result::Result<U256, LedgerError>;

    fn paused(&self, contract: ContractRef) -> std::result::Result<bool, LedgerError>;

    /// The manager address a contract accepts mutating calls from.
    fn authorized_manager(
        &self,
        contract: ContractRef,
    ) -> std::result::Result<Address, LedgerError>;
}

/// Submits signed calls and simulates them off-chain. The orchestrator never
/// signs; signing happens behind this seam and may block on user
/// confirmation for an unbounded time.
pub trait Submitter {
    fn submit(&self, call: &CallSpec) -> std::result::Result<TxHandle, SubmitError>;
    fn simulate(&self, call: &CallSpec) -> std::result::Result<(), SimulateError>;
}

/// Blocks (cooperatively) until a handle reaches a terminal status or the
/// timeout elapses. Ordinary non-finality is `Ok(TimedOut)`, never an error;
/// `Err` is reserved for genuine I/O failure talking to the ledger.
pub trait ReceiptSource {
    fn wait_for_receipt(
        &self,
        handle: &TxHandle,
        timeout: Duration,
    ) -> std::result::Result<TerminalStatus, LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approve_selector_is_the_erc20_selector() {
        let call = CallSpec::approve(Address::ZERO, Address::ZERO, U256::from(1));
        // keccak("approve(address,uint256)")[..4]
        assert_eq!(call.selector, [0x09, 0x5e, 0xa7, 0xb3]);
        assert!(call.is_approve());
        assert!(!call.is_purchase());
    }

    #[test]
    fn purchase_call_carries_farm_and_count() {
        let manager: Address = "0x8123E32f4b5240B4B77355c3E5D08EA9253bf51B"
            .parse()
            .unwrap();
        let call = CallSpec::purchase_trees(manager, 7, 25);
        assert_eq!(call.target, manager);
        assert_eq!(call.args, vec![U256::from(7), U256::from(25)]);
        assert!(call.is_purchase());
        assert_eq!(call.gas_limit, None);
        assert_eq!(call.with_gas_limit(300_000).gas_limit, Some(300_000));
    }

    #[test]
    fn approve_widens_spender_to_a_word() {
        let spender: Address = "0x8123E32f4b5240B4B77355c3E5D08EA9253bf51B"
            .parse()
            .unwrap();
        let call = CallSpec::approve(Address::ZERO, spender, U256::from(400));
        assert_eq!(call.args[0], word(spender));
        assert_eq!(call.args[1], U256::from(400));
    }
}
