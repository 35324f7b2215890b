//! Deterministic in-memory ledger implementing every collaborator trait.
//!
//! Scripted submit/receipt outcomes make failure paths reproducible; state
//! effects (allowance grants, tree purchases) apply when — and only when — a
//! receipt confirms success, so post-success re-reads observe the new state
//! the same way they would on a real chain.
//!
//! NOTE: Available in all builds to support integration testing and the CLI
//! scenario runner, but should not back a production deployment.

use crate::error::LedgerError;
use crate::farm::{FarmInvestment, FarmSnapshot, SnapshotSource};
use crate::ledger::{
    AccountProvider, CallSpec, ContractRef, LedgerReader, ReceiptSource, SimulateError,
    SubmitError, Submitter, TerminalStatus, TxHandle,
};
use alloy_primitives::{keccak256, Address, B256, U256};
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Scripted outcomes
// ---------------------------------------------------------------------------

/// What the next `submit` call should do. Defaults to `Accept` when the
/// script runs dry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accept,
    Reject(String),
    GasEstimation(String),
    Transport(String),
}

/// What the next `wait_for_receipt` call should report. Defaults to
/// `Success` when the script runs dry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptOutcome {
    Success,
    Reverted,
    TimedOut,
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct FarmRecord {
    name: String,
    location: String,
    active: bool,
    current_trees: u64,
    tree_capacity: u64,
    farmer: Address,
    metadata_uri: String,
}

#[derive(Debug, Clone)]
struct PendingCall {
    spec: CallSpec,
    sender: Address,
}

#[derive(Debug, Default)]
struct Inner {
    farms: HashMap<u64, FarmRecord>,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    paused: HashMap<ContractRef, bool>,
    authorized_manager: Address,
    investments: Vec<FarmInvestment>,
    submit_script: VecDeque<SubmitOutcome>,
    receipt_script: VecDeque<ReceiptOutcome>,
    pending: HashMap<TxHandle, PendingCall>,
    submitted: Vec<CallSpec>,
    read_count: usize,
    next_nonce: u64,
    fail_reads: Option<String>,
}

// ---------------------------------------------------------------------------
// MemoryLedger
// ---------------------------------------------------------------------------

pub struct MemoryLedger {
    inner: Mutex<Inner>,
    actor: Address,
    connected: bool,
    tree_price: U256,
}

impl MemoryLedger {
    pub fn builder() -> MemoryLedgerBuilder {
        MemoryLedgerBuilder::new()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn count_read(&self) -> Result<(), LedgerError> {
        let mut inner = self.inner();
        inner.read_count += 1;
        match &inner.fail_reads {
            Some(msg) => Err(LedgerError::Rpc(msg.clone())),
            None => Ok(()),
        }
    }

    /// Reads performed so far. Lets tests prove a request was rejected
    /// before any read occurred.
    pub fn read_count(&self) -> usize {
        self.inner().read_count
    }

    /// Every call spec that reached `submit`, accepted or not.
    pub fn submitted_calls(&self) -> Vec<CallSpec> {
        self.inner().submitted.clone()
    }

    /// Contract-equivalent evaluation of a purchase call against current
    /// state, with the real revert strings.
    fn evaluate_purchase(&self, call: &CallSpec, sender: Address) -> Result<(), String> {
        let inner = self.inner();
        if *inner.paused.get(&ContractRef::BeanToken).unwrap_or(&false)
            || *inner.paused.get(&ContractRef::FarmManager).unwrap_or(&false)
        {
            return Err("Pausable: paused".into());
        }
        let farm_id: u64 = call.args[0].to::<u64>();
        let count: u64 = call.args[1].to::<u64>();
        let farm = inner
            .farms
            .get(&farm_id)
            .ok_or_else(|| "FarmManager: farm does not exist".to_string())?;
        if !farm.active {
            return Err("Farm is not active".into());
        }
        if farm.current_trees.saturating_add(count) > farm.tree_capacity {
            return Err("Farm is at full capacity".into());
        }
        let cost = self.tree_price.saturating_mul(U256::from(count));
        let allowance = inner
            .allowances
            .get(&(sender, call.target))
            .copied()
            .unwrap_or_default();
        if allowance < cost {
            return Err("ERC20: insufficient allowance".into());
        }
        let balance = inner.balances.get(&sender).copied().unwrap_or_default();
        if balance < cost {
            return Err("ERC20: transfer amount exceeds balance".into());
        }
        Ok(())
    }

    fn apply_success(&self, pending: PendingCall) {
        let mut inner = self.inner();
        let spec = &pending.spec;
        if spec.is_approve() {
            let spender = Address::from_word(B256::from(spec.args[0].to_be_bytes::<32>()));
            let amount = spec.args[1];
            inner.allowances.insert((pending.sender, spender), amount);
        } else if spec.is_purchase() {
            let farm_id: u64 = spec.args[0].to::<u64>();
            let count: u64 = spec.args[1].to::<u64>();
            let cost = self.tree_price.saturating_mul(U256::from(count));
            if let Some(farm) = inner.farms.get_mut(&farm_id) {
                farm.current_trees = farm.current_trees.saturating_add(count);
            }
            let balance = inner.balances.entry(pending.sender).or_default();
            *balance = balance.saturating_sub(cost);
            let allowance = inner
                .allowances
                .entry((pending.sender, spec.target))
                .or_default();
            *allowance = allowance.saturating_sub(cost);
            inner.investments.push(FarmInvestment {
                farm_id,
                investor: pending.sender,
                tree_count: count,
                total_paid: cost,
                timestamp: Utc::now(),
                active: true,
            });
        }
    }
}

impl AccountProvider for MemoryLedger {
    fn account(&self) -> Result<Address, LedgerError> {
        if !self.connected {
            return Err(LedgerError::NotConnected);
        }
        Ok(self.actor)
    }

    fn connected(&self) -> bool {
        self.connected
    }
}

impl LedgerReader for MemoryLedger {
    fn all_farms(&self) -> Result<Vec<u64>, LedgerError> {
        self.count_read()?;
        let mut ids: Vec<u64> = self.inner().farms.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn farm_snapshot(&self, farm_id: u64) -> Result<Option<FarmSnapshot>, LedgerError> {
        self.count_read()?;
        let inner = self.inner();
        Ok(inner.farms.get(&farm_id).map(|farm| FarmSnapshot {
            farm_id,
            name: farm.name.clone(),
            location: farm.location.clone(),
            active: farm.active,
            current_trees: farm.current_trees,
            tree_capacity: farm.tree_capacity,
            farmer: farm.farmer,
            metadata_uri: farm.metadata_uri.clone(),
            fetched_at: Utc::now(),
            source: SnapshotSource::Ledger,
        }))
    }

    fn farm_investments(&self, farm_id: u64) -> Result<Vec<FarmInvestment>, LedgerError> {
        self.count_read()?;
        Ok(self
            .inner()
            .investments
            .iter()
            .filter(|i| i.farm_id == farm_id)
            .cloned()
            .collect())
    }

    fn balance_of(&self, owner: Address) -> Result<U256, LedgerError> {
        self.count_read()?;
        Ok(self.inner().balances.get(&owner).copied().unwrap_or_default())
    }

    fn allowance(&self, owner: Address, spender: Address) -> Result<U256, LedgerError> {
        self.count_read()?;
        Ok(self
            .inner()
            .allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default())
    }

    fn paused(&self, contract: ContractRef) -> Result<bool, LedgerError> {
        self.count_read()?;
        Ok(*self.inner().paused.get(&contract).unwrap_or(&false))
    }

    fn authorized_manager(&self, _contract: ContractRef) -> Result<Address, LedgerError> {
        self.count_read()?;
        Ok(self.inner().authorized_manager)
    }
}

impl Submitter for MemoryLedger {
    fn submit(&self, call: &CallSpec) -> Result<TxHandle, SubmitError> {
        let outcome = {
            let mut inner = self.inner();
            inner.submitted.push(call.clone());
            inner
                .submit_script
                .pop_front()
                .unwrap_or(SubmitOutcome::Accept)
        };
        match outcome {
            SubmitOutcome::Accept => {
                let mut inner = self.inner();
                inner.next_nonce += 1;
                let handle = TxHandle(keccak256(inner.next_nonce.to_be_bytes()));
                inner.pending.insert(
                    handle,
                    PendingCall {
                        spec: call.clone(),
                        sender: self.actor,
                    },
                );
                Ok(handle)
            }
            SubmitOutcome::Reject(msg) => Err(SubmitError::Rejected(msg)),
            SubmitOutcome::GasEstimation(msg) => Err(SubmitError::GasEstimation(msg)),
            SubmitOutcome::Transport(msg) => Err(SubmitError::Transport(msg)),
        }
    }

    fn simulate(&self, call: &CallSpec) -> Result<(), SimulateError> {
        if call.is_purchase() {
            self.evaluate_purchase(call, self.actor)
                .map_err(SimulateError::Reverted)
        } else {
            Ok(())
        }
    }
}

impl ReceiptSource for MemoryLedger {
    fn wait_for_receipt(
        &self,
        handle: &TxHandle,
        _timeout: Duration,
    ) -> Result<TerminalStatus, LedgerError> {
        let (outcome, pending) = {
            let mut inner = self.inner();
            let outcome = inner
                .receipt_script
                .pop_front()
                .unwrap_or(ReceiptOutcome::Success);
            let pending = match outcome {
                // A timed-out watch leaves the transaction pending on-chain.
                ReceiptOutcome::TimedOut | ReceiptOutcome::Unavailable(_) => None,
                _ => inner.pending.remove(handle),
            };
            (outcome, pending)
        };
        match outcome {
            ReceiptOutcome::Success => {
                if let Some(pending) = pending {
                    self.apply_success(pending);
                }
                Ok(TerminalStatus::Success)
            }
            ReceiptOutcome::Reverted => Ok(TerminalStatus::Reverted),
            ReceiptOutcome::TimedOut => Ok(TerminalStatus::TimedOut),
            ReceiptOutcome::Unavailable(msg) => Err(LedgerError::Rpc(msg)),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct MemoryLedgerBuilder {
    inner: Inner,
    actor: Address,
    connected: bool,
    tree_price: U256,
    manager: Address,
}

impl Default for MemoryLedgerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedgerBuilder {
    pub fn new() -> Self {
        let manager = crate::config::ContractAddresses::default().farm_manager;
        Self {
            inner: Inner {
                authorized_manager: manager,
                ..Default::default()
            },
            actor: Address::repeat_byte(0x11),
            connected: true,
            tree_price: U256::from(crate::config::ProtocolConfig::default().tree_price),
            manager,
        }
    }

    pub fn actor(mut self, actor: Address) -> Self {
        self.actor = actor;
        self
    }

    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }

    pub fn tree_price(mut self, price: U256) -> Self {
        self.tree_price = price;
        self
    }

    pub fn farm(
        mut self,
        farm_id: u64,
        name: &str,
        current_trees: u64,
        tree_capacity: u64,
        active: bool,
    ) -> Self {
        self.inner.farms.insert(
            farm_id,
            FarmRecord {
                name: name.to_string(),
                location: String::new(),
                active,
                current_trees,
                tree_capacity,
                farmer: Address::repeat_byte(0xFA),
                metadata_uri: String::new(),
            },
        );
        self
    }

    pub fn farm_location(mut self, farm_id: u64, location: &str) -> Self {
        if let Some(farm) = self.inner.farms.get_mut(&farm_id) {
            location.clone_into(&mut farm.location);
        }
        self
    }

    /// Balance plus the allowance already granted to the farm manager.
    pub fn account(mut self, owner: Address, balance: U256, allowance: U256) -> Self {
        self.inner.balances.insert(owner, balance);
        self.inner.allowances.insert((owner, self.manager), allowance);
        self
    }

    pub fn paused(mut self, contract: ContractRef) -> Self {
        self.inner.paused.insert(contract, true);
        self
    }

    pub fn authorized_manager(mut self, manager: Address) -> Self {
        self.inner.authorized_manager = manager;
        self
    }

    pub fn failing_reads(mut self, message: &str) -> Self {
        self.inner.fail_reads = Some(message.to_string());
        self
    }

    pub fn script_submit(mut self, outcome: SubmitOutcome) -> Self {
        self.inner.submit_script.push_back(outcome);
        self
    }

    pub fn script_receipt(mut self, outcome: ReceiptOutcome) -> Self {
        self.inner.receipt_script.push_back(outcome);
        self
    }

    pub fn build(self) -> MemoryLedger {
        MemoryLedger {
            inner: Mutex::new(self.inner),
            actor: self.actor,
            connected: self.connected,
            tree_price: self.tree_price,
        }
    }
}
