//! Declarative ledger fixtures. A scenario file describes the state of the
//! in-memory ledger — farms, balances, allowances, flags, and scripted
//! submit/receipt outcomes — so the CLI and integration tests can replay a
//! whole investment flow deterministically.

use crate::config::{ConfigError, ProtocolConfig};
use crate::ledger::memory::{MemoryLedger, ReceiptOutcome, SubmitOutcome};
use crate::ledger::ContractRef;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmDef {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub current_trees: u64,
    pub tree_capacity: u64,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDef {
    pub address: Address,
    /// Smallest-denomination balance.
    #[serde(default)]
    pub balance: u128,
    /// Allowance already granted to the farm manager.
    #[serde(default)]
    pub allowance: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcomeDef {
    Accept,
    Reject(String),
    GasEstimation(String),
    Transport(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptOutcomeDef {
    Success,
    Reverted,
    TimedOut,
    Unavailable(String),
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFile {
    /// The connected wallet account.
    pub actor: Address,
    /// Overrides the protocol tree price for the scenario's ledger.
    #[serde(default)]
    pub tree_price: Option<u128>,
    #[serde(default)]
    pub farms: Vec<FarmDef>,
    #[serde(default)]
    pub accounts: Vec<AccountDef>,
    #[serde(default)]
    pub paused: Vec<ContractRef>,
    /// Manager address the land token accepts; defaults to the configured
    /// farm manager (i.e. a healthy pointer).
    #[serde(default)]
    pub authorized_manager: Option<Address>,
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub submit_outcomes: Vec<SubmitOutcomeDef>,
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub receipt_outcomes: Vec<ReceiptOutcomeDef>,
}

impl ScenarioFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&data)?)
    }

    /// Materialize the scenario into a ledger.
    pub fn build(&self, config: &ProtocolConfig) -> MemoryLedger {
        let tree_price = self.tree_price.unwrap_or(config.tree_price);
        let mut builder = MemoryLedger::builder()
            .actor(self.actor)
            .tree_price(U256::from(tree_price))
            .authorized_manager(
                self.authorized_manager
                    .unwrap_or(config.contracts.farm_manager),
            );

        for farm in &self.farms {
            builder = builder
                .farm(
                    farm.id,
                    &farm.name,
                    farm.current_trees,
                    farm.tree_capacity,
                    farm.active,
                )
                .farm_location(farm.id, &farm.location);
        }
        for account in &self.accounts {
            builder = builder.account(
                account.address,
                U256::from(account.balance),
                U256::from(account.allowance),
            );
        }
        for contract in &self.paused {
            builder = builder.paused(*contract);
        }
        for outcome in &self.submit_outcomes {
            builder = builder.script_submit(match outcome {
                SubmitOutcomeDef::Accept => SubmitOutcome::Accept,
                SubmitOutcomeDef::Reject(msg) => SubmitOutcome::Reject(msg.clone()),
                SubmitOutcomeDef::GasEstimation(msg) => SubmitOutcome::GasEstimation(msg.clone()),
                SubmitOutcomeDef::Transport(msg) => SubmitOutcome::Transport(msg.clone()),
            });
        }
        for outcome in &self.receipt_outcomes {
            builder = builder.script_receipt(match outcome {
                ReceiptOutcomeDef::Success => ReceiptOutcome::Success,
                ReceiptOutcomeDef::Reverted => ReceiptOutcome::Reverted,
                ReceiptOutcomeDef::TimedOut => ReceiptOutcome::TimedOut,
                ReceiptOutcomeDef::Unavailable(msg) => ReceiptOutcome::Unavailable(msg.clone()),
            });
        }
        builder.build()
    }
}
