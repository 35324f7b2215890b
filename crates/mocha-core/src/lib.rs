pub mod attempt;
pub mod config;
pub mod error;
pub mod farm;
pub mod funds;
pub mod ledger;
pub mod orchestrator;
pub mod pricing;
pub mod reconcile;
pub mod revert;
pub mod scenario;
pub mod session;
pub mod snapshot;
pub mod validate;
pub mod watcher;

pub use error::{InvestFailure, LedgerError, Result};
