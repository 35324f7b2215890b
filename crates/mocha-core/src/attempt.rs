use crate::ledger::{TerminalStatus, TxHandle};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// AttemptKind / GasTier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptKind {
    Approval,
    Purchase,
}

impl fmt::Display for AttemptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttemptKind::Approval => "approval",
            AttemptKind::Purchase => "purchase",
        };
        f.write_str(s)
    }
}

/// Which fixed gas limit a submission requested. `limit: None` delegates
/// estimation to the submitter (approval leg).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GasTier {
    pub index: usize,
    pub limit: Option<u64>,
}

impl GasTier {
    pub fn fixed(index: usize, limit: u64) -> Self {
        Self {
            index,
            limit: Some(limit),
        }
    }

    pub fn submitter_default() -> Self {
        Self {
            index: 0,
            limit: None,
        }
    }
}

// ---------------------------------------------------------------------------
// TransactionAttempt
// ---------------------------------------------------------------------------

/// One submission and its lifecycle to a terminal status. Attempts are
/// append-only: an escalated retry is a new record, never a mutation of a
/// failed one. `handle` stays `None` when the submitter refused the call
/// before broadcast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionAttempt {
    pub id: Uuid,
    pub kind: AttemptKind,
    pub gas_tier: GasTier,
    pub handle: Option<TxHandle>,
    pub submitted_at: DateTime<Utc>,
    pub terminal: Option<TerminalStatus>,
}

impl TransactionAttempt {
    pub fn new(kind: AttemptKind, gas_tier: GasTier) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            gas_tier,
            handle: None,
            submitted_at: Utc::now(),
            terminal: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.terminal.is_none()
    }
}
