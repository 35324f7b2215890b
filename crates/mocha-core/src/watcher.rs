use crate::config::ProtocolConfig;
use crate::error::{InvestFailure, Result};
use crate::ledger::{ReceiptSource, TerminalStatus, TxHandle};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ReceiptWatcher
// ---------------------------------------------------------------------------

/// Bounded wait for a submitted handle. Terminal statuses pass through
/// untouched — a timeout is an answer, not an error. Only genuine I/O
/// failure talking to the receipt source becomes `WatcherUnavailable`.
pub struct ReceiptWatcher<'a, W: ReceiptSource> {
    source: &'a W,
    timeout: Duration,
}

impl<'a, W: ReceiptSource> ReceiptWatcher<'a, W> {
    pub fn new(source: &'a W, config: &ProtocolConfig) -> Self {
        Self {
            source,
            timeout: Duration::from_millis(config.receipt_timeout_ms),
        }
    }

    pub fn await_terminal(&self, handle: &TxHandle) -> Result<TerminalStatus> {
        tracing::debug!(%handle, timeout_ms = self.timeout.as_millis() as u64, "watching receipt");
        self.source
            .wait_for_receipt(handle, self.timeout)
            .map_err(|e| InvestFailure::WatcherUnavailable(e.to_string()))
    }
}
