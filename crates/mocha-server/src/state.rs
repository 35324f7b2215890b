use mocha_core::config::ProtocolConfig;
use mocha_core::ledger::LedgerReader;
use std::sync::Arc;

/// Shared application state passed to all route handlers. The reader is the
/// only ledger access the server has — it serves reads, never submissions.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn LedgerReader + Send + Sync>,
    pub config: Arc<ProtocolConfig>,
}

impl AppState {
    pub fn new(ledger: Arc<dyn LedgerReader + Send + Sync>, config: ProtocolConfig) -> Self {
        Self {
            ledger,
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mocha_core::ledger::memory::MemoryLedger;

    #[test]
    fn state_is_cloneable_and_shares_the_ledger() {
        let ledger = Arc::new(MemoryLedger::builder().farm(1, "Farm", 0, 10, true).build());
        let state = AppState::new(ledger, ProtocolConfig::default());
        let clone = state.clone();
        assert_eq!(clone.ledger.all_farms().unwrap(), vec![1]);
    }
}
