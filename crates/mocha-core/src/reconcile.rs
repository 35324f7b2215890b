//! Post-success reconciliation: refresh cached reads and signal the caller
//! to move on. Runs after the state machine has already terminated — nothing
//! here may flip a succeeded session back to failed, because the on-ledger
//! effect already happened.

use crate::config::ProtocolConfig;
use crate::ledger::LedgerReader;
use crate::session::{InvestSession, SessionPhase};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct Reconciler {
    settle_delay: Duration,
}

impl Reconciler {
    pub fn new(config: &ProtocolConfig) -> Self {
        Self {
            settle_delay: Duration::from_millis(config.settle_delay_ms),
        }
    }

    /// Refresh the session's farm snapshot, wait out the settling delay,
    /// then fire the completion hook (the navigation callback) exactly once.
    /// No-op unless the session actually succeeded.
    pub fn run<R, F>(&self, reader: &R, session: &mut InvestSession, on_complete: F)
    where
        R: LedgerReader,
        F: FnOnce(),
    {
        if session.phase() != &SessionPhase::Succeeded {
            return;
        }

        if let Some(request) = session.request().copied() {
            match reader.farm_snapshot(request.farm_id) {
                Ok(Some(snapshot)) => {
                    tracing::debug!(
                        session = %session.id,
                        farm = request.farm_id,
                        trees = snapshot.current_trees,
                        "post-success snapshot refreshed"
                    );
                    session.snapshot = Some(snapshot);
                }
                Ok(None) => {
                    tracing::warn!(farm = request.farm_id, "farm vanished on refresh; keeping last snapshot");
                }
                Err(e) => {
                    // Swallowed: the purchase is already on the ledger.
                    tracing::warn!(error = %e, "post-success refresh failed");
                }
            }
        }

        if !self.settle_delay.is_zero() {
            std::thread::sleep(self.settle_delay);
        }
        on_complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::MemoryLedger;
    use crate::session::InvestRequest;
    use alloy_primitives::Address;
    use std::cell::Cell;

    fn zero_delay_config() -> ProtocolConfig {
        ProtocolConfig {
            settle_delay_ms: 0,
            ..Default::default()
        }
    }

    fn succeeded_session() -> InvestSession {
        let mut session = InvestSession::new();
        session.accept(InvestRequest {
            farm_id: 1,
            tree_count: 5,
            actor: Address::repeat_byte(0x11),
        });
        session.set_phase(SessionPhase::Succeeded);
        session
    }

    #[test]
    fn refreshes_snapshot_and_signals_once() {
        let config = zero_delay_config();
        let ledger = MemoryLedger::builder().farm(1, "Farm", 42, 100, true).build();
        let mut session = succeeded_session();

        let fired = Cell::new(0u32);
        Reconciler::new(&config).run(&ledger, &mut session, || fired.set(fired.get() + 1));

        assert_eq!(fired.get(), 1);
        assert_eq!(session.snapshot.as_ref().unwrap().current_trees, 42);
    }

    #[test]
    fn refresh_failure_never_unsucceeds_the_session() {
        let config = zero_delay_config();
        let ledger = MemoryLedger::builder().failing_reads("rpc down").build();
        let mut session = succeeded_session();

        let fired = Cell::new(false);
        Reconciler::new(&config).run(&ledger, &mut session, || fired.set(true));

        assert!(fired.get());
        assert_eq!(session.phase(), &SessionPhase::Succeeded);
    }

    #[test]
    fn does_nothing_for_failed_sessions() {
        let config = zero_delay_config();
        let ledger = MemoryLedger::builder().farm(1, "Farm", 0, 100, true).build();
        let mut session = InvestSession::new();
        session.set_phase(SessionPhase::Failed(
            crate::error::InvestFailure::PurchaseReverted,
        ));

        let fired = Cell::new(false);
        Reconciler::new(&config).run(&ledger, &mut session, || fired.set(true));

        assert!(!fired.get());
    }
}
