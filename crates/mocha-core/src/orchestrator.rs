//! The investment orchestrator: a finite-state machine over four external
//! collaborators (reader, submitter, receipt source, wallet). It decides
//! when an approval is required, which gas tier to request, how to classify
//! simulation failures, and when to declare success — and it never submits
//! a purchase against an allowance it has not just re-read.

use crate::attempt::{AttemptKind, GasTier};
use crate::config::ProtocolConfig;
use crate::error::InvestFailure;
use crate::funds;
use crate::ledger::{
    CallSpec, LedgerReader, ReceiptSource, SimulateError, SubmitError, Submitter, TerminalStatus,
};
use crate::pricing::PricingRule;
use crate::revert;
use crate::session::{InvestRequest, InvestSession, SessionPhase};
use crate::validate;
use crate::watcher::ReceiptWatcher;

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<'a, R, S, W>
where
    R: LedgerReader,
    S: Submitter,
    W: ReceiptSource,
{
    reader: &'a R,
    submitter: &'a S,
    receipts: &'a W,
    config: &'a ProtocolConfig,
}

impl<'a, R, S, W> Orchestrator<'a, R, S, W>
where
    R: LedgerReader,
    S: Submitter,
    W: ReceiptSource,
{
    pub fn new(reader: &'a R, submitter: &'a S, receipts: &'a W, config: &'a ProtocolConfig) -> Self {
        Self {
            reader,
            submitter,
            receipts,
            config,
        }
    }

    /// Drive one request from acceptance to a terminal phase. Blocks
    /// cooperatively at each suspension point (reads, submission, receipt
    /// waits). Returns the terminal phase; the session records the full
    /// trail.
    ///
    /// A request into a busy (non-idle, non-terminal) session is rejected
    /// with `SessionBusy` and leaves the session untouched.
    pub fn invest(&self, session: &mut InvestSession, request: InvestRequest) -> SessionPhase {
        if !session.can_accept() {
            tracing::warn!(session = %session.id, "request rejected: session busy");
            return SessionPhase::Failed(InvestFailure::SessionBusy);
        }
        session.accept(request);
        tracing::info!(
            session = %session.id,
            farm = request.farm_id,
            trees = request.tree_count,
            actor = %request.actor,
            "investment session accepted"
        );

        session.set_phase(SessionPhase::Validating);
        let snapshot = match validate::check_preconditions(self.reader, self.config, &request) {
            Ok(snapshot) => snapshot,
            Err(failure) => return self.fail(session, failure),
        };
        session.snapshot = Some(snapshot);

        let pricing = PricingRule::from_config(self.config);
        let cost = match pricing.cost(request.tree_count) {
            Some(cost) => cost,
            None => {
                return self.fail(
                    session,
                    InvestFailure::InvalidTreeCount {
                        given: request.tree_count,
                        max: self.config.max_trees_per_purchase,
                    },
                )
            }
        };

        // Funds loop: resolve, approve if short, then resolve again — the
        // fresh read is the only allowance source of truth (an approval may
        // race with out-of-band changes).
        let mut approvals_confirmed = 0u32;
        loop {
            session.set_phase(SessionPhase::ResolvingFunds);
            let resolved = match funds::resolve(self.reader, self.config, request.actor) {
                Ok(resolved) => resolved,
                Err(failure) => return self.fail(session, failure),
            };
            session.funds = Some(resolved);

            if !resolved.sufficient_balance(cost) {
                return self.fail(
                    session,
                    InvestFailure::InsufficientBalance {
                        needed: cost,
                        balance: resolved.balance,
                    },
                );
            }
            if resolved.sufficient_allowance(cost) {
                session.set_phase(SessionPhase::ReadyToPurchase);
                break;
            }
            if approvals_confirmed > 0 {
                // The approval confirmed but the re-read still comes up
                // short: something out-of-band is competing for the
                // allowance. Surface it instead of looping forever.
                return self.fail(
                    session,
                    InvestFailure::ReadFailure(
                        "allowance still insufficient after a confirmed approval".into(),
                    ),
                );
            }

            session.set_phase(SessionPhase::NeedsApproval);
            if let Err(failure) = self.approval_leg(session, &pricing, &request) {
                return self.fail(session, failure);
            }
            approvals_confirmed += 1;
        }

        self.purchase_leg(session, &request)
    }

    // -----------------------------------------------------------------------
    // Approval leg
    // -----------------------------------------------------------------------

    fn approval_leg(
        &self,
        session: &mut InvestSession,
        pricing: &PricingRule,
        request: &InvestRequest,
    ) -> Result<(), InvestFailure> {
        let amount = pricing
            .approval_amount(request.tree_count, self.config.approval_buffer_trees)
            .ok_or(InvestFailure::InvalidTreeCount {
                given: request.tree_count,
                max: self.config.max_trees_per_purchase,
            })?;
        let call = CallSpec::approve(
            self.config.contracts.bean_token,
            self.config.contracts.farm_manager,
            amount,
        );

        session.set_phase(SessionPhase::Approving);
        let attempt = session.push_attempt(AttemptKind::Approval, GasTier::submitter_default());
        let handle = self
            .submitter
            .submit(&call)
            .map_err(|e| InvestFailure::ApprovalRejected(e.to_string()))?;
        session.attach_handle(attempt, handle);
        tracing::info!(session = %session.id, %handle, %amount, "approval submitted");

        session.set_phase(SessionPhase::AwaitingApprovalReceipt);
        let watcher = ReceiptWatcher::new(self.receipts, self.config);
        let status = watcher.await_terminal(&handle)?;
        session.close_attempt(attempt, status);

        match status {
            TerminalStatus::Success => Ok(()),
            TerminalStatus::Reverted => Err(InvestFailure::ApprovalReverted),
            // The approval may still land later; only this session stops
            // waiting for it.
            TerminalStatus::TimedOut => Err(InvestFailure::ApprovalTimedOut),
        }
    }

    // -----------------------------------------------------------------------
    // Purchase leg
    // -----------------------------------------------------------------------

    fn purchase_leg(&self, session: &mut InvestSession, request: &InvestRequest) -> SessionPhase {
        let base = CallSpec::purchase_trees(
            self.config.contracts.farm_manager,
            request.farm_id,
            request.tree_count,
        );

        // Simulate off-chain first: a doomed submission wastes the actor's
        // execution fee.
        match self.submitter.simulate(&base) {
            Ok(()) => {}
            Err(SimulateError::Reverted(raw)) => {
                let kind = revert::classify(&raw);
                return self.fail(session, InvestFailure::SimulationFailed(kind));
            }
            Err(SimulateError::Transport(msg)) => {
                return self.fail(
                    session,
                    InvestFailure::ReadFailure(format!("simulation: {msg}")),
                )
            }
        }

        let watcher = ReceiptWatcher::new(self.receipts, self.config);
        for (tier, limit) in self.config.purchase_gas_tiers.iter().enumerate() {
            session.set_phase(SessionPhase::Purchasing);
            let attempt = session.push_attempt(AttemptKind::Purchase, GasTier::fixed(tier, *limit));
            let call = base.clone().with_gas_limit(*limit);

            let handle = match self.submitter.submit(&call) {
                Ok(handle) => handle,
                Err(SubmitError::GasEstimation(msg)) => {
                    tracing::warn!(session = %session.id, tier, message = %msg, "gas tier refused");
                    continue;
                }
                Err(e) => {
                    return self.fail(session, InvestFailure::PurchaseRejected(e.to_string()))
                }
            };
            session.attach_handle(attempt, handle);
            tracing::info!(session = %session.id, %handle, tier, gas = limit, "purchase submitted");

            session.set_phase(SessionPhase::AwaitingPurchaseReceipt);
            let status = match watcher.await_terminal(&handle) {
                Ok(status) => status,
                Err(failure) => return self.fail(session, failure),
            };
            session.close_attempt(attempt, status);

            return match status {
                TerminalStatus::Success => {
                    tracing::info!(session = %session.id, %handle, "purchase confirmed");
                    session.set_phase(SessionPhase::Succeeded);
                    SessionPhase::Succeeded
                }
                TerminalStatus::Reverted => self.fail(session, InvestFailure::PurchaseReverted),
                TerminalStatus::TimedOut => self.fail(session, InvestFailure::PurchaseTimedOut),
            };
        }

        self.fail(session, InvestFailure::GasEstimationExhausted)
    }

    fn fail(&self, session: &mut InvestSession, failure: InvestFailure) -> SessionPhase {
        tracing::warn!(session = %session.id, %failure, "investment session failed");
        session.set_phase(SessionPhase::Failed(failure.clone()));
        SessionPhase::Failed(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::{MemoryLedger, ReceiptOutcome, SubmitOutcome};
    use alloy_primitives::{Address, U256};

    fn config() -> ProtocolConfig {
        ProtocolConfig {
            tree_price: 4,
            ..Default::default()
        }
    }

    fn request(actor: Address) -> InvestRequest {
        InvestRequest {
            farm_id: 1,
            tree_count: 100,
            actor,
        }
    }

    fn ledger_for(config: &ProtocolConfig, actor: Address) -> crate::ledger::memory::MemoryLedgerBuilder {
        MemoryLedger::builder()
            .actor(actor)
            .tree_price(U256::from(config.tree_price))
            .farm(1, "Ethiopian Highlands Farm", 0, 2000, true)
            .authorized_manager(config.contracts.farm_manager)
    }

    #[test]
    fn busy_session_rejected_without_clobbering_state() {
        let config = config();
        let actor = Address::repeat_byte(0x11);
        let ledger = ledger_for(&config, actor).build();
        let orchestrator = Orchestrator::new(&ledger, &ledger, &ledger, &config);

        let mut session = InvestSession::new();
        session.accept(request(actor));
        session.set_phase(SessionPhase::AwaitingPurchaseReceipt);

        let phase = orchestrator.invest(&mut session, request(actor));
        assert_eq!(phase, SessionPhase::Failed(InvestFailure::SessionBusy));
        assert_eq!(session.phase(), &SessionPhase::AwaitingPurchaseReceipt);
    }

    #[test]
    fn approval_that_never_grants_does_not_loop() {
        let config = config();
        let actor = Address::repeat_byte(0x11);
        // Approval receipt reports success but the scripted revert keeps the
        // allowance unchanged — orchestrator must bail after one loop.
        let ledger = ledger_for(&config, actor)
            .account(actor, U256::from(1000), U256::ZERO)
            .script_receipt(ReceiptOutcome::Reverted)
            .build();
        let orchestrator = Orchestrator::new(&ledger, &ledger, &ledger, &config);

        let mut session = InvestSession::new();
        let phase = orchestrator.invest(&mut session, request(actor));
        assert_eq!(phase, SessionPhase::Failed(InvestFailure::ApprovalReverted));
        assert_eq!(session.attempts_of(AttemptKind::Purchase), 0);
    }

    #[test]
    fn purchase_rejection_is_not_retried() {
        let config = config();
        let actor = Address::repeat_byte(0x11);
        let ledger = ledger_for(&config, actor)
            .account(actor, U256::from(1000), U256::from(1000))
            .script_submit(SubmitOutcome::Reject("signature declined".into()))
            .build();
        let orchestrator = Orchestrator::new(&ledger, &ledger, &ledger, &config);

        let mut session = InvestSession::new();
        let phase = orchestrator.invest(&mut session, request(actor));
        assert!(matches!(
            phase,
            SessionPhase::Failed(InvestFailure::PurchaseRejected(_))
        ));
        assert_eq!(session.attempts_of(AttemptKind::Purchase), 1);
    }

    #[test]
    fn watcher_outage_during_purchase_is_surfaced() {
        let config = config();
        let actor = Address::repeat_byte(0x11);
        let ledger = ledger_for(&config, actor)
            .account(actor, U256::from(1000), U256::from(1000))
            .script_receipt(ReceiptOutcome::Unavailable("rpc closed".into()))
            .build();
        let orchestrator = Orchestrator::new(&ledger, &ledger, &ledger, &config);

        let mut session = InvestSession::new();
        let phase = orchestrator.invest(&mut session, request(actor));
        assert!(matches!(
            phase,
            SessionPhase::Failed(InvestFailure::WatcherUnavailable(_))
        ));
    }
}
