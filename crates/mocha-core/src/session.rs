use crate::attempt::{AttemptKind, GasTier, TransactionAttempt};
use crate::error::InvestFailure;
use crate::farm::FarmSnapshot;
use crate::funds::Funds;
use crate::ledger::{TerminalStatus, TxHandle};
use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// InvestRequest
// ---------------------------------------------------------------------------

/// One user request to convert balance into trees. Immutable once accepted
/// by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InvestRequest {
    pub farm_id: u64,
    pub tree_count: u64,
    pub actor: Address,
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// The orchestrator state machine. `Succeeded` and `Failed` are terminal;
/// everything else is driven forward by the completion of exactly one
/// asynchronous operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", content = "failure", rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Validating,
    ResolvingFunds,
    NeedsApproval,
    ReadyToPurchase,
    Approving,
    AwaitingApprovalReceipt,
    Purchasing,
    AwaitingPurchaseReceipt,
    Succeeded,
    Failed(InvestFailure),
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Succeeded | SessionPhase::Failed(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Validating => "validating",
            SessionPhase::ResolvingFunds => "resolving_funds",
            SessionPhase::NeedsApproval => "needs_approval",
            SessionPhase::ReadyToPurchase => "ready_to_purchase",
            SessionPhase::Approving => "approving",
            SessionPhase::AwaitingApprovalReceipt => "awaiting_approval_receipt",
            SessionPhase::Purchasing => "purchasing",
            SessionPhase::AwaitingPurchaseReceipt => "awaiting_purchase_receipt",
            SessionPhase::Succeeded => "succeeded",
            SessionPhase::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Failed(failure) => write!(f, "failed: {failure}"),
            other => f.write_str(other.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// PhaseTransition / SessionObserver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseTransition {
    pub phase: SessionPhase,
    pub entered: DateTime<Utc>,
}

/// Subscription point for the presentation layer. The session owns its
/// state; views only get told when it changes — no view-layer variables,
/// no effect-ordering races.
pub trait SessionObserver: Send + Sync {
    fn phase_changed(&self, session_id: Uuid, phase: &SessionPhase);
}

// ---------------------------------------------------------------------------
// InvestSession
// ---------------------------------------------------------------------------

/// Mutable state for exactly one investment request, owned by one
/// orchestrator run from acceptance to terminal phase. A new request is only
/// accepted while `Idle` or after the previous one terminated.
pub struct InvestSession {
    pub id: Uuid,
    request: Option<InvestRequest>,
    phase: SessionPhase,
    pub phase_history: Vec<PhaseTransition>,
    pub snapshot: Option<FarmSnapshot>,
    pub funds: Option<Funds>,
    attempts: Vec<TransactionAttempt>,
    observers: Vec<Arc<dyn SessionObserver>>,
}

impl Default for InvestSession {
    fn default() -> Self {
        Self::new()
    }
}

impl InvestSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            request: None,
            phase: SessionPhase::Idle,
            phase_history: vec![PhaseTransition {
                phase: SessionPhase::Idle,
                entered: Utc::now(),
            }],
            snapshot: None,
            funds: None,
            attempts: Vec::new(),
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn request(&self) -> Option<&InvestRequest> {
        self.request.as_ref()
    }

    pub fn attempts(&self) -> &[TransactionAttempt] {
        &self.attempts
    }

    pub fn attempts_of(&self, kind: AttemptKind) -> usize {
        self.attempts.iter().filter(|a| a.kind == kind).count()
    }

    /// Whether a new request may enter this session right now.
    pub fn can_accept(&self) -> bool {
        matches!(self.phase, SessionPhase::Idle) || self.phase.is_terminal()
    }

    /// Accept a request, resetting per-request state. A terminal session is
    /// reusable; an in-flight one is not — callers check `can_accept` first
    /// and surface `SessionBusy` otherwise.
    pub fn accept(&mut self, request: InvestRequest) {
        if self.phase.is_terminal() {
            self.id = Uuid::new_v4();
            self.phase = SessionPhase::Idle;
            self.phase_history = vec![PhaseTransition {
                phase: SessionPhase::Idle,
                entered: Utc::now(),
            }];
            self.snapshot = None;
            self.funds = None;
            self.attempts.clear();
        }
        self.request = Some(request);
    }

    /// Single choke point for every transition: history, log line,
    /// observer notifications.
    pub fn set_phase(&mut self, phase: SessionPhase) {
        tracing::debug!(session = %self.id, from = %self.phase, to = %phase, "session transition");
        self.phase = phase.clone();
        self.phase_history.push(PhaseTransition {
            phase: phase.clone(),
            entered: Utc::now(),
        });
        for observer in &self.observers {
            observer.phase_changed(self.id, &phase);
        }
    }

    /// Abandoning is only possible before anything was broadcast; once a
    /// handle exists the ledger may still act on it and the session must
    /// terminate through the state machine instead.
    pub fn abandon(&mut self) -> bool {
        let submitted = self.attempts.iter().any(|a| a.handle.is_some());
        if submitted || self.phase.is_terminal() {
            return false;
        }
        self.request = None;
        self.set_phase(SessionPhase::Idle);
        true
    }

    /// Append a new attempt record and return its index.
    pub fn push_attempt(&mut self, kind: AttemptKind, gas_tier: GasTier) -> usize {
        self.attempts.push(TransactionAttempt::new(kind, gas_tier));
        self.attempts.len() - 1
    }

    pub fn attach_handle(&mut self, index: usize, handle: TxHandle) {
        if let Some(attempt) = self.attempts.get_mut(index) {
            attempt.handle = Some(handle);
        }
    }

    pub fn close_attempt(&mut self, index: usize, status: TerminalStatus) {
        if let Some(attempt) = self.attempts.get_mut(index) {
            attempt.terminal = Some(status);
        }
    }
}

impl fmt::Debug for InvestSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvestSession")
            .field("id", &self.id)
            .field("request", &self.request)
            .field("phase", &self.phase)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn request() -> InvestRequest {
        InvestRequest {
            farm_id: 1,
            tree_count: 10,
            actor: Address::ZERO,
        }
    }

    #[test]
    fn fresh_session_accepts() {
        let session = InvestSession::new();
        assert!(session.can_accept());
        assert_eq!(session.phase(), &SessionPhase::Idle);
    }

    #[test]
    fn in_flight_session_is_busy() {
        let mut session = InvestSession::new();
        session.accept(request());
        session.set_phase(SessionPhase::Validating);
        assert!(!session.can_accept());
    }

    #[test]
    fn terminal_session_resets_on_accept() {
        let mut session = InvestSession::new();
        session.accept(request());
        session.set_phase(SessionPhase::Failed(InvestFailure::SessionBusy));
        let old_id = session.id;

        assert!(session.can_accept());
        session.accept(request());
        assert_ne!(session.id, old_id);
        assert_eq!(session.phase(), &SessionPhase::Idle);
        assert!(session.attempts().is_empty());
    }

    #[test]
    fn abandon_before_submission_only() {
        let mut session = InvestSession::new();
        session.accept(request());
        session.set_phase(SessionPhase::ResolvingFunds);
        assert!(session.abandon());
        assert_eq!(session.phase(), &SessionPhase::Idle);

        session.accept(request());
        let idx = session.push_attempt(AttemptKind::Purchase, GasTier::fixed(0, 300_000));
        session.attach_handle(idx, TxHandle(alloy_primitives::B256::ZERO));
        assert!(!session.abandon());
    }

    #[test]
    fn observers_see_every_transition() {
        struct Recorder(Mutex<Vec<String>>);
        impl SessionObserver for Recorder {
            fn phase_changed(&self, _id: Uuid, phase: &SessionPhase) {
                self.0.lock().unwrap().push(phase.as_str().to_string());
            }
        }

        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let mut session = InvestSession::new();
        session.subscribe(recorder.clone());
        session.set_phase(SessionPhase::Validating);
        session.set_phase(SessionPhase::ResolvingFunds);

        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(seen, vec!["validating", "resolving_funds"]);
    }

    #[test]
    fn attempts_are_append_only() {
        let mut session = InvestSession::new();
        session.accept(request());
        let first = session.push_attempt(AttemptKind::Purchase, GasTier::fixed(0, 300_000));
        session.close_attempt(first, TerminalStatus::Reverted);
        let second = session.push_attempt(AttemptKind::Purchase, GasTier::fixed(1, 1_000_000));

        assert_eq!(session.attempts().len(), 2);
        assert_eq!(session.attempts()[first].terminal, Some(TerminalStatus::Reverted));
        assert!(session.attempts()[second].is_open());
        assert_eq!(session.attempts_of(AttemptKind::Purchase), 2);
    }
}
