use crate::output::print_json;
use anyhow::{bail, Context};
use mocha_core::config::ProtocolConfig;
use mocha_core::ledger::memory::MemoryLedger;
use mocha_core::ledger::AccountProvider;
use mocha_core::orchestrator::Orchestrator;
use mocha_core::reconcile::Reconciler;
use mocha_core::session::{InvestRequest, InvestSession, SessionObserver, SessionPhase};
use std::sync::Arc;

/// Text-mode observer: one line per state-machine transition.
struct PhaseLogger;

impl SessionObserver for PhaseLogger {
    fn phase_changed(&self, _session_id: uuid::Uuid, phase: &SessionPhase) {
        println!("  → {phase}");
    }
}

pub fn run(
    config: &ProtocolConfig,
    ledger: &MemoryLedger,
    farm_id: u64,
    trees: u64,
    json: bool,
) -> anyhow::Result<()> {
    let actor = ledger.account().context("wallet is not connected")?;
    let request = InvestRequest {
        farm_id,
        tree_count: trees,
        actor,
    };

    let mut session = InvestSession::new();
    if !json {
        println!("investing {trees} tree(s) in farm #{farm_id} as {actor}");
        session.subscribe(Arc::new(PhaseLogger));
    }

    let orchestrator = Orchestrator::new(ledger, ledger, ledger, config);
    let terminal = orchestrator.invest(&mut session, request);

    if terminal == SessionPhase::Succeeded {
        Reconciler::new(config).run(ledger, &mut session, || {
            if !json {
                println!("session complete — returning to farm list");
            }
        });
    }

    if json {
        print_json(&serde_json::json!({
            "session": session.id,
            "terminal": terminal,
            "phases": session.phase_history,
            "attempts": session.attempts(),
            "snapshot": session.snapshot,
        }));
    } else {
        for attempt in session.attempts() {
            let handle = attempt
                .handle
                .map(|h| h.to_string())
                .unwrap_or_else(|| "(not broadcast)".to_string());
            let status = attempt
                .terminal
                .map(|s| s.to_string())
                .unwrap_or_else(|| "open".to_string());
            println!("  {} attempt: {handle} [{status}]", attempt.kind);
        }
    }

    match terminal {
        SessionPhase::Succeeded => Ok(()),
        SessionPhase::Failed(failure) => bail!("investment failed: {failure}"),
        other => bail!("session ended in non-terminal phase {other}"),
    }
}
