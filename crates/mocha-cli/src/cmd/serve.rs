use mocha_core::config::ProtocolConfig;
use mocha_core::ledger::memory::MemoryLedger;
use mocha_server::AppState;
use std::sync::Arc;

pub fn run(config: &ProtocolConfig, ledger: MemoryLedger, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(Arc::new(ledger), config.clone());
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(mocha_server::serve(state, port))
}
