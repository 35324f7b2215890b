use crate::output::{print_json, print_kv};
use anyhow::Context;
use mocha_core::ledger::memory::MemoryLedger;
use mocha_core::ledger::LedgerReader;
use mocha_core::pricing::format_beans;

pub fn list(ledger: &MemoryLedger, json: bool) -> anyhow::Result<()> {
    let ids = ledger.all_farms().context("failed to list farms")?;
    let mut farms = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(snapshot) = ledger.farm_snapshot(id).context("failed to read farm")? {
            farms.push(snapshot);
        }
    }

    if json {
        print_json(&serde_json::json!(farms));
        return Ok(());
    }

    if farms.is_empty() {
        println!("no farms registered");
        return Ok(());
    }
    for farm in &farms {
        let status = if farm.active { "active" } else { "inactive" };
        println!(
            "#{:<4} {:30} {:>6}/{:<6} trees  [{}]",
            farm.farm_id, farm.name, farm.current_trees, farm.tree_capacity, status
        );
    }
    Ok(())
}

pub fn show(ledger: &MemoryLedger, farm_id: u64, json: bool) -> anyhow::Result<()> {
    let snapshot = ledger
        .farm_snapshot(farm_id)
        .context("failed to read farm")?
        .with_context(|| format!("farm {farm_id} not found"))?;

    if json {
        print_json(&serde_json::json!(snapshot));
        return Ok(());
    }

    let investments = ledger
        .farm_investments(farm_id)
        .context("failed to read investments")?;
    let invested: u64 = investments.iter().map(|i| i.tree_count).sum();

    print_kv(&[
        ("farm", format!("#{} {}", snapshot.farm_id, snapshot.name)),
        ("location", snapshot.location.clone()),
        (
            "status",
            if snapshot.active { "active" } else { "inactive" }.to_string(),
        ),
        (
            "trees",
            format!("{}/{}", snapshot.current_trees, snapshot.tree_capacity),
        ),
        ("available", snapshot.available_capacity().to_string()),
        ("farmer", snapshot.farmer.to_string()),
        ("investors", investments.len().to_string()),
        ("trees sold", invested.to_string()),
        (
            "total raised",
            format!(
                "{} MBT",
                format_beans(investments.iter().map(|i| i.total_paid).sum(), 18)
            ),
        ),
    ]);
    Ok(())
}
