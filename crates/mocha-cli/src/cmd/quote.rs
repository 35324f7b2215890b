use crate::output::{print_json, print_kv};
use anyhow::bail;
use mocha_core::config::ProtocolConfig;
use mocha_core::pricing::{format_beans, PricingRule};

pub fn run(config: &ProtocolConfig, trees: u64, json: bool) -> anyhow::Result<()> {
    if trees == 0 || trees > config.max_trees_per_purchase {
        bail!(
            "tree count must be between 1 and {}",
            config.max_trees_per_purchase
        );
    }

    let pricing = PricingRule::from_config(config);
    let Some(cost) = pricing.cost(trees) else {
        bail!("cost overflows for {trees} trees");
    };
    let Some(approval) = pricing.approval_amount(trees, config.approval_buffer_trees) else {
        bail!("approval amount overflows for {trees} trees");
    };

    if json {
        print_json(&serde_json::json!({
            "trees": trees,
            "treePrice": pricing.tree_price,
            "cost": cost,
            "approvalAmount": approval,
            "approvalBufferTrees": config.approval_buffer_trees,
        }));
        return Ok(());
    }

    print_kv(&[
        ("trees", trees.to_string()),
        ("price per tree", format!("{} MBT", format_beans(pricing.tree_price, 18))),
        ("total cost", format!("{} MBT", format_beans(cost, 18))),
        (
            "approval amount",
            format!(
                "{} MBT ({} buffer trees)",
                format_beans(approval, 18),
                config.approval_buffer_trees
            ),
        ),
    ]);
    Ok(())
}
