use crate::config::ProtocolConfig;
use alloy_primitives::U256;

// ---------------------------------------------------------------------------
// PricingRule
// ---------------------------------------------------------------------------

/// Fixed price per tree. Pure arithmetic, no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingRule {
    pub tree_price: U256,
}

impl PricingRule {
    pub fn new(tree_price: U256) -> Self {
        Self { tree_price }
    }

    pub fn from_config(config: &ProtocolConfig) -> Self {
        Self::new(U256::from(config.tree_price))
    }

    /// Total cost for `tree_count` trees. `None` on overflow, which callers
    /// treat as an invalid request rather than a panic.
    pub fn cost(&self, tree_count: u64) -> Option<U256> {
        self.tree_price.checked_mul(U256::from(tree_count))
    }

    /// Amount to request on an approval: the cost of the purchase plus an
    /// optional buffer of extra trees' worth, so repeat purchases skip the
    /// approval leg.
    pub fn approval_amount(&self, tree_count: u64, buffer_trees: u64) -> Option<U256> {
        self.cost(tree_count.checked_add(buffer_trees)?)
    }
}

/// Render a smallest-denomination amount as whole bean tokens for display.
pub fn format_beans(amount: U256, decimals: u32) -> String {
    let divisor = U256::from(10u64).pow(U256::from(decimals));
    if divisor.is_zero() {
        return amount.to_string();
    }
    let whole = amount / divisor;
    let frac = amount % divisor;
    if frac.is_zero() {
        format!("{whole}")
    } else {
        let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
        format!("{whole}.{}", frac.trim_end_matches('0'))
    }
}
