use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

// ---------------------------------------------------------------------------
// ContractAddresses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub bean_token: Address,
    pub farm_manager: Address,
    pub land_token: Address,
}

impl Default for ContractAddresses {
    fn default() -> Self {
        // Scroll Sepolia deployment.
        Self {
            bean_token: addr("0x868BE05289CC245be73e8A461597893f6cb55b70"),
            farm_manager: addr("0x8123E32f4b5240B4B77355c3E5D08EA9253bf51B"),
            land_token: addr("0x289FdEE84aF11DD000Be62C55bC44B1e754681DB"),
        }
    }
}

fn addr(s: &str) -> Address {
    s.parse().unwrap_or(Address::ZERO)
}

// ---------------------------------------------------------------------------
// ProtocolConfig
// ---------------------------------------------------------------------------

/// Protocol parameters for the investment flow. Everything the orchestrator
/// treats as a tunable lives here; nothing is hard-coded per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Price per tree in the bean token's smallest denomination.
    #[serde(default = "default_tree_price")]
    pub tree_price: u128,

    /// Per-request cap on trees.
    #[serde(default = "default_max_trees")]
    pub max_trees_per_purchase: u64,

    /// Extra trees' worth of allowance requested on each approval, to reduce
    /// future re-approvals.
    #[serde(default)]
    pub approval_buffer_trees: u64,

    /// Fixed gas limits tried for the purchase leg, in order. Exactly two
    /// tiers; constants rather than dynamic estimates keep the fallback
    /// deterministic and testable.
    #[serde(default = "default_gas_tiers")]
    pub purchase_gas_tiers: Vec<u64>,

    /// How long one receipt wait may block before the session gives up on
    /// watching (the transaction itself stays pending on the ledger).
    #[serde(default = "default_receipt_timeout_ms")]
    pub receipt_timeout_ms: u64,

    /// Settling delay between a confirmed purchase and the completion signal.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default)]
    pub contracts: ContractAddresses,
}

fn default_tree_price() -> u128 {
    // 4 MBT per tree, 18 decimals.
    4_000_000_000_000_000_000
}

fn default_max_trees() -> u64 {
    500
}

fn default_gas_tiers() -> Vec<u64> {
    vec![300_000, 1_000_000]
}

fn default_receipt_timeout_ms() -> u64 {
    90_000
}

fn default_settle_delay_ms() -> u64 {
    2_000
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            tree_price: default_tree_price(),
            max_trees_per_purchase: default_max_trees(),
            approval_buffer_trees: 0,
            purchase_gas_tiers: default_gas_tiers(),
            receipt_timeout_ms: default_receipt_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            contracts: ContractAddresses::default(),
        }
    }
}

impl ProtocolConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let config: ProtocolConfig = serde_yaml::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tree_price == 0 {
            return Err(ConfigError::Invalid("tree_price must be positive".into()));
        }
        if self.max_trees_per_purchase == 0 {
            return Err(ConfigError::Invalid(
                "max_trees_per_purchase must be positive".into(),
            ));
        }
        if self.purchase_gas_tiers.is_empty() || self.purchase_gas_tiers.len() > 2 {
            return Err(ConfigError::Invalid(
                "purchase_gas_tiers must hold one or two tiers".into(),
            ));
        }
        if !self.purchase_gas_tiers.windows(2).all(|w| w[0] < w[1]) {
            return Err(ConfigError::Invalid(
                "purchase_gas_tiers must be strictly increasing".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = ProtocolConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.purchase_gas_tiers, vec![300_000, 1_000_000]);
        assert_eq!(cfg.max_trees_per_purchase, 500);
    }

    #[test]
    fn non_increasing_tiers_rejected() {
        let cfg = ProtocolConfig {
            purchase_gas_tiers: vec![1_000_000, 300_000],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn more_than_two_tiers_rejected() {
        let cfg = ProtocolConfig {
            purchase_gas_tiers: vec![100, 200, 300],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn yaml_roundtrip_with_partial_fields() {
        let yaml = "tree_price: 4\nmax_trees_per_purchase: 10\n";
        let cfg: ProtocolConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.tree_price, 4);
        assert_eq!(cfg.max_trees_per_purchase, 10);
        // Unspecified fields fall back to defaults.
        assert_eq!(cfg.purchase_gas_tiers, vec![300_000, 1_000_000]);
        assert_eq!(cfg.settle_delay_ms, 2_000);
    }

    #[test]
    fn load_rejects_invalid_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("protocol.yaml");
        std::fs::write(&path, "tree_price: 0\n").unwrap();
        assert!(ProtocolConfig::load(&path).is_err());
    }
}
