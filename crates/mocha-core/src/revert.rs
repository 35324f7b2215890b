//! Best-effort classification of raw revert reasons into the failure
//! taxonomy. Matching is an ordered substring table so new reasons are
//! additive entries, not new control flow.

use serde::Serialize;
use std::fmt;

// ---------------------------------------------------------------------------
// RevertKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RevertKind {
    InsufficientBalance,
    InsufficientAllowance,
    CapacityExceeded,
    FarmInactive,
    Paused,
    Unauthorized,
    Unknown { raw: String },
}

impl fmt::Display for RevertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevertKind::InsufficientBalance => f.write_str("insufficient balance"),
            RevertKind::InsufficientAllowance => f.write_str("insufficient allowance"),
            RevertKind::CapacityExceeded => f.write_str("farm capacity exceeded"),
            RevertKind::FarmInactive => f.write_str("farm not active"),
            RevertKind::Paused => f.write_str("contract paused"),
            RevertKind::Unauthorized => f.write_str("caller not authorized"),
            RevertKind::Unknown { raw } => write!(f, "unrecognized revert: {raw}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Matcher table
// ---------------------------------------------------------------------------

struct Matcher {
    needles: &'static [&'static str],
    kind: fn() -> RevertKind,
}

/// Ordered: more specific reasons first. Allowance before balance because
/// ERC20 wording overlaps on "insufficient".
const MATCHERS: &[Matcher] = &[
    Matcher {
        needles: &["insufficient allowance", "exceeds allowance"],
        kind: || RevertKind::InsufficientAllowance,
    },
    Matcher {
        needles: &["insufficient balance", "exceeds balance", "transfer amount exceeds"],
        kind: || RevertKind::InsufficientBalance,
    },
    Matcher {
        needles: &["full capacity", "capacity exceeded", "not enough tree"],
        kind: || RevertKind::CapacityExceeded,
    },
    Matcher {
        needles: &["not active", "farm inactive"],
        kind: || RevertKind::FarmInactive,
    },
    Matcher {
        needles: &["paused"],
        kind: || RevertKind::Paused,
    },
    Matcher {
        needles: &["not authorized", "caller is not", "unauthorized"],
        kind: || RevertKind::Unauthorized,
    },
];

/// Classify a raw revert string. Unrecognized reasons are preserved verbatim
/// in `Unknown` — never guessed at.
pub fn classify(raw: &str) -> RevertKind {
    let haystack = raw.to_ascii_lowercase();
    for matcher in MATCHERS {
        if matcher.needles.iter().any(|n| haystack.contains(n)) {
            return (matcher.kind)();
        }
    }
    RevertKind::Unknown {
        raw: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_erc20_allowance_before_balance() {
        assert_eq!(
            classify("ERC20: insufficient allowance"),
            RevertKind::InsufficientAllowance
        );
        assert_eq!(
            classify("ERC20: transfer amount exceeds balance"),
            RevertKind::InsufficientBalance
        );
    }

    #[test]
    fn classifies_farm_manager_reasons() {
        assert_eq!(classify("Farm is at full capacity"), RevertKind::CapacityExceeded);
        assert_eq!(classify("Farm is not active"), RevertKind::FarmInactive);
        assert_eq!(classify("Pausable: paused"), RevertKind::Paused);
        assert_eq!(
            classify("Ownable: caller is not the owner"),
            RevertKind::Unauthorized
        );
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(classify("FARM IS AT FULL CAPACITY"), RevertKind::CapacityExceeded);
    }

    #[test]
    fn unknown_preserves_raw_reason() {
        let kind = classify("execution reverted: 0xdeadbeef");
        assert_eq!(
            kind,
            RevertKind::Unknown {
                raw: "execution reverted: 0xdeadbeef".to_string()
            }
        );
    }
}
