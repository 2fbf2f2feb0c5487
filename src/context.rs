use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ledger::{AccountId, PublicKey};
use crate::rates::RateCache;

/// How tool calls are carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AgentMode {
    /// Tools submit operations and return completed results.
    #[default]
    #[serde(rename = "autonomous")]
    Autonomous,
    /// Reserved: return unsigned operation bytes to the caller. No tool supports it yet.
    #[serde(rename = "returnBytes")]
    ReturnBytes,
}

impl fmt::Display for AgentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentMode::Autonomous => write!(f, "autonomous"),
            AgentMode::ReturnBytes => write!(f, "returnBytes"),
        }
    }
}

impl FromStr for AgentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "autonomous" => Ok(AgentMode::Autonomous),
            "returnBytes" | "return_bytes" => Ok(AgentMode::ReturnBytes),
            _ => Err(format!(
                "unknown agent mode: {} (expected autonomous or returnBytes)",
                s
            )),
        }
    }
}

/// Network a client is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerId {
    #[default]
    Testnet,
    Mainnet,
}

impl fmt::Display for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerId::Testnet => write!(f, "testnet"),
            LedgerId::Mainnet => write!(f, "mainnet"),
        }
    }
}

impl FromStr for LedgerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "testnet" => Ok(LedgerId::Testnet),
            "mainnet" => Ok(LedgerId::Mainnet),
            _ => Err(format!(
                "unknown ledger id: {} (expected testnet or mainnet)",
                s
            )),
        }
    }
}

/// Session-scoped defaults shared by every tool call.
///
/// Built once at startup and read-only afterwards; a new session needs a new
/// context.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub mode: AgentMode,
    /// Operator identity used when a call omits its source or owner account.
    pub account_id: Option<AccountId>,
    /// Operator public key, used wherever a key parameter is `true`.
    pub account_public_key: Option<PublicKey>,
    pub rates: Option<Arc<RateCache>>,
}

impl Context {
    pub fn new(mode: AgentMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn with_account_id(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn with_public_key(mut self, key: PublicKey) -> Self {
        self.account_public_key = Some(key);
        self
    }

    pub fn with_rates(mut self, rates: Arc<RateCache>) -> Self {
        self.rates = Some(rates);
        self
    }
}

/// An explicit account wins; otherwise fall back to the operator identity.
pub fn resolve_account(explicit: Option<AccountId>, context: &Context) -> Option<AccountId> {
    explicit.or(context.account_id)
}
