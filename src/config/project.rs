use std::path::{Path, PathBuf};

use anyhow::Context as _;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::{AgentMode, Context, LedgerId};
use crate::error::KitError;
use crate::ledger::{AccountId, PublicKey};

/// File name looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "agent-kit.toml";

/// Directory under `$HOME` holding the global `config.toml`.
pub const GLOBAL_CONFIG_DIR: &str = ".ledger-agent-kit";

const ENV_ACCOUNT_ID: &str = "LEDGER_ACCOUNT_ID";
const ENV_PUBLIC_KEY: &str = "LEDGER_PUBLIC_KEY";

/// File-based settings.
///
/// Every field is optional so that a project file can override only part of
/// the global one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Allowed tool methods; absent, empty or `["all"]` exposes every tool
    #[serde(default)]
    pub tools: Option<Vec<String>>,

    #[serde(default)]
    pub agent_mode: Option<AgentMode>,

    /// Operator account
    #[serde(default)]
    pub account_id: Option<AccountId>,

    /// Operator public key, raw or DER hex
    #[serde(default)]
    pub public_key: Option<String>,

    #[serde(default)]
    pub ledger_id: Option<LedgerId>,

    /// USD price of one hbar used to seed the rate cache
    #[serde(default)]
    pub usd_rate: Option<Decimal>,
}

impl ProjectConfig {
    /// Load with precedence: environment > `./agent-kit.toml` >
    /// `~/.ledger-agent-kit/config.toml` > defaults.
    pub fn load() -> Result<Self, KitError> {
        let global = match Self::default_global_path() {
            Ok(path) => Self::load_from(&path)?,
            Err(e) => {
                debug!(error = %e, "no global config location");
                Self::default()
            }
        };
        let project = Self::load_from(Path::new(PROJECT_CONFIG_FILE))?;
        global
            .merge(project)
            .with_env_from(|name| std::env::var(name).ok())
    }

    /// Read one TOML file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, KitError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = toml::from_str(&content).map_err(|e| {
            KitError::Configuration(format!("invalid config file {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn default_global_path() -> Result<PathBuf, KitError> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(GLOBAL_CONFIG_DIR).join("config.toml"))
    }

    /// Fields set in `overlay` replace those in `self`.
    pub fn merge(self, overlay: ProjectConfig) -> Self {
        Self {
            tools: overlay.tools.or(self.tools),
            agent_mode: overlay.agent_mode.or(self.agent_mode),
            account_id: overlay.account_id.or(self.account_id),
            public_key: overlay.public_key.or(self.public_key),
            ledger_id: overlay.ledger_id.or(self.ledger_id),
            usd_rate: overlay.usd_rate.or(self.usd_rate),
        }
    }

    /// Apply `LEDGER_ACCOUNT_ID` and `LEDGER_PUBLIC_KEY` from `lookup`.
    pub fn with_env_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, KitError> {
        if let Some(raw) = lookup(ENV_ACCOUNT_ID).filter(|v| !v.trim().is_empty()) {
            let id = raw
                .trim()
                .parse::<AccountId>()
                .map_err(|e| KitError::Configuration(format!("{}: {}", ENV_ACCOUNT_ID, e)))?;
            self.account_id = Some(id);
        }
        if let Some(raw) = lookup(ENV_PUBLIC_KEY).filter(|v| !v.trim().is_empty()) {
            self.public_key = Some(raw.trim().to_string());
        }
        Ok(self)
    }

    pub fn allowed_tools(&self) -> Vec<String> {
        match &self.tools {
            Some(tools) if !tools.iter().any(|t| t.eq_ignore_ascii_case("all")) => tools
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Build the session context. Rates are attached separately.
    pub fn context(&self) -> Result<Context, KitError> {
        let mut context = Context::new(self.agent_mode.unwrap_or_default());
        if let Some(account_id) = self.account_id {
            context = context.with_account_id(account_id);
        }
        if let Some(raw) = &self.public_key {
            let key = raw
                .parse::<PublicKey>()
                .map_err(|e| KitError::Configuration(format!("public_key: {}", e)))?;
            context = context.with_public_key(key);
        }
        Ok(context)
    }
}

/// Parse a `--tools` value: `all` (or nothing) selects every tool, otherwise a
/// comma separated list of methods.
pub fn parse_tools(value: &str) -> Vec<String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("all") {
        return Vec::new();
    }
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
