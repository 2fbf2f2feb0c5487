use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{AccountId, ContractId, LedgerOperation, ScheduleId, TokenId, TopicId, TransactionId};
use crate::context::LedgerId;

/// Failure reported by the ledger or by the transport in front of it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The ledger processed the operation and rejected it.
    #[error("{status}: {message}")]
    Rejected { status: String, message: String },

    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl LedgerError {
    pub fn rejected(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            status: status.into(),
            message: message.into(),
        }
    }
}

/// Outcome of a submitted operation. Only the fields the operation produces are set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionReceipt {
    pub status: String,
    pub transaction_id: TransactionId,
    pub account_id: Option<AccountId>,
    pub token_id: Option<TokenId>,
    pub topic_id: Option<TopicId>,
    pub contract_id: Option<ContractId>,
    pub schedule_id: Option<ScheduleId>,
    /// Set when signing a schedule caused its inner operation to execute.
    pub scheduled_transaction_id: Option<TransactionId>,
    pub serial_numbers: Vec<i64>,
    pub topic_sequence_number: Option<u64>,
}

/// Exchange rate between hbar and US cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExchangeRate {
    pub hbar_equivalent: u64,
    pub cent_equivalent: u64,
    pub expiration_time: DateTime<Utc>,
}

impl ExchangeRate {
    /// US dollars per one hbar.
    pub fn usd_per_hbar(&self) -> Decimal {
        if self.hbar_equivalent == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.cent_equivalent) / Decimal::from(self.hbar_equivalent) / Decimal::ONE_HUNDRED
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicInfo {
    pub topic_id: TopicId,
    pub memo: Option<String>,
    pub sequence_number: u64,
    pub has_admin_key: bool,
    pub has_submit_key: bool,
    pub deleted: bool,
}

/// Read-only lookups served by the ledger's mirror/read API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    HbarBalance { account_id: AccountId },
    TopicInfo { topic_id: TopicId },
    ExchangeRate,
}

/// The network client this crate drives. Signing, submission and consensus
/// are owned by the implementation.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit an operation and wait for its receipt.
    async fn submit(&self, operation: LedgerOperation) -> Result<TransactionReceipt, LedgerError>;

    /// Hbar balance of an account, in tinybars.
    async fn account_balance(&self, account_id: &AccountId) -> Result<i64, LedgerError>;

    async fn topic_info(&self, topic_id: &TopicId) -> Result<TopicInfo, LedgerError>;

    async fn exchange_rate(&self) -> Result<ExchangeRate, LedgerError>;

    /// Which network this client talks to.
    fn ledger_id(&self) -> LedgerId;
}
