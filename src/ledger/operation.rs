use chrono::{DateTime, Utc};

use super::{AccountId, ContractId, PublicKey, ScheduleId, TokenId, TopicId};

/// One signed hbar movement, in tinybars. Negative amounts are debits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbarTransfer {
    pub account_id: AccountId,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    FungibleCommon,
    NonFungibleUnique,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplyType {
    Infinite,
    Finite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCreate {
    pub name: String,
    pub symbol: String,
    pub token_type: TokenType,
    pub decimals: u32,
    /// Base units.
    pub initial_supply: u64,
    pub supply_type: SupplyType,
    /// Base units; required for finite supply.
    pub max_supply: Option<u64>,
    pub treasury_account_id: AccountId,
    pub admin_key: Option<PublicKey>,
    pub supply_key: Option<PublicKey>,
    pub memo: Option<String>,
}

/// Wraps an inner operation so it executes later, once signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleCreate {
    pub scheduled: LedgerOperation,
    pub admin_key: Option<PublicKey>,
    pub payer_account_id: Option<AccountId>,
    pub expiration_time: Option<DateTime<Utc>>,
    pub wait_for_expiry: bool,
    pub memo: Option<String>,
}

/// Operations a ledger client can submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOperation {
    CryptoTransfer {
        hbar_transfers: Vec<HbarTransfer>,
        memo: Option<String>,
    },
    AccountCreate {
        key: PublicKey,
        /// Tinybars.
        initial_balance: i64,
        memo: Option<String>,
        max_automatic_token_associations: i32,
    },
    AccountDelete {
        account_id: AccountId,
        transfer_account_id: AccountId,
    },
    TopicCreate {
        memo: Option<String>,
        admin_key: Option<PublicKey>,
        submit_key: Option<PublicKey>,
        transaction_memo: Option<String>,
    },
    TopicMessageSubmit {
        topic_id: TopicId,
        message: String,
        transaction_memo: Option<String>,
    },
    TopicDelete {
        topic_id: TopicId,
    },
    TokenCreate(TokenCreate),
    /// Mints one NFT per metadata entry.
    TokenMint {
        token_id: TokenId,
        metadata: Vec<Vec<u8>>,
    },
    TokenAssociate {
        account_id: AccountId,
        token_ids: Vec<TokenId>,
    },
    /// Calls a contract function with ABI-encoded arguments.
    ContractExecute {
        contract_id: ContractId,
        gas: u64,
        function_parameters: Vec<u8>,
    },
    ScheduleCreate(Box<ScheduleCreate>),
    ScheduleSign {
        schedule_id: ScheduleId,
    },
    ScheduleDelete {
        schedule_id: ScheduleId,
    },
}

impl LedgerOperation {
    /// Network-level name of the operation.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CryptoTransfer { .. } => "CryptoTransfer",
            Self::AccountCreate { .. } => "CryptoCreateAccount",
            Self::AccountDelete { .. } => "CryptoDelete",
            Self::TopicCreate { .. } => "ConsensusCreateTopic",
            Self::TopicMessageSubmit { .. } => "ConsensusSubmitMessage",
            Self::TopicDelete { .. } => "ConsensusDeleteTopic",
            Self::TokenCreate(_) => "TokenCreate",
            Self::TokenMint { .. } => "TokenMint",
            Self::TokenAssociate { .. } => "TokenAssociateToAccount",
            Self::ContractExecute { .. } => "ContractCall",
            Self::ScheduleCreate(_) => "ScheduleCreate",
            Self::ScheduleSign { .. } => "ScheduleSign",
            Self::ScheduleDelete { .. } => "ScheduleDelete",
        }
    }

    /// Schedule operations cannot themselves be scheduled.
    pub fn is_schedulable(&self) -> bool {
        !matches!(
            self,
            Self::ScheduleCreate(_) | Self::ScheduleSign { .. } | Self::ScheduleDelete { .. }
        )
    }

    pub fn is_schedule_create(&self) -> bool {
        matches!(self, Self::ScheduleCreate(_))
    }
}
