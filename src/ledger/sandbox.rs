use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::debug;

use super::{
    AccountId, ContractId, ExchangeRate, HbarTransfer, LedgerClient, LedgerError, LedgerOperation,
    PublicKey, ScheduleCreate, ScheduleId, SupplyType, TokenCreate, TokenId, TokenType, TopicId,
    TopicInfo, TransactionId, TransactionReceipt,
};
use crate::context::LedgerId;

const FIRST_ENTITY_NUM: u64 = 1001;
const TINYBARS_PER_HBAR: i64 = 100_000_000;
const MAX_CONTRACT_GAS: u64 = 15_000_000;

/// Accounts that exist on every network from genesis (fee collection and
/// staking reward accounts).
const SYSTEM_ACCOUNTS: [u64; 3] = [98, 800, 801];

struct AccountRecord {
    balance: i64,
    deleted: bool,
    tokens: HashMap<TokenId, u64>,
}

impl AccountRecord {
    fn with_balance(balance: i64) -> Self {
        Self {
            balance,
            deleted: false,
            tokens: HashMap::new(),
        }
    }
}

struct TokenRecord {
    spec: TokenCreate,
    total_supply: u64,
    next_serial: i64,
}

struct TopicRecord {
    memo: Option<String>,
    admin_key: Option<PublicKey>,
    submit_key: Option<PublicKey>,
    sequence_number: u64,
    deleted: bool,
}

#[derive(Default)]
struct ContractRecord {
    calls: u64,
}

struct ScheduleRecord {
    create: ScheduleCreate,
    signatures: usize,
    executed: bool,
    deleted: bool,
}

struct State {
    next_num: u64,
    last_valid_start: (i64, u32),
    accounts: HashMap<AccountId, AccountRecord>,
    tokens: HashMap<TokenId, TokenRecord>,
    topics: HashMap<TopicId, TopicRecord>,
    contracts: HashMap<ContractId, ContractRecord>,
    schedules: HashMap<ScheduleId, ScheduleRecord>,
    submissions: Vec<LedgerOperation>,
}

impl State {
    fn next_entity(&mut self) -> u64 {
        let num = self.next_num;
        self.next_num += 1;
        num
    }

    fn account(&self, id: &AccountId) -> Result<&AccountRecord, LedgerError> {
        match self.accounts.get(id) {
            Some(acct) if acct.deleted => Err(LedgerError::rejected(
                "ACCOUNT_DELETED",
                format!("account {} has been deleted", id),
            )),
            Some(acct) => Ok(acct),
            None => Err(LedgerError::rejected(
                "INVALID_ACCOUNT_ID",
                format!("account {} does not exist", id),
            )),
        }
    }

    fn account_mut(&mut self, id: &AccountId) -> Result<&mut AccountRecord, LedgerError> {
        self.account(id)?;
        self.accounts
            .get_mut(id)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))
    }
}

/// In-process ledger used for local dry runs and tests.
///
/// Executes operations against in-memory state with the same receipt shape a
/// network client produces, and records every submission in order.
pub struct SandboxLedger {
    ledger_id: LedgerId,
    operator: AccountId,
    exchange_rate: Mutex<ExchangeRate>,
    state: Mutex<State>,
}

impl SandboxLedger {
    /// Create a sandbox whose operator holds `operator_hbar` hbar.
    pub fn new(ledger_id: LedgerId, operator: AccountId, operator_hbar: i64) -> Self {
        let mut accounts = HashMap::new();
        for num in SYSTEM_ACCOUNTS {
            accounts.insert(AccountId::new(0, 0, num), AccountRecord::with_balance(0));
        }
        accounts.insert(
            operator,
            AccountRecord::with_balance(operator_hbar.saturating_mul(TINYBARS_PER_HBAR)),
        );

        Self {
            ledger_id,
            operator,
            exchange_rate: Mutex::new(ExchangeRate {
                hbar_equivalent: 1,
                cent_equivalent: 12,
                expiration_time: Utc::now() + Duration::hours(1),
            }),
            state: Mutex::new(State {
                next_num: FIRST_ENTITY_NUM,
                last_valid_start: (0, 0),
                accounts,
                tokens: HashMap::new(),
                topics: HashMap::new(),
                contracts: HashMap::new(),
                schedules: HashMap::new(),
                submissions: Vec::new(),
            }),
        }
    }

    /// Add an account holding `hbar` hbar.
    pub fn with_account(self, account_id: AccountId, hbar: i64) -> Self {
        self.lock()
            .accounts
            .insert(account_id, AccountRecord::with_balance(hbar * TINYBARS_PER_HBAR));
        self
    }

    /// Register an existing token owned by `spec.treasury_account_id`.
    pub fn with_token(self, token_id: TokenId, spec: TokenCreate) -> Self {
        {
            let mut state = self.lock();
            state
                .accounts
                .entry(spec.treasury_account_id)
                .or_insert_with(|| AccountRecord::with_balance(0))
                .tokens
                .insert(token_id, spec.initial_supply);
            let next_serial = spec.initial_supply as i64 + 1;
            state.tokens.insert(
                token_id,
                TokenRecord {
                    total_supply: spec.initial_supply,
                    next_serial,
                    spec,
                },
            );
        }
        self
    }

    /// Register a deployed contract that accepts calls.
    pub fn with_contract(self, contract_id: ContractId) -> Self {
        self.lock().contracts.entry(contract_id).or_default();
        self
    }

    pub fn with_exchange_rate(self, hbar_equivalent: u64, cent_equivalent: u64) -> Self {
        if let Ok(mut rate) = self.exchange_rate.lock() {
            rate.hbar_equivalent = hbar_equivalent;
            rate.cent_equivalent = cent_equivalent;
        }
        self
    }

    pub fn operator(&self) -> AccountId {
        self.operator
    }

    /// Every operation submitted so far, including rejected ones.
    pub fn submissions(&self) -> Vec<LedgerOperation> {
        self.lock().submissions.clone()
    }

    pub fn submission_count(&self) -> usize {
        self.lock().submissions.len()
    }

    /// Minted NFT serials of a token, or total supply in base units for fungible tokens.
    pub fn token_supply(&self, token_id: &TokenId) -> Option<u64> {
        self.lock().tokens.get(token_id).map(|t| t.total_supply)
    }

    pub fn is_schedule_executed(&self, schedule_id: &ScheduleId) -> Option<bool> {
        self.lock().schedules.get(schedule_id).map(|s| s.executed)
    }

    /// Successful calls made to a contract.
    pub fn contract_calls(&self, contract_id: &ContractId) -> Option<u64> {
        self.lock().contracts.get(contract_id).map(|c| c.calls)
    }

    /// Signatures a schedule has collected so far.
    pub fn schedule_signatures(&self, schedule_id: &ScheduleId) -> Option<usize> {
        self.lock().schedules.get(schedule_id).map(|s| s.signatures)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Operations validate before mutating, so a poisoned map is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_transaction_id(&self, state: &mut State) -> TransactionId {
        let now = Utc::now();
        let mut start = (now.timestamp(), now.timestamp_subsec_nanos());
        if start <= state.last_valid_start {
            let (secs, nanos) = state.last_valid_start;
            start = if nanos >= 999_999_999 {
                (secs + 1, 0)
            } else {
                (secs, nanos + 1)
            };
        }
        state.last_valid_start = start;
        TransactionId::new(self.operator, start.0, start.1)
    }

    fn apply(
        &self,
        state: &mut State,
        operation: &LedgerOperation,
        receipt: &mut TransactionReceipt,
    ) -> Result<(), LedgerError> {
        match operation {
            LedgerOperation::CryptoTransfer { hbar_transfers, .. } => {
                apply_transfer(state, hbar_transfers)
            }
            LedgerOperation::AccountCreate {
                initial_balance, ..
            } => {
                if *initial_balance < 0 {
                    return Err(LedgerError::rejected(
                        "INVALID_INITIAL_BALANCE",
                        "initial balance must not be negative",
                    ));
                }
                let payer = state.account(&self.operator)?;
                if payer.balance < *initial_balance {
                    return Err(insufficient_balance(&self.operator));
                }
                let id = AccountId::new(0, 0, state.next_entity());
                state.account_mut(&self.operator)?.balance -= initial_balance;
                state
                    .accounts
                    .insert(id, AccountRecord::with_balance(*initial_balance));
                receipt.account_id = Some(id);
                Ok(())
            }
            LedgerOperation::AccountDelete {
                account_id,
                transfer_account_id,
            } => {
                if account_id == transfer_account_id {
                    return Err(LedgerError::rejected(
                        "TRANSFER_ACCOUNT_SAME_AS_DELETE_ACCOUNT",
                        "transfer account must differ from the deleted account",
                    ));
                }
                state.account(transfer_account_id)?;
                let acct = state.account_mut(account_id)?;
                let balance = acct.balance;
                acct.balance = 0;
                acct.deleted = true;
                state.account_mut(transfer_account_id)?.balance += balance;
                Ok(())
            }
            LedgerOperation::TopicCreate {
                memo,
                admin_key,
                submit_key,
                ..
            } => {
                let id = TopicId::new(0, 0, state.next_entity());
                state.topics.insert(
                    id,
                    TopicRecord {
                        memo: memo.clone(),
                        admin_key: admin_key.clone(),
                        submit_key: submit_key.clone(),
                        sequence_number: 0,
                        deleted: false,
                    },
                );
                receipt.topic_id = Some(id);
                Ok(())
            }
            LedgerOperation::TopicMessageSubmit {
                topic_id, message, ..
            } => {
                if message.is_empty() {
                    return Err(LedgerError::rejected(
                        "INVALID_TOPIC_MESSAGE",
                        "message must not be empty",
                    ));
                }
                let topic = live_topic(state, topic_id)?;
                topic.sequence_number += 1;
                receipt.topic_sequence_number = Some(topic.sequence_number);
                Ok(())
            }
            LedgerOperation::TopicDelete { topic_id } => {
                let topic = live_topic(state, topic_id)?;
                if topic.admin_key.is_none() {
                    return Err(LedgerError::rejected(
                        "UNAUTHORIZED",
                        format!("topic {} has no admin key and cannot be deleted", topic_id),
                    ));
                }
                topic.deleted = true;
                Ok(())
            }
            LedgerOperation::TokenCreate(spec) => {
                if spec.supply_type == SupplyType::Finite
                    && spec.max_supply.is_none_or(|max| max < spec.initial_supply)
                {
                    return Err(LedgerError::rejected(
                        "INVALID_TOKEN_MAX_SUPPLY",
                        "finite tokens need a max supply no smaller than the initial supply",
                    ));
                }
                state.account(&spec.treasury_account_id)?;
                let id = TokenId::new(0, 0, state.next_entity());
                let treasury = state.account_mut(&spec.treasury_account_id)?;
                treasury.tokens.insert(id, spec.initial_supply);
                state.tokens.insert(
                    id,
                    TokenRecord {
                        spec: spec.clone(),
                        total_supply: spec.initial_supply,
                        next_serial: 1,
                    },
                );
                receipt.token_id = Some(id);
                Ok(())
            }
            LedgerOperation::TokenMint { token_id, metadata } => {
                let token = state.tokens.get(token_id).ok_or_else(|| {
                    LedgerError::rejected(
                        "INVALID_TOKEN_ID",
                        format!("token {} does not exist", token_id),
                    )
                })?;
                if token.spec.token_type != TokenType::NonFungibleUnique {
                    return Err(LedgerError::rejected(
                        "INVALID_TOKEN_MINT_METADATA",
                        "metadata can only be minted for non-fungible tokens",
                    ));
                }
                if token.spec.supply_key.is_none() {
                    return Err(LedgerError::rejected(
                        "TOKEN_HAS_NO_SUPPLY_KEY",
                        format!("token {} has no supply key", token_id),
                    ));
                }
                let minted = metadata.len() as u64;
                if let Some(max) = token.spec.max_supply {
                    if token.total_supply + minted > max {
                        return Err(LedgerError::rejected(
                            "TOKEN_MAX_SUPPLY_REACHED",
                            format!("minting {} would exceed max supply {}", minted, max),
                        ));
                    }
                }
                let treasury = token.spec.treasury_account_id;
                state.account(&treasury)?;
                let Some(token) = state.tokens.get_mut(token_id) else {
                    return Err(LedgerError::NotFound(token_id.to_string()));
                };
                let first = token.next_serial;
                token.next_serial += minted as i64;
                token.total_supply += minted;
                receipt.serial_numbers = (first..first + minted as i64).collect();
                receipt.token_id = Some(*token_id);
                let acct = state.account_mut(&treasury)?;
                *acct.tokens.entry(*token_id).or_default() += minted;
                Ok(())
            }
            LedgerOperation::TokenAssociate {
                account_id,
                token_ids,
            } => {
                let acct = state.account(account_id)?;
                let mut seen = HashSet::new();
                for token_id in token_ids {
                    if !state.tokens.contains_key(token_id) {
                        return Err(LedgerError::rejected(
                            "INVALID_TOKEN_ID",
                            format!("token {} does not exist", token_id),
                        ));
                    }
                    if acct.tokens.contains_key(token_id) || !seen.insert(*token_id) {
                        return Err(LedgerError::rejected(
                            "TOKEN_ALREADY_ASSOCIATED_TO_ACCOUNT",
                            format!("token {} is already associated to {}", token_id, account_id),
                        ));
                    }
                }
                let acct = state.account_mut(account_id)?;
                for token_id in token_ids {
                    acct.tokens.insert(*token_id, 0);
                }
                Ok(())
            }
            LedgerOperation::ContractExecute {
                contract_id,
                gas,
                function_parameters,
            } => {
                if *gas == 0 {
                    return Err(LedgerError::rejected("INSUFFICIENT_GAS", "gas must be positive"));
                }
                if *gas > MAX_CONTRACT_GAS {
                    return Err(LedgerError::rejected(
                        "MAX_GAS_LIMIT_EXCEEDED",
                        format!("gas {} exceeds the limit of {}", gas, MAX_CONTRACT_GAS),
                    ));
                }
                if function_parameters.len() < 4 {
                    return Err(LedgerError::rejected(
                        "CONTRACT_REVERT_EXECUTED",
                        "call data has no function selector",
                    ));
                }
                let contract = state.contracts.get_mut(contract_id).ok_or_else(|| {
                    LedgerError::rejected(
                        "INVALID_CONTRACT_ID",
                        format!("contract {} does not exist", contract_id),
                    )
                })?;
                contract.calls += 1;
                receipt.contract_id = Some(*contract_id);
                Ok(())
            }
            LedgerOperation::ScheduleCreate(create) => {
                if !create.scheduled.is_schedulable() {
                    return Err(LedgerError::rejected(
                        "SCHEDULED_TRANSACTION_NOT_IN_WHITELIST",
                        format!("{} cannot be scheduled", create.scheduled.kind()),
                    ));
                }
                if create.wait_for_expiry && create.expiration_time.is_none() {
                    return Err(LedgerError::rejected(
                        "MISSING_EXPIRY_TIME",
                        "wait_for_expiry requires an expiration time",
                    ));
                }
                if let Some(payer) = &create.payer_account_id {
                    state.account(payer)?;
                }
                let id = ScheduleId::new(0, 0, state.next_entity());
                state.schedules.insert(
                    id,
                    ScheduleRecord {
                        create: (**create).clone(),
                        signatures: 0,
                        executed: false,
                        deleted: false,
                    },
                );
                receipt.schedule_id = Some(id);
                Ok(())
            }
            LedgerOperation::ScheduleSign { schedule_id } => {
                let record = pending_schedule(state, schedule_id)?;
                receipt.schedule_id = Some(*schedule_id);
                if record.create.wait_for_expiry {
                    record.signatures += 1;
                    return Ok(());
                }
                let inner = record.create.scheduled.clone();
                let mut inner_receipt = TransactionReceipt {
                    status: "SUCCESS".to_string(),
                    transaction_id: self.next_transaction_id(state),
                    ..Default::default()
                };
                self.apply(state, &inner, &mut inner_receipt)?;
                if let Some(record) = state.schedules.get_mut(schedule_id) {
                    record.signatures += 1;
                    record.executed = true;
                }
                receipt.scheduled_transaction_id = Some(inner_receipt.transaction_id);
                Ok(())
            }
            LedgerOperation::ScheduleDelete { schedule_id } => {
                let record = pending_schedule(state, schedule_id)?;
                if record.create.admin_key.is_none() {
                    return Err(LedgerError::rejected(
                        "SCHEDULE_IS_IMMUTABLE",
                        format!("schedule {} has no admin key", schedule_id),
                    ));
                }
                record.deleted = true;
                receipt.schedule_id = Some(*schedule_id);
                Ok(())
            }
        }
    }
}

fn insufficient_balance(account_id: &AccountId) -> LedgerError {
    LedgerError::rejected(
        "INSUFFICIENT_ACCOUNT_BALANCE",
        format!("account {} has insufficient balance", account_id),
    )
}

fn apply_transfer(state: &mut State, transfers: &[HbarTransfer]) -> Result<(), LedgerError> {
    let mut net: HashMap<AccountId, i64> = HashMap::new();
    let mut sum: i64 = 0;
    for t in transfers {
        *net.entry(t.account_id).or_default() += t.amount;
        sum = sum.checked_add(t.amount).ok_or_else(|| {
            LedgerError::rejected("INVALID_ACCOUNT_AMOUNTS", "transfer amounts overflow")
        })?;
    }
    if sum != 0 {
        return Err(LedgerError::rejected(
            "INVALID_ACCOUNT_AMOUNTS",
            format!("transfer amounts sum to {} instead of zero", sum),
        ));
    }
    for (account_id, delta) in &net {
        let acct = state.account(account_id)?;
        if acct.balance + delta < 0 {
            return Err(insufficient_balance(account_id));
        }
    }
    for (account_id, delta) in net {
        state.account_mut(&account_id)?.balance += delta;
    }
    Ok(())
}

fn live_topic<'a>(state: &'a mut State, topic_id: &TopicId) -> Result<&'a mut TopicRecord, LedgerError> {
    match state.topics.get_mut(topic_id) {
        Some(topic) if !topic.deleted => Ok(topic),
        _ => Err(LedgerError::rejected(
            "INVALID_TOPIC_ID",
            format!("topic {} does not exist", topic_id),
        )),
    }
}

fn pending_schedule<'a>(
    state: &'a mut State,
    schedule_id: &ScheduleId,
) -> Result<&'a mut ScheduleRecord, LedgerError> {
    match state.schedules.get_mut(schedule_id) {
        None => Err(LedgerError::rejected(
            "INVALID_SCHEDULE_ID",
            format!("schedule {} does not exist", schedule_id),
        )),
        Some(s) if s.deleted => Err(LedgerError::rejected(
            "SCHEDULE_ALREADY_DELETED",
            format!("schedule {} was deleted", schedule_id),
        )),
        Some(s) if s.executed => Err(LedgerError::rejected(
            "SCHEDULE_ALREADY_EXECUTED",
            format!("schedule {} has already executed", schedule_id),
        )),
        Some(s) => Ok(s),
    }
}

#[async_trait]
impl LedgerClient for SandboxLedger {
    async fn submit(&self, operation: LedgerOperation) -> Result<TransactionReceipt, LedgerError> {
        let mut state = self.lock();
        state.submissions.push(operation.clone());

        let transaction_id = self.next_transaction_id(&mut state);
        let mut receipt = TransactionReceipt {
            status: "SUCCESS".to_string(),
            transaction_id,
            ..Default::default()
        };
        self.apply(&mut state, &operation, &mut receipt)?;

        debug!(
            operation = operation.kind(),
            transaction_id = %receipt.transaction_id,
            "sandbox operation applied"
        );
        Ok(receipt)
    }

    async fn account_balance(&self, account_id: &AccountId) -> Result<i64, LedgerError> {
        self.lock()
            .accounts
            .get(account_id)
            .filter(|a| !a.deleted)
            .map(|a| a.balance)
            .ok_or_else(|| LedgerError::NotFound(format!("account {}", account_id)))
    }

    async fn topic_info(&self, topic_id: &TopicId) -> Result<TopicInfo, LedgerError> {
        let state = self.lock();
        let topic = state
            .topics
            .get(topic_id)
            .ok_or_else(|| LedgerError::NotFound(format!("topic {}", topic_id)))?;
        Ok(TopicInfo {
            topic_id: *topic_id,
            memo: topic.memo.clone(),
            sequence_number: topic.sequence_number,
            has_admin_key: topic.admin_key.is_some(),
            has_submit_key: topic.submit_key.is_some(),
            deleted: topic.deleted,
        })
    }

    async fn exchange_rate(&self) -> Result<ExchangeRate, LedgerError> {
        self.exchange_rate
            .lock()
            .map(|rate| *rate)
            .map_err(|_| LedgerError::Transport("exchange rate unavailable".to_string()))
    }

    fn ledger_id(&self) -> LedgerId {
        self.ledger_id
    }
}
