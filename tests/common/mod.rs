#![allow(dead_code)]

use std::sync::Arc;

use ledger_agent_kit::ledger::{SupplyType, TokenCreate, TokenType};
use ledger_agent_kit::tools::{core_account_plugin, core_token_plugin};
use ledger_agent_kit::{
    AccountId, Configuration, Context, ContractId, Dispatcher, LedgerId, PublicKey, SandboxLedger,
    TokenId,
};

pub const OPERATOR: AccountId = AccountId::new(0, 0, 2);
pub const RECIPIENT: AccountId = AccountId::new(0, 0, 800);
pub const NFT_TOKEN: TokenId = TokenId::new(0, 0, 5005);
pub const ERC20_CONTRACT: ContractId = ContractId::new(0, 0, 6000);

pub const ED25519_RAW: &str = "e0c8ec2758a5879ffac226a13c0c516b799e72e35141a0dd828f94d37988a4b7";

pub fn operator_key() -> PublicKey {
    ED25519_RAW.parse().unwrap()
}

pub fn operator_context() -> Context {
    Context::default()
        .with_account_id(OPERATOR)
        .with_public_key(operator_key())
}

/// Sandbox with a funded operator, an NFT class the operator can mint and an
/// ERC20 contract.
pub fn sandbox() -> Arc<SandboxLedger> {
    let nft = TokenCreate {
        name: "Test Art".to_string(),
        symbol: "ART".to_string(),
        token_type: TokenType::NonFungibleUnique,
        decimals: 0,
        initial_supply: 0,
        supply_type: SupplyType::Finite,
        max_supply: Some(100),
        treasury_account_id: OPERATOR,
        admin_key: Some(operator_key()),
        supply_key: Some(operator_key()),
        memo: None,
    };
    Arc::new(
        SandboxLedger::new(LedgerId::Testnet, OPERATOR, 1_000)
            .with_account(AccountId::new(0, 0, 4242), 10)
            .with_token(NFT_TOKEN, nft)
            .with_contract(ERC20_CONTRACT),
    )
}

/// Account and token plugins, every tool allowed.
pub fn account_and_token_config() -> Configuration {
    Configuration::new(operator_context())
        .with_plugins([core_account_plugin(), core_token_plugin()])
}

/// Every core plugin, every tool allowed.
pub fn core_config() -> Configuration {
    Configuration::new(operator_context()).with_core_plugins()
}

pub fn dispatcher(ledger: &Arc<SandboxLedger>, config: &Configuration) -> Dispatcher {
    Dispatcher::new(ledger.clone(), config).unwrap()
}
