use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::{Value, json};

use super::{Request, Tool, ToolOutput, scheduled_message};
use crate::context::Context;
use crate::ledger::{LedgerOperation, SupplyType, TokenCreate, TokenId, TokenType};
use crate::normalize::ParamReader;
use crate::plugin::Plugin;
use crate::prompt;
use crate::scheduling;
use crate::units::{self, MAX_DECIMALS};

pub const CREATE_FUNGIBLE_TOKEN: &str = "create_fungible_token";
pub const CREATE_NON_FUNGIBLE_TOKEN: &str = "create_non_fungible_token";
pub const MINT_NON_FUNGIBLE_TOKEN: &str = "mint_non_fungible_token";
pub const ASSOCIATE_TOKEN: &str = "associate_token";

pub const MAX_NFT_URIS: usize = 10;
pub const MAX_NFT_METADATA_BYTES: usize = 100;
const DEFAULT_NFT_MAX_SUPPLY: u64 = 100;
const DEFAULT_FINITE_MAX_SUPPLY: u64 = 1_000_000;

pub fn plugin() -> Plugin {
    Plugin::new("core-token-plugin", |ctx: &Context| -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(CreateFungibleTokenTool::new(ctx)),
            Arc::new(CreateNonFungibleTokenTool::new(ctx)),
            Arc::new(MintNonFungibleTokenTool::new(ctx)),
            Arc::new(AssociateTokenTool::new(ctx)),
        ]
    })
    .with_version("1.0.0")
    .with_description("Token service: create, mint and associate tokens")
}

fn tx_id(output: &ToolOutput) -> String {
    output
        .receipt()
        .map(|r| r.transaction_id.to_string())
        .unwrap_or_default()
}

fn token_created_message(kind: &str, output: &ToolOutput) -> String {
    if let ToolOutput::Scheduled(r) = output {
        return scheduled_message(&format!("{} token creation", kind), r);
    }
    let token = output
        .receipt()
        .and_then(|r| r.token_id)
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "Token created successfully at address {} with transaction id {}",
        token,
        tx_id(output)
    )
}

/// Scale a non-negative display amount into base units.
/// Default finite cap in base units, clamped to the largest supply the ledger
/// can represent when the decimals push it past `i64::MAX`.
fn default_max_supply(decimals: u32) -> u64 {
    units::to_base_units(Decimal::from(DEFAULT_FINITE_MAX_SUPPLY), decimals)
        .map_or(i64::MAX as u64, |n| n.max(0) as u64)
}

fn base_units(args: &mut ParamReader<'_>, field: &str, value: Decimal, decimals: u32) -> u64 {
    if value.is_sign_negative() && !value.is_zero() {
        args.issue(field, "must not be negative");
        return 0;
    }
    match units::to_base_units(value, decimals) {
        Ok(n) => n.max(0) as u64,
        Err(e) => {
            args.issue(field, e.to_string());
            0
        }
    }
}

fn read_supply_type(args: &mut ParamReader<'_>) -> SupplyType {
    let Some(text) = args.optional_string("supply_type") else {
        return SupplyType::Finite;
    };
    match text.trim().to_ascii_lowercase().as_str() {
        "finite" | "1" => SupplyType::Finite,
        "infinite" | "0" => SupplyType::Infinite,
        _ => {
            args.issue("supply_type", format!("must be finite or infinite, got {:?}", text));
            SupplyType::Finite
        }
    }
}

/// Create a fungible token with the operator as treasury by default.
pub struct CreateFungibleTokenTool {
    description: String,
}

impl CreateFungibleTokenTool {
    pub fn new(context: &Context) -> Self {
        let description = prompt::describe(
            context,
            "This tool will create a fungible token.",
            &[
                "token_name (str, required): name of the token".to_string(),
                "token_symbol (str, required): symbol of the token".to_string(),
                "initial_supply (number, optional, default 0): initial supply in display units".to_string(),
                "supply_type (str, optional, default finite): finite or infinite".to_string(),
                format!(
                    "max_supply (number, optional): maximum supply in display units; defaults to {} for finite tokens",
                    DEFAULT_FINITE_MAX_SUPPLY
                ),
                format!("decimals (int, optional, default 0): 0 to {}", MAX_DECIMALS),
                prompt::account_parameter_description("treasury_account_id", context),
                "is_supply_key (bool, optional): set the operator key as supply key".to_string(),
                "token_memo (str, optional): memo stored on the token".to_string(),
            ],
            true,
        );
        Self { description }
    }
}

impl Tool for CreateFungibleTokenTool {
    fn method(&self) -> &str {
        CREATE_FUNGIBLE_TOKEN
    }

    fn name(&self) -> &str {
        "Create Fungible Token"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "token_name": {"type": "string"},
                "token_symbol": {"type": "string"},
                "initial_supply": {"type": ["number", "string"], "default": 0},
                "supply_type": {"type": "string", "enum": ["finite", "infinite"], "default": "finite"},
                "max_supply": {"type": ["number", "string"]},
                "decimals": {"type": "integer", "minimum": 0, "maximum": MAX_DECIMALS, "default": 0},
                "treasury_account_id": {"type": "string"},
                "is_supply_key": {"type": "boolean"},
                "token_memo": {"type": "string"},
                "scheduling_params": scheduling::schema_property()
            },
            "required": ["token_name", "token_symbol"]
        })
    }

    fn is_schedulable(&self) -> bool {
        true
    }

    fn normalize(&self, args: &mut ParamReader<'_>, context: &Context) -> Request {
        let name = args.required_string("token_name");
        let symbol = args.required_string("token_symbol");

        let decimals = match args.optional_integer("decimals") {
            None => 0,
            Some(d) if (0..=i64::from(MAX_DECIMALS)).contains(&d) => d as u32,
            Some(_) => {
                args.issue("decimals", format!("must be between 0 and {}", MAX_DECIMALS));
                0
            }
        };

        let initial = args.optional_decimal("initial_supply").unwrap_or_default();
        let initial_supply = base_units(args, "initial_supply", initial, decimals);

        let supply_type = read_supply_type(args);
        let max_supply = match (supply_type, args.optional_decimal("max_supply")) {
            (SupplyType::Finite, Some(max)) => Some(base_units(args, "max_supply", max, decimals)),
            (SupplyType::Finite, None) => Some(default_max_supply(decimals)),
            (SupplyType::Infinite, Some(_)) => {
                args.issue("max_supply", "cannot be set for an infinite supply token");
                None
            }
            (SupplyType::Infinite, None) => None,
        };
        if let Some(max) = max_supply {
            if max < initial_supply {
                if args.has("max_supply") {
                    args.issue("max_supply", "must not be less than initial_supply");
                } else {
                    args.issue("initial_supply", "exceeds the default max supply");
                }
            }
        }

        let supply_key = match args.optional_bool("is_supply_key") {
            Some(true) => {
                if context.account_public_key.is_none() {
                    args.issue(
                        "is_supply_key",
                        "is true but no operator public key is configured",
                    );
                }
                context.account_public_key.clone()
            }
            _ => None,
        };

        Request::Transaction(LedgerOperation::TokenCreate(TokenCreate {
            name,
            symbol,
            token_type: TokenType::FungibleCommon,
            decimals,
            initial_supply,
            supply_type,
            max_supply,
            treasury_account_id: args.account_or_default("treasury_account_id", context),
            admin_key: context.account_public_key.clone(),
            supply_key,
            memo: args.optional_string("token_memo"),
        }))
    }

    fn human_message(&self, output: &ToolOutput) -> String {
        token_created_message("fungible", output)
    }

    fn action(&self) -> &str {
        "create fungible token"
    }
}

/// Create an NFT class. Always finite supply, with the operator key as supply key.
pub struct CreateNonFungibleTokenTool {
    description: String,
}

impl CreateNonFungibleTokenTool {
    pub fn new(context: &Context) -> Self {
        let description = prompt::describe(
            context,
            "This tool will create a non-fungible token (NFT) class.",
            &[
                "token_name (str, required): name of the token".to_string(),
                "token_symbol (str, required): symbol of the token".to_string(),
                format!(
                    "max_supply (int, optional, default {}): maximum number of NFTs",
                    DEFAULT_NFT_MAX_SUPPLY
                ),
                prompt::account_parameter_description("treasury_account_id", context),
                "token_memo (str, optional): memo stored on the token".to_string(),
            ],
            true,
        );
        Self { description }
    }
}

impl Tool for CreateNonFungibleTokenTool {
    fn method(&self) -> &str {
        CREATE_NON_FUNGIBLE_TOKEN
    }

    fn name(&self) -> &str {
        "Create Non-Fungible Token"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "token_name": {"type": "string"},
                "token_symbol": {"type": "string"},
                "max_supply": {"type": "integer", "minimum": 1, "default": DEFAULT_NFT_MAX_SUPPLY},
                "treasury_account_id": {"type": "string"},
                "token_memo": {"type": "string"},
                "scheduling_params": scheduling::schema_property()
            },
            "required": ["token_name", "token_symbol"]
        })
    }

    fn is_schedulable(&self) -> bool {
        true
    }

    fn normalize(&self, args: &mut ParamReader<'_>, context: &Context) -> Request {
        let name = args.required_string("token_name");
        let symbol = args.required_string("token_symbol");
        let max_supply = match args.optional_integer("max_supply") {
            None => DEFAULT_NFT_MAX_SUPPLY,
            Some(n) if n >= 1 => n as u64,
            Some(_) => {
                args.issue("max_supply", "must be at least 1");
                DEFAULT_NFT_MAX_SUPPLY
            }
        };
        if context.account_public_key.is_none() {
            args.issue(
                "supply_key",
                "an operator public key is required to mint NFTs of this class",
            );
        }

        Request::Transaction(LedgerOperation::TokenCreate(TokenCreate {
            name,
            symbol,
            token_type: TokenType::NonFungibleUnique,
            decimals: 0,
            initial_supply: 0,
            supply_type: SupplyType::Finite,
            max_supply: Some(max_supply),
            treasury_account_id: args.account_or_default("treasury_account_id", context),
            admin_key: context.account_public_key.clone(),
            supply_key: context.account_public_key.clone(),
            memo: args.optional_string("token_memo"),
        }))
    }

    fn human_message(&self, output: &ToolOutput) -> String {
        token_created_message("non-fungible", output)
    }

    fn action(&self) -> &str {
        "create non-fungible token"
    }
}

/// Mint NFTs, one per metadata URI.
pub struct MintNonFungibleTokenTool {
    description: String,
}

impl MintNonFungibleTokenTool {
    pub fn new(context: &Context) -> Self {
        let description = prompt::describe(
            context,
            "This tool will mint NFTs for an existing NFT class.",
            &[
                "token_id (str, required): the NFT class".to_string(),
                format!(
                    "uris (list of str, required): 1 to {} metadata URIs, one NFT each",
                    MAX_NFT_URIS
                ),
            ],
            true,
        );
        Self { description }
    }
}

impl Tool for MintNonFungibleTokenTool {
    fn method(&self) -> &str {
        MINT_NON_FUNGIBLE_TOKEN
    }

    fn name(&self) -> &str {
        "Mint Non-Fungible Token"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "token_id": {"type": "string"},
                "uris": {
                    "type": "array",
                    "items": {"type": "string", "maxLength": MAX_NFT_METADATA_BYTES},
                    "minItems": 1,
                    "maxItems": MAX_NFT_URIS
                },
                "scheduling_params": scheduling::schema_property()
            },
            "required": ["token_id", "uris"]
        })
    }

    fn is_schedulable(&self) -> bool {
        true
    }

    fn normalize(&self, args: &mut ParamReader<'_>, _context: &Context) -> Request {
        let token_id = args.required_id::<TokenId>("token_id");
        let uris = args.string_list("uris", true);
        if uris.len() > MAX_NFT_URIS {
            args.issue("uris", format!("must contain at most {} entries", MAX_NFT_URIS));
        }
        for (i, uri) in uris.iter().enumerate() {
            if uri.len() > MAX_NFT_METADATA_BYTES {
                args.issue(
                    &format!("uris[{}]", i),
                    format!("must be at most {} bytes", MAX_NFT_METADATA_BYTES),
                );
            }
        }

        Request::Transaction(LedgerOperation::TokenMint {
            token_id,
            metadata: uris.into_iter().map(String::into_bytes).collect(),
        })
    }

    fn human_message(&self, output: &ToolOutput) -> String {
        match output {
            ToolOutput::Scheduled(r) => scheduled_message("NFT mint", r),
            _ => {
                let serials = output
                    .receipt()
                    .map(|r| {
                        r.serial_numbers
                            .iter()
                            .map(i64::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default();
                format!(
                    "Token successfully minted.\nTransaction ID: {}\nSerial numbers: {}",
                    tx_id(output),
                    serials
                )
            }
        }
    }

    fn action(&self) -> &str {
        "mint non-fungible token"
    }
}

/// Associate tokens with an account so it can hold them.
pub struct AssociateTokenTool {
    description: String,
}

impl AssociateTokenTool {
    pub fn new(context: &Context) -> Self {
        let description = prompt::describe(
            context,
            "This tool will associate one or more tokens with an account.",
            &[
                prompt::account_parameter_description("account_id", context),
                "token_ids (list of str, required): tokens to associate".to_string(),
            ],
            true,
        );
        Self { description }
    }
}

impl Tool for AssociateTokenTool {
    fn method(&self) -> &str {
        ASSOCIATE_TOKEN
    }

    fn name(&self) -> &str {
        "Associate Token"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "account_id": {"type": "string"},
                "token_ids": {"type": "array", "items": {"type": "string"}, "minItems": 1},
                "scheduling_params": scheduling::schema_property()
            },
            "required": ["token_ids"]
        })
    }

    fn is_schedulable(&self) -> bool {
        true
    }

    fn normalize(&self, args: &mut ParamReader<'_>, context: &Context) -> Request {
        Request::Transaction(LedgerOperation::TokenAssociate {
            account_id: args.account_or_default("account_id", context),
            token_ids: args.id_list::<TokenId>("token_ids", true),
        })
    }

    fn human_message(&self, output: &ToolOutput) -> String {
        match output {
            ToolOutput::Scheduled(r) => scheduled_message("token association", r),
            _ => format!(
                "Tokens successfully associated with account.\nTransaction ID: {}",
                tx_id(output)
            ),
        }
    }

    fn action(&self) -> &str {
        "associate token"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AccountId, PublicKey};
    use crate::tools::normalize_params;

    const ED25519_RAW: &str = "e0c8ec2758a5879ffac226a13c0c516b799e72e35141a0dd828f94d37988a4b7";

    fn ctx() -> Context {
        let key: PublicKey = ED25519_RAW.parse().unwrap();
        Context::default()
            .with_account_id(AccountId::new(0, 0, 2))
            .with_public_key(key)
    }

    fn token_create(request: Request) -> TokenCreate {
        match request {
            Request::Transaction(LedgerOperation::TokenCreate(spec)) => spec,
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn fungible_supply_scales_by_decimals() {
        let tool = CreateFungibleTokenTool::new(&ctx());
        let args = json!({
            "token_name": "Gold",
            "token_symbol": "GLD",
            "decimals": 2,
            "initial_supply": 10.5,
            "max_supply": "500"
        });
        let spec = token_create(normalize_params(&tool, &args, &ctx()).unwrap().request);

        assert_eq!(spec.initial_supply, 1_050);
        assert_eq!(spec.max_supply, Some(50_000));
        assert_eq!(spec.supply_type, SupplyType::Finite);
        assert_eq!(spec.treasury_account_id, AccountId::new(0, 0, 2));
    }

    #[test]
    fn fungible_rejects_bad_decimals_and_supply() {
        let tool = CreateFungibleTokenTool::new(&ctx());
        let args = json!({
            "token_name": "Gold",
            "token_symbol": "GLD",
            "decimals": 19,
            "initial_supply": 100,
            "max_supply": 10
        });
        let err = normalize_params(&tool, &args, &ctx()).unwrap_err();
        assert_eq!(err.fields(), vec!["decimals", "max_supply"]);
    }

    #[test]
    fn default_max_supply_clamps_for_high_decimals() {
        let tool = CreateFungibleTokenTool::new(&ctx());
        let args = json!({"token_name": "Gold", "token_symbol": "GLD", "decimals": 18});
        let spec = token_create(normalize_params(&tool, &args, &ctx()).unwrap().request);
        assert_eq!(spec.decimals, 18);
        assert_eq!(spec.max_supply, Some(i64::MAX as u64));

        let args = json!({"token_name": "Gold", "token_symbol": "GLD", "decimals": 12});
        let spec = token_create(normalize_params(&tool, &args, &ctx()).unwrap().request);
        assert_eq!(spec.max_supply, Some(1_000_000_000_000_000_000));
    }

    #[test]
    fn infinite_supply_has_no_max() {
        let tool = CreateFungibleTokenTool::new(&ctx());
        let args = json!({"token_name": "A", "token_symbol": "A", "supply_type": "infinite"});
        let spec = token_create(normalize_params(&tool, &args, &ctx()).unwrap().request);
        assert_eq!(spec.max_supply, None);
    }

    #[test]
    fn nft_defaults_to_finite_supply_of_one_hundred() {
        let tool = CreateNonFungibleTokenTool::new(&ctx());
        let args = json!({"token_name": "Art", "token_symbol": "ART"});
        let spec = token_create(normalize_params(&tool, &args, &ctx()).unwrap().request);

        assert_eq!(spec.token_type, TokenType::NonFungibleUnique);
        assert_eq!(spec.max_supply, Some(100));
        assert!(spec.supply_key.is_some());
    }

    #[test]
    fn mint_encodes_uris_as_metadata() {
        let tool = MintNonFungibleTokenTool::new(&ctx());
        let args = json!({"token_id": "0.0.5005", "uris": ["ipfs://QmTest123"]});
        let params = normalize_params(&tool, &args, &ctx()).unwrap();

        assert_eq!(
            params.request,
            Request::Transaction(LedgerOperation::TokenMint {
                token_id: TokenId::new(0, 0, 5005),
                metadata: vec![b"ipfs://QmTest123".to_vec()],
            })
        );
    }

    #[test]
    fn mint_limits_uri_count_and_length() {
        let tool = MintNonFungibleTokenTool::new(&ctx());
        let many: Vec<String> = (0..11).map(|i| format!("ipfs://{}", i)).collect();
        let err = normalize_params(&tool, &json!({"token_id": "0.0.1", "uris": many}), &ctx())
            .unwrap_err();
        assert_eq!(err.fields(), vec!["uris"]);

        let long = "x".repeat(MAX_NFT_METADATA_BYTES + 1);
        let err = normalize_params(&tool, &json!({"token_id": "0.0.1", "uris": [long]}), &ctx())
            .unwrap_err();
        assert_eq!(err.fields(), vec!["uris[0]"]);

        let err = normalize_params(&tool, &json!({"token_id": "0.0.1", "uris": []}), &ctx())
            .unwrap_err();
        assert_eq!(err.fields(), vec!["uris"]);
    }

    #[test]
    fn associate_defaults_to_operator_account() {
        let tool = AssociateTokenTool::new(&ctx());
        let args = json!({"token_ids": ["0.0.10", "0.0.11"]});
        let params = normalize_params(&tool, &args, &ctx()).unwrap();

        assert_eq!(
            params.request,
            Request::Transaction(LedgerOperation::TokenAssociate {
                account_id: AccountId::new(0, 0, 2),
                token_ids: vec![TokenId::new(0, 0, 10), TokenId::new(0, 0, 11)],
            })
        );
    }
}
