use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use serde_json::{Value, json};

use super::{Request, Tool, ToolOutput, scheduled_message};
use crate::context::Context;
use crate::ledger::{ContractId, EvmAddress, LedgerOperation, encode_erc20_transfer};
use crate::normalize::ParamReader;
use crate::plugin::Plugin;
use crate::prompt;
use crate::scheduling;

pub const TRANSFER_ERC20: &str = "transfer_erc20";

/// Gas limit for a plain ERC-20 transfer call.
pub const ERC20_TRANSFER_GAS: u64 = 100_000;

/// Smart-contract actions on EVM token contracts.
pub fn plugin() -> Plugin {
    Plugin::new("core-evm-plugin", |ctx: &Context| -> Vec<Arc<dyn Tool>> {
        vec![Arc::new(TransferErc20Tool::new(ctx))]
    })
    .with_version("1.0.0")
    .with_description("EVM contracts: ERC20 token transfers")
}

/// Transfer ERC-20 tokens by calling `transfer(address,uint256)` on the token contract.
pub struct TransferErc20Tool {
    description: String,
}

impl TransferErc20Tool {
    pub fn new(context: &Context) -> Self {
        let description = prompt::describe(
            context,
            "This tool will transfer ERC20 tokens by executing the token contract's transfer function.",
            &[
                "contract_id (str, required): ID of the ERC20 contract, e.g. 0.0.5678".to_string(),
                "recipient_address (str, required): EVM address (0x...) or account ID receiving the tokens".to_string(),
                "amount (int, required): amount in the token's smallest unit".to_string(),
            ],
            true,
        );
        Self { description }
    }
}

impl Tool for TransferErc20Tool {
    fn method(&self) -> &str {
        TRANSFER_ERC20
    }

    fn name(&self) -> &str {
        "Transfer ERC20"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "contract_id": {"type": "string", "description": "The id of the ERC20 contract"},
                "recipient_address": {"type": "string", "description": "Address to which the tokens will be transferred"},
                "amount": {"type": ["integer", "string"], "minimum": 1},
                "scheduling_params": scheduling::schema_property()
            },
            "required": ["contract_id", "recipient_address", "amount"]
        })
    }

    fn is_schedulable(&self) -> bool {
        true
    }

    fn normalize(&self, args: &mut ParamReader<'_>, _context: &Context) -> Request {
        let contract_id = args.required_id::<ContractId>("contract_id");
        let recipient = args.required_id::<EvmAddress>("recipient_address");

        let amount = if args.has("amount") {
            args.optional_decimal("amount")
        } else {
            args.issue("amount", "is required");
            None
        };
        let amount = match amount {
            None => 0,
            Some(n) if !n.fract().is_zero() => {
                args.issue("amount", "must be a whole number of base units");
                0
            }
            Some(n) => match n.to_u128() {
                Some(units) if units > 0 => units,
                _ => {
                    args.issue("amount", "must be greater than zero");
                    0
                }
            },
        };

        Request::Transaction(LedgerOperation::ContractExecute {
            contract_id,
            gas: ERC20_TRANSFER_GAS,
            function_parameters: encode_erc20_transfer(&recipient, amount),
        })
    }

    fn human_message(&self, output: &ToolOutput) -> String {
        match output {
            ToolOutput::Scheduled(r) => scheduled_message("ERC20 transfer", r),
            _ => format!(
                "ERC20 token transferred successfully.\nTransaction ID: {}",
                output
                    .receipt()
                    .map(|r| r.transaction_id.to_string())
                    .unwrap_or_default()
            ),
        }
    }

    fn action(&self) -> &str {
        "transfer ERC20"
    }
}
