use std::sync::Arc;

use serde_json::{Value, json};

use super::{Request, Tool, ToolOutput, scheduled_message};
use crate::context::Context;
use crate::ledger::{AccountId, HbarTransfer, LedgerOperation, PublicKey, ScheduleId};
use crate::normalize::ParamReader;
use crate::plugin::Plugin;
use crate::prompt;
use crate::scheduling;
use crate::units;

pub const TRANSFER_HBAR: &str = "transfer_hbar";
pub const CREATE_ACCOUNT: &str = "create_account";
pub const DELETE_ACCOUNT: &str = "delete_account";
pub const SIGN_SCHEDULE: &str = "sign_schedule_transaction";
pub const SCHEDULE_DELETE: &str = "schedule_delete";

/// Account operations: transfers, account lifecycle and schedule follow-ups.
pub fn plugin() -> Plugin {
    Plugin::new("core-account-plugin", |ctx: &Context| -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(TransferHbarTool::new(ctx)),
            Arc::new(CreateAccountTool::new(ctx)),
            Arc::new(DeleteAccountTool::new(ctx)),
            Arc::new(SignScheduleTool::new(ctx)),
            Arc::new(ScheduleDeleteTool::new(ctx)),
        ]
    })
    .with_version("1.0.0")
    .with_description("Transfers HBAR and manages accounts and schedules")
}

fn tx_id(output: &ToolOutput) -> String {
    output
        .receipt()
        .map(|r| r.transaction_id.to_string())
        .unwrap_or_default()
}

/// Transfer HBAR from one account (the operator by default) to one or more recipients.
pub struct TransferHbarTool {
    description: String,
}

impl TransferHbarTool {
    pub fn new(context: &Context) -> Self {
        let description = prompt::describe(
            context,
            "This tool will transfer HBAR to one or more accounts.",
            &[
                "transfers (list, required): each entry has account_id (str, recipient) and amount (number or str, HBAR)".to_string(),
                prompt::account_parameter_description("source_account_id", context),
                "transaction_memo (str, optional): memo for the transfer transaction".to_string(),
            ],
            true,
        );
        Self { description }
    }
}

impl Tool for TransferHbarTool {
    fn method(&self) -> &str {
        TRANSFER_HBAR
    }

    fn name(&self) -> &str {
        "Transfer HBAR"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "transfers": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "properties": {
                            "account_id": {"type": "string", "description": "Recipient account ID"},
                            "amount": {"type": ["number", "string"], "description": "Amount of HBAR to transfer"}
                        },
                        "required": ["account_id", "amount"]
                    }
                },
                "source_account_id": {"type": "string", "description": "Account sending the HBAR"},
                "transaction_memo": {"type": "string"},
                "scheduling_params": scheduling::schema_property()
            },
            "required": ["transfers"]
        })
    }

    fn is_schedulable(&self) -> bool {
        true
    }

    fn normalize(&self, args: &mut ParamReader<'_>, context: &Context) -> Request {
        let mut hbar_transfers = args.each_object("transfers", true, |t| {
            let account_id = t.required_id::<AccountId>("account_id");
            let amount = if t.has("amount") {
                t.optional_decimal("amount")
            } else {
                t.issue("amount", "is required");
                None
            };
            let tinybars = match amount.map(units::to_tinybars) {
                Some(Ok(n)) if n > 0 => n,
                Some(Ok(_)) => {
                    t.issue("amount", "invalid transfer amount: must be greater than zero");
                    0
                }
                Some(Err(e)) => {
                    t.issue("amount", e.to_string());
                    0
                }
                None => 0,
            };
            HbarTransfer {
                account_id,
                amount: tinybars,
            }
        });
        let source = args.account_or_default("source_account_id", context);
        let memo = args.optional_string("transaction_memo");

        let total = hbar_transfers
            .iter()
            .try_fold(0i64, |acc, t| acc.checked_add(t.amount));
        match total {
            Some(total) => hbar_transfers.push(HbarTransfer {
                account_id: source,
                amount: -total,
            }),
            None => args.issue("transfers", "total amount is out of range"),
        }

        Request::Transaction(LedgerOperation::CryptoTransfer {
            hbar_transfers,
            memo,
        })
    }

    fn human_message(&self, output: &ToolOutput) -> String {
        match output {
            ToolOutput::Scheduled(r) => scheduled_message("HBAR transfer", r),
            _ => format!(
                "HBAR successfully transferred.\nTransaction ID: {}",
                tx_id(output)
            ),
        }
    }

    fn action(&self) -> &str {
        "transfer HBAR"
    }
}

/// Create a new account, keyed by the operator key unless another is given.
pub struct CreateAccountTool {
    description: String,
}

impl CreateAccountTool {
    pub fn new(context: &Context) -> Self {
        let description = prompt::describe(
            context,
            "This tool will create a new account.",
            &[
                "public_key (str, optional): key for the new account; defaults to the operator public key".to_string(),
                "initial_balance (number, optional, default 0): HBAR moved from the operator into the new account".to_string(),
                "account_memo (str, optional): memo stored on the account".to_string(),
                "max_automatic_token_associations (int, optional, default -1): -1 means unlimited".to_string(),
            ],
            true,
        );
        Self { description }
    }
}

impl Tool for CreateAccountTool {
    fn method(&self) -> &str {
        CREATE_ACCOUNT
    }

    fn name(&self) -> &str {
        "Create Account"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "public_key": {"type": "string"},
                "initial_balance": {"type": ["number", "string"], "default": 0},
                "account_memo": {"type": "string"},
                "max_automatic_token_associations": {"type": "integer", "default": -1, "minimum": -1},
                "scheduling_params": scheduling::schema_property()
            }
        })
    }

    fn is_schedulable(&self) -> bool {
        true
    }

    fn normalize(&self, args: &mut ParamReader<'_>, context: &Context) -> Request {
        let key = if args.has("public_key") {
            args.optional_id::<PublicKey>("public_key")
        } else {
            if context.account_public_key.is_none() {
                args.issue(
                    "public_key",
                    "is required because no operator public key is configured",
                );
            }
            context.account_public_key.clone()
        };

        let initial_balance = match args.optional_decimal("initial_balance").map(units::to_tinybars) {
            None => 0,
            Some(Ok(n)) if n >= 0 => n,
            Some(Ok(_)) => {
                args.issue("initial_balance", "must not be negative");
                0
            }
            Some(Err(e)) => {
                args.issue("initial_balance", e.to_string());
                0
            }
        };

        let max_automatic_token_associations =
            match args.optional_integer("max_automatic_token_associations") {
                None => -1,
                Some(n) if (-1..=i64::from(i32::MAX)).contains(&n) => n as i32,
                Some(_) => {
                    args.issue("max_automatic_token_associations", "must be -1 or greater");
                    -1
                }
            };

        Request::Transaction(LedgerOperation::AccountCreate {
            key: key.unwrap_or_else(placeholder_key),
            initial_balance,
            memo: args.optional_string("account_memo"),
            max_automatic_token_associations,
        })
    }

    fn human_message(&self, output: &ToolOutput) -> String {
        match output {
            ToolOutput::Scheduled(r) => scheduled_message("account creation", r),
            _ => {
                let account = output
                    .receipt()
                    .and_then(|r| r.account_id)
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                format!(
                    "Account created successfully.\nTransaction ID: {}\nNew Account ID: {}",
                    tx_id(output),
                    account
                )
            }
        }
    }

    fn action(&self) -> &str {
        "create account"
    }
}

/// Stand-in when the key failed validation; the request is never submitted.
fn placeholder_key() -> PublicKey {
    PublicKey::from_raw_ed25519([0u8; 32])
}

/// Delete an account, sending its remaining HBAR to another account.
pub struct DeleteAccountTool {
    description: String,
}

impl DeleteAccountTool {
    pub fn new(context: &Context) -> Self {
        let description = prompt::describe(
            context,
            "This tool will delete an existing account and transfer its remaining balance.",
            &[
                "account_id (str, required): account to delete".to_string(),
                prompt::account_parameter_description("transfer_account_id", context),
            ],
            true,
        );
        Self { description }
    }
}

impl Tool for DeleteAccountTool {
    fn method(&self) -> &str {
        DELETE_ACCOUNT
    }

    fn name(&self) -> &str {
        "Delete Account"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "account_id": {"type": "string"},
                "transfer_account_id": {"type": "string"},
                "scheduling_params": scheduling::schema_property()
            },
            "required": ["account_id"]
        })
    }

    fn is_schedulable(&self) -> bool {
        true
    }

    fn normalize(&self, args: &mut ParamReader<'_>, context: &Context) -> Request {
        Request::Transaction(LedgerOperation::AccountDelete {
            account_id: args.required_id("account_id"),
            transfer_account_id: args.account_or_default("transfer_account_id", context),
        })
    }

    fn human_message(&self, output: &ToolOutput) -> String {
        match output {
            ToolOutput::Scheduled(r) => scheduled_message("account deletion", r),
            _ => format!(
                "Account successfully deleted.\nTransaction ID: {}",
                tx_id(output)
            ),
        }
    }

    fn action(&self) -> &str {
        "delete account"
    }
}

fn schedule_id_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "schedule_id": {"type": "string", "description": "ID of the schedule, e.g. 0.0.123456"}
        },
        "required": ["schedule_id"]
    })
}

/// Add the operator's signature to a pending schedule.
pub struct SignScheduleTool {
    description: String,
}

impl SignScheduleTool {
    pub fn new(context: &Context) -> Self {
        let description = prompt::describe(
            context,
            "This tool will sign a scheduled transaction with the operator key. The transaction executes once all required signatures are present.",
            &["schedule_id (str, required): the schedule to sign".to_string()],
            false,
        );
        Self { description }
    }
}

impl Tool for SignScheduleTool {
    fn method(&self) -> &str {
        SIGN_SCHEDULE
    }

    fn name(&self) -> &str {
        "Sign Scheduled Transaction"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        schedule_id_schema()
    }

    fn normalize(&self, args: &mut ParamReader<'_>, _context: &Context) -> Request {
        Request::Transaction(LedgerOperation::ScheduleSign {
            schedule_id: args.required_id::<ScheduleId>("schedule_id"),
        })
    }

    fn human_message(&self, output: &ToolOutput) -> String {
        let mut msg = format!(
            "Transaction successfully signed.\nTransaction ID: {}",
            tx_id(output)
        );
        if let Some(executed) = output.receipt().and_then(|r| r.scheduled_transaction_id) {
            msg.push_str(&format!("\nScheduled transaction executed: {}", executed));
        }
        msg
    }

    fn action(&self) -> &str {
        "sign scheduled transaction"
    }
}

/// Delete a pending schedule. Only schedules created with an admin key can be deleted.
pub struct ScheduleDeleteTool {
    description: String,
}

impl ScheduleDeleteTool {
    pub fn new(context: &Context) -> Self {
        let description = prompt::describe(
            context,
            "This tool will delete a scheduled transaction so it never executes. The schedule must have an admin key.",
            &["schedule_id (str, required): the schedule to delete".to_string()],
            false,
        );
        Self { description }
    }
}

impl Tool for ScheduleDeleteTool {
    fn method(&self) -> &str {
        SCHEDULE_DELETE
    }

    fn name(&self) -> &str {
        "Delete Scheduled Transaction"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        schedule_id_schema()
    }

    fn normalize(&self, args: &mut ParamReader<'_>, _context: &Context) -> Request {
        Request::Transaction(LedgerOperation::ScheduleDelete {
            schedule_id: args.required_id::<ScheduleId>("schedule_id"),
        })
    }

    fn human_message(&self, output: &ToolOutput) -> String {
        format!(
            "Scheduled transaction successfully deleted.\nTransaction ID: {}",
            tx_id(output)
        )
    }

    fn action(&self) -> &str {
        "delete scheduled transaction"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::normalize_params;

    fn ctx() -> Context {
        Context::default().with_account_id(AccountId::new(0, 0, 2))
    }

    fn transfers(request: &Request) -> &[HbarTransfer] {
        match request {
            Request::Transaction(LedgerOperation::CryptoTransfer { hbar_transfers, .. }) => {
                hbar_transfers
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn transfer_debits_source_for_the_total() {
        let tool = TransferHbarTool::new(&ctx());
        let args = json!({"transfers": [
            {"account_id": "0.0.800", "amount": 1.5},
            {"account_id": "0.0.801", "amount": "0.25"},
        ]});
        let params = normalize_params(&tool, &args, &ctx()).unwrap();
        let list = transfers(&params.request);

        assert_eq!(list.len(), 3);
        assert_eq!(list[0].amount, 150_000_000);
        assert_eq!(list[1].amount, 25_000_000);
        assert_eq!(list[2].account_id, AccountId::new(0, 0, 2));
        assert_eq!(list[2].amount, -175_000_000);
        assert_eq!(list.iter().map(|t| t.amount).sum::<i64>(), 0);
    }

    #[test]
    fn transfer_rejects_non_positive_amounts() {
        let tool = TransferHbarTool::new(&ctx());
        for amount in [json!(0), json!(-1), json!("0.000000001")] {
            let args = json!({"transfers": [{"account_id": "0.0.800", "amount": amount}]});
            let err = normalize_params(&tool, &args, &ctx()).unwrap_err();
            assert_eq!(err.fields(), vec!["transfers[0].amount"]);
            assert!(err.to_string().contains("invalid transfer amount"));
        }
    }

    #[test]
    fn transfer_without_source_or_operator_fails() {
        let tool = TransferHbarTool::new(&Context::default());
        let args = json!({"transfers": [{"account_id": "0.0.800", "amount": 1}]});
        let err = normalize_params(&tool, &args, &Context::default()).unwrap_err();
        assert_eq!(err.fields(), vec!["source_account_id"]);
    }

    #[test]
    fn create_account_needs_a_key() {
        let tool = CreateAccountTool::new(&ctx());
        let err = normalize_params(&tool, &json!({}), &ctx()).unwrap_err();
        assert_eq!(err.fields(), vec!["public_key"]);

        let args = json!({
            "public_key": "e0c8ec2758a5879ffac226a13c0c516b799e72e35141a0dd828f94d37988a4b7",
            "initial_balance": 2
        });
        let params = normalize_params(&tool, &args, &ctx()).unwrap();
        let Request::Transaction(LedgerOperation::AccountCreate {
            initial_balance,
            max_automatic_token_associations,
            ..
        }) = params.request
        else {
            panic!("expected account create");
        };
        assert_eq!(initial_balance, 200_000_000);
        assert_eq!(max_automatic_token_associations, -1);
    }

    #[test]
    fn delete_account_accepts_scheduling() {
        let tool = DeleteAccountTool::new(&ctx());
        assert!(tool.schema()["properties"]["scheduling_params"].is_object());

        let args = json!({"account_id": "0.0.1001", "scheduling_params": {"is_scheduled": true}});
        let params = normalize_params(&tool, &args, &ctx()).unwrap();
        assert!(params.is_scheduled());
        assert_eq!(
            params.request,
            Request::Transaction(LedgerOperation::AccountDelete {
                account_id: AccountId::new(0, 0, 1001),
                transfer_account_id: AccountId::new(0, 0, 2),
            })
        );
    }

    #[test]
    fn schedule_follow_ups_reject_scheduling() {
        let args = json!({"schedule_id": "0.0.1001", "scheduling_params": {"is_scheduled": false}});
        let sign = SignScheduleTool::new(&ctx());
        let delete = ScheduleDeleteTool::new(&ctx());
        for tool in [&sign as &dyn Tool, &delete] {
            let err = normalize_params(tool, &args, &ctx()).unwrap_err();
            assert_eq!(err.fields(), vec!["scheduling_params"]);
        }
    }
}
