mod account;
mod account_query;
mod consensus;
mod consensus_query;
mod evm;
mod response;
mod token;

pub use account::{
    CreateAccountTool, DeleteAccountTool, ScheduleDeleteTool, SignScheduleTool, TransferHbarTool,
};
pub use account_query::{GetExchangeRateTool, GetHbarBalanceTool};
pub use consensus::{CreateTopicTool, DeleteTopicTool, SubmitTopicMessageTool};
pub use consensus_query::GetTopicInfoTool;
pub use evm::TransferErc20Tool;
pub use account::plugin as core_account_plugin;
pub use account_query::plugin as core_account_query_plugin;
pub use consensus::plugin as core_consensus_plugin;
pub use consensus_query::plugin as core_consensus_query_plugin;
pub use evm::plugin as core_evm_plugin;
pub use token::plugin as core_token_plugin;
pub use response::{ToolOutput, ToolResponse, ToolResult};
pub use token::{
    AssociateTokenTool, CreateFungibleTokenTool, CreateNonFungibleTokenTool,
    MintNonFungibleTokenTool,
};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::context::Context;
use crate::error::ValidationError;
use crate::ledger::{LedgerClient, LedgerError, LedgerOperation, Query, TransactionReceipt};
use crate::normalize::ParamReader;
use crate::plugin::Plugin;
use crate::scheduling::{self, SchedulingParams};
use crate::units;

/// What a tool asks of the ledger once its arguments are normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Transaction(LedgerOperation),
    Query(Query),
}

/// Domain-typed parameters for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedParams {
    pub request: Request,
    /// Present when the caller sent `scheduling_params`.
    pub scheduling: Option<SchedulingParams>,
}

impl NormalizedParams {
    pub fn is_scheduled(&self) -> bool {
        self.scheduling.as_ref().is_some_and(|s| s.is_scheduled)
    }
}

/// A ledger operation an agent can invoke by method name.
///
/// Tools are stateless after construction and may be called concurrently.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique key the agent calls this tool by.
    fn method(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    /// Prompt text describing the tool to the agent.
    fn description(&self) -> &str;

    /// JSON schema for the tool's parameters.
    fn schema(&self) -> Value;

    /// Whether the tool accepts `scheduling_params`.
    fn is_schedulable(&self) -> bool {
        false
    }

    /// Read the tool's own fields. Issues are recorded on the reader.
    fn normalize(&self, args: &mut ParamReader<'_>, context: &Context) -> Request;

    /// Perform the request against the ledger.
    async fn execute(
        &self,
        client: &dyn LedgerClient,
        _context: &Context,
        params: NormalizedParams,
    ) -> Result<ToolOutput, LedgerError> {
        execute_request(client, params.request).await
    }

    /// Success summary shown to the agent.
    fn human_message(&self, output: &ToolOutput) -> String;

    /// Short verb phrase for failure messages, e.g. `"transfer HBAR"`.
    fn action(&self) -> &str;
}

/// Normalize raw arguments for `tool`, including its scheduling parameters.
pub fn normalize_params(
    tool: &dyn Tool,
    args: &Value,
    context: &Context,
) -> Result<NormalizedParams, ValidationError> {
    let mut reader = ParamReader::new(args);
    let request = tool.normalize(&mut reader, context);
    let scheduling = if tool.is_schedulable() {
        SchedulingParams::read(&mut reader)
    } else {
        reader.forbid(
            scheduling::FIELD,
            &format!("{} does not support scheduling", tool.method()),
        );
        None
    };
    reader.finish()?;
    Ok(NormalizedParams {
        request,
        scheduling,
    })
}

/// Run `tool` end to end on already-normalized parameters, converting every
/// failure into an error response.
pub async fn call(
    tool: &dyn Tool,
    client: &dyn LedgerClient,
    context: &Context,
    params: NormalizedParams,
) -> ToolResponse {
    match tool.execute(client, context, params).await {
        Ok(output) => {
            let message = tool.human_message(&output);
            ToolResponse::success(output.into_fields(), message)
        }
        Err(e) => ToolResponse::error(format!("Failed to {}: {}", tool.action(), e)),
    }
}

/// Submit a transaction or answer a query with the default result shape.
pub async fn execute_request(
    client: &dyn LedgerClient,
    request: Request,
) -> Result<ToolOutput, LedgerError> {
    match request {
        Request::Transaction(op) => {
            let scheduled = op.is_schedule_create();
            let receipt = client.submit(op).await?;
            Ok(if scheduled {
                ToolOutput::Scheduled(receipt)
            } else {
                ToolOutput::Executed(receipt)
            })
        }
        Request::Query(Query::HbarBalance { account_id }) => {
            let tinybars = client.account_balance(&account_id).await?;
            Ok(ToolOutput::Data(json!({
                "account_id": account_id,
                "balance_tinybars": tinybars,
                "balance_hbar": units::to_hbar(tinybars).to_string(),
            })))
        }
        Request::Query(Query::TopicInfo { topic_id }) => {
            let info = client.topic_info(&topic_id).await?;
            let data = serde_json::to_value(info)
                .map_err(|e| LedgerError::Transport(format!("malformed topic info: {}", e)))?;
            Ok(ToolOutput::Data(data))
        }
        Request::Query(Query::ExchangeRate) => {
            let rate = client.exchange_rate().await?;
            Ok(ToolOutput::Data(json!({
                "hbar_equivalent": rate.hbar_equivalent,
                "cent_equivalent": rate.cent_equivalent,
                "usd_per_hbar": rate.usd_per_hbar().normalize().to_string(),
                "expiration_time": rate.expiration_time.to_rfc3339(),
            })))
        }
    }
}

/// Summary for a schedule created in place of `subject`.
fn scheduled_message(subject: &str, receipt: &TransactionReceipt) -> String {
    let schedule_id = receipt
        .schedule_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "Scheduled {} created successfully.\nTransaction ID: {}\nSchedule ID: {}",
        subject, receipt.transaction_id, schedule_id
    )
}

/// Every plugin this crate ships, in registration order.
pub fn core_plugins() -> Vec<Plugin> {
    vec![
        account::plugin(),
        account_query::plugin(),
        consensus::plugin(),
        consensus_query::plugin(),
        token::plugin(),
        evm::plugin(),
    ]
}
