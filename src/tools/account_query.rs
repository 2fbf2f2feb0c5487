use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{NormalizedParams, Request, Tool, ToolOutput, execute_request};
use crate::context::Context;
use crate::ledger::{LedgerClient, LedgerError, Query};
use crate::normalize::ParamReader;
use crate::plugin::Plugin;
use crate::prompt;
use crate::units;

pub const GET_HBAR_BALANCE: &str = "get_hbar_balance";
pub const GET_EXCHANGE_RATE: &str = "get_exchange_rate";

pub fn plugin() -> Plugin {
    Plugin::new("core-account-query-plugin", |ctx: &Context| -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(GetHbarBalanceTool::new(ctx)),
            Arc::new(GetExchangeRateTool::new(ctx)),
        ]
    })
    .with_version("1.0.0")
    .with_description("Read-only account and network queries")
}

/// HBAR balance of an account, with its USD value when a rate is cached.
pub struct GetHbarBalanceTool {
    description: String,
}

impl GetHbarBalanceTool {
    pub fn new(context: &Context) -> Self {
        let description = prompt::describe(
            context,
            "This tool will return the HBAR balance of an account.",
            &[prompt::account_parameter_description("account_id", context)],
            false,
        );
        Self { description }
    }
}

#[async_trait]
impl Tool for GetHbarBalanceTool {
    fn method(&self) -> &str {
        GET_HBAR_BALANCE
    }

    fn name(&self) -> &str {
        "Get HBAR Balance"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "account_id": {"type": "string", "description": "Account to query; defaults to the operator"}
            }
        })
    }

    fn normalize(&self, args: &mut ParamReader<'_>, context: &Context) -> Request {
        Request::Query(Query::HbarBalance {
            account_id: args.account_or_default("account_id", context),
        })
    }

    async fn execute(
        &self,
        client: &dyn LedgerClient,
        context: &Context,
        params: NormalizedParams,
    ) -> Result<ToolOutput, LedgerError> {
        let mut data = match execute_request(client, params.request).await? {
            ToolOutput::Data(Value::Object(data)) => data,
            other => return Ok(other),
        };

        let usd = context.rates.as_ref().and_then(|rates| {
            let tinybars = data.get("balance_tinybars")?.as_i64()?;
            rates.hbar_to_usd(units::to_hbar(tinybars)).ok()
        });
        if let Some(usd) = usd {
            data.insert("balance_usd".into(), json!(usd.to_string()));
        }
        Ok(ToolOutput::Data(Value::Object(data)))
    }

    fn human_message(&self, output: &ToolOutput) -> String {
        let ToolOutput::Data(data) = output else {
            return "Balance query returned no data.".to_string();
        };
        let account = data["account_id"].as_str().unwrap_or("unknown");
        let hbar = data["balance_hbar"].as_str().unwrap_or("0");
        match data.get("balance_usd").and_then(Value::as_str) {
            Some(usd) => format!("Account {} has a balance of {} HBAR (~${} USD)", account, hbar, usd),
            None => format!("Account {} has a balance of {} HBAR", account, hbar),
        }
    }

    fn action(&self) -> &str {
        "get HBAR balance"
    }
}

/// Current HBAR to US cent exchange rate.
pub struct GetExchangeRateTool {
    description: String,
}

impl GetExchangeRateTool {
    pub fn new(context: &Context) -> Self {
        let description = prompt::describe(
            context,
            "This tool will return the current HBAR to USD exchange rate.",
            &[],
            false,
        );
        Self { description }
    }
}

impl Tool for GetExchangeRateTool {
    fn method(&self) -> &str {
        GET_EXCHANGE_RATE
    }

    fn name(&self) -> &str {
        "Get Exchange Rate"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    fn normalize(&self, _args: &mut ParamReader<'_>, _context: &Context) -> Request {
        Request::Query(Query::ExchangeRate)
    }

    fn human_message(&self, output: &ToolOutput) -> String {
        let ToolOutput::Data(data) = output else {
            return "Exchange rate query returned no data.".to_string();
        };
        format!(
            "Current exchange rate: {} cents per {} HBAR (1 HBAR = ${} USD), valid until {}",
            data["cent_equivalent"],
            data["hbar_equivalent"],
            data["usd_per_hbar"].as_str().unwrap_or("?"),
            data["expiration_time"].as_str().unwrap_or("?"),
        )
    }

    fn action(&self) -> &str {
        "get exchange rate"
    }
}
