use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::ledger::TransactionReceipt;

/// What a successful tool call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// The operation executed.
    Executed(TransactionReceipt),
    /// A schedule was created; the operation itself is pending.
    Scheduled(TransactionReceipt),
    /// Query result.
    Data(Value),
}

impl ToolOutput {
    pub fn receipt(&self) -> Option<&TransactionReceipt> {
        match self {
            ToolOutput::Executed(r) | ToolOutput::Scheduled(r) => Some(r),
            ToolOutput::Data(_) => None,
        }
    }

    /// Operation fields placed in a success result.
    pub fn into_fields(self) -> Map<String, Value> {
        let mut fields = Map::new();
        match self {
            ToolOutput::Executed(r) => {
                fields.insert("transaction_id".into(), json!(r.transaction_id));
                fields.insert("ledger_status".into(), json!(r.status));
                if let Some(id) = r.account_id {
                    fields.insert("account_id".into(), json!(id));
                }
                if let Some(id) = r.token_id {
                    fields.insert("token_id".into(), json!(id));
                }
                if let Some(id) = r.topic_id {
                    fields.insert("topic_id".into(), json!(id));
                }
                if let Some(id) = r.contract_id {
                    fields.insert("contract_id".into(), json!(id));
                }
                if let Some(id) = r.schedule_id {
                    fields.insert("schedule_id".into(), json!(id));
                }
                if let Some(id) = r.scheduled_transaction_id {
                    fields.insert("scheduled_transaction_id".into(), json!(id));
                }
                if !r.serial_numbers.is_empty() {
                    fields.insert("serial_numbers".into(), json!(r.serial_numbers));
                }
                if let Some(seq) = r.topic_sequence_number {
                    fields.insert("topic_sequence_number".into(), json!(seq));
                }
            }
            ToolOutput::Scheduled(r) => {
                fields.insert("scheduled".into(), Value::Bool(true));
                fields.insert("schedule_id".into(), json!(r.schedule_id));
                fields.insert("transaction_id".into(), json!(r.transaction_id));
                fields.insert("ledger_status".into(), json!(r.status));
            }
            ToolOutput::Data(Value::Object(map)) => fields = map,
            ToolOutput::Data(other) => {
                fields.insert("data".into(), other);
            }
        }
        fields
    }
}

/// Success fields are flattened next to the `status` tag. Tools must not
/// emit a field named `status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResult {
    Success(Map<String, Value>),
    Error { error: String },
}

/// The uniform value every call returns, success or failure.
///
/// Serializes as
/// `{"result": {"status": "success", ...} | {"status": "error", "error": ".."}, "human_message": ".."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResponse {
    pub result: ToolResult,
    pub human_message: String,
}

impl ToolResponse {
    pub fn success(fields: Map<String, Value>, human_message: impl Into<String>) -> Self {
        Self {
            result: ToolResult::Success(fields),
            human_message: human_message.into(),
        }
    }

    /// The message doubles as the human message.
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            result: ToolResult::Error {
                error: message.clone(),
            },
            human_message: message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, ToolResult::Success(_))
    }

    /// A field of a success result.
    pub fn get(&self, field: &str) -> Option<&Value> {
        match &self.result {
            ToolResult::Success(fields) => fields.get(field),
            ToolResult::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.result {
            ToolResult::Error { error } => Some(error),
            ToolResult::Success(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            json!({"result": {"status": "error", "error": e.to_string()}, "human_message": e.to_string()})
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AccountId, ScheduleId, TransactionId};

    fn receipt() -> TransactionReceipt {
        TransactionReceipt {
            status: "SUCCESS".to_string(),
            transaction_id: TransactionId::new(AccountId::new(0, 0, 2), 1_700_000_000, 5),
            ..Default::default()
        }
    }

    #[test]
    fn success_serializes_with_status_tag() {
        let fields = ToolOutput::Executed(receipt()).into_fields();
        let json = ToolResponse::success(fields, "done").to_json();

        assert_eq!(json["result"]["status"], "success");
        assert_eq!(json["result"]["transaction_id"], "0.0.2@1700000000.000000005");
        assert_eq!(json["human_message"], "done");
    }

    #[test]
    fn error_serializes_message() {
        let json = ToolResponse::error("unknown tool: nope").to_json();
        assert_eq!(
            json,
            json!({
                "result": {"status": "error", "error": "unknown tool: nope"},
                "human_message": "unknown tool: nope"
            })
        );
    }

    #[test]
    fn scheduled_output_carries_schedule_id() {
        let mut r = receipt();
        r.schedule_id = Some(ScheduleId::new(0, 0, 1001));
        let fields = ToolOutput::Scheduled(r).into_fields();

        assert_eq!(fields["scheduled"], true);
        assert_eq!(fields["schedule_id"], "0.0.1001");
        assert!(!fields.contains_key("serial_numbers"));
    }
}
