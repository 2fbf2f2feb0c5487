use std::sync::Arc;

use serde_json::{Value, json};

use super::{Request, Tool, ToolOutput, scheduled_message};
use crate::context::Context;
use crate::ledger::{LedgerOperation, TopicId};
use crate::normalize::ParamReader;
use crate::plugin::Plugin;
use crate::prompt;
use crate::scheduling;

pub const CREATE_TOPIC: &str = "create_topic";
pub const SUBMIT_TOPIC_MESSAGE: &str = "submit_topic_message";
pub const DELETE_TOPIC: &str = "delete_topic";

pub fn plugin() -> Plugin {
    Plugin::new("core-consensus-plugin", |ctx: &Context| -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(CreateTopicTool::new(ctx)),
            Arc::new(SubmitTopicMessageTool::new(ctx)),
            Arc::new(DeleteTopicTool::new(ctx)),
        ]
    })
    .with_version("1.0.0")
    .with_description("Consensus topics: create, submit messages, delete")
}

fn tx_id(output: &ToolOutput) -> String {
    output
        .receipt()
        .map(|r| r.transaction_id.to_string())
        .unwrap_or_default()
}

/// Create a consensus topic administered by the operator key.
pub struct CreateTopicTool {
    description: String,
}

impl CreateTopicTool {
    pub fn new(context: &Context) -> Self {
        let description = prompt::describe(
            context,
            "This tool will create a new topic on the consensus service. The operator key becomes the topic admin key.",
            &[
                "topic_memo (str, optional): memo stored on the topic".to_string(),
                "transaction_memo (str, optional): memo for the create transaction".to_string(),
                "is_submit_key (bool, optional, default false): restrict message submission to the operator key".to_string(),
            ],
            true,
        );
        Self { description }
    }
}

impl Tool for CreateTopicTool {
    fn method(&self) -> &str {
        CREATE_TOPIC
    }

    fn name(&self) -> &str {
        "Create Topic"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "topic_memo": {"type": "string"},
                "transaction_memo": {"type": "string"},
                "is_submit_key": {"type": "boolean", "default": false},
                "scheduling_params": scheduling::schema_property()
            }
        })
    }

    fn is_schedulable(&self) -> bool {
        true
    }

    fn normalize(&self, args: &mut ParamReader<'_>, context: &Context) -> Request {
        let submit_key = match args.optional_bool("is_submit_key") {
            Some(true) => {
                if context.account_public_key.is_none() {
                    args.issue(
                        "is_submit_key",
                        "is true but no operator public key is configured",
                    );
                }
                context.account_public_key.clone()
            }
            _ => None,
        };

        Request::Transaction(LedgerOperation::TopicCreate {
            memo: args.optional_string("topic_memo"),
            admin_key: context.account_public_key.clone(),
            submit_key,
            transaction_memo: args.optional_string("transaction_memo"),
        })
    }

    fn human_message(&self, output: &ToolOutput) -> String {
        if let ToolOutput::Scheduled(r) = output {
            return scheduled_message("topic creation", r);
        }
        let topic = output
            .receipt()
            .and_then(|r| r.topic_id)
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "Topic created successfully with topic id {}.\nTransaction ID: {}",
            topic,
            tx_id(output)
        )
    }

    fn action(&self) -> &str {
        "create topic"
    }
}

/// Submit a message to a topic.
pub struct SubmitTopicMessageTool {
    description: String,
}

impl SubmitTopicMessageTool {
    pub fn new(context: &Context) -> Self {
        let description = prompt::describe(
            context,
            "This tool will submit a message to a topic on the consensus service.",
            &[
                "topic_id (str, required): topic to submit to".to_string(),
                "message (str, required): message content".to_string(),
                "transaction_memo (str, optional): memo for the submit transaction".to_string(),
            ],
            true,
        );
        Self { description }
    }
}

impl Tool for SubmitTopicMessageTool {
    fn method(&self) -> &str {
        SUBMIT_TOPIC_MESSAGE
    }

    fn name(&self) -> &str {
        "Submit Topic Message"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "topic_id": {"type": "string"},
                "message": {"type": "string"},
                "transaction_memo": {"type": "string"},
                "scheduling_params": scheduling::schema_property()
            },
            "required": ["topic_id", "message"]
        })
    }

    fn is_schedulable(&self) -> bool {
        true
    }

    fn normalize(&self, args: &mut ParamReader<'_>, _context: &Context) -> Request {
        Request::Transaction(LedgerOperation::TopicMessageSubmit {
            topic_id: args.required_id::<TopicId>("topic_id"),
            message: args.required_string("message"),
            transaction_memo: args.optional_string("transaction_memo"),
        })
    }

    fn human_message(&self, output: &ToolOutput) -> String {
        match output {
            ToolOutput::Scheduled(r) => scheduled_message("topic message submission", r),
            _ => format!(
                "Message submitted successfully.\nTransaction ID: {}",
                tx_id(output)
            ),
        }
    }

    fn action(&self) -> &str {
        "submit topic message"
    }
}

/// Delete a topic. Requires the topic's admin key.
pub struct DeleteTopicTool {
    description: String,
}

impl DeleteTopicTool {
    pub fn new(context: &Context) -> Self {
        let description = prompt::describe(
            context,
            "This tool will delete a topic. Only topics with an admin key can be deleted.",
            &["topic_id (str, required): topic to delete".to_string()],
            true,
        );
        Self { description }
    }
}

impl Tool for DeleteTopicTool {
    fn method(&self) -> &str {
        DELETE_TOPIC
    }

    fn name(&self) -> &str {
        "Delete Topic"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "topic_id": {"type": "string"},
                "scheduling_params": scheduling::schema_property()
            },
            "required": ["topic_id"]
        })
    }

    fn is_schedulable(&self) -> bool {
        true
    }

    fn normalize(&self, args: &mut ParamReader<'_>, _context: &Context) -> Request {
        Request::Transaction(LedgerOperation::TopicDelete {
            topic_id: args.required_id::<TopicId>("topic_id"),
        })
    }

    fn human_message(&self, output: &ToolOutput) -> String {
        match output {
            ToolOutput::Scheduled(r) => scheduled_message("topic deletion", r),
            _ => format!(
                "Topic successfully deleted.\nTransaction ID: {}",
                tx_id(output)
            ),
        }
    }

    fn action(&self) -> &str {
        "delete topic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AccountId, PublicKey};
    use crate::tools::normalize_params;

    const ED25519_RAW: &str = "e0c8ec2758a5879ffac226a13c0c516b799e72e35141a0dd828f94d37988a4b7";

    #[test]
    fn submit_key_uses_operator_key() {
        let key: PublicKey = ED25519_RAW.parse().unwrap();
        let ctx = Context::default()
            .with_account_id(AccountId::new(0, 0, 2))
            .with_public_key(key.clone());
        let tool = CreateTopicTool::new(&ctx);

        let params =
            normalize_params(&tool, &json!({"is_submit_key": true, "topic_memo": "news"}), &ctx)
                .unwrap();
        let Request::Transaction(LedgerOperation::TopicCreate {
            memo, submit_key, ..
        }) = params.request
        else {
            panic!("expected topic create");
        };
        assert_eq!(memo.as_deref(), Some("news"));
        assert_eq!(submit_key, Some(key));
    }

    #[test]
    fn submit_key_without_operator_key_is_rejected() {
        let ctx = Context::default();
        let tool = CreateTopicTool::new(&ctx);
        let err = normalize_params(&tool, &json!({"is_submit_key": true}), &ctx).unwrap_err();
        assert_eq!(err.fields(), vec!["is_submit_key"]);
    }

    #[test]
    fn message_and_topic_are_required() {
        let ctx = Context::default();
        let tool = SubmitTopicMessageTool::new(&ctx);
        let err = normalize_params(&tool, &json!({}), &ctx).unwrap_err();
        assert_eq!(err.fields(), vec!["topic_id", "message"]);
    }

    #[test]
    fn topic_lifecycle_tools_accept_scheduling() {
        let ctx = Context::default();
        let create = CreateTopicTool::new(&ctx);
        let delete = DeleteTopicTool::new(&ctx);

        let scheduled = json!({"topic_memo": "news", "scheduling_params": {"is_scheduled": true}});
        assert!(normalize_params(&create, &scheduled, &ctx).unwrap().is_scheduled());

        let immediate = json!({"topic_id": "0.0.1001", "scheduling_params": {"is_scheduled": false}});
        let params = normalize_params(&delete, &immediate, &ctx).unwrap();
        assert!(!params.is_scheduled());
        assert_eq!(
            params.request,
            Request::Transaction(LedgerOperation::TopicDelete {
                topic_id: TopicId::new(0, 0, 1001),
            })
        );
    }
}
