use std::sync::Arc;

use serde_json::{Value, json};

use super::{Request, Tool, ToolOutput};
use crate::context::Context;
use crate::ledger::{Query, TopicId};
use crate::normalize::ParamReader;
use crate::plugin::Plugin;
use crate::prompt;

pub const GET_TOPIC_INFO: &str = "get_topic_info";

pub fn plugin() -> Plugin {
    Plugin::new("core-consensus-query-plugin", |ctx: &Context| -> Vec<Arc<dyn Tool>> {
        vec![Arc::new(GetTopicInfoTool::new(ctx))]
    })
    .with_version("1.0.0")
    .with_description("Read-only topic queries")
}

pub struct GetTopicInfoTool {
    description: String,
}

impl GetTopicInfoTool {
    pub fn new(context: &Context) -> Self {
        let description = prompt::describe(
            context,
            "This tool will return information about a topic.",
            &["topic_id (str, required): topic to query".to_string()],
            false,
        );
        Self { description }
    }
}

impl Tool for GetTopicInfoTool {
    fn method(&self) -> &str {
        GET_TOPIC_INFO
    }

    fn name(&self) -> &str {
        "Get Topic Info"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"topic_id": {"type": "string"}},
            "required": ["topic_id"]
        })
    }

    fn normalize(&self, args: &mut ParamReader<'_>, _context: &Context) -> Request {
        Request::Query(Query::TopicInfo {
            topic_id: args.required_id::<TopicId>("topic_id"),
        })
    }

    fn human_message(&self, output: &ToolOutput) -> String {
        let ToolOutput::Data(data) = output else {
            return "Topic query returned no data.".to_string();
        };
        let mut lines = vec![format!(
            "Topic {}:",
            data["topic_id"].as_str().unwrap_or("unknown")
        )];
        if let Some(memo) = data["memo"].as_str() {
            lines.push(format!("- memo: {}", memo));
        }
        lines.push(format!("- messages: {}", data["sequence_number"]));
        lines.push(format!("- admin key: {}", yes_no(&data["has_admin_key"])));
        lines.push(format!("- submit key: {}", yes_no(&data["has_submit_key"])));
        if data["deleted"].as_bool() == Some(true) {
            lines.push("- deleted".to_string());
        }
        lines.join("\n")
    }

    fn action(&self) -> &str {
        "get topic info"
    }
}

fn yes_no(value: &Value) -> &'static str {
    if value.as_bool() == Some(true) { "yes" } else { "no" }
}
