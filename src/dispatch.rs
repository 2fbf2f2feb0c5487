use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Configuration;
use crate::context::{AgentMode, Context};
use crate::error::KitError;
use crate::ledger::LedgerClient;
use crate::registry::{self, ToolCollision, ToolRegistry};
use crate::scheduling;
use crate::tools::{self, Tool, ToolResponse};

/// Shared inner state, wrapped in Arc so clones can be handed to concurrent tasks.
struct Inner {
    client: Arc<dyn LedgerClient>,
    context: Context,
    registry: ToolRegistry,
    collisions: Vec<ToolCollision>,
}

/// Single entry point an agent framework calls tools through.
///
/// The tool set is resolved once at construction. [`dispatch`](Self::dispatch)
/// never fails: every problem with a call comes back as an error
/// [`ToolResponse`] the agent can read and correct.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use ledger_agent_kit::{AccountId, Configuration, Context, Dispatcher, LedgerId, SandboxLedger};
/// # async fn example() -> Result<(), ledger_agent_kit::KitError> {
/// let operator = AccountId::new(0, 0, 2);
/// let ledger = Arc::new(SandboxLedger::new(LedgerId::Testnet, operator, 100));
/// let config = Configuration::new(Context::default().with_account_id(operator)).with_core_plugins();
/// let dispatcher = Dispatcher::new(ledger, &config)?;
///
/// let response = dispatcher
///     .dispatch("get_hbar_balance", serde_json::json!({}))
///     .await;
/// println!("{}", response.human_message);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Resolve the tool set for `config`. Misconfiguration fails here rather
    /// than on the first call.
    pub fn new(client: Arc<dyn LedgerClient>, config: &Configuration) -> Result<Self, KitError> {
        let resolution = registry::resolve(config)?;
        Ok(Self {
            inner: Arc::new(Inner {
                client,
                context: config.context.clone(),
                registry: resolution.registry,
                collisions: resolution.collisions,
            }),
        })
    }

    /// Resolved tools, in registration order.
    pub fn tools(&self) -> Vec<&dyn Tool> {
        self.inner.registry.all()
    }

    pub fn tool(&self, method: &str) -> Option<Arc<dyn Tool>> {
        self.inner.registry.get(method)
    }

    /// Duplicate methods dropped during resolution.
    pub fn collisions(&self) -> &[ToolCollision] {
        &self.inner.collisions
    }

    pub fn context(&self) -> &Context {
        &self.inner.context
    }

    /// Look up, normalize, optionally schedule, and execute one tool call.
    pub async fn dispatch(&self, tool_name: &str, args: Value) -> ToolResponse {
        let call_id = Uuid::new_v4();
        debug!(%call_id, tool = %tool_name, "dispatching tool call");

        let context = &self.inner.context;
        if context.mode != AgentMode::Autonomous {
            warn!(%call_id, tool = %tool_name, mode = %context.mode, "rejected call in unsupported mode");
            return ToolResponse::error(KitError::UnsupportedMode(context.mode).to_string());
        }

        let Some(tool) = self.inner.registry.get(tool_name) else {
            debug!(%call_id, tool = %tool_name, "unknown tool");
            return ToolResponse::error(KitError::UnknownTool(tool_name.to_string()).to_string());
        };

        let params = match tools::normalize_params(tool.as_ref(), &args, context)
            .and_then(|params| scheduling::apply(params, context))
        {
            Ok(params) => params,
            Err(e) => {
                debug!(%call_id, tool = %tool_name, fields = ?e.fields(), "invalid parameters");
                return ToolResponse::error(KitError::Validation(e).to_string());
            }
        };
        if params.is_scheduled() {
            info!(%call_id, tool = %tool_name, "submitting as scheduled transaction");
        }

        let response = tools::call(tool.as_ref(), self.inner.client.as_ref(), context, params).await;
        match response.error_message() {
            Some(error) => warn!(%call_id, tool = %tool_name, error = %error, "tool call failed"),
            None => debug!(%call_id, tool = %tool_name, "tool call succeeded"),
        }
        response
    }
}
