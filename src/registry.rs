use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::context::AgentMode;
use crate::error::KitError;
use crate::tools::Tool;

/// Ordered set of tools keyed by method.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. Returns false, leaving the registry unchanged, when
    /// its method is already taken.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> bool {
        let method = tool.method().to_string();
        if self.index.contains_key(&method) {
            return false;
        }
        self.index.insert(method, self.tools.len());
        self.tools.push(tool);
        true
    }

    /// Get a tool by method
    pub fn get(&self, method: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(method).map(|&i| Arc::clone(&self.tools[i]))
    }

    /// All tools, in registration order
    pub fn all(&self) -> Vec<&dyn Tool> {
        self.tools.iter().map(|t| t.as_ref()).collect()
    }

    /// Tool methods, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.method()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Keep only the tools whose method appears in `allowed`, preserving order.
    fn retain(&mut self, allowed: &[String]) {
        self.tools.retain(|t| allowed.iter().any(|m| m == t.method()));
        self.index = self
            .tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.method().to_string(), i))
            .collect();
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A method offered by more than one plugin. The first plugin's tool is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCollision {
    pub method: String,
    pub kept_plugin: String,
    pub dropped_plugin: String,
}

/// Outcome of [`resolve`].
pub struct Resolution {
    pub registry: ToolRegistry,
    pub collisions: Vec<ToolCollision>,
}

/// Build the active tool set for `config`.
///
/// Plugins are loaded in declared order and the first tool registered for a
/// method wins. A later tool with the same method and the same schema is
/// dropped and reported as a collision; a different schema is a
/// configuration error. A non-empty allow-list then narrows the set, and
/// every allow-list entry must name a resolved tool.
pub fn resolve(config: &Configuration) -> Result<Resolution, KitError> {
    if config.context.mode == AgentMode::ReturnBytes {
        warn!(mode = %config.context.mode, "agent mode is reserved; every dispatch will be rejected");
    }

    let mut registry = ToolRegistry::new();
    let mut owners: HashMap<String, String> = HashMap::new();
    let mut collisions = Vec::new();

    for plugin in &config.plugins {
        let tools = plugin.tools(&config.context);
        debug!(plugin = %plugin.name, tools = tools.len(), "loading plugin");

        for tool in tools {
            let method = tool.method().to_string();
            if let Some(existing) = registry.get(&method) {
                let kept_plugin = owners.get(&method).cloned().unwrap_or_default();
                if existing.schema() != tool.schema() {
                    return Err(KitError::Configuration(format!(
                        "tool {} is registered by plugins {} and {} with different schemas",
                        method, kept_plugin, plugin.name
                    )));
                }
                warn!(
                    tool = %method,
                    kept = %kept_plugin,
                    dropped = %plugin.name,
                    "duplicate tool method; keeping the first registration"
                );
                collisions.push(ToolCollision {
                    method,
                    kept_plugin,
                    dropped_plugin: plugin.name.clone(),
                });
                continue;
            }
            owners.insert(method, plugin.name.clone());
            registry.register(tool);
        }
    }

    if !config.tools.is_empty() {
        let unmatched: Vec<&str> = config
            .tools
            .iter()
            .filter(|m| registry.get(m).is_none())
            .map(String::as_str)
            .collect();
        if !unmatched.is_empty() {
            return Err(KitError::Configuration(format!(
                "allowed tools not provided by any plugin: {}",
                unmatched.join(", ")
            )));
        }
        registry.retain(&config.tools);
    }

    info!(tools = registry.len(), plugins = config.plugins.len(), "tool set resolved");
    Ok(Resolution {
        registry,
        collisions,
    })
}
