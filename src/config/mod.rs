mod project;

pub use project::{GLOBAL_CONFIG_DIR, PROJECT_CONFIG_FILE, ProjectConfig, parse_tools};

use crate::context::Context;
use crate::plugin::Plugin;
use crate::tools::core_plugins;

/// Everything needed to resolve a tool set: which plugins to load, which
/// methods to expose, and the session context.
///
/// An empty `tools` list exposes every tool the plugins provide.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    pub tools: Vec<String>,
    pub plugins: Vec<Plugin>,
    pub context: Context,
}

impl Configuration {
    pub fn new(context: Context) -> Self {
        Self {
            tools: Vec::new(),
            plugins: Vec::new(),
            context,
        }
    }

    /// Append plugins after any already configured.
    pub fn with_plugins(mut self, plugins: impl IntoIterator<Item = Plugin>) -> Self {
        self.plugins.extend(plugins);
        self
    }

    pub fn with_plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Replace the allow-list.
    pub fn with_tools<S: Into<String>>(mut self, tools: impl IntoIterator<Item = S>) -> Self {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Load every plugin this crate ships.
    pub fn with_core_plugins(self) -> Self {
        self.with_plugins(core_plugins())
    }
}
