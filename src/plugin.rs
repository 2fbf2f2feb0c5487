use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::tools::Tool;

type ToolFactory = dyn Fn(&Context) -> Vec<Arc<dyn Tool>> + Send + Sync;

/// A named bundle of related tools.
///
/// Holds no state of its own: each call to [`tools`](Self::tools) builds a
/// fresh set for the given context.
#[derive(Clone)]
pub struct Plugin {
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    factory: Arc<ToolFactory>,
}

impl Plugin {
    pub fn new(
        name: impl Into<String>,
        factory: impl Fn(&Context) -> Vec<Arc<dyn Tool>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            version: None,
            description: None,
            factory: Arc::new(factory),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Instantiate this plugin's tools, in declaration order.
    pub fn tools(&self, context: &Context) -> Vec<Arc<dyn Tool>> {
        (self.factory)(context)
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
