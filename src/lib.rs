pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod ledger;
pub mod normalize;
pub mod plugin;
pub mod prompt;
pub mod rates;
pub mod registry;
pub mod scheduling;
pub mod tools;
pub mod units;

pub use config::{Configuration, ProjectConfig};
pub use context::{AgentMode, Context, LedgerId};
pub use dispatch::Dispatcher;
pub use error::{FieldIssue, KitError, ValidationError};
pub use ledger::{
    AccountId, ContractId, LedgerClient, LedgerError, LedgerOperation, PublicKey, SandboxLedger,
    ScheduleId, TokenId, TopicId, TransactionId, TransactionReceipt,
};
pub use plugin::Plugin;
pub use rates::RateCache;
pub use registry::{Resolution, ToolCollision, ToolRegistry};
pub use scheduling::SchedulingParams;
pub use tools::{NormalizedParams, Request, Tool, ToolOutput, ToolResponse, ToolResult};
