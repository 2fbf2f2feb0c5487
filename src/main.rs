use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use ledger_agent_kit::config::parse_tools;
use ledger_agent_kit::{
    AccountId, AgentMode, Configuration, Dispatcher, LedgerId, ProjectConfig, RateCache,
    SandboxLedger, ToolResponse,
};

const DEFAULT_OPERATOR: AccountId = AccountId::new(0, 0, 2);
const DEFAULT_OPERATOR_HBAR: i64 = 10_000;

#[derive(Parser)]
#[command(name = "ledger-agent-kit", version)]
#[command(about = "Agent-invokable ledger tools", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Comma separated tool methods to expose, or "all"
    #[arg(long, global = true)]
    tools: Option<String>,

    /// Agent mode (autonomous, returnBytes)
    #[arg(long, global = true)]
    agent_mode: Option<AgentMode>,

    /// Operator account, e.g. 0.0.1234
    #[arg(long, global = true)]
    account_id: Option<AccountId>,

    /// Operator public key (raw or DER hex)
    #[arg(long, global = true)]
    public_key: Option<String>,

    /// Network (testnet, mainnet)
    #[arg(long, global = true)]
    ledger_id: Option<LedgerId>,

    /// Config file to use instead of the project and global files
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved tool set as JSON
    Tools,

    /// Call one tool and print its response
    Call {
        /// Tool method, e.g. transfer_hbar
        method: String,

        /// Tool arguments as a JSON object
        #[arg(default_value = "{}")]
        arguments: String,
    },

    /// Read one JSON request per line from stdin and answer each on stdout
    Serve,
}

/// One line of `serve` input.
#[derive(Deserialize)]
struct ServeRequest {
    tool: String,
    #[serde(default)]
    arguments: Value,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive("info".parse().expect("valid log directive"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Settings with precedence: CLI > env > project > global > defaults.
fn load_settings(cli: &Cli) -> Result<ProjectConfig> {
    let files = match &cli.config {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            ProjectConfig::load_from(path)?.with_env_from(|name| std::env::var(name).ok())?
        }
        None => ProjectConfig::load()?,
    };

    let flags = ProjectConfig {
        tools: cli.tools.as_deref().map(parse_tools),
        agent_mode: cli.agent_mode,
        account_id: cli.account_id,
        public_key: cli.public_key.clone(),
        ledger_id: cli.ledger_id,
        usd_rate: None,
    };
    Ok(files.merge(flags))
}

/// Sandbox ledger seeded with the operator, quoting `usd_rate` when configured.
fn build_ledger(settings: &ProjectConfig, operator: AccountId) -> Result<SandboxLedger> {
    let ledger = SandboxLedger::new(
        settings.ledger_id.unwrap_or_default(),
        operator,
        DEFAULT_OPERATOR_HBAR,
    );
    let Some(usd) = settings.usd_rate else {
        return Ok(ledger);
    };
    // Quote per 100 hbar so sub-cent prices keep their precision.
    let cents = (usd * rust_decimal::Decimal::from(10_000))
        .round()
        .to_u64()
        .filter(|c| *c > 0)
        .with_context(|| format!("usd_rate must be positive, got {}", usd))?;
    Ok(ledger.with_exchange_rate(100, cents))
}

async fn build_dispatcher(cli: &Cli) -> Result<Dispatcher> {
    let settings = load_settings(cli)?;
    let mut context = settings.context()?;
    let operator = *context.account_id.get_or_insert(DEFAULT_OPERATOR);

    let ledger = Arc::new(build_ledger(&settings, operator)?);
    let rates = Arc::new(RateCache::new());
    if let Err(e) = rates.initialize(ledger.as_ref()).await {
        warn!(error = %e, "exchange rate unavailable; USD values will be omitted");
    }
    context = context.with_rates(rates);

    info!(
        ledger = %settings.ledger_id.unwrap_or_default(),
        operator = %operator,
        mode = %context.mode,
        "starting sandbox host"
    );

    let config = Configuration::new(context)
        .with_core_plugins()
        .with_tools(settings.allowed_tools());
    let dispatcher =
        Dispatcher::new(ledger, &config).context("failed to resolve tool configuration")?;
    Ok(dispatcher)
}

async fn serve(dispatcher: &Dispatcher) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<ServeRequest>(&line) {
            Ok(request) => dispatcher.dispatch(&request.tool, request.arguments).await,
            Err(e) => {
                debug!(error = %e, "malformed request line");
                ToolResponse::error(format!("invalid request: {}", e))
            }
        };
        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let dispatcher = build_dispatcher(&cli).await?;

    match &cli.command {
        Commands::Tools => {
            let tools: Vec<Value> = dispatcher
                .tools()
                .into_iter()
                .map(|tool| {
                    json!({
                        "method": tool.method(),
                        "name": tool.name(),
                        "description": tool.description(),
                        "parameters": tool.schema(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }

        Commands::Call { method, arguments } => {
            let arguments: Value =
                serde_json::from_str(arguments).context("arguments must be valid JSON")?;
            let response = dispatcher.dispatch(method, arguments).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.is_success() {
                std::process::exit(1);
            }
        }

        Commands::Serve => serve(&dispatcher).await?,
    }

    Ok(())
}
