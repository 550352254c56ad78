//! Text REPL for the Sotto assistant core.
//!
//! Runs the full conversational pipeline (filters, fast path, workflows,
//! chat loop) against typed input, printing tool calls and workflow
//! progress as they happen.  Commands: `quit`/`exit`/`q` to leave,
//! `clear` to reset the conversation.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use sotto_engine::{EngineConfig, EngineEvent, EventBus, Session, StateStatus, TurnContext};
use sotto_llm::{LlmClient, LlmConfig};
use sotto_tools::ToolRegistry;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "sotto", about = "Sotto assistant REPL", version)]
struct Cli {
    /// Enable debug logging.
    #[arg(long)]
    debug: bool,

    /// Pin the LLM provider (anthropic, openai, ollama).
    #[arg(long)]
    provider: Option<String>,

    /// Model override for the pinned provider.
    #[arg(long)]
    model: Option<String>,

    /// Client IANA timezone for fast-path time queries.
    #[arg(long)]
    timezone: Option<String>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let mut llm_config = LlmConfig::from_env();
    if let Some(provider) = &cli.provider {
        llm_config.provider = Some(provider.parse().context("unknown provider")?);
    }
    if let Some(model) = &cli.model {
        llm_config.model = model.clone();
    }

    let active_provider = llm_config.resolve_provider();
    let active_model = llm_config.model_for(active_provider).to_owned();

    let model = Arc::new(LlmClient::new(llm_config).context("failed to create LLM client")?);
    let registry = Arc::new(ToolRegistry::builtin());
    let bus = EventBus::new(256);

    spawn_event_printer(bus.subscribe());

    let mut session = Session::new(model, registry, EngineConfig::from_env(), bus);
    let turn_ctx = TurnContext {
        client_timezone: cli.timezone.clone(),
        stt: None,
    };

    println!("Sotto assistant ({active_provider}/{active_model})");
    println!("Type 'quit' to exit, 'clear' to reset conversation.\n");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"You: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        if input.is_empty() {
            continue;
        }
        match input.to_lowercase().as_str() {
            "quit" | "exit" | "q" => break,
            "clear" => {
                session.clear_history();
                println!("Conversation cleared.\n");
                continue;
            }
            _ => {}
        }

        match session.chat_with_context(input, &turn_ctx).await {
            Ok(Some(reply)) => println!("Assistant: {reply}\n"),
            Ok(None) => println!("(dropped by input filter)\n"),
            Err(e) => println!("Error: {e}\n"),
        }
    }

    println!("Goodbye!");
    Ok(())
}

// ---------------------------------------------------------------------------
// Event printing
// ---------------------------------------------------------------------------

/// Render engine events as they stream in, one concise line each.
fn spawn_event_printer(mut rx: tokio::sync::broadcast::Receiver<Arc<EngineEvent>>) {
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event.as_ref() {
                EngineEvent::ToolCall { name, args } => {
                    println!("  tool: {name}({args})");
                }
                EngineEvent::WorkflowStart { definition } => {
                    println!(
                        "  workflow: {} ({})",
                        definition["name"].as_str().unwrap_or("?"),
                        definition["workflow_id"].as_str().unwrap_or("?"),
                    );
                }
                EngineEvent::WorkflowState {
                    state_id,
                    status: StateStatus::Active,
                    detail,
                    ..
                } => match detail {
                    Some(detail) => println!("  step: {state_id} ({detail})"),
                    None => println!("  step: {state_id}"),
                },
                EngineEvent::WorkflowState {
                    state_id,
                    status: StateStatus::Visited,
                    ..
                } => {
                    println!("    done: {state_id}");
                }
                EngineEvent::WorkflowNarration { text } => {
                    println!("  {text}");
                }
                EngineEvent::WorkflowExit { workflow_id } => {
                    println!("  workflow done: {workflow_id}");
                }
                _ => {}
            }
        }
    });
}
