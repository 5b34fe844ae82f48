//! cockpit - command-line front-end for the Green Hill orchestration server.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use greenhill_cockpit::agents::{AgentRegistry, COMMANDS, ERROR_MARKER};
use greenhill_cockpit::config::Config;
use greenhill_cockpit::llm::{LlmClient, OpenAiClient};
use greenhill_cockpit::orchestration::{InvokeOutcome, OrchestrationClient};
use greenhill_cockpit::storage::{EvidenceEntry, EvidenceLog, StateStore};
use greenhill_cockpit::util::{mask_secret, truncate_chars};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const ANSWER_PREVIEW_CHARS: usize = 240;

#[derive(Debug, Parser)]
#[command(name = "cockpit")]
#[command(author, version, about = "Green Hill Canarias executive cockpit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Ask an agent a question through the orchestration server
    Ask {
        /// Agent id (`auto` lets the CEO digital twin answer)
        #[arg(short, long, default_value = "auto")]
        agent: String,

        /// Optional command (analyze, recommend, forecast, report, simulate, optimize)
        #[arg(short, long)]
        command: Option<String>,

        question: String,
    },

    /// Show recent evidence, newest first
    Evidence {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Inspect or edit the governance state
    State {
        #[command(subcommand)]
        action: StateAction,
    },

    /// List agents and commands
    Agents,

    /// Check reachability and show masked configuration
    Diagnostics,
}

#[derive(Debug, Subcommand)]
enum StateAction {
    /// Print the current state as JSON
    Show,

    /// Update individual fields
    Set {
        #[arg(long)]
        phase: Option<String>,

        #[arg(long)]
        zec_rate: Option<f64>,

        /// Cash buffer target date (YYYY-MM-DD)
        #[arg(long)]
        cash_buffer_to: Option<String>,

        /// Key date as `name=YYYY-MM-DD`; repeatable
        #[arg(long = "key-date", value_parser = parse_key_date)]
        key_dates: Vec<(String, String)>,
    },
}

fn parse_key_date(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, date)) if !name.trim().is_empty() && !date.trim().is_empty() => {
            Ok((name.trim().to_string(), date.trim().to_string()))
        }
        _ => Err(format!("expected name=date, got '{}'", raw)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "greenhill_cockpit=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Ask {
            agent,
            command,
            question,
        } => ask(&config, &agent, command, &question).await,
        Commands::Evidence { limit } => show_evidence(&config, limit).await,
        Commands::State { action } => state(&config, action).await,
        Commands::Agents => {
            list_agents();
            Ok(())
        }
        Commands::Diagnostics => diagnostics(&config).await,
    }
}

async fn ask(
    config: &Config,
    agent: &str,
    command: Option<String>,
    question: &str,
) -> anyhow::Result<()> {
    let state = StateStore::new(config.state_file.clone()).load().await;
    let client = OrchestrationClient::new(&config.orchestration);

    let outcome = client
        .invoke(question, command.as_deref(), agent, &state)
        .await;

    let (serving_agent, answer, tokens) = match &outcome {
        InvokeOutcome::Answer(response) if response.is_error() => {
            bail!("{}", response.answer.trim_start_matches(ERROR_MARKER))
        }
        InvokeOutcome::Answer(response) => (
            response.meta.agent.clone(),
            response.answer.clone(),
            response.meta.tokens,
        ),
        InvokeOutcome::Demo { agent, answer } => (agent.clone(), answer.clone(), 0),
        InvokeOutcome::Error { message } => bail!("{}", message),
    };

    let registry = AgentRegistry::builtin();
    println!("{}:\n{}", registry.display_name(&serving_agent), answer);

    if let Some(path) = &config.evidence_log {
        let entry = EvidenceEntry::new(serving_agent, question, answer, tokens)
            .with_command(command)
            .with_state(serde_json::to_value(&state).ok());
        if let Err(e) = EvidenceLog::new(path.clone()).append(&entry).await {
            tracing::warn!("Failed to record evidence: {}", e);
        }
    }
    Ok(())
}

async fn show_evidence(config: &Config, limit: usize) -> anyhow::Result<()> {
    let Some(path) = &config.evidence_log else {
        println!("Evidence logging is disabled (GHC_DT_EVIDENCE_LOG is empty).");
        return Ok(());
    };

    let entries = EvidenceLog::new(path.clone())
        .read_recent(limit)
        .await
        .context("Could not read evidence file")?;
    if entries.is_empty() {
        println!("No evidence recorded yet.");
        return Ok(());
    }

    for entry in entries {
        let command = entry
            .command
            .as_deref()
            .map(|c| format!(" [{}]", c))
            .unwrap_or_default();
        println!("{} {}{}", entry.timestamp, entry.agent, command);
        println!("  Q: {}", entry.question);
        println!("  A: {}", truncate_chars(&entry.answer, ANSWER_PREVIEW_CHARS));
    }
    Ok(())
}

async fn state(config: &Config, action: StateAction) -> anyhow::Result<()> {
    let store = StateStore::new(config.state_file.clone());
    let mut current = store.load().await;

    if let StateAction::Set {
        phase,
        zec_rate,
        cash_buffer_to,
        key_dates,
    } = action
    {
        if let Some(phase) = phase {
            current.phase = Some(phase);
        }
        if let Some(rate) = zec_rate {
            current.zec_rate = Some(rate);
        }
        if let Some(date) = cash_buffer_to {
            current.cash_buffer_to = Some(date);
        }
        current.key_dates.extend(key_dates);
        store
            .save(&current)
            .await
            .with_context(|| format!("Failed to save {}", store.path().display()))?;
    }

    println!("{}", serde_json::to_string_pretty(&current)?);
    Ok(())
}

fn list_agents() {
    println!("Agents:");
    for agent in AgentRegistry::builtin().iter() {
        println!(
            "  {:<12} {} (temperature {})",
            agent.id, agent.display_name, agent.temperature
        );
    }
    println!("\nCommands:");
    for command in COMMANDS {
        println!("  {:<12} {}", command.id, command.description);
    }
}

async fn diagnostics(config: &Config) -> anyhow::Result<()> {
    let orchestration = OrchestrationClient::new(&config.orchestration);
    let orchestration_ok = orchestration.health().await;

    let provider_ok = match OpenAiClient::from_config(&config.provider) {
        Some(client) => match client.probe().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Provider probe failed: {}", e);
                false
            }
        },
        None => false,
    };

    println!("Orchestration endpoint: {}", orchestration.base_url());
    println!("  reachable: {}", orchestration_ok);
    println!("  LANGGRAPH_API_KEY: {}", mask_secret(config.orchestration.api_key.as_deref()));
    println!("Completion provider: {}", config.provider.base_url);
    println!("  reachable: {}", provider_ok);
    println!("  OPENAI_API_KEY: {}", mask_secret(config.provider.api_key.as_deref()));
    println!("  model: {}", config.provider.default_model);
    println!("State file: {}", config.state_file.display());
    match &config.evidence_log {
        Some(path) => println!("Evidence log: {}", path.display()),
        None => println!("Evidence log: disabled"),
    }
    Ok(())
}
