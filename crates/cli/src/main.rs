//! `ayati` — a thin harness binary exercising the core end-to-end: load
//! config, open a session, run one turn from stdin, print the reply.
//!
//! This is not a chat client or a socket server (both out of scope per
//! §1) — it talks to the core the same way those collaborators would,
//! through the public interfaces of `ayati-domain`/`ayati-guardrail`/
//! `ayati-tools`/`ayati-session`/`ayati-agent`. In the absence of a real
//! provider adapter (also out of scope here) it drives the loop with a
//! `ScriptedProvider` that answers directly, which is enough to prove the
//! crates compose and a turn round-trips through the journal.

mod cli;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ayati_agent::{run_agent_loop, AgentLoopInput, NullContextRecallAgent, RunHandle, ScriptedProvider, TurnOutcome};
use ayati_domain::config::Config;
use ayati_guardrail::{ConfirmationStore, PolicyStore};
use ayati_session::{SessionIndex, SessionMemoryManager};
use ayati_tools::builtin_registry;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config_path = PathBuf::from(&cli.config);
    let config = Config::load_or_default(&config_path).with_context(|| format!("loading {}", config_path.display()))?;

    match cli.command.unwrap_or(Command::Run { client: "cli:run".into(), json: false }) {
        Command::Run { client, json } => run_one_turn(config, &cli.data_dir, &client, json).await,
        Command::Doctor => doctor(&config_path),
        Command::Config => print_config(&config),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,ayati=debug")))
        .json()
        .init();
}

fn doctor(config_path: &std::path::Path) -> anyhow::Result<()> {
    if !config_path.exists() {
        println!("no config file at {} — built-in defaults apply", config_path.display());
        return Ok(());
    }
    let text = std::fs::read_to_string(config_path)?;
    match Config::from_toml(&text) {
        Ok(_) => {
            println!("{} parses cleanly", config_path.display());
            Ok(())
        }
        Err(e) => anyhow::bail!("{} failed to parse: {e}", config_path.display()),
    }
}

fn print_config(config: &Config) -> anyhow::Result<()> {
    let text = toml::to_string_pretty(config).context("serializing resolved config")?;
    println!("{text}");
    Ok(())
}

/// Reads one message from stdin, runs it through a real session +
/// guardrail + tool executor + agent loop, and prints the reply.
async fn run_one_turn(config: Config, data_dir: &str, client_id: &str, json: bool) -> anyhow::Result<()> {
    let data_root = PathBuf::from(data_dir);

    let mut user_message = String::new();
    std::io::stdin().read_to_string(&mut user_message).context("reading stdin")?;
    let user_message = user_message.trim().to_string();
    if user_message.is_empty() {
        anyhow::bail!("no input on stdin");
    }

    let policy = Arc::new(PolicyStore::from_config(config.guardrail.clone()));
    let confirmations = Arc::new(ConfirmationStore::new(
        config.guardrail.confirmation_token_prefix.clone(),
        config.guardrail.confirmation_ttl_secs,
    ));
    let tools = builtin_registry(policy, confirmations);

    let index = Arc::new(SessionIndex::open(&data_root.join("memory.sqlite")).context("opening session index")?);
    let memory = SessionMemoryManager::new(data_root.join("sessions"), index);
    memory.initialize(client_id).context("restoring session state")?;

    let (session_id, run_id) = memory.begin_run(client_id, &user_message)?;
    let run = RunHandle { session_id, run_id };

    // The CLI harness has no live model behind it; it answers the turn
    // directly so the loop exercises the journal, guardrail, and tool
    // wiring end to end without a provider adapter.
    let provider = ScriptedProvider::new(vec![TurnOutcome::Assistant {
        content: format!("received: {user_message}"),
    }]);
    let recall = NullContextRecallAgent;

    let input = AgentLoopInput {
        client_id: client_id.to_string(),
        user_content: user_message,
        system_context: "You are Ayati, a local agent runtime harness.".to_string(),
        static_system_tokens: 0,
        dynamic_system_tokens: 0,
        run,
        provider_name: "scripted".to_string(),
        model_name: "none".to_string(),
    };

    let outcome = run_agent_loop(&config.agent_loop, &config.prompt, &provider, &tools, &memory, &recall, input)
        .await
        .context("running agent loop")?;

    memory.flush_background_tasks().await;
    memory.shutdown(client_id).await?;

    if json {
        let value = serde_json::json!({
            "kind": format!("{:?}", outcome.kind),
            "content": outcome.content,
            "end_status": outcome.end_status.map(|s| format!("{s:?}")),
            "total_steps": outcome.total_steps,
            "tool_calls_made": outcome.tool_calls_made,
            "session_id": session_id.to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", outcome.content);
    }

    Ok(())
}
