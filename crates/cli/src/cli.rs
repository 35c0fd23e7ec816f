use clap::{Parser, Subcommand};

/// Ayati — a long-running local AI-agent runtime core.
#[derive(Debug, Parser)]
#[command(name = "ayati", version, about)]
pub struct Cli {
    /// Path to the TOML config file. Defaults to `config.toml`, falling
    /// back to built-in defaults if absent.
    #[arg(long, global = true, default_value = "config.toml")]
    pub config: String,
    /// Directory journals, the session index, and the pulse store live
    /// under.
    #[arg(long, global = true, default_value = "data")]
    pub data_dir: String,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one turn from stdin and print the reply (default when no
    /// subcommand is given).
    Run {
        /// Client identity the session is scoped to.
        #[arg(long, default_value = "cli:run")]
        client: String,
        /// Print the full [`AgentLoopOutcome`] as JSON instead of just the
        /// reply text.
        #[arg(long)]
        json: bool,
    },
    /// Parse the config file and report whether it is valid.
    Doctor,
    /// Print the resolved configuration (with defaults) as TOML.
    Config,
}
