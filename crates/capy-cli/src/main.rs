//! Capy CLI — entry point.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use capy::CorrelationClient;
use capy_cli::commands::{execute, Command};
use capy_cli::config::{resolve_endpoint, resolve_timeout_ms};

#[derive(Parser)]
#[command(
    name = "capy",
    about = "Correlation statistics from a faceted search endpoint",
    version
)]
struct Cli {
    /// Statistics endpoint URL (also read from CAPY_ENDPOINT).
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    /// Request timeout in milliseconds (also read from CAPY_TIMEOUT_MS).
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Stats(Command),

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   capy completions bash > ~/.local/share/bash-completion/completions/capy
    ///   capy completions zsh > ~/.zfunc/_capy
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Stats(command) => {
            let endpoint = resolve_endpoint(cli.endpoint.as_deref());
            let timeout_ms = resolve_timeout_ms(cli.timeout_ms);
            tracing::debug!("Endpoint: {endpoint} (timeout {timeout_ms} ms)");

            let client = CorrelationClient::connect(&endpoint, timeout_ms);
            let output = execute(&client, &command)?;
            println!("{}", output.trim_end());
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "capy", &mut std::io::stdout());
        }
    }

    Ok(())
}
