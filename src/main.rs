#![warn(clippy::all)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use fleet_agent::{channels, Config};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Fleet command agent: runs addressed commands from a shared chat channel.
#[derive(Parser, Debug)]
#[command(name = "fleet-agent")]
#[command(version, long_version = fleet_agent::BUILD_INFO)]
#[command(about, long_about = None)]
struct Cli {
    /// Path to config.toml (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Listen on Telegram and answer commands
    Run,

    /// Read commands from stdin and print replies
    Console {
        /// Where attachments (screenshots, downloads, long output) are written
        #[arg(long, default_value = "received")]
        save_dir: PathBuf,
    },

    /// Show effective configuration and check the Telegram connection
    Doctor,

    /// Handle one command locally, e.g. `fleet-agent exec "/status all"`
    Exec {
        /// Full command text including the leading slash
        text: String,

        #[arg(long, default_value = "received")]
        save_dir: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => {
            tracing::info!("Starting fleet-agent {}", fleet_agent::build_info());
            channels::start_telegram(config).await
        }
        Commands::Console { save_dir } => channels::start_console(config, save_dir).await,
        Commands::Doctor => channels::doctor(config).await,
        Commands::Exec { text, save_dir } => channels::exec_once(config, &text, save_dir).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn exec_keeps_command_text_whole() {
        let cli = Cli::try_parse_from(["fleet-agent", "-v", "exec", "/cmd all ls -la"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Exec { text, save_dir } => {
                assert_eq!(text, "/cmd all ls -la");
                assert_eq!(save_dir, PathBuf::from("received"));
            }
            other => panic!("expected exec, got {other:?}"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["fleet-agent", "doctor", "--config", "/tmp/a.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/a.toml")));
    }
}
