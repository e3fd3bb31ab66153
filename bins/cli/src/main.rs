//! Ledgerform CLI
//!
//! Plans and applies a ledger manifest against the remote ledger service.

mod state;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledgerform_client::GraphqlLedgerClient;
use ledgerform_core::ReconcilePass;
use ledgerform_shared::AppConfig;

/// Ledgerform - declarative ledger configuration
#[derive(Parser, Debug)]
#[command(name = "ledgerform")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Mirror of the last applied remote state
    #[arg(long, global = true, default_value = "ledgerform.state.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the changes a pass would make, reading only
    Plan {
        /// Path to the JSON manifest
        manifest: PathBuf,
    },

    /// Apply the manifest and update the state file
    Apply {
        /// Path to the JSON manifest
        manifest: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledgerform=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    let client = GraphqlLedgerClient::new(&config.ledger)?;
    info!(endpoint = %client.endpoint(), "Ledger client ready");

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping after the current request");
                cancel.cancel();
            }
        }
    });

    let pass = ReconcilePass::new(&client, &cancel, config.ledger.page_size);

    match cli.command {
        Command::Plan { manifest } => {
            let manifest = state::load_manifest(&manifest)?;
            let mirror = state::load_mirror(&cli.state)?;
            let plan = pass.plan(&manifest, &mirror).await;

            if plan.changes.is_empty() {
                println!("No changes.");
            }
            for change in &plan.changes {
                println!("{change}");
            }
            for error in &plan.errors {
                eprintln!("error: {error}");
            }
            Ok(exit_code(plan.errors.len()))
        }
        Command::Apply { manifest } => {
            let manifest = state::load_manifest(&manifest)?;
            let mut mirror = state::load_mirror(&cli.state)?;
            let report = pass.run(&manifest, &mut mirror).await;

            // Whatever landed is saved, even when the pass failed part way.
            state::save_mirror(&cli.state, &mirror)?;
            info!(path = %cli.state.display(), "State saved");

            for outcome in &report.outcomes {
                println!("{outcome}");
            }
            for error in &report.errors {
                eprintln!("error: {error}");
            }
            if report.was_cancelled() {
                warn!("Pass cancelled");
            }
            Ok(exit_code(report.errors.len()))
        }
    }
}

fn exit_code(errors: usize) -> ExitCode {
    if errors == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_state_defaults_and_overrides() {
        let cli = Cli::parse_from(["ledgerform", "plan", "ledger.json"]);
        assert_eq!(cli.state, PathBuf::from("ledgerform.state.json"));
        assert!(matches!(cli.command, Command::Plan { ref manifest } if manifest == &PathBuf::from("ledger.json")));

        let cli = Cli::parse_from(["ledgerform", "apply", "ledger.json", "--state", "prod.json"]);
        assert_eq!(cli.state, PathBuf::from("prod.json"));
        assert!(matches!(cli.command, Command::Apply { .. }));
    }
}
