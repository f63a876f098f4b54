mod cli;
mod config;
mod duration;
mod error;
mod models;
mod output;
mod reconcile;
mod registry;
mod rules;

use std::path::Path;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::Cli;
use config::Config;
use output::{print_dry_run_banner, print_report, print_summary};
use reconcile::Reconciler;
use registry::QuayClient;

#[tokio::main]
async fn main() {
    // Before parsing so clap's env lookups see the file's values
    let dotenv = config::load_dotenv(Path::new("."));
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "tagexpire=debug" } else { "tagexpire=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli).context("Failed to load configuration")?;
    if config.dry_run {
        print_dry_run_banner();
    }

    let client = QuayClient::new(&config).context("Failed to create Quay client")?;

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if record_interrupt(&interrupted) {
                    eprintln!("Interrupted again, exiting");
                    process::exit(130);
                }
                tracing::warn!("Interrupt received, finishing current repository (Ctrl-C again to abort)");
            }
        });
    }

    tracing::info!(url = %config.url, "Collect repositories and change tag expiration");
    let report = Reconciler::new(&client, &config)
        .with_interrupt(interrupted)
        .run()
        .await;

    print_report(&report, config.dry_run);
    print_summary(&report, config.dry_run);

    Ok(())
}

/// Set the interrupt flag; true if it was already set.
fn record_interrupt(flag: &AtomicBool) -> bool {
    flag.swap(true, Ordering::SeqCst)
}
