//! devgate binary entry point.
//!
//! Two modes: `serve` (default) runs the HTTP gateway after the startup
//! invariants hold; `setup` performs first-run initialisation. A missing
//! token store in serve mode exits 3, a blank one exits 4, both with a
//! message pointing at the fix.

use anyhow::Result;
use clap::{Parser, Subcommand};
use devgate::auth::{AuthGate, TokenStore};
use devgate::config::Config;
use devgate::exec::{CommandExecutor, SudoExecutor};
use devgate::gateway::{self, AppState};
use devgate::identity::{AccountManager, IdentityResolver};
use devgate::provision::BulkProvisioner;
use devgate::session::{self, SessionLauncher};
use devgate::{error, setup};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "devgate",
    version,
    about = "Multi-tenant access gateway for per-user development sessions"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP gateway (default)
    Serve,
    /// First-run initialisation: create the token store, issue an admin key
    Setup,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Arc::new(Config::from_env());

    // Seed the port counter for the allocation scripts in both modes.
    if let Err(err) = session::ensure_port_counter(&config.port_counter_path, config.start_port) {
        eprintln!("Couldn't create the port counter file: {err}");
        std::process::exit(1);
    }

    let executor: Arc<dyn CommandExecutor> = Arc::new(SudoExecutor);

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Setup => setup::run(&config, executor).await,
        Command::Serve => serve(config, executor).await,
    };

    if let Err(err) = result {
        let code = err
            .downcast_ref::<error::Error>()
            .map_or(1, error::Error::exit_code);
        eprintln!("{err}");
        std::process::exit(code);
    }
}

async fn serve(config: Arc<Config>, executor: Arc<dyn CommandExecutor>) -> Result<()> {
    let store = Arc::new(TokenStore::open(&config.token_store_path)?);
    let resolver = IdentityResolver::new(Arc::clone(&executor));
    let accounts = AccountManager::new(Arc::clone(&executor));
    let launcher = SessionLauncher::new(Arc::clone(&executor), config.start_port);
    let gate = AuthGate::new(Arc::clone(&store), resolver.clone());
    let provisioner = BulkProvisioner::new(Arc::clone(&store), accounts.clone());

    gateway::serve(AppState {
        config,
        gate,
        resolver,
        accounts,
        launcher,
        provisioner,
    })
    .await
}
