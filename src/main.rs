//! Command-line front end for the resilience layer.
//!
//! Loads a TOML configuration and either validates it, prints the status
//! snapshot, probes a pool over HTTP, or follows configuration reloads.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use rpc_failover::config::{load_config, ConfigWatcher};
use rpc_failover::observability::logging::init_logging;
use rpc_failover::{
    ExecuteError, HttpConnector, HttpHandle, ReloadableResilience, Resilience, TargetKind,
};

#[derive(Parser)]
#[command(name = "rpc-failover")]
#[command(about = "Resilient endpoint pools with failover and circuit breaking", long_about = None)]
struct Cli {
    /// Path to the TOML configuration.
    #[arg(short, long, default_value = "rpc-failover.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and print the ordered pools
    Check,
    /// Print the status snapshot as JSON
    Status,
    /// Send a GET through the pool of one target kind
    Probe {
        /// Target kind (rpc, horizon)
        #[arg(short, long)]
        kind: TargetKind,
        /// Path requested relative to each endpoint
        #[arg(short, long, default_value = "/")]
        path: String,
    },
    /// Follow configuration changes until Ctrl-C
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_logging(&config.observability.log_level);

    tracing::info!(config = %cli.config.display(), "rpc-failover v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Check => {
            let resilience = Resilience::from_config(&config, HttpConnector::new()?)?;
            for kind in TargetKind::ALL {
                let endpoints = resilience.pool().endpoints(kind);
                let policy = resilience.retry_policy(kind);
                println!(
                    "{} ({} endpoints, {} attempts each, timeout {:?})",
                    kind,
                    endpoints.len(),
                    policy.max_attempts_per_endpoint,
                    policy.timeout
                );
                for (i, endpoint) in endpoints.iter().enumerate() {
                    println!("  [{}] {} (priority {})", i, endpoint.address, endpoint.priority);
                }
            }
            println!("configuration OK");
        }
        Commands::Status => {
            let resilience = Resilience::from_config(&config, HttpConnector::new()?)?;
            println!("{}", resilience.status().to_json()?);
        }
        Commands::Probe { kind, path } => {
            let resilience = Resilience::from_config(&config, HttpConnector::new()?)?;
            let result = probe(&resilience, kind, &path).await;
            println!("{}", resilience.status().to_json()?);

            let body = result.inspect_err(|e| eprintln!("probe failed: {}", e))?;
            println!("{}", body);
        }
        Commands::Watch => {
            let reloadable = Arc::new(ReloadableResilience::new(&config, HttpConnector::new()?)?);
            let (watcher, updates) = ConfigWatcher::new(&cli.config, config.clone());
            let _watcher = watcher.run()?;

            let follower = reloadable.clone();
            let follow = tokio::spawn(async move { follower.follow(updates).await });

            println!("{}", reloadable.load().status().to_json()?);
            tokio::signal::ctrl_c().await?;
            follow.abort();
            tracing::info!("Shutdown complete");
        }
    }

    Ok(())
}

/// GET `path` through the pool for `kind`.
async fn probe(
    resilience: &Resilience<HttpConnector>,
    kind: TargetKind,
    path: &str,
) -> Result<String, ExecuteError<String>> {
    resilience
        .execute(kind, |handle: HttpHandle| {
            let path = path.to_string();
            async move { fetch(handle, &path).await }
        })
        .await
}

async fn fetch(handle: HttpHandle, path: &str) -> Result<String, String> {
    let url = handle.join(path).map_err(|e| e.to_string())?;
    let response = handle
        .client
        .get(url)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {}", status));
    }
    response.text().await.map_err(|e| e.to_string())
}
