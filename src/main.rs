//! HTTP ingress balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                 INGRESS BALANCER                 │
//!                     │                                                  │
//!   Client Request    │  ┌──────────┐   ┌────────────┐   ┌────────────┐  │
//!   ──────────────────┼─▶│  axum    │──▶│ rate limit │──▶│  backend   │  │
//!                     │  │  server  │   │  (per IP)  │   │    pool    │  │
//!                     │  └──────────┘   └────────────┘   └─────┬──────┘  │
//!                     │                                        │         │
//!   Client Response   │  ┌──────────┐                   ┌──────▼─────┐  │
//!   ◀─────────────────┼──│ response │◀──────────────────│   hyper    │◀─┼── Backend
//!                     │  └──────────┘                   │   client   │  │
//!                     │                                 └────────────┘  │
//!                     │  ┌────────────────┐   ┌──────────────────────┐  │
//!                     │  │ health monitor │──▶│ pool liveness flags  │  │
//!                     │  └────────────────┘   └──────────────────────┘  │
//!                     └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use ingress_balancer::config::load_config;
use ingress_balancer::lifecycle::startup;
use ingress_balancer::observability::logging;

#[derive(Parser)]
#[command(name = "ingress-balancer")]
#[command(about = "Round-robin HTTP balancer with per-client rate limiting", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "balancer.toml")]
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    if cli.check {
        println!("{}: configuration OK", cli.config.display());
        return Ok(());
    }

    logging::init_logging(&config.observability);
    tracing::info!("ingress-balancer v{} starting", env!("CARGO_PKG_VERSION"));

    startup::start(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
