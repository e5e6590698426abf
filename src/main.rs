//! mcphub entry point.
//!
//! Thin CLI over the composition root in `mcphub-axum::bootstrap`; nothing
//! here touches storage or transports directly.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mcphub_axum::ServeConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mcphub")]
#[command(about = "Aggregate many MCP servers behind one authenticated endpoint")]
#[command(version)]
struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway
    Serve {
        /// Directory for workspace stores and the workspace registry
        #[arg(long = "data-dir", default_value = ".mcphub")]
        data_dir: PathBuf,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, default_value_t = 8787)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Serve {
            data_dir,
            host,
            port,
        } => {
            mcphub_axum::serve(ServeConfig {
                data_dir,
                host,
                port,
            })
            .await
        }
    }
}
