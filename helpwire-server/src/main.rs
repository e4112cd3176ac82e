//! Helpwire server — entry point.
//!
//! ```text
//! helpwire-server                     Listen on 0.0.0.0:7400
//! helpwire-server -p 9000             Custom port
//! helpwire-server --bind 127.0.0.1    Custom bind address
//! ```

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod context;
mod server;

use context::ServerContext;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "helpwire-server", about = "Helpwire reference server")]
struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = 7400)]
    port: u16,

    /// Log level when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("helpwire-server v{}", env!("CARGO_PKG_VERSION"));

    let listener = TcpListener::bind((cli.bind.as_str(), cli.port)).await?;
    info!("listening on {}", listener.local_addr()?);

    // Composition root: the one place shared state is constructed.
    let ctx = Arc::new(ServerContext::default());

    tokio::select! {
        result = server::run(listener, ctx) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received — shutting down");
        }
    }

    Ok(())
}
