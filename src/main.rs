//! echod: a concurrent TCP echo server
//!
//! Accepts TCP connections and echoes received bytes back to the sender
//! until the peer disconnects or an I/O error occurs. Each accepted
//! connection is served by its own detached task; the accept loop never
//! waits on a worker.
//!
//! Features:
//! - One task per connection, no shared state between connections
//! - Full-write semantics (partial writes are resumed from offset)
//! - Transparent retry on interrupted reads, writes, and accepts
//! - Timestamped line-oriented logging to stdout

mod config;
mod connection;
mod server;

use config::Config;
use server::Server;
use std::process::ExitCode;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(false)
        .init();

    // Socket, option, bind, and listen failures are fatal startup errors:
    // printed to stderr, exit code 1.
    let server = Server::bind(config.port)?;

    // Runs until a fatal accept error stops the loop, then exits cleanly.
    server.run().await;
    Ok(())
}
