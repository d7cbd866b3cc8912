//! Cachet demo server
//!
//! Endpoints:
//!   POST /login?user=NAME  - Start a session for NAME
//!   GET  /me               - Show the current session
//!   POST /logout           - Destroy the current session

mod routes;

use anyhow::{Context, Result};
use cachet_core::config::CachetConfig;
use cachet_core::session::{MemorySessionStore, SessionManager};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

/// CLI arguments
#[derive(Parser)]
#[command(name = "cachet-server", about = "Cookie session demo server")]
struct Args {
    /// Listening address (overrides config and CACHET_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Listening port (overrides config and CACHET_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// TOML configuration file
    #[arg(short, long, default_value = "cachet.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    let args = Args::parse();

    let mut config = CachetConfig::load_from(&args.config)?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    let manager =
        SessionManager::with_config(MemorySessionStore::new(), config.sessions.to_manager_config()?);

    log::info!("🚀 Starting Cachet demo server");
    log::info!("   Cookie: {}", manager.cookie_name());
    log::info!("   Max lifetime: {}s", manager.max_lifetime_secs());
    log::info!("   Write policy: {:?}", manager.config().write_policy);

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    log::info!("✅ Server listening on http://{}", addr);

    let manager = Arc::new(manager);

    loop {
        let (stream, remote_addr) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                return Ok(());
            }
        };
        let manager = manager.clone();

        tokio::spawn(async move {
            let io = hyper_util::rt::TokioIo::new(stream);

            let service = hyper::service::service_fn(move |req| {
                let manager = manager.clone();
                async move { routes::handle_request(&manager, req).await }
            });

            if let Err(err) =
                hyper::server::conn::http1::Builder::new().serve_connection(io, service).await
            {
                log::error!("Connection error from {}: {}", remote_addr, err);
            }
        });
    }
}
