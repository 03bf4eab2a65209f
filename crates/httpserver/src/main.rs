//! Demo server for the httpfromtcp engine.
//!
//! ```text
//! httpserver [--host <addr>] [--port <u16>] [--max-connections <n>] [--upstream <url>]
//! ```
//!
//! Log verbosity is taken from `RUST_LOG`, `info` by default.

mod routes;

use anyhow::Context;
use clap::Parser;
use httpfromtcp::server::{DEFAULT_HOST, Server};
use tokio::signal::ctrl_c;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::routes::{DEFAULT_UPSTREAM, Routes};

#[derive(Parser, Debug)]
#[command(name = "httpserver", version, about = "Serves demo routes over a hand-built HTTP/1.1 engine", long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port to bind
    #[arg(short, long, default_value_t = 42069)]
    port: u16,

    /// Cap on connections handled at once, unbounded if unset
    #[arg(long)]
    max_connections: Option<usize>,

    /// Base url the `/httpbin/` routes are forwarded to
    #[arg(long, default_value = DEFAULT_UPSTREAM)]
    upstream: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    let args = Args::parse();

    let mut builder = Server::builder().host(args.host).port(args.port);
    if let Some(max_connections) = args.max_connections {
        builder = builder.max_connections(max_connections);
    }
    let config = builder.build().context("invalid server settings")?;

    let routes = Routes::new(args.upstream).context("failed to build upstream client")?;
    let mut server = Server::start(config, routes).await.context("failed to start server")?;
    info!(local_addr = %server.local_addr(), "server started");

    shutdown_signal().await?;

    server.close().await?;
    info!("server gracefully stopped");
    Ok(())
}

async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
        tokio::select! {
            interrupted = ctrl_c() => interrupted.context("failed to listen for ctrl-c")?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await.context("failed to listen for ctrl-c")?;

    Ok(())
}
