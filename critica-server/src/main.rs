//! # Critica Server
//!
//! Content-review API server.
//!
//! ## Overview
//!
//! Critica lets registered users submit titles (books, films, music),
//! organize them by category and genre, and attach one scored review plus
//! unlimited comments per title, with three-tier role-based access
//! control and email-code signup.
//!
//! ## Architecture
//!
//! The server is built on Axum and uses:
//! - PostgreSQL for persistent storage
//! - HMAC-derived confirmation codes and HS256 JWTs for authentication

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use critica_core::db::Database;
use critica_server::{AppState, infra::config::Config, routes};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "critica-server")]
#[command(about = "Content-review API with role-based access control")]
struct Cli {
    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Skip schema initialization at startup
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "critica_server=info,critica_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(port) = cli.port {
        config.server_port = port;
    }

    let db = Database::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    if !cli.no_migrate {
        db.initialize_schema()
            .await
            .context("failed to initialize database schema")?;
    }

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .context("invalid server address")?;

    let state = AppState::new(db, config);
    let app = routes::create_router(state);

    info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .await
        .context("server exited with error")?;

    Ok(())
}
