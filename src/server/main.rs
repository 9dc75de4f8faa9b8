//! Connector server.
//!
//! Serves the point lookup (`/geo_data`), region export (`/fylke`) and
//! service info (`/`) endpoints on top of the upstream geodata service.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use geodata_connector::api::{router, SERVICE_NAME};
use geodata_connector::{ConnectorConfig, GeodataClient};

#[derive(Parser, Debug)]
#[command(name = "connector")]
#[command(about = "Geodata enrichment and region export connector")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:5000")]
    listen: String,

    /// Optional TOML file with connector settings; environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("{}", SERVICE_NAME);

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ConnectorConfig::load_from_file(path)?
        }
        None => {
            info!("Using configuration from environment variables");
            ConnectorConfig::from_env().context("Invalid connector configuration")?
        }
    };

    if config.export_settings().is_err() {
        info!("fylke_id or attributes not set, /fylke requests will fail");
    }

    info!("Upstream geodata service at {}", config.base_url);
    let client = GeodataClient::new(config).context("Failed to create HTTP client")?;

    let app = router(client);

    info!("Starting server on {}", args.listen);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
