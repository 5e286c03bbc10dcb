#![forbid(unsafe_code)]
//! CertChain API server

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use certchain::api::run_api_server;
use certchain::blockchain::ChainStore;
use certchain::config::{load_config, DEFAULT_CONFIG_PATH};
use certchain::persistence::{JsonFilePersistence, Persistence};

#[derive(Parser)]
#[command(name = "certchain-server", about = "Serve the certificate ledger over HTTP")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the configured port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut config = load_config(&args.config)?;
    if let Some(port) = args.port {
        config.override_port(port)?;
    }

    let store = Arc::new(ChainStore::new()?);

    let snapshot = config.ledger.snapshot_path.as_ref().map(JsonFilePersistence::new);
    if let Some(snapshot) = &snapshot {
        if snapshot.load_chain()?.is_some() {
            let length = store.import_from(snapshot)?;
            tracing::info!(path = %snapshot.path().display(), chain_length = length, "snapshot loaded");
        } else {
            tracing::info!(path = %snapshot.path().display(), "no snapshot yet; starting from genesis");
        }
    }

    tokio::select! {
        result = run_api_server(store.clone(), &config) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
        }
    }

    if let Some(snapshot) = &snapshot {
        let length = store.export_to(snapshot)?;
        tracing::info!(path = %snapshot.path().display(), chain_length = length, "snapshot saved on shutdown");
    }

    Ok(())
}
