//! # loan-api: Binary Entry Point
//!
//! Builds the document store, identity client, and request schemas, then
//! serves the API.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use loan_identity::{IdentityConfig, IdentityProvider, IdentityToolkitClient};
use loan_schema::Schemas;
use loan_store::{DocumentStore, FirestoreStore, MemoryStore, Repository, StoreConfig};
use tracing_subscriber::EnvFilter;

use loan_api::state::AppState;

/// Loan Desk API server.
#[derive(Parser, Debug)]
#[command(name = "loan-api", version, about, long_about = None)]
struct Cli {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Document store backend.
    #[arg(long, env = "LOAN_STORE", value_enum, default_value_t = StoreKind::Memory)]
    store: StoreKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    /// In-process store. Data is lost on exit.
    Memory,
    /// Cloud Firestore (or its emulator), configured from `FIRESTORE_*`.
    Firestore,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_store(kind: StoreKind) -> Result<Arc<dyn DocumentStore>, Box<dyn std::error::Error>> {
    match kind {
        StoreKind::Memory => {
            tracing::warn!("using in-memory document store; data will not persist");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreKind::Firestore => {
            let config = StoreConfig::from_env()?;
            tracing::info!(?config, "Firestore store configured");
            Ok(Arc::new(FirestoreStore::new(&config)?))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    let store = build_store(cli.store).map_err(|e| {
        tracing::error!("document store initialization failed: {e}");
        e
    })?;
    let repository = Repository::new(store);

    let identity_config = IdentityConfig::from_env().map_err(|e| {
        tracing::error!("identity service not configured: {e}");
        e
    })?;
    tracing::info!(config = ?identity_config, "identity client configured");
    let identity: Arc<dyn IdentityProvider> = Arc::new(IdentityToolkitClient::new(identity_config)?);

    let schemas = Schemas::compile().map_err(|e| {
        tracing::error!("request schema compilation failed: {e}");
        e
    })?;

    let backend = repository.backend_name();
    let app = loan_api::app(AppState::new(repository, identity, schemas));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cli.port));
    tracing::info!(%addr, store = backend, "loan API listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
