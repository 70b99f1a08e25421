//! Invoice numbering server
//!
//! Loads `invoice.yaml` (or the file named by `INVOICE_CONFIG`), provisions
//! the tables and counter record, and serves the REST API.
//!
//! ```sh
//! cargo run --example invoice_server                       # in-memory store
//! cargo run --example invoice_server --features dynamodb   # DynamoDB Local on :8000
//! ```

use anyhow::Result;
use invoice::prelude::*;
use tracing_subscriber::EnvFilter;

fn load_config() -> Result<InvoiceConfig> {
    let path = std::env::var("INVOICE_CONFIG").unwrap_or_else(|_| "invoice.yaml".to_string());
    if std::path::Path::new(&path).exists() {
        tracing::info!(path = %path, "loading configuration");
        InvoiceConfig::from_yaml_file(&path)
    } else {
        tracing::info!(path = %path, "no configuration file, using defaults");
        Ok(InvoiceConfig::default())
    }
}

/// Create tables and seed counters; both are no-ops on an existing deployment
async fn provision(admin: &dyn TableAdmin, config: &InvoiceConfig) -> Result<()> {
    if !admin.is_ready() {
        anyhow::bail!("store is not ready, check the endpoint and credentials");
    }

    if let Err(err) = admin.create_tables().await {
        tracing::warn!(error = %err, "table creation skipped");
    }

    match admin.seed_counters(&config.sequence.seed()?).await {
        Ok(()) => {}
        Err(StoreError::AlreadyExists { key }) => {
            tracing::info!(key = %key, "counter record already provisioned");
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

#[cfg(feature = "dynamodb")]
async fn build_service(config: &InvoiceConfig) -> Result<InvoiceService> {
    let store = Arc::new(DynamoDBStore::connect(config.store.clone()).await);
    provision(store.as_ref(), config).await?;

    let allocator = SequenceAllocator::new(store.clone(), config.sequence.width);
    Ok(InvoiceService::new(allocator, store))
}

#[cfg(not(feature = "dynamodb"))]
async fn build_service(config: &InvoiceConfig) -> Result<InvoiceService> {
    let store = Arc::new(InMemoryStore::with_counter_key(config.store.counter_key.clone()));
    provision(store.as_ref(), config).await?;

    let allocator = SequenceAllocator::new(store.clone(), config.sequence.width);
    Ok(InvoiceService::new(allocator, store))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    let service = build_service(&config).await?;

    println!("🚀 Invoice server on http://{}", config.server.bind);
    println!("   POST /invoices                 create");
    println!("   GET  /invoices/{{number}}        fetch");
    println!("   POST /invoices/batch           fetch many");
    println!("   GET  /invoices?status=billing  list by status");
    println!("   PUT  /invoices/{{number}}/resolve resolve\n");

    InvoiceServer::new(service).serve(&config.server.bind).await
}
