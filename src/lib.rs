//! # Invoice-RS
//!
//! Month-scoped sequential invoice numbering over a key-value store.
//!
//! ## Features
//!
//! - **Human-readable numbers**: `YYMM` + zero-padded sequence (`24030011`)
//! - **Atomic counters**: one conditional increment per allocation, no gaps filled, no duplicates
//! - **Pre-provisioned periods**: counters are seeded ahead of time; unseeded months are refused
//! - **Pluggable storage**: in-memory for tests, DynamoDB behind the `dynamodb` feature
//! - **REST surface**: create, get, batch get, list by status, resolve
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use invoice::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let store = Arc::new(InMemoryStore::new());
//! store.seed_counters(&CounterSeed::new(2024, 2035, 10)?).await?;
//!
//! let allocator = SequenceAllocator::new(store.clone(), SequenceWidth::Four);
//! let service = InvoiceService::new(allocator, store);
//!
//! let invoice = service
//!     .create_invoice(serde_json::json!({ "customer": "acme", "amount": 1200 }))
//!     .await?;
//! println!("issued {}", invoice.number);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        allocator::SequenceAllocator,
        error::{AllocationError, ErrorResponse, InvoiceError, InvoiceResult, StoreError},
        invoice::{Invoice, InvoiceDraft, InvoiceStatus, InvoiceSummary, StatusUpdate},
        number::{InvoiceNumber, SequenceWidth, format_number},
        period::{CounterField, Period},
        service::InvoiceService,
        store::{CounterSeed, CounterStore, InvoiceStore, TableAdmin},
    };

    // === Configuration ===
    pub use crate::config::{InvoiceConfig, SequenceConfig, ServerConfig, StoreConfig};

    // === Server ===
    pub use crate::server::{InvoiceServer, build_invoice_routes, handlers::AppState};

    // === Storage ===
    pub use crate::storage::InMemoryStore;

    #[cfg(feature = "dynamodb")]
    pub use crate::storage::DynamoDBStore;

    // === Re-exports from dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
    pub use std::sync::Arc;
}
