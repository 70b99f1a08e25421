//! Shared test harness for storage backend testing
//!
//! Provides invoice fixtures and seeding helpers used by the
//! `invoice_store_tests!` conformance suite.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//! ```

#![allow(dead_code)]

use serde_json::{Map, json};

use invoice::core::invoice::{Invoice, InvoiceStatus};
use invoice::core::period::Period;
use invoice::core::store::{CounterSeed, TableAdmin};

#[macro_use]
pub mod invoice_store_tests;

/// Issue time shared by fixtures: 2024-03-01T08:00:00Z
pub const ISSUE_AT: i64 = 1_709_280_000_000;

/// Baseline every seeded counter starts from
pub const BASELINE: u64 = 10;

pub fn march_2024() -> Period {
    Period::new(2024, 3).unwrap()
}

pub fn april_2024() -> Period {
    Period::new(2024, 4).unwrap()
}

/// Build an invoice record with a couple of business fields
pub fn sample_invoice(number: &str, status: InvoiceStatus) -> Invoice {
    let mut details = Map::new();
    details.insert("customer".to_string(), json!("acme"));
    details.insert("amount".to_string(), json!(1200));

    Invoice {
        number: number.to_string(),
        issue_at: ISSUE_AT,
        status,
        resolved_by: None,
        resolved_at: None,
        details,
    }
}

/// Provision every month of 2024 at [`BASELINE`]
pub async fn seed_2024<S: TableAdmin + ?Sized>(store: &S) {
    store
        .seed_counters(&CounterSeed::new(2024, 2024, BASELINE).unwrap())
        .await
        .expect("Failed to seed counters");
}
