//! Macro-generated test suite for store contract validation.
//!
//! The `invoice_store_tests!` macro generates a test module that validates
//! any backend implementing `CounterStore + InvoiceStore + TableAdmin`
//! against the full contract: record reads and writes, batch lookups,
//! status queries, resolution, and counter increments.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//! use invoice::storage::InMemoryStore;
//!
//! invoice_store_tests!(InMemoryStore::new());
//! ```
//!
//! # Generated Tests
//!
//! ## Records
//! - `test_get_nonexistent`: unknown number returns None
//! - `test_get_reserved_keys`: empty and counter keys are rejected
//! - `test_put_and_get`: every attribute survives the round trip
//! - `test_put_overwrites`: same number written twice keeps the last
//! - `test_put_strips_shadowing_details`: business fields never replace managed ones
//!
//! ## Batch / Query
//! - `test_batch_get_partial`: unknown numbers are silently omitted
//! - `test_batch_get_empty`: empty set returns empty vec
//! - `test_batch_get_skips_reserved_keys`: empty and counter keys are dropped, not errors
//! - `test_query_no_match`: None when nothing has the status
//! - `test_query_by_status`: only matching records come back
//!
//! ## Resolution
//! - `test_update_status_writes_audit`: status, resolver, time persisted
//! - `test_update_status_nonexistent`: None, no record created
//!
//! ## Counters
//! - `test_increment_monotonic`: baseline + 1, + 2, + 3
//! - `test_increment_unseeded`: None and no side effect
//! - `test_periods_isolated`: one month never moves another
//! - `test_concurrent_increments`: parallel increments are all distinct
//! - `test_reseed_rejected`: second seed is AlreadyExists

/// Generate a store conformance test suite.
///
/// `$factory` must evaluate to a ready store with empty tables. It is
/// re-evaluated for each test to ensure isolation. The concurrent test
/// also needs `Clone + 'static` (shared state via Arc pattern).
#[macro_export]
macro_rules! invoice_store_tests {
    ($factory:expr) => {
        mod invoice_store_contract_tests {
            use super::*;
            use invoice::core::error::{InvoiceError, StoreError};
            use invoice::core::invoice::{InvoiceStatus, StatusUpdate};
            use invoice::core::store::{CounterSeed, CounterStore, InvoiceStore, TableAdmin};
            use std::collections::{BTreeSet, HashSet};

            // ==================================================================
            // Records
            // ==================================================================

            #[tokio::test]
            async fn test_get_nonexistent() {
                let store = $factory;
                let result = store.get("2403999").await.unwrap();
                assert!(result.is_none(), "Unknown number should return None");
            }

            #[tokio::test]
            async fn test_get_reserved_keys() {
                let store = $factory;

                let err = store.get("").await.unwrap_err();
                assert!(matches!(err, InvoiceError::InvalidInput { .. }));

                let err = store.get("M-1111").await.unwrap_err();
                assert!(
                    matches!(err, InvoiceError::InvalidInput { .. }),
                    "The counter record must not be readable as an invoice"
                );

                let err = store
                    .put(&sample_invoice("M-1111", InvoiceStatus::Billing))
                    .await
                    .unwrap_err();
                assert!(matches!(err, InvoiceError::InvalidInput { .. }));
            }

            #[tokio::test]
            async fn test_put_and_get() {
                let store = $factory;
                let invoice = sample_invoice("24030011", InvoiceStatus::Billing);

                store.put(&invoice).await.unwrap();

                let retrieved = store.get("24030011").await.unwrap();
                assert_eq!(retrieved, Some(invoice));
            }

            #[tokio::test]
            async fn test_put_overwrites() {
                let store = $factory;
                store
                    .put(&sample_invoice("24030011", InvoiceStatus::Billing))
                    .await
                    .unwrap();
                store
                    .put(&sample_invoice("24030011", InvoiceStatus::Active))
                    .await
                    .unwrap();

                let retrieved = store.get("24030011").await.unwrap().unwrap();
                assert_eq!(retrieved.status, InvoiceStatus::Active);
            }

            #[tokio::test]
            async fn test_put_strips_shadowing_details() {
                let store = $factory;
                let mut invoice = sample_invoice("24030011", InvoiceStatus::Billing);
                invoice.details.insert("status".to_string(), serde_json::json!("paid"));
                invoice.details.insert("number".to_string(), serde_json::json!("99999999"));

                store.put(&invoice).await.unwrap();

                let stored = store.get("24030011").await.unwrap().unwrap();
                assert_eq!(stored.number, "24030011");
                assert_eq!(stored.status, InvoiceStatus::Billing);
                assert!(!stored.details.contains_key("status"));
                assert!(!stored.details.contains_key("number"));
                assert_eq!(stored.details["customer"], "acme");

                let billing = store
                    .query_by_status(&InvoiceStatus::Billing)
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(billing.len(), 1);
            }

            // ==================================================================
            // Batch / Query
            // ==================================================================

            #[tokio::test]
            async fn test_batch_get_partial() {
                let store = $factory;
                store
                    .put(&sample_invoice("24030011", InvoiceStatus::Billing))
                    .await
                    .unwrap();
                store
                    .put(&sample_invoice("24030013", InvoiceStatus::Active))
                    .await
                    .unwrap();

                let numbers: BTreeSet<String> = ["24030011", "24030012", "24030013"]
                    .into_iter()
                    .map(String::from)
                    .collect();
                let found = store.batch_get(&numbers).await.unwrap();

                assert_eq!(found.len(), 2, "Missing numbers should be omitted");
                let returned: HashSet<&str> = found.iter().map(|s| s.number.as_str()).collect();
                assert!(returned.contains("24030011"));
                assert!(returned.contains("24030013"));

                let active = found.iter().find(|s| s.number == "24030013").unwrap();
                assert_eq!(active.status, InvoiceStatus::Active);
                assert_eq!(active.issue_at, ISSUE_AT);
                assert_eq!(active.resolved_at, None);
            }

            #[tokio::test]
            async fn test_batch_get_empty() {
                let store = $factory;
                let found = store.batch_get(&BTreeSet::new()).await.unwrap();
                assert!(found.is_empty());
            }

            #[tokio::test]
            async fn test_batch_get_skips_reserved_keys() {
                let store = $factory;
                seed_2024(&store).await;
                store
                    .put(&sample_invoice("24030011", InvoiceStatus::Billing))
                    .await
                    .unwrap();

                let numbers: BTreeSet<String> = ["M-1111", "", "24030011"]
                    .into_iter()
                    .map(String::from)
                    .collect();
                let found = store.batch_get(&numbers).await.unwrap();

                assert_eq!(found.len(), 1, "Only the invoice should come back");
                assert_eq!(found[0].number, "24030011");
                assert_eq!(found[0].issue_at, ISSUE_AT);

                let only_reserved: BTreeSet<String> =
                    ["M-1111", ""].into_iter().map(String::from).collect();
                assert!(store.batch_get(&only_reserved).await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_query_no_match() {
                let store = $factory;
                store
                    .put(&sample_invoice("24030011", InvoiceStatus::Billing))
                    .await
                    .unwrap();

                let result = store
                    .query_by_status(&InvoiceStatus::Resolved)
                    .await
                    .unwrap();
                assert!(result.is_none(), "No match should be None, not empty");
            }

            #[tokio::test]
            async fn test_query_by_status() {
                let store = $factory;
                store
                    .put(&sample_invoice("24030011", InvoiceStatus::Billing))
                    .await
                    .unwrap();
                store
                    .put(&sample_invoice("24030012", InvoiceStatus::Active))
                    .await
                    .unwrap();
                store
                    .put(&sample_invoice("24030013", InvoiceStatus::Billing))
                    .await
                    .unwrap();

                let billing = store
                    .query_by_status(&InvoiceStatus::Billing)
                    .await
                    .unwrap()
                    .unwrap();
                let mut numbers: Vec<&str> = billing.iter().map(|i| i.number.as_str()).collect();
                numbers.sort();
                assert_eq!(numbers, ["24030011", "24030013"]);
                assert!(billing.iter().all(|i| i.status == InvoiceStatus::Billing));
            }

            // ==================================================================
            // Resolution
            // ==================================================================

            #[tokio::test]
            async fn test_update_status_writes_audit() {
                let store = $factory;
                store
                    .put(&sample_invoice("24030011", InvoiceStatus::Billing))
                    .await
                    .unwrap();

                let update = StatusUpdate {
                    status: InvoiceStatus::from("paid"),
                    resolved_by: "alice".to_string(),
                    resolved_at: ISSUE_AT + 60_000,
                };
                let updated = store
                    .update_status("24030011", &update)
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(updated.status.as_str(), "paid");
                assert_eq!(updated.resolved_by.as_deref(), Some("alice"));
                assert_eq!(updated.resolved_at, Some(ISSUE_AT + 60_000));
                // business fields are untouched
                assert_eq!(updated.details["customer"], "acme");

                let stored = store.get("24030011").await.unwrap().unwrap();
                assert_eq!(stored, updated);
            }

            #[tokio::test]
            async fn test_update_status_nonexistent() {
                let store = $factory;
                let update = StatusUpdate {
                    status: InvoiceStatus::Resolved,
                    resolved_by: "alice".to_string(),
                    resolved_at: ISSUE_AT,
                };

                let result = store.update_status("24039999", &update).await.unwrap();
                assert!(result.is_none());
                assert!(
                    store.get("24039999").await.unwrap().is_none(),
                    "Resolving a missing invoice must not create it"
                );
            }

            // ==================================================================
            // Counters
            // ==================================================================

            #[tokio::test]
            async fn test_increment_monotonic() {
                let store = $factory;
                seed_2024(&store).await;

                for expected in [BASELINE + 1, BASELINE + 2, BASELINE + 3] {
                    let value = store.increment(&march_2024()).await.unwrap();
                    assert_eq!(value, Some(expected));
                }
            }

            #[tokio::test]
            async fn test_increment_unseeded() {
                let store = $factory;
                assert_eq!(store.increment(&march_2024()).await.unwrap(), None);

                seed_2024(&store).await;
                let next_year = invoice::core::period::Period::new(2025, 1).unwrap();
                assert_eq!(store.increment(&next_year).await.unwrap(), None);
                assert_eq!(
                    store.increment(&next_year).await.unwrap(),
                    None,
                    "A refused increment must not provision the period"
                );
            }

            #[tokio::test]
            async fn test_periods_isolated() {
                let store = $factory;
                seed_2024(&store).await;

                store.increment(&march_2024()).await.unwrap();
                store.increment(&march_2024()).await.unwrap();

                let april = store.increment(&april_2024()).await.unwrap();
                assert_eq!(april, Some(BASELINE + 1));
                let march = store.increment(&march_2024()).await.unwrap();
                assert_eq!(march, Some(BASELINE + 3));
            }

            #[tokio::test]
            async fn test_concurrent_increments() {
                let store = $factory;
                seed_2024(&store).await;

                let mut handles = Vec::new();
                for _ in 0..10 {
                    let store = store.clone();
                    handles.push(tokio::spawn(async move {
                        store.increment(&march_2024()).await
                    }));
                }

                let mut values = HashSet::new();
                for handle in handles {
                    let value = handle.await.unwrap().unwrap().unwrap();
                    assert!(values.insert(value), "Duplicate sequence value {}", value);
                }

                let expected: HashSet<u64> = (BASELINE + 1..=BASELINE + 10).collect();
                assert_eq!(values, expected);
            }

            #[tokio::test]
            async fn test_reseed_rejected() {
                let store = $factory;
                seed_2024(&store).await;
                store.increment(&march_2024()).await.unwrap();

                let err = store
                    .seed_counters(&CounterSeed::new(2024, 2024, BASELINE).unwrap())
                    .await
                    .unwrap_err();
                assert!(matches!(err, StoreError::AlreadyExists { .. }));

                // the existing counter is left alone
                let next = store.increment(&march_2024()).await.unwrap();
                assert_eq!(next, Some(BASELINE + 2));
            }
        }
    };
}
