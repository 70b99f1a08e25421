//! Key-value store contracts
//!
//! The store is the only serialization point of the system. Counter
//! increments rely on the backend's atomic single-item update; every other
//! operation is an independent read or write. Implementations do not cache
//! and do not retry.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::core::error::{InvoiceError, StoreError};
use crate::core::invoice::{Invoice, InvoiceStatus, InvoiceSummary, StatusUpdate};
use crate::core::period::{CounterField, Period};

/// Well-known key of the counter record
pub const DEFAULT_COUNTER_KEY: &str = "M-1111";

/// Atomic access to the per-period counters of the counter record
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment the counter of `period` by one and return the new value
    ///
    /// Returns `None` when the counter field does not exist. The field is
    /// never created by this call.
    async fn increment(&self, period: &Period) -> Result<Option<u64>, StoreError>;
}

/// Persistence of invoice records
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Point lookup; `None` when absent
    async fn get(&self, number: &str) -> Result<Option<Invoice>, InvoiceError>;

    /// Full overwrite of the record at `invoice.number`
    async fn put(&self, invoice: &Invoice) -> Result<(), InvoiceError>;

    /// Projected lookup of several numbers
    ///
    /// Missing numbers are omitted. So are keys that can never name an
    /// invoice (empty, or the counter key): they are dropped before the
    /// store is asked, never reported as an error.
    async fn batch_get(&self, numbers: &BTreeSet<String>)
    -> Result<Vec<InvoiceSummary>, InvoiceError>;

    /// Secondary-index lookup; `None` when nothing matches
    async fn query_by_status(
        &self,
        status: &InvoiceStatus,
    ) -> Result<Option<Vec<Invoice>>, InvoiceError>;

    /// Conditionally apply `update` to an existing record
    ///
    /// Returns the updated record, or `None` if there is no invoice with
    /// that number. A missing record is never created.
    async fn update_status(
        &self,
        number: &str,
        update: &StatusUpdate,
    ) -> Result<Option<Invoice>, InvoiceError>;
}

/// Setup-time table management
///
/// A backend that failed its readiness probe must refuse every operation
/// here with [`StoreError::NotReady`] without contacting the store.
#[async_trait]
pub trait TableAdmin: Send + Sync {
    fn is_ready(&self) -> bool;

    async fn create_tables(&self) -> Result<(), StoreError>;

    async fn drop_tables(&self) -> Result<(), StoreError>;

    /// Create the counter record with every period of `seed` at its baseline
    ///
    /// Fails with [`StoreError::AlreadyExists`] if the record is present.
    async fn seed_counters(&self, seed: &CounterSeed) -> Result<(), StoreError>;
}

/// Periods and starting value used to provision the counter record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSeed {
    periods: Vec<Period>,
    baseline: u64,
}

impl CounterSeed {
    pub fn new(first_year: i32, last_year: i32, baseline: u64) -> Result<Self, InvoiceError> {
        if first_year > last_year {
            return Err(InvoiceError::invalid_input(
                "years",
                format!("first year {} is after last year {}", first_year, last_year),
            ));
        }
        let periods = Period::months_between(first_year, last_year)?;
        Ok(Self { periods, baseline })
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn baseline(&self) -> u64 {
        self.baseline
    }

    /// Counter fields to create, in period order
    pub fn fields(&self) -> impl Iterator<Item = CounterField> + '_ {
        self.periods.iter().map(Period::counter_field)
    }
}

/// Numbers of `numbers` that pass [`check_invoice_key`], in set order
pub fn lookup_keys<'a>(
    numbers: &'a BTreeSet<String>,
    counter_key: &'a str,
) -> impl Iterator<Item = &'a String> + 'a {
    numbers
        .iter()
        .filter(move |number| check_invoice_key(number, counter_key).is_ok())
}

/// Reject keys that can never name an invoice
pub fn check_invoice_key(number: &str, counter_key: &str) -> Result<(), InvoiceError> {
    if number.trim().is_empty() {
        return Err(InvoiceError::invalid_input(
            "number",
            "invoice number must not be empty",
        ));
    }
    if number == counter_key {
        return Err(InvoiceError::invalid_input(
            "number",
            format!("'{}' is reserved for the sequence counter", number),
        ));
    }
    Ok(())
}
