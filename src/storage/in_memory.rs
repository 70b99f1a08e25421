//! In-memory implementation of the store contracts for testing and development

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::error::{InvoiceError, StoreError};
use crate::core::invoice::{Invoice, InvoiceStatus, InvoiceSummary, StatusUpdate};
use crate::core::period::Period;
use crate::core::store::{
    CounterSeed, CounterStore, DEFAULT_COUNTER_KEY, InvoiceStore, TableAdmin, check_invoice_key,
    lookup_keys,
};

const BACKEND: &str = "in-memory";

#[derive(Default)]
struct Tables {
    invoices: HashMap<String, Invoice>,
    /// The counter record; `None` until seeded
    counters: Option<HashMap<Period, u64>>,
}

/// In-memory store implementation
///
/// Useful for testing and development. A single `RwLock` guards both tables,
/// so every counter increment is one indivisible read-modify-write.
#[derive(Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    counter_key: String,
    ready: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Create a new, ready, empty store
    pub fn new() -> Self {
        Self::with_counter_key(DEFAULT_COUNTER_KEY)
    }

    pub fn with_counter_key(counter_key: impl Into<String>) -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            counter_key: counter_key.into(),
            ready: Arc::new(AtomicBool::new(true)),
        }
    }

    /// A store whose readiness probe failed; table administration is refused
    pub fn offline() -> Self {
        let store = Self::new();
        store.ready.store(false, Ordering::SeqCst);
        store
    }

    /// Current value of a period counter, if provisioned
    pub fn counter(&self, period: &Period) -> Result<Option<u64>, StoreError> {
        let tables = self.read("counter")?;
        Ok(tables
            .counters
            .as_ref()
            .and_then(|counters| counters.get(period).copied()))
    }

    fn read(&self, operation: &str) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|e| {
                StoreError::request(
                    BACKEND,
                    operation,
                    format!("Failed to acquire read lock: {}", e),
                )
            })
    }

    fn write(&self, operation: &str) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|e| {
                StoreError::request(
                    BACKEND,
                    operation,
                    format!("Failed to acquire write lock: {}", e),
                )
            })
    }

    fn ensure_ready(&self) -> Result<(), StoreError> {
        if self.is_ready() {
            Ok(())
        } else {
            tracing::error!(backend = BACKEND, "store is not ready");
            Err(StoreError::NotReady {
                backend: BACKEND.to_string(),
            })
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for InMemoryStore {
    async fn increment(&self, period: &Period) -> Result<Option<u64>, StoreError> {
        let mut tables = self.write("increment")?;

        let Some(counter) = tables
            .counters
            .as_mut()
            .and_then(|counters| counters.get_mut(period))
        else {
            return Ok(None);
        };

        *counter += 1;
        Ok(Some(*counter))
    }
}

#[async_trait]
impl InvoiceStore for InMemoryStore {
    async fn get(&self, number: &str) -> Result<Option<Invoice>, InvoiceError> {
        check_invoice_key(number, &self.counter_key)?;
        let tables = self.read("get")?;
        Ok(tables.invoices.get(number).cloned())
    }

    async fn put(&self, invoice: &Invoice) -> Result<(), InvoiceError> {
        check_invoice_key(&invoice.number, &self.counter_key)?;
        let mut record = invoice.clone();
        record.strip_reserved_details();

        let mut tables = self.write("put")?;
        tables.invoices.insert(record.number.clone(), record);
        Ok(())
    }

    async fn batch_get(
        &self,
        numbers: &BTreeSet<String>,
    ) -> Result<Vec<InvoiceSummary>, InvoiceError> {
        let tables = self.read("batch_get")?;
        Ok(lookup_keys(numbers, &self.counter_key)
            .filter_map(|number| tables.invoices.get(number))
            .map(InvoiceSummary::from)
            .collect())
    }

    async fn query_by_status(
        &self,
        status: &InvoiceStatus,
    ) -> Result<Option<Vec<Invoice>>, InvoiceError> {
        let tables = self.read("query")?;
        let mut found: Vec<Invoice> = tables
            .invoices
            .values()
            .filter(|invoice| &invoice.status == status)
            .cloned()
            .collect();

        if found.is_empty() {
            return Ok(None);
        }
        found.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(Some(found))
    }

    async fn update_status(
        &self,
        number: &str,
        update: &StatusUpdate,
    ) -> Result<Option<Invoice>, InvoiceError> {
        check_invoice_key(number, &self.counter_key)?;
        let mut tables = self.write("update_status")?;

        Ok(tables.invoices.get_mut(number).map(|invoice| {
            invoice.apply(update);
            invoice.clone()
        }))
    }
}

#[async_trait]
impl TableAdmin for InMemoryStore {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn create_tables(&self) -> Result<(), StoreError> {
        self.ensure_ready()
    }

    async fn drop_tables(&self) -> Result<(), StoreError> {
        self.ensure_ready()?;
        let mut tables = self.write("drop_tables")?;
        *tables = Tables::default();
        Ok(())
    }

    async fn seed_counters(&self, seed: &CounterSeed) -> Result<(), StoreError> {
        self.ensure_ready()?;
        let mut tables = self.write("seed_counters")?;
        if tables.counters.is_some() {
            return Err(StoreError::AlreadyExists {
                key: self.counter_key.clone(),
            });
        }

        tables.counters = Some(
            seed.periods()
                .iter()
                .map(|period| (*period, seed.baseline()))
                .collect(),
        );
        tracing::info!(
            backend = BACKEND,
            periods = seed.periods().len(),
            baseline = seed.baseline(),
            "counter record seeded"
        );
        Ok(())
    }
}
