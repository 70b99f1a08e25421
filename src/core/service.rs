//! Invoice service: numbering, creation and resolution
//!
//! Lifecycle: `billing` (set at creation) → any status set by [`InvoiceService::resolve`].
//!
//! Creation is not transactional. If the record write fails after the
//! counter was incremented, that sequence value is never reused and the
//! period simply has a gap.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::core::allocator::SequenceAllocator;
use crate::core::error::InvoiceError;
use crate::core::invoice::{Invoice, InvoiceDraft, InvoiceStatus, InvoiceSummary, StatusUpdate};
use crate::core::store::InvoiceStore;

/// Stateless orchestration over a counter store and an invoice store
#[derive(Clone)]
pub struct InvoiceService {
    allocator: SequenceAllocator,
    store: Arc<dyn InvoiceStore>,
}

impl InvoiceService {
    pub fn new(allocator: SequenceAllocator, store: Arc<dyn InvoiceStore>) -> Self {
        Self { allocator, store }
    }

    pub fn allocator(&self) -> &SequenceAllocator {
        &self.allocator
    }

    /// Number and persist a new invoice issued now
    pub async fn create_invoice(&self, draft: Value) -> Result<Invoice, InvoiceError> {
        self.create_invoice_at(draft, Utc::now()).await
    }

    /// Number and persist a new invoice issued at `now`
    ///
    /// The draft is validated before any sequence value is consumed.
    pub async fn create_invoice_at(
        &self,
        draft: Value,
        now: DateTime<Utc>,
    ) -> Result<Invoice, InvoiceError> {
        let draft = InvoiceDraft::try_from(draft)?;
        let number = self.allocator.next_number(now).await?;
        let invoice = draft.issue(&number, now);

        if let Err(err) = self.store.put(&invoice).await {
            tracing::warn!(
                number = %number,
                error = %err,
                "invoice write failed, sequence value is lost"
            );
            return Err(err);
        }

        tracing::info!(number = %number, issue_at = invoice.issue_at, "invoice created");
        Ok(invoice)
    }

    /// Set the status and audit fields of an existing invoice
    ///
    /// Any current status may move to any other; no prior state is checked.
    /// Returns `None` if the invoice does not exist.
    pub async fn resolve(
        &self,
        number: &str,
        status: impl Into<InvoiceStatus>,
        updated_by: &str,
    ) -> Result<Option<Invoice>, InvoiceError> {
        self.resolve_at(number, status, updated_by, Utc::now()).await
    }

    pub async fn resolve_at(
        &self,
        number: &str,
        status: impl Into<InvoiceStatus>,
        updated_by: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Invoice>, InvoiceError> {
        let status = status.into();
        if status.as_str().trim().is_empty() {
            return Err(InvoiceError::invalid_input("status", "status must not be empty"));
        }
        if updated_by.trim().is_empty() {
            return Err(InvoiceError::invalid_input(
                "updated_by",
                "resolver must not be empty",
            ));
        }

        let update = StatusUpdate {
            status,
            resolved_by: updated_by.to_string(),
            resolved_at: now.timestamp_millis(),
        };
        let resolved = self.store.update_status(number, &update).await?;

        match &resolved {
            Some(invoice) => tracing::info!(
                number = %invoice.number,
                status = %invoice.status,
                resolved_by = updated_by,
                "invoice resolved"
            ),
            None => tracing::debug!(number, "resolve skipped, invoice not found"),
        }
        Ok(resolved)
    }

    pub async fn get(&self, number: &str) -> Result<Option<Invoice>, InvoiceError> {
        self.store.get(number).await
    }

    pub async fn batch_get(
        &self,
        numbers: &BTreeSet<String>,
    ) -> Result<Vec<InvoiceSummary>, InvoiceError> {
        self.store.batch_get(numbers).await
    }

    pub async fn query_by_status(
        &self,
        status: &InvoiceStatus,
    ) -> Result<Option<Vec<Invoice>>, InvoiceError> {
        self.store.query_by_status(status).await
    }
}
