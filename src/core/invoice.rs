//! Invoice records, drafts and the batch projection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::core::error::InvoiceError;
use crate::core::number::InvoiceNumber;

/// Stored attribute names
pub mod attr {
    pub const NUMBER: &str = "number";
    pub const ISSUE_AT: &str = "issueAt";
    pub const STATUS: &str = "status";
    pub const RESOLVED_BY: &str = "resolvedBy";
    pub const RESOLVED_AT: &str = "resolvedAt";

    /// Attributes owned by the service; a draft can never set them
    pub const RESERVED: [&str; 5] = [NUMBER, ISSUE_AT, STATUS, RESOLVED_BY, RESOLVED_AT];
}

/// Invoice status
///
/// `billing` is assigned at creation. Resolution may set any value,
/// including ones this crate does not name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InvoiceStatus {
    Billing,
    Active,
    Resolved,
    Other(String),
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InvoiceStatus::Billing => "billing",
            InvoiceStatus::Active => "active",
            InvoiceStatus::Resolved => "resolved",
            InvoiceStatus::Other(s) => s,
        }
    }
}

impl From<String> for InvoiceStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "billing" => InvoiceStatus::Billing,
            "active" => InvoiceStatus::Active,
            "resolved" => InvoiceStatus::Resolved,
            _ => InvoiceStatus::Other(s),
        }
    }
}

impl From<&str> for InvoiceStatus {
    fn from(s: &str) -> Self {
        InvoiceStatus::from(s.to_string())
    }
}

impl From<InvoiceStatus> for String {
    fn from(status: InvoiceStatus) -> Self {
        match status {
            InvoiceStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted invoice
///
/// Business fields (amounts, line items, customer data) are opaque here and
/// travel in `details`, flattened next to the managed attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub number: String,
    /// Epoch milliseconds
    pub issue_at: i64,
    pub status: InvoiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    /// Epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<i64>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Invoice {
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    /// Remove business fields that would shadow a managed attribute once flattened
    pub fn strip_reserved_details(&mut self) {
        for key in attr::RESERVED {
            self.details.remove(key);
        }
    }

    /// Apply a status update in place
    pub fn apply(&mut self, update: &StatusUpdate) {
        self.status = update.status.clone();
        self.resolved_by = Some(update.resolved_by.clone());
        self.resolved_at = Some(update.resolved_at);
    }
}

/// Business fields of an invoice that has not been numbered yet
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InvoiceDraft {
    details: Map<String, Value>,
}

impl InvoiceDraft {
    pub fn new(details: Map<String, Value>) -> Self {
        let mut draft = Self { details };
        for key in attr::RESERVED {
            draft.details.remove(key);
        }
        draft
    }

    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    /// Stamp the managed attributes and produce the record to persist
    pub fn issue(self, number: &InvoiceNumber, issued_at: DateTime<Utc>) -> Invoice {
        Invoice {
            number: number.to_string(),
            issue_at: issued_at.timestamp_millis(),
            status: InvoiceStatus::Billing,
            resolved_by: None,
            resolved_at: None,
            details: self.details,
        }
    }
}

impl TryFrom<Value> for InvoiceDraft {
    type Error = InvoiceError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(details) => Ok(InvoiceDraft::new(details)),
            Value::Null => Err(InvoiceError::invalid_input(
                "draft",
                "invoice draft must not be null",
            )),
            _ => Err(InvoiceError::invalid_input(
                "draft",
                "invoice draft must be a JSON object",
            )),
        }
    }
}

/// Fixed projection returned by batch lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    pub number: String,
    pub issue_at: i64,
    pub status: InvoiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<i64>,
}

impl InvoiceSummary {
    /// Attributes read by a batch lookup
    pub const PROJECTION: [&'static str; 4] =
        [attr::NUMBER, attr::ISSUE_AT, attr::STATUS, attr::RESOLVED_AT];
}

impl From<&Invoice> for InvoiceSummary {
    fn from(invoice: &Invoice) -> Self {
        Self {
            number: invoice.number.clone(),
            issue_at: invoice.issue_at,
            status: invoice.status.clone(),
            resolved_at: invoice.resolved_at,
        }
    }
}

/// Audit fields written by a resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: InvoiceStatus,
    pub resolved_by: String,
    /// Epoch milliseconds
    pub resolved_at: i64,
}
