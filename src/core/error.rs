//! Typed error handling for invoice numbering and persistence
//!
//! Every failure surfaces to the immediate caller; nothing is retried or
//! swallowed. "Not found" is never an error here: lookups return `Option`.
//!
//! # Error Categories
//!
//! - [`InvoiceError::InvalidInput`]: a required input was missing or malformed
//! - [`AllocationError`]: the period counter could not be incremented
//! - [`InvoiceError::NumberOverflow`]: the sequence no longer fits the number width
//! - [`StoreError`]: the underlying key-value store failed
//!
//! # Example
//!
//! ```rust,ignore
//! match service.create_invoice(draft).await {
//!     Ok(invoice) => println!("issued {}", invoice.number),
//!     Err(InvoiceError::Allocation(AllocationError::PeriodNotProvisioned { field })) => {
//!         eprintln!("counter {} was never seeded", field);
//!     }
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// The main error type returned by stores, the allocator and the service
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// Caller supplied an empty, null or malformed required input
    #[error("Invalid input for '{field}': {message}")]
    InvalidInput { field: String, message: String },

    /// The atomic counter increment failed
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// The allocated sequence exceeds the fixed formatting width
    #[error("Sequence {sequence} does not fit in {width} digits")]
    NumberOverflow { sequence: u64, width: usize },

    /// Any underlying store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl InvoiceError {
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        InvoiceError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            InvoiceError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            InvoiceError::Allocation(e) => e.status_code(),
            InvoiceError::NumberOverflow { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InvoiceError::Store(e) => e.status_code(),
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            InvoiceError::InvalidInput { .. } => "INVALID_INPUT",
            InvoiceError::Allocation(e) => e.error_code(),
            InvoiceError::NumberOverflow { .. } => "NUMBER_OVERFLOW",
            InvoiceError::Store(e) => e.error_code(),
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
        }
    }
}

impl IntoResponse for InvoiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    pub fn not_found(number: &str) -> Self {
        Self {
            code: "INVOICE_NOT_FOUND".to_string(),
            message: format!("Invoice '{}' not found", number),
        }
    }
}

// =============================================================================
// Allocation Errors
// =============================================================================

/// Errors raised while turning a timestamp into a sequence value
#[derive(Debug, Error)]
pub enum AllocationError {
    /// The period cannot be represented with a two-digit year, or the month is not 1-12
    #[error("Period {year}-{month} is outside the supported range")]
    PeriodOutOfRange { year: i32, month: u32 },

    /// The epoch value does not map to a calendar date
    #[error("Timestamp {millis} is not a representable instant")]
    InvalidTimestamp { millis: i64 },

    /// The counter field for the period was never provisioned
    #[error("Counter field '{field}' does not exist")]
    PeriodNotProvisioned { field: String },

    /// The increment request itself failed
    #[error("Counter increment failed: {0}")]
    Store(#[source] StoreError),
}

impl AllocationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AllocationError::PeriodOutOfRange { .. } => StatusCode::BAD_REQUEST,
            AllocationError::InvalidTimestamp { .. } => StatusCode::BAD_REQUEST,
            AllocationError::PeriodNotProvisioned { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AllocationError::Store(e) => e.status_code(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AllocationError::PeriodOutOfRange { .. } => "PERIOD_OUT_OF_RANGE",
            AllocationError::InvalidTimestamp { .. } => "INVALID_TIMESTAMP",
            AllocationError::PeriodNotProvisioned { .. } => "PERIOD_NOT_PROVISIONED",
            AllocationError::Store(_) => "ALLOCATION_FAILED",
        }
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors related to storage backends
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend has not passed its startup probe; table mutations are refused
    #[error("Storage backend '{backend}' is not ready")]
    NotReady { backend: String },

    /// A request to the backend failed (network, throttling, validation)
    #[error("{backend} {operation} failed: {message}")]
    Request {
        backend: String,
        operation: String,
        message: String,
    },

    /// An item could not be converted to or from its stored form
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// A record that must be created exactly once is already present
    #[error("Item '{key}' already exists")]
    AlreadyExists { key: String },
}

impl StoreError {
    pub fn request(
        backend: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        StoreError::Request {
            backend: backend.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::NotReady { .. } => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::Request { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            StoreError::Serialization { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            StoreError::AlreadyExists { .. } => StatusCode::CONFLICT,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::NotReady { .. } => "STORE_NOT_READY",
            StoreError::Request { .. } => "STORE_ERROR",
            StoreError::Serialization { .. } => "STORE_SERIALIZATION_ERROR",
            StoreError::AlreadyExists { .. } => "STORE_ITEM_EXISTS",
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization {
            message: err.to_string(),
        }
    }
}

/// A specialized Result type for invoice operations
pub type InvoiceResult<T> = Result<T, InvoiceError>;
