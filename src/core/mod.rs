//! Core module containing the numbering scheme, records and store contracts

pub mod allocator;
pub mod error;
pub mod invoice;
pub mod number;
pub mod period;
pub mod service;
pub mod store;

pub use allocator::SequenceAllocator;
pub use error::{AllocationError, InvoiceError, InvoiceResult, StoreError};
pub use invoice::{Invoice, InvoiceDraft, InvoiceStatus, InvoiceSummary, StatusUpdate};
pub use number::{InvoiceNumber, SequenceWidth, format_number};
pub use period::{CounterField, Period};
pub use service::InvoiceService;
pub use store::{CounterSeed, CounterStore, InvoiceStore, TableAdmin};
