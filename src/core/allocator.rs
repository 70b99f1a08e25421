//! Sequence allocation against the shared counter record
//!
//! The allocator holds no state of its own. Every call goes to the store,
//! whose atomic increment is what keeps concurrent allocations (across
//! tasks and across processes) from observing the same value.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::core::error::{AllocationError, InvoiceError};
use crate::core::number::{InvoiceNumber, SequenceWidth};
use crate::core::period::Period;
use crate::core::store::CounterStore;

#[derive(Clone)]
pub struct SequenceAllocator {
    counters: Arc<dyn CounterStore>,
    width: SequenceWidth,
}

impl SequenceAllocator {
    pub fn new(counters: Arc<dyn CounterStore>, width: SequenceWidth) -> Self {
        Self { counters, width }
    }

    pub fn width(&self) -> SequenceWidth {
        self.width
    }

    /// Consume the next sequence value of the period containing `at`
    ///
    /// A period whose counter was never provisioned fails closed with
    /// [`AllocationError::PeriodNotProvisioned`].
    pub async fn allocate(&self, at: DateTime<Utc>) -> Result<u64, AllocationError> {
        let period = Period::from_datetime(at)?;
        self.allocate_in(&period).await
    }

    pub async fn allocate_in(&self, period: &Period) -> Result<u64, AllocationError> {
        let field = period.counter_field();
        match self.counters.increment(period).await {
            Ok(Some(value)) => {
                tracing::debug!(period = %period, field = %field, value, "sequence allocated");
                Ok(value)
            }
            Ok(None) => {
                tracing::warn!(period = %period, field = %field, "counter not provisioned");
                Err(AllocationError::PeriodNotProvisioned {
                    field: field.to_string(),
                })
            }
            Err(err) => {
                tracing::warn!(period = %period, error = %err, "counter increment failed");
                Err(AllocationError::Store(err))
            }
        }
    }

    /// Allocate and format the invoice number for `at`
    ///
    /// The sequence value is consumed even when it overflows the configured
    /// width; the counter is never decremented.
    pub async fn next_number(&self, at: DateTime<Utc>) -> Result<InvoiceNumber, InvoiceError> {
        let period = Period::from_datetime(at)?;
        let sequence = self.allocate_in(&period).await?;
        InvoiceNumber::new(period, sequence, self.width).inspect_err(|_| {
            tracing::error!(
                period = %period,
                sequence,
                width = self.width.digits(),
                "sequence exhausted for period"
            );
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::StoreError;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// Counter that starts every period at a fixed value
    struct FixedStart {
        next: Mutex<u64>,
        fail: bool,
    }

    #[async_trait]
    impl CounterStore for FixedStart {
        async fn increment(&self, period: &Period) -> Result<Option<u64>, StoreError> {
            if self.fail {
                return Err(StoreError::request("test", "increment", "unavailable"));
            }
            if period.year() != 2024 {
                return Ok(None);
            }
            let mut next = self.next.lock().unwrap();
            *next += 1;
            Ok(Some(*next))
        }
    }

    fn allocator(start: u64, width: SequenceWidth) -> SequenceAllocator {
        SequenceAllocator::new(
            Arc::new(FixedStart {
                next: Mutex::new(start),
                fail: false,
            }),
            width,
        )
    }

    #[tokio::test]
    async fn test_allocate_returns_post_increment_value() {
        let allocator = allocator(10, SequenceWidth::Three);
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        assert_eq!(allocator.allocate(at).await.unwrap(), 11);
        assert_eq!(allocator.allocate(at).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_next_number_formats_period_prefix() {
        let allocator = allocator(6, SequenceWidth::Three);
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        let number = allocator.next_number(at).await.unwrap();
        assert_eq!(number.to_string(), "2403007");
    }

    #[tokio::test]
    async fn test_unprovisioned_period_fails_closed() {
        let allocator = allocator(10, SequenceWidth::Four);
        let at = Utc.with_ymd_and_hms(2031, 7, 1, 0, 0, 0).unwrap();
        let err = allocator.allocate(at).await.unwrap_err();
        assert!(matches!(
            err,
            AllocationError::PeriodNotProvisioned { ref field } if field == "y31.m7.cnt"
        ));
    }

    #[tokio::test]
    async fn test_overflow_surfaces() {
        let allocator = allocator(999, SequenceWidth::Three);
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        let err = allocator.next_number(at).await.unwrap_err();
        assert!(matches!(
            err,
            InvoiceError::NumberOverflow {
                sequence: 1000,
                width: 3
            }
        ));
    }

    #[tokio::test]
    async fn test_store_failure_is_allocation_error() {
        let allocator = SequenceAllocator::new(
            Arc::new(FixedStart {
                next: Mutex::new(0),
                fail: true,
            }),
            SequenceWidth::Four,
        );
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        assert!(matches!(
            allocator.allocate(at).await,
            Err(AllocationError::Store(_))
        ));
    }
}
