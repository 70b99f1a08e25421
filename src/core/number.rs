//! Invoice number wire format: `{yy}{mm}{seq}`
//!
//! A number is the two-digit year, the zero-padded month and the period
//! sequence zero-padded to a fixed width, e.g. `2403007` with width 3 or
//! `24030007` with width 4. The width is fixed per deployment; numbers of
//! one deployment therefore all have the same length and sort by period.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::InvoiceError;
use crate::core::period::Period;

/// Number of digits reserved for the per-period sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SequenceWidth {
    Three,
    #[default]
    Four,
}

impl SequenceWidth {
    pub fn digits(self) -> usize {
        match self {
            SequenceWidth::Three => 3,
            SequenceWidth::Four => 4,
        }
    }

    /// Largest sequence value that fits
    pub fn capacity(self) -> u64 {
        match self {
            SequenceWidth::Three => 999,
            SequenceWidth::Four => 9_999,
        }
    }
}

impl TryFrom<u8> for SequenceWidth {
    type Error = String;

    fn try_from(digits: u8) -> Result<Self, Self::Error> {
        match digits {
            3 => Ok(SequenceWidth::Three),
            4 => Ok(SequenceWidth::Four),
            other => Err(format!("unsupported sequence width {}, expected 3 or 4", other)),
        }
    }
}

impl From<SequenceWidth> for u8 {
    fn from(width: SequenceWidth) -> Self {
        width.digits() as u8
    }
}

/// A parsed or freshly allocated invoice number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvoiceNumber {
    period: Period,
    sequence: u64,
    width: SequenceWidth,
}

impl InvoiceNumber {
    /// Build a number, failing with `NumberOverflow` instead of truncating
    pub fn new(period: Period, sequence: u64, width: SequenceWidth) -> Result<Self, InvoiceError> {
        if sequence > width.capacity() {
            return Err(InvoiceError::NumberOverflow {
                sequence,
                width: width.digits(),
            });
        }
        Ok(Self {
            period,
            sequence,
            width,
        })
    }

    /// Parse a number previously rendered with the same width
    pub fn parse(text: &str, width: SequenceWidth) -> Result<Self, InvoiceError> {
        let expected = 4 + width.digits();
        if text.len() != expected {
            return Err(InvoiceError::invalid_input(
                "number",
                format!("expected {} digits, got '{}'", expected, text),
            ));
        }
        if !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvoiceError::invalid_input(
                "number",
                format!("'{}' contains non-digit characters", text),
            ));
        }

        // ASCII digits only, so these slices sit on char boundaries
        let yy: u8 = text[0..2].parse().map_err(|_| digits_error(text))?;
        let month: u32 = text[2..4].parse().map_err(|_| digits_error(text))?;
        let sequence: u64 = text[4..].parse().map_err(|_| digits_error(text))?;

        let period = Period::from_two_digit(yy, month)
            .map_err(|e| InvoiceError::invalid_input("number", e.to_string()))?;
        Self::new(period, sequence, width)
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn width(&self) -> SequenceWidth {
        self.width
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:0w$}",
            self.period,
            self.sequence,
            w = self.width.digits()
        )
    }
}

fn digits_error(text: &str) -> InvoiceError {
    InvoiceError::invalid_input("number", format!("'{}' is not a valid invoice number", text))
}

/// Render `{yy}{mm}{seq}` from raw parts
///
/// ```
/// use invoice::core::number::{format_number, SequenceWidth};
///
/// assert_eq!(format_number(24, 3, 7, SequenceWidth::Three).unwrap(), "2403007");
/// ```
pub fn format_number(
    yy: u8,
    mm: u32,
    sequence: u64,
    width: SequenceWidth,
) -> Result<String, InvoiceError> {
    let period = Period::from_two_digit(yy, mm)
        .map_err(|e| InvoiceError::invalid_input("period", e.to_string()))?;
    Ok(InvoiceNumber::new(period, sequence, width)?.to_string())
}
