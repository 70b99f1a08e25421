//! Configuration loading and management

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::core::error::InvoiceError;
use crate::core::number::SequenceWidth;
use crate::core::period::{FIRST_YEAR, LAST_YEAR};
use crate::core::store::{CounterSeed, DEFAULT_COUNTER_KEY};

/// Key-value store connection and table layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub region: String,

    /// Override endpoint, e.g. DynamoDB Local
    pub endpoint: Option<String>,

    pub invoice_table: String,

    /// Table holding the counter record; the invoice table by default
    pub counter_table: String,

    /// Key of the counter record
    pub counter_key: String,

    /// Secondary index partitioned on `status`
    pub status_index: String,

    pub read_capacity: i64,
    pub write_capacity: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            region: "us-west-2".to_string(),
            endpoint: Some("http://localhost:8000".to_string()),
            invoice_table: "INVOICE".to_string(),
            counter_table: "INVOICE".to_string(),
            counter_key: DEFAULT_COUNTER_KEY.to_string(),
            status_index: "status-index".to_string(),
            read_capacity: 1,
            write_capacity: 1,
        }
    }
}

impl StoreConfig {
    /// Whether the counter record lives beside the invoices
    pub fn shares_counter_table(&self) -> bool {
        self.counter_table == self.invoice_table
    }
}

/// Numbering scheme and counter provisioning range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Digits of the per-period sequence (3 or 4)
    pub width: SequenceWidth,

    /// Value every counter holds right after provisioning
    pub baseline: u64,

    pub first_year: i32,
    pub last_year: i32,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            width: SequenceWidth::Four,
            baseline: 10,
            first_year: 2024,
            last_year: 2035,
        }
    }
}

impl SequenceConfig {
    pub fn seed(&self) -> Result<CounterSeed, InvoiceError> {
        CounterSeed::new(self.first_year, self.last_year, self.baseline)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceConfig {
    pub store: StoreConfig,
    pub sequence: SequenceConfig,
    pub server: ServerConfig,
}

impl InvoiceConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let store = &self.store;
        for (name, value) in [
            ("store.invoice_table", &store.invoice_table),
            ("store.counter_table", &store.counter_table),
            ("store.counter_key", &store.counter_key),
            ("store.status_index", &store.status_index),
            ("store.region", &store.region),
        ] {
            if value.trim().is_empty() {
                bail!("{} must not be empty", name);
            }
        }
        if store.read_capacity < 1 || store.write_capacity < 1 {
            bail!("store capacities must be at least 1");
        }

        let sequence = &self.sequence;
        if sequence.first_year < FIRST_YEAR || sequence.last_year > LAST_YEAR {
            bail!(
                "sequence years must lie within {}..={}, got {}..={}",
                FIRST_YEAR,
                LAST_YEAR,
                sequence.first_year,
                sequence.last_year
            );
        }
        if sequence.first_year > sequence.last_year {
            bail!("sequence.first_year is after sequence.last_year");
        }
        if sequence.baseline >= sequence.width.capacity() {
            bail!(
                "sequence.baseline {} leaves no room in {} digits",
                sequence.baseline,
                sequence.width.digits()
            );
        }
        Ok(())
    }
}
