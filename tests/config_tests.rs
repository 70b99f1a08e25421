//! Integration tests for YAML configuration loading

use invoice::prelude::*;
use std::io::Write;

#[test]
fn test_load_from_file() {
    let yaml = r#"
store:
  region: eu-west-1
  endpoint: null
  invoice_table: invoices
  counter_table: invoice_counters
  counter_key: SEQ
sequence:
  width: 3
  baseline: 0
  first_year: 2025
  last_year: 2026
server:
  bind: 0.0.0.0:8080
"#;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let config = InvoiceConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();

    assert_eq!(config.store.region, "eu-west-1");
    assert!(config.store.endpoint.is_none());
    assert_eq!(config.store.counter_key, "SEQ");
    assert!(!config.store.shares_counter_table());
    assert_eq!(config.sequence.width, SequenceWidth::Three);
    assert_eq!(config.server.bind, "0.0.0.0:8080");

    let seed = config.sequence.seed().unwrap();
    assert_eq!(seed.periods().len(), 24);
    assert_eq!(seed.baseline(), 0);
}

#[test]
fn test_missing_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    assert!(InvoiceConfig::from_yaml_file(path.to_str().unwrap()).is_err());
}

#[test]
fn test_empty_document_uses_defaults() {
    let config = InvoiceConfig::from_yaml_str("{}").unwrap();
    assert_eq!(config, InvoiceConfig::default());
    assert_eq!(config.store.endpoint.as_deref(), Some("http://localhost:8000"));
    assert_eq!(config.store.status_index, "status-index");
}

#[test]
fn test_unsupported_width_rejected() {
    let yaml = r#"
sequence:
  width: 5
"#;
    assert!(InvoiceConfig::from_yaml_str(yaml).is_err());
}

#[test]
fn test_empty_table_name_rejected() {
    let yaml = r#"
store:
  invoice_table: ""
"#;
    let err = InvoiceConfig::from_yaml_str(yaml).unwrap_err();
    assert!(err.to_string().contains("store.invoice_table"));
}

#[test]
fn test_inverted_years_rejected() {
    let yaml = r#"
sequence:
  first_year: 2030
  last_year: 2025
"#;
    assert!(InvoiceConfig::from_yaml_str(yaml).is_err());
}

#[test]
fn test_zero_capacity_rejected() {
    let yaml = r#"
store:
  read_capacity: 0
"#;
    assert!(InvoiceConfig::from_yaml_str(yaml).is_err());
}
