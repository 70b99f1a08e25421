//! DynamoDB implementation of the store contracts
//!
//! Layout: one table keyed on `number` holds the invoices; the counter
//! record is the item at the configured counter key, in the same table
//! unless `counter_table` says otherwise. Counters are nested maps
//! (`y24 → m3 → cnt`) and are only ever changed by a conditional
//! `SET ... + :one`, which DynamoDB applies atomically per item.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_dynamodb::Client as DynamoDBClient;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::{BuildError, DisplayErrorContext};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, GlobalSecondaryIndex, KeySchemaElement, KeyType,
    KeysAndAttributes, Projection, ProjectionType, ProvisionedThroughput, ReturnValue,
    ScalarAttributeType,
};
use serde_dynamo::{from_item, to_item};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::StoreConfig;
use crate::core::error::{InvoiceError, StoreError};
use crate::core::invoice::{Invoice, InvoiceStatus, InvoiceSummary, StatusUpdate, attr};
use crate::core::period::{CounterField, Period};
use crate::core::store::{
    CounterSeed, CounterStore, InvoiceStore, TableAdmin, check_invoice_key, lookup_keys,
};

const BACKEND: &str = "dynamodb";

/// BatchGetItem accepts at most this many keys per request
const BATCH_GET_LIMIT: usize = 100;

type Item = HashMap<String, AttributeValue>;

/// DynamoDB-backed counter, invoice and table administration store
#[derive(Clone)]
pub struct DynamoDBStore {
    client: DynamoDBClient,
    config: StoreConfig,
    ready: Arc<AtomicBool>,
}

impl DynamoDBStore {
    /// Wrap an existing client; the store is not ready until [`probe`](Self::probe) succeeds
    pub fn new(client: DynamoDBClient, config: StoreConfig) -> Self {
        Self {
            client,
            config,
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build a client from the ambient AWS configuration and probe the endpoint
    ///
    /// Never fails: an unreachable endpoint yields a store that reports
    /// `is_ready() == false` and refuses table administration.
    pub async fn connect(config: StoreConfig) -> Self {
        let region = RegionProviderChain::first_try(Region::new(config.region.clone()))
            .or_default_provider();
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let store = Self::new(DynamoDBClient::new(&sdk_config), config);
        store.probe().await;
        store
    }

    /// Check that the endpoint answers and record the outcome
    pub async fn probe(&self) -> bool {
        let ready = match self.client.list_tables().limit(1).send().await {
            Ok(_) => {
                tracing::info!(backend = BACKEND, region = %self.config.region, "DynamoDB is ready");
                true
            }
            Err(err) => {
                tracing::warn!(
                    backend = BACKEND,
                    error = %DisplayErrorContext(&err),
                    "Error when checking DynamoDB status"
                );
                false
            }
        };
        self.ready.store(ready, Ordering::SeqCst);
        ready
    }

    pub fn client(&self) -> &DynamoDBClient {
        &self.client
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn ensure_ready(&self) -> Result<(), StoreError> {
        if self.is_ready() {
            Ok(())
        } else {
            tracing::error!(backend = BACKEND, "DynamoDB is not ready yet");
            Err(StoreError::NotReady {
                backend: BACKEND.to_string(),
            })
        }
    }

    fn number_key(number: &str) -> (String, AttributeValue) {
        (attr::NUMBER.to_string(), AttributeValue::S(number.to_string()))
    }

    fn projected_keys(&self, keys: Vec<Item>) -> Result<KeysAndAttributes, StoreError> {
        let [number, issue_at, status, resolved_at] = InvoiceSummary::PROJECTION;
        KeysAndAttributes::builder()
            .set_keys(Some(keys))
            .projection_expression("#n, #i, #s, #r")
            .expression_attribute_names("#n", number)
            .expression_attribute_names("#i", issue_at)
            .expression_attribute_names("#s", status)
            .expression_attribute_names("#r", resolved_at)
            .build()
            .map_err(|e| build_failed("batch_get_item", e))
    }

    /// One BatchGetItem call plus follow-ups for whatever DynamoDB left unprocessed
    async fn batch_get_chunk(&self, keys: Vec<Item>) -> Result<Vec<InvoiceSummary>, StoreError> {
        let table = &self.config.invoice_table;
        let mut pending = Some(self.projected_keys(keys)?);
        let mut found = Vec::new();

        while let Some(request) = pending.take() {
            let output = self
                .client
                .batch_get_item()
                .request_items(table, request)
                .send()
                .await
                .map_err(|e| request_failed("batch_get_item", e))?;

            if let Some(items) = output.responses.and_then(|mut r| r.remove(table)) {
                for item in items {
                    found.push(decode(item)?);
                }
            }
            pending = output
                .unprocessed_keys
                .and_then(|mut u| u.remove(table))
                .filter(|request| !request.keys().is_empty());
        }
        Ok(found)
    }

    async fn create_table(&self, table: &str, with_status_index: bool) -> Result<(), StoreError> {
        let throughput = ProvisionedThroughput::builder()
            .read_capacity_units(self.config.read_capacity)
            .write_capacity_units(self.config.write_capacity)
            .build()
            .map_err(|e| build_failed("create_table", e))?;

        let mut request = self
            .client
            .create_table()
            .table_name(table)
            .key_schema(key_element(attr::NUMBER)?)
            .attribute_definitions(string_attribute(attr::NUMBER)?)
            .provisioned_throughput(throughput.clone());

        if with_status_index {
            let index = GlobalSecondaryIndex::builder()
                .index_name(&self.config.status_index)
                .key_schema(key_element(attr::STATUS)?)
                .projection(
                    Projection::builder()
                        .projection_type(ProjectionType::All)
                        .build(),
                )
                .provisioned_throughput(throughput)
                .build()
                .map_err(|e| build_failed("create_table", e))?;
            request = request
                .attribute_definitions(string_attribute(attr::STATUS)?)
                .global_secondary_indexes(index);
        }

        request
            .send()
            .await
            .map_err(|e| request_failed("create_table", e))?;
        tracing::info!(backend = BACKEND, table, "table created");
        Ok(())
    }

    async fn delete_table(&self, table: &str) -> Result<(), StoreError> {
        self.client
            .delete_table()
            .table_name(table)
            .send()
            .await
            .map_err(|e| request_failed("delete_table", e))?;
        tracing::info!(backend = BACKEND, table, "table dropped");
        Ok(())
    }
}

#[async_trait]
impl CounterStore for DynamoDBStore {
    async fn increment(&self, period: &Period) -> Result<Option<u64>, StoreError> {
        let field = period.counter_field();
        let (key, value) = Self::number_key(&self.config.counter_key);

        let result = self
            .client
            .update_item()
            .table_name(&self.config.counter_table)
            .key(key, value)
            .update_expression("SET #y.#m.#c = #y.#m.#c + :one")
            .condition_expression("attribute_exists(#y.#m.#c)")
            .expression_attribute_names("#y", field.year_attr())
            .expression_attribute_names("#m", field.month_attr())
            .expression_attribute_names("#c", CounterField::LEAF)
            .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                return Ok(None);
            }
            Err(err) => return Err(request_failed("update_item", err)),
        };

        let count = output
            .attributes
            .as_ref()
            .and_then(|attrs| attrs.get(field.year_attr()))
            .and_then(|year| year.as_m().ok())
            .and_then(|year| year.get(field.month_attr()))
            .and_then(|month| month.as_m().ok())
            .and_then(|month| month.get(CounterField::LEAF))
            .and_then(|count| count.as_n().ok())
            .ok_or_else(|| StoreError::Serialization {
                message: format!("update of '{}' returned no counter value", field),
            })?;

        count.parse::<u64>().map(Some).map_err(|e| StoreError::Serialization {
            message: format!("counter '{}' holds '{}': {}", field, count, e),
        })
    }
}

#[async_trait]
impl InvoiceStore for DynamoDBStore {
    async fn get(&self, number: &str) -> Result<Option<Invoice>, InvoiceError> {
        check_invoice_key(number, &self.config.counter_key)?;
        let (key, value) = Self::number_key(number);

        let output = self
            .client
            .get_item()
            .table_name(&self.config.invoice_table)
            .key(key, value)
            .send()
            .await
            .map_err(|e| request_failed("get_item", e))?;

        match output.item {
            Some(item) => Ok(Some(decode(item)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, invoice: &Invoice) -> Result<(), InvoiceError> {
        check_invoice_key(&invoice.number, &self.config.counter_key)?;
        let mut record = invoice.clone();
        record.strip_reserved_details();

        let item: Item = to_item(&record).map_err(|e| StoreError::Serialization {
            message: e.to_string(),
        })?;

        self.client
            .put_item()
            .table_name(&self.config.invoice_table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| request_failed("put_item", e))?;
        Ok(())
    }

    async fn batch_get(
        &self,
        numbers: &BTreeSet<String>,
    ) -> Result<Vec<InvoiceSummary>, InvoiceError> {
        let keys: Vec<Item> = lookup_keys(numbers, &self.config.counter_key)
            .map(|number| HashMap::from([Self::number_key(number)]))
            .collect();
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let chunks = keys
            .chunks(BATCH_GET_LIMIT)
            .map(|chunk| self.batch_get_chunk(chunk.to_vec()));

        let found = futures::future::try_join_all(chunks).await?;
        Ok(found.into_iter().flatten().collect())
    }

    async fn query_by_status(
        &self,
        status: &InvoiceStatus,
    ) -> Result<Option<Vec<Invoice>>, InvoiceError> {
        let mut found = Vec::new();
        let mut start_key = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(&self.config.invoice_table)
                .index_name(&self.config.status_index)
                .key_condition_expression("#s = :status")
                .expression_attribute_names("#s", attr::STATUS)
                .expression_attribute_values(":status", AttributeValue::S(status.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| request_failed("query", e))?;

            for item in output.items.unwrap_or_default() {
                found.push(decode(item)?);
            }
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        if found.is_empty() {
            return Ok(None);
        }
        Ok(Some(found))
    }

    async fn update_status(
        &self,
        number: &str,
        update: &StatusUpdate,
    ) -> Result<Option<Invoice>, InvoiceError> {
        check_invoice_key(number, &self.config.counter_key)?;
        let (key, value) = Self::number_key(number);

        let result = self
            .client
            .update_item()
            .table_name(&self.config.invoice_table)
            .key(key, value)
            .update_expression("SET #s = :status, #rb = :by, #ra = :at")
            .condition_expression("attribute_exists(#n)")
            .expression_attribute_names("#n", attr::NUMBER)
            .expression_attribute_names("#s", attr::STATUS)
            .expression_attribute_names("#rb", attr::RESOLVED_BY)
            .expression_attribute_names("#ra", attr::RESOLVED_AT)
            .expression_attribute_values(":status", AttributeValue::S(update.status.to_string()))
            .expression_attribute_values(":by", AttributeValue::S(update.resolved_by.clone()))
            .expression_attribute_values(":at", AttributeValue::N(update.resolved_at.to_string()))
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(output) => match output.attributes {
                Some(item) => Ok(Some(decode(item)?)),
                None => Ok(None),
            },
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(request_failed("update_item", err).into()),
        }
    }
}

#[async_trait]
impl TableAdmin for DynamoDBStore {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn create_tables(&self) -> Result<(), StoreError> {
        self.ensure_ready()?;
        self.create_table(&self.config.invoice_table, true).await?;
        if !self.config.shares_counter_table() {
            self.create_table(&self.config.counter_table, false).await?;
        }
        Ok(())
    }

    async fn drop_tables(&self) -> Result<(), StoreError> {
        self.ensure_ready()?;
        self.delete_table(&self.config.invoice_table).await?;
        if !self.config.shares_counter_table() {
            self.delete_table(&self.config.counter_table).await?;
        }
        Ok(())
    }

    async fn seed_counters(&self, seed: &CounterSeed) -> Result<(), StoreError> {
        self.ensure_ready()?;

        let mut years: HashMap<String, Item> = HashMap::new();
        for field in seed.fields() {
            let count = HashMap::from([(
                CounterField::LEAF.to_string(),
                AttributeValue::N(seed.baseline().to_string()),
            )]);
            years
                .entry(field.year_attr().to_string())
                .or_default()
                .insert(field.month_attr().to_string(), AttributeValue::M(count));
        }

        let mut item: Item = years
            .into_iter()
            .map(|(year, months)| (year, AttributeValue::M(months)))
            .collect();
        let (key, value) = Self::number_key(&self.config.counter_key);
        item.insert(key, value);

        let result = self
            .client
            .put_item()
            .table_name(&self.config.counter_table)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(#n)")
            .expression_attribute_names("#n", attr::NUMBER)
            .send()
            .await;

        match result {
            Ok(_) => {
                tracing::info!(
                    backend = BACKEND,
                    key = %self.config.counter_key,
                    periods = seed.periods().len(),
                    baseline = seed.baseline(),
                    "counter record seeded"
                );
                Ok(())
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Err(StoreError::AlreadyExists {
                    key: self.config.counter_key.clone(),
                })
            }
            Err(err) => Err(request_failed("put_item", err)),
        }
    }
}

fn key_element(name: &str) -> Result<KeySchemaElement, StoreError> {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(KeyType::Hash)
        .build()
        .map_err(|e| build_failed("create_table", e))
}

fn string_attribute(name: &str) -> Result<AttributeDefinition, StoreError> {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .map_err(|e| build_failed("create_table", e))
}

fn decode<T: serde::de::DeserializeOwned>(item: Item) -> Result<T, StoreError> {
    from_item(item).map_err(|e| StoreError::Serialization {
        message: e.to_string(),
    })
}

fn request_failed<E: std::error::Error>(operation: &str, err: E) -> StoreError {
    let message = DisplayErrorContext(&err).to_string();
    tracing::warn!(backend = BACKEND, operation, error = %message, "request failed");
    StoreError::request(BACKEND, operation, message)
}

fn build_failed(operation: &str, err: BuildError) -> StoreError {
    StoreError::request(BACKEND, operation, err.to_string())
}
