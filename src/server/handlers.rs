//! HTTP handlers for invoice operations

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::core::error::{ErrorResponse, InvoiceError};
use crate::core::invoice::{Invoice, InvoiceStatus, InvoiceSummary};
use crate::core::service::InvoiceService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: InvoiceService,
}

/// Request body for a batch lookup
#[derive(Debug, Deserialize)]
pub struct BatchGetRequest {
    pub numbers: BTreeSet<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchGetResponse {
    pub invoices: Vec<InvoiceSummary>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ListInvoicesResponse {
    pub invoices: Vec<Invoice>,
    pub count: usize,
    pub status: String,
}

/// Request body for resolving an invoice
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub status: String,
    pub updated_by: String,
}

fn not_found(number: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::not_found(number))).into_response()
}

/// Create an invoice from a JSON draft
///
/// POST /invoices
pub async fn create_invoice(
    State(state): State<AppState>,
    Json(draft): Json<Value>,
) -> Result<Response, InvoiceError> {
    let invoice = state.service.create_invoice(draft).await?;
    Ok((StatusCode::CREATED, Json(invoice)).into_response())
}

/// Get a single invoice
///
/// GET /invoices/{number}
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Response, InvoiceError> {
    match state.service.get(&number).await? {
        Some(invoice) => Ok(Json(invoice).into_response()),
        None => Ok(not_found(&number)),
    }
}

/// Look up many invoices at once; unknown numbers are omitted
///
/// POST /invoices/batch
pub async fn batch_get_invoices(
    State(state): State<AppState>,
    Json(request): Json<BatchGetRequest>,
) -> Result<Json<BatchGetResponse>, InvoiceError> {
    let invoices = state.service.batch_get(&request.numbers).await?;
    let count = invoices.len();
    Ok(Json(BatchGetResponse { invoices, count }))
}

/// List invoices in a status
///
/// GET /invoices?status=billing
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<ListInvoicesResponse>, InvoiceError> {
    let status = InvoiceStatus::from(query.status);
    let invoices = state
        .service
        .query_by_status(&status)
        .await?
        .unwrap_or_default();
    let count = invoices.len();

    Ok(Json(ListInvoicesResponse {
        invoices,
        count,
        status: status.to_string(),
    }))
}

/// Set the status of an invoice and stamp the resolver
///
/// PUT /invoices/{number}/resolve
pub async fn resolve_invoice(
    State(state): State<AppState>,
    Path(number): Path<String>,
    Json(request): Json<ResolveRequest>,
) -> Result<Response, InvoiceError> {
    match state
        .service
        .resolve(&number, request.status, &request.updated_by)
        .await?
    {
        Some(invoice) => Ok(Json(invoice).into_response()),
        None => Ok(not_found(&number)),
    }
}
