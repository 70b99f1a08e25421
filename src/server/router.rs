//! Router builder for invoice routes

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::server::handlers::{
    AppState, batch_get_invoices, create_invoice, get_invoice, list_invoices, resolve_invoice,
};

/// Build invoice routes
///
/// - POST /invoices - Create an invoice
/// - GET /invoices?status={status} - List invoices in a status
/// - POST /invoices/batch - Fetch summaries for many numbers
/// - GET /invoices/{number} - Get an invoice
/// - PUT /invoices/{number}/resolve - Resolve an invoice
pub fn build_invoice_routes(state: AppState) -> Router {
    Router::new()
        .route("/invoices", post(create_invoice).get(list_invoices))
        .route("/invoices/batch", post(batch_get_invoices))
        .route("/invoices/{number}", get(get_invoice))
        .route("/invoices/{number}/resolve", put(resolve_invoice))
        .with_state(state)
}
