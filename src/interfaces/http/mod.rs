//! HTTP surface mapping requests onto the ledger components.

pub mod error;
pub mod handlers;

use crate::application::{LoanLifecycleManager, PaymentProcessor, StatusQueryService};
use crate::domain::ports::{BalanceCacheRef, LedgerStoreRef};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// Shared handles to the three ledger components.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<LoanLifecycleManager>,
    pub payments: Arc<PaymentProcessor>,
    pub status: Arc<StatusQueryService>,
}

impl AppState {
    pub fn new(store: LedgerStoreRef, cache: BalanceCacheRef, cache_ttl: Duration) -> Self {
        Self {
            lifecycle: Arc::new(LoanLifecycleManager::new(store.clone())),
            payments: Arc::new(PaymentProcessor::with_cache_ttl(
                store.clone(),
                cache.clone(),
                cache_ttl,
            )),
            status: Arc::new(StatusQueryService::with_cache_ttl(store, cache, cache_ttl)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/loans", post(handlers::create_loan))
        .route("/loans/:loan_id/payments", post(handlers::make_payment))
        .route("/loans/:loan_id/outstanding", get(handlers::get_outstanding))
        .route("/loans/:loan_id/delinquent", get(handlers::get_delinquent))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
