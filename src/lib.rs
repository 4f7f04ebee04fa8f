pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod health;
pub mod provider;
pub mod schemas;
pub mod services;

use axum::{
    Router,
    routing::{get, post},
};
use std::time::Instant;

use crate::services::dispatcher::Dispatcher;
use crate::services::query::QueryService;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub dispatcher: Dispatcher,
    pub query_service: QueryService,
    pub start_time: Instant,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/customers/:customer/transfer", post(handlers::transfer))
        .route("/customers/:customer/withdraw", post(handlers::withdraw))
        .route(
            "/customers/:customer/transactions/:transactionId/status",
            get(handlers::transaction_status),
        )
        .with_state(state)
}
