use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::session_middleware;

use crate::handlers::*;

pub fn stock_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(stock_index))
        .route("/products", post(create_product))
        .route("/products/new", get(new_product))
        .route("/products/{id}/delete", post(delete_product))
        .route("/products/{id}/adjust", post(adjust_product))
        .route("/categories", post(create_category))
        .route("/categories/{id}/delete", post(delete_category))
        .route("/movements", post(record_movement))
        .route("/history", get(movement_history))
        .route("/low-count", get(low_stock_count))
        .layer(middleware::from_fn_with_state(config.clone(), session_middleware))
        .with_state(config)
}
