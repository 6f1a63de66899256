use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_models::auth::REPORT_VIEWERS;
use shared_utils::extractor::{require_roles, session_middleware};

use crate::handlers::*;

pub fn reporting_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/revenue", get(revenue_report))
        .route("/revenue/export", get(export_revenue))
        .route("/statistics", get(statistics))
        .route("/statistics/export", get(export_statistics))
        .layer(middleware::from_fn_with_state(REPORT_VIEWERS, require_roles))
        .layer(middleware::from_fn_with_state(config.clone(), session_middleware))
        .with_state(config)
}

pub fn dashboard_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .layer(middleware::from_fn_with_state(config.clone(), session_middleware))
        .with_state(config)
}
