use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::session_middleware;

use crate::handlers::*;

pub fn appointment_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(list_rendezvous).post(create_rendezvous))
        .route("/new", get(new_rendezvous))
        .route("/{id}", get(edit_rendezvous).post(update_rendezvous))
        .route("/{id}/delete", post(delete_rendezvous))
        .layer(middleware::from_fn_with_state(config.clone(), session_middleware))
        .with_state(config)
}
