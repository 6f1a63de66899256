use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_models::auth::ADMIN_ONLY;
use shared_utils::extractor::{require_roles, session_middleware};

use crate::handlers::*;

pub fn staff_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(list_employers).post(create_employer))
        .route("/new", get(new_employer))
        .route("/{id}", get(edit_employer).post(update_employer))
        .route("/{id}/delete", post(delete_employer))
        .layer(middleware::from_fn_with_state(ADMIN_ONLY, require_roles))
        .layer(middleware::from_fn_with_state(config.clone(), session_middleware))
        .with_state(config)
}
