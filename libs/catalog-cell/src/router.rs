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

pub fn service_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(list_services).post(create_service))
        .route("/{id}", get(edit_service).post(update_service))
        .route("/{id}/delete", post(delete_service))
        .layer(middleware::from_fn_with_state(config.clone(), session_middleware))
        .with_state(config)
}

pub fn medicament_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(list_medicaments).post(create_medicament))
        .route("/{id}", get(edit_medicament).post(update_medicament))
        .route("/{id}/delete", post(delete_medicament))
        .layer(middleware::from_fn_with_state(config.clone(), session_middleware))
        .with_state(config)
}

pub fn settings_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/cabinet", get(cabinet_settings).post(save_cabinet_settings))
        .layer(middleware::from_fn_with_state(ADMIN_ONLY, require_roles))
        .layer(middleware::from_fn_with_state(config.clone(), session_middleware))
        .with_state(config)
}
