use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::session_middleware;

use crate::handlers::*;

pub fn create_patient_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(search_patients).post(create_patient))
        .route("/options", get(patient_options))
        .route("/{id}", get(get_patient).post(update_patient))
        .route("/{id}/delete", post(delete_patient))
        .layer(middleware::from_fn_with_state(config.clone(), session_middleware))
        .with_state(config)
}
