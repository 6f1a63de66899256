use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::session_middleware;

use crate::handlers::*;

pub fn consultation_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(list_consultations).post(create_consultation))
        .route("/new", get(new_consultation))
        .route("/{id}", get(edit_consultation).post(update_consultation))
        .route("/{id}/history", get(consultation_history))
        .route("/{id}/delete", post(delete_consultation))
        .route("/{id}/print/ordonnance", get(print_ordonnance))
        .route("/{id}/print/arret-travail", get(print_sick_leave))
        .route("/{id}/print/recu", get(print_receipt))
        .layer(middleware::from_fn_with_state(config.clone(), session_middleware))
        .with_state(config)
}
