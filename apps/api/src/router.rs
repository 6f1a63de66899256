use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use catalog_cell::router::{medicament_routes, service_routes, settings_routes};
use consultation_cell::router::consultation_routes;
use patient_cell::router::create_patient_router;
use reporting_cell::handlers::liveness;
use reporting_cell::router::{dashboard_routes, reporting_routes};
use shared_config::AppConfig;
use staff_cell::router::staff_routes;
use stock_cell::router::stock_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(liveness))
        .nest("/account", auth_routes(state.clone()))
        .nest("/dashboard", dashboard_routes(state.clone()))
        .nest("/employers", staff_routes(state.clone()))
        .nest("/patients", create_patient_router(state.clone()))
        .nest("/rendezvous", appointment_routes(state.clone()))
        .nest("/services", service_routes(state.clone()))
        .nest("/medicaments", medicament_routes(state.clone()))
        .nest("/settings", settings_routes(state.clone()))
        .nest("/consultations", consultation_routes(state.clone()))
        .nest("/stock", stock_routes(state.clone()))
        .nest("/reports", reporting_routes(state))
}
