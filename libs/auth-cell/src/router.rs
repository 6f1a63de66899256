use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::session_middleware;

use crate::handlers::{self, AuthState};

pub fn auth_routes(config: Arc<AppConfig>) -> Router {
    let state = AuthState::new(config.clone());

    let public_routes = Router::new()
        .route("/login", get(handlers::login_page).post(handlers::login));

    let protected_routes = Router::new()
        .route("/logout", post(handlers::logout))
        .route("/me", get(handlers::me))
        .layer(middleware::from_fn_with_state(config, session_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
