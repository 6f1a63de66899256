use std::sync::Arc;

use axum::{
    extract::{FromRef, Query, State},
    response::Redirect,
    Extension, Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::CurrentUser;
use shared_models::error::AppError;
use shared_utils::extractor::LOGIN_PATH;
use shared_utils::session::{issue_session_token, new_claims, removal_cookie, session_cookie};

use crate::models::{AuthError, LoginForm, LoginQuery};
use crate::services::{AuthService, LoginThrottle};

#[derive(Clone)]
pub struct AuthState {
    pub config: Arc<AppConfig>,
    pub throttle: LoginThrottle,
}

impl AuthState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let throttle = LoginThrottle::new(
            config.login_max_attempts,
            Duration::minutes(config.login_lockout_minutes),
        );
        Self { config, throttle }
    }
}

impl FromRef<AuthState> for Arc<AppConfig> {
    fn from_ref(state: &AuthState) -> Self {
        state.config.clone()
    }
}

/// Only same-site absolute paths are followed after login.
pub fn safe_return_url(return_url: Option<&str>) -> &str {
    match return_url {
        Some(url) if url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\") => url,
        _ => "/",
    }
}

#[axum::debug_handler]
pub async fn login_page(Query(query): Query<LoginQuery>) -> Json<Value> {
    Json(json!({ "return_url": query.return_url }))
}

#[axum::debug_handler(state = AuthState)]
pub async fn login(
    State(state): State<AuthState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect), AppError> {
    let service = AuthService::new(&state.config, state.throttle.clone());
    let now = Utc::now();

    let user = service.login(&form, now).await?;

    let claims = new_claims(&user, now, state.config.session_ttl_minutes);
    let token = issue_session_token(&claims, &state.config.session_secret)
        .map_err(AuthError::Session)?;

    let target = safe_return_url(form.return_url.as_deref()).to_string();

    Ok((
        jar.add(session_cookie(token, &state.config)),
        Redirect::to(&target),
    ))
}

#[axum::debug_handler(state = AuthState)]
pub async fn logout(
    State(config): State<Arc<AppConfig>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    (jar.add(removal_cookie(&config)), Redirect::to(LOGIN_PATH))
}

#[axum::debug_handler]
pub async fn me(Extension(user): Extension<CurrentUser>) -> Json<CurrentUser> {
    Json(user)
}
