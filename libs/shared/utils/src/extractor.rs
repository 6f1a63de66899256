use std::sync::Arc;

use axum::{
    body::Body,
    extract::{OriginalUri, State},
    http::{header::SET_COOKIE, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_models::auth::{CurrentUser, Role};
use shared_models::error::AppError;

use crate::session::{
    issue_session_token, needs_refresh, new_claims, session_cookie, validate_session_token,
    SESSION_COOKIE,
};

pub const LOGIN_PATH: &str = "/account/login";

/// Cookie session guard for page routes. Anonymous callers are sent to the
/// login page with the requested location as `return_url`.
pub async fn session_middleware(
    State(config): State<Arc<AppConfig>>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let now = Utc::now();

    let token = match jar.get(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => return login_redirect(&request),
    };

    let claims = match validate_session_token(&token, &config.session_secret, now.timestamp()) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Rejected session cookie: {}", e);
            return login_redirect(&request);
        }
    };

    let user = CurrentUser::from(&claims);
    request.extensions_mut().insert(user.clone());

    let response = next.run(request).await;

    if !needs_refresh(&claims, now.timestamp()) || sets_session_cookie(&response) {
        return response;
    }

    match issue_session_token(
        &new_claims(&user, now, config.session_ttl_minutes),
        &config.session_secret,
    ) {
        Ok(token) => (jar.add(session_cookie(token, &config)), response).into_response(),
        Err(e) => {
            warn!("Could not refresh session for {}: {}", user.email, e);
            response
        }
    }
}

/// Role gate, layered inside `session_middleware`.
pub async fn require_roles(
    State(roles): State<&'static [Role]>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = extract_user(&request)?;

    if !user.has_any_role(roles) {
        warn!("{} ({}) denied access to {}", user.email, user.role, request.uri());
        return Err(AppError::Forbidden(
            "You do not have access to this page".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

pub fn extract_user<B>(request: &Request<B>) -> Result<CurrentUser, AppError> {
    request
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string()))
}

/// `/account/login?return_url=<path and query as first requested>`.
pub fn login_location(original: &str) -> String {
    format!("{}?return_url={}", LOGIN_PATH, urlencoding::encode(original))
}

fn login_redirect<B>(request: &Request<B>) -> Response {
    let original = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.clone())
        .unwrap_or_else(|| request.uri().clone());

    let target = original
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    Redirect::to(&login_location(&target)).into_response()
}

fn sets_session_cookie(response: &Response) -> bool {
    let prefix = format!("{}=", SESSION_COOKIE);
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&prefix))
}
