use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::{CurrentUser, SessionClaims, SessionHeader};

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "cabinet_session";

pub fn new_claims(user: &CurrentUser, now: DateTime<Utc>, ttl_minutes: i64) -> SessionClaims {
    SessionClaims {
        sub: user.id,
        email: user.email.clone(),
        full_name: user.full_name.clone(),
        role: user.role,
        iat: now.timestamp(),
        exp: (now + Duration::minutes(ttl_minutes)).timestamp(),
    }
}

fn sign(input: &str, secret: &str) -> Result<Vec<u8>, String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(input.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

pub fn issue_session_token(claims: &SessionClaims, secret: &str) -> Result<String, String> {
    if secret.is_empty() {
        return Err("Session secret is not set".to_string());
    }

    let header = SessionHeader {
        alg: "HS256".to_string(),
        typ: "SESSION".to_string(),
    };
    let header_json = serde_json::to_vec(&header).map_err(|e| e.to_string())?;
    let claims_json = serde_json::to_vec(claims).map_err(|e| e.to_string())?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    );
    let signature = sign(&signing_input, secret)?;

    Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
}

pub fn validate_session_token(token: &str, secret: &str, now: i64) -> Result<SessionClaims, String> {
    if secret.is_empty() {
        return Err("Session secret is not set".to_string());
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let signature = URL_SAFE_NO_PAD.decode(parts[2]).map_err(|e| {
        debug!("Failed to decode signature: {}", e);
        "Invalid signature encoding".to_string()
    })?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(format!("{}.{}", parts[0], parts[1]).as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Session signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims_json = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|_| "Invalid claims encoding".to_string())?;

    let claims: SessionClaims = serde_json::from_slice(&claims_json).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        "Invalid claims format".to_string()
    })?;

    if claims.exp <= now {
        debug!("Session expired at {} (now: {})", claims.exp, now);
        return Err("Session expired".to_string());
    }

    Ok(claims)
}

/// Sliding expiration: true once more than half of the lifetime has elapsed.
pub fn needs_refresh(claims: &SessionClaims, now: i64) -> bool {
    let lifetime = claims.exp - claims.iat;
    now - claims.iat > lifetime / 2
}

pub fn session_cookie(token: String, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(config.cookie_secure)
        .max_age(time::Duration::minutes(config.session_ttl_minutes))
        .build()
}

/// Expired cookie with the same attributes, used on logout.
pub fn removal_cookie(config: &AppConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(config.cookie_secure)
        .max_age(time::Duration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::auth::Role;

    const SECRET: &str = "session-test-secret";

    fn user() -> CurrentUser {
        CurrentUser {
            id: 4,
            email: "s.bennani@cabinet.ma".to_string(),
            full_name: "Bennani Sara".to_string(),
            role: Role::Secretaire,
        }
    }

    #[test]
    fn issued_tokens_validate() {
        let now = Utc::now();
        let claims = new_claims(&user(), now, 30);
        let token = issue_session_token(&claims, SECRET).unwrap();

        let decoded = validate_session_token(&token, SECRET, now.timestamp()).unwrap();
        assert_eq!(decoded, claims);
        assert_eq!(CurrentUser::from(&decoded), user());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let token = issue_session_token(&new_claims(&user(), now, 30), SECRET).unwrap();

        let err = validate_session_token(&token, "other", now.timestamp()).unwrap_err();
        assert_eq!(err, "Invalid token signature");
    }

    #[test]
    fn expired_and_malformed_tokens_are_rejected() {
        let now = Utc::now();
        let token = issue_session_token(&new_claims(&user(), now, 30), SECRET).unwrap();
        let later = (now + Duration::minutes(31)).timestamp();

        assert_eq!(
            validate_session_token(&token, SECRET, later).unwrap_err(),
            "Session expired"
        );
        assert_eq!(
            validate_session_token("not-a-token", SECRET, now.timestamp()).unwrap_err(),
            "Invalid token format"
        );
    }

    #[test]
    fn refresh_after_half_the_lifetime() {
        let now = Utc::now();
        let claims = new_claims(&user(), now, 30);

        assert!(!needs_refresh(&claims, (now + Duration::minutes(10)).timestamp()));
        assert!(needs_refresh(&claims, (now + Duration::minutes(16)).timestamp()));
    }

    #[test]
    fn cookie_attributes() {
        let config = AppConfig {
            supabase_url: String::new(),
            supabase_service_key: String::new(),
            session_secret: SECRET.to_string(),
            session_ttl_minutes: 30,
            login_max_attempts: 5,
            login_lockout_minutes: 15,
            cookie_secure: true,
            bind_address: String::new(),
        };
        let cookie = session_cookie("abc".to_string(), &config);

        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::minutes(30)));
    }
}
