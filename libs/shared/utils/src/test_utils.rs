use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::{CurrentUser, Role};

use crate::session::{issue_session_token, new_claims, SESSION_COOKIE};

pub struct TestConfig {
    pub session_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            session_secret: "test-secret-key-for-session-signing-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Points the PostgREST client at a running `wiremock::MockServer`.
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            session_secret: self.session_secret.clone(),
            session_ttl_minutes: 30,
            login_max_attempts: 5,
            login_lockout_minutes: 15,
            cookie_secure: false,
            bind_address: "127.0.0.1:0".to_string(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new(1, "test@cabinet.ma", Role::Admin)
    }
}

impl TestUser {
    pub fn new(id: i64, email: &str, role: Role) -> Self {
        Self {
            id,
            email: email.to_string(),
            full_name: "Test User".to_string(),
            role,
        }
    }

    pub fn admin(email: &str) -> Self {
        Self::new(1, email, Role::Admin)
    }

    pub fn medecin(email: &str) -> Self {
        Self::new(2, email, Role::Medecin)
    }

    pub fn secretaire(email: &str) -> Self {
        Self::new(3, email, Role::Secretaire)
    }

    pub fn to_current_user(&self) -> CurrentUser {
        CurrentUser {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
        }
    }
}

pub struct SessionTestUtils;

impl SessionTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, ttl_minutes: i64) -> String {
        let claims = new_claims(&user.to_current_user(), Utc::now(), ttl_minutes);
        issue_session_token(&claims, secret).expect("test secret is set")
    }

    /// Token issued `age_minutes` ago with the default 30 minute lifetime.
    pub fn create_aged_token(user: &TestUser, secret: &str, age_minutes: i64) -> String {
        let issued = Utc::now() - Duration::minutes(age_minutes);
        let claims = new_claims(&user.to_current_user(), issued, 30);
        issue_session_token(&claims, secret).expect("test secret is set")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_aged_token(user, secret, 31)
    }

    /// Value for a `Cookie` request header.
    pub fn cookie_header(user: &TestUser, secret: &str) -> String {
        format!("{}={}", SESSION_COOKIE, Self::create_test_token(user, secret, 30))
    }
}

/// Row fixtures shaped like PostgREST answers.
pub struct MockPostgrest;

impl MockPostgrest {
    pub fn content_range(total: i64) -> String {
        if total == 0 {
            "*/0".to_string()
        } else {
            format!("0-{}/{}", total - 1, total)
        }
    }

    pub fn employer_row(id: i64, email: &str, role: Role, password_hash: &str) -> Value {
        json!({
            "id": id,
            "last_name": "Tazi",
            "first_name": "Youssef",
            "email": email,
            "password_hash": password_hash,
            "role": role.as_str(),
            "job_title": null,
            "phone": null,
            "address": null
        })
    }

    pub fn patient_row(id: i64, last_name: &str, first_name: &str) -> Value {
        json!({
            "id": id,
            "last_name": last_name,
            "first_name": first_name,
            "cin": "AB123456",
            "email": null,
            "phone": "0612345678",
            "birth_date": "1985-04-12",
            "sex": "F",
            "address": null,
            "created_at": "2026-01-05T09:00:00Z",
            "updated_at": "2026-01-05T09:00:00Z"
        })
    }

    pub fn service_row(id: i64, name: &str, price: f64) -> Value {
        json!({
            "id": id,
            "name": name,
            "price": price,
            "notes": null,
            "created_at": "2026-01-01T08:00:00Z",
            "updated_at": "2026-01-01T08:00:00Z"
        })
    }

    pub fn stock_row(id: i64, name: &str, quantity: i32, alarm: i32) -> Value {
        json!({
            "id": id,
            "name": name,
            "notes": null,
            "quantity": quantity,
            "alarm": alarm,
            "category_id": 1,
            "created_at": "2026-01-01T08:00:00Z",
            "updated_at": "2026-01-01T08:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code,
            "details": null,
            "hint": null
        })
    }
}
