use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::error::AppError;
use shared_models::validation::FieldErrors;
use shared_utils::form::trimmed_string;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default, deserialize_with = "trimmed_string")]
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub return_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginQuery {
    #[serde(default, deserialize_with = "trimmed_string")]
    pub return_url: Option<String>,
}

/// The columns login needs from `employers`.
#[derive(Debug, Clone, Deserialize)]
pub struct EmployerCredentials {
    pub id: i64,
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

impl EmployerCredentials {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Too many failed attempts. Try again in {minutes} minute(s).")]
    LockedOut { minutes: i64 },

    #[error("Account has no valid role")]
    InvalidRole,

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Session error: {0}")]
    Session(String),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::Auth(err.to_string()),
            AuthError::LockedOut { .. } => AppError::Locked(err.to_string()),
            AuthError::InvalidRole => AppError::Forbidden(err.to_string()),
            AuthError::Validation(fields) => AppError::Validation(fields),
            AuthError::Session(msg) => AppError::Internal(msg),
            AuthError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
