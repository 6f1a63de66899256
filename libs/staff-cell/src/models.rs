use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use auth_cell::PasswordError;
use shared_models::auth::Role;
use shared_models::error::AppError;
use shared_models::validation::FieldErrors;
use shared_utils::form::trimmed_string;

pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employer {
    pub id: i64,
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl Employer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }
}

/// Select-list entry, e.g. the "moved by" picker on stock movements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployerOption {
    pub id: i64,
    pub label: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployerForm {
    #[serde(default, deserialize_with = "trimmed_string")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub job_title: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub address: Option<String>,
}

impl EmployerForm {
    pub fn normalized_email(&self) -> String {
        self.email
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase()
    }

    pub fn changes_password(&self) -> bool {
        !self.password.trim().is_empty()
    }

    /// On edit the password is optional; a blank one keeps the stored hash.
    pub fn validate(&self, password_required: bool) -> Result<Role, FieldErrors> {
        let mut errors = FieldErrors::new();

        errors.require("last_name", self.last_name.as_deref(), "Last name is required");
        errors.require("first_name", self.first_name.as_deref(), "First name is required");
        errors.require("email", self.email.as_deref(), "Email is required");
        errors.email("email", self.email.as_deref());

        if password_required || self.changes_password() {
            validate_password(&mut errors, &self.password, &self.confirm_password);
        }

        let role = match self.role.as_deref().map(str::parse::<Role>) {
            Some(Ok(role)) => Some(role),
            Some(Err(_)) => {
                errors.add("role", "Select a valid role");
                None
            }
            None => {
                errors.add("role", "Select a role");
                None
            }
        };

        match role {
            Some(role) if errors.is_empty() => Ok(role),
            _ => Err(errors),
        }
    }

    /// Row body without the password column.
    pub fn to_row(&self, role: Role) -> Value {
        json!({
            "last_name": self.last_name,
            "first_name": self.first_name,
            "email": self.normalized_email(),
            "role": role.as_str(),
            "job_title": self.job_title,
            "phone": self.phone,
            "address": self.address,
        })
    }
}

fn validate_password(errors: &mut FieldErrors, password: &str, confirmation: &str) {
    if password.trim().is_empty() {
        errors.add("password", "Password is required");
        return;
    }

    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        errors.add(
            "password",
            format!(
                "Password must be between {} and {} characters",
                PASSWORD_MIN_LEN, PASSWORD_MAX_LEN
            ),
        );
    }

    if confirmation.is_empty() {
        errors.add("confirm_password", "Password confirmation is required");
    } else if password != confirmation {
        errors.add("confirm_password", "Passwords do not match");
    }
}

#[derive(Debug, Error)]
pub enum StaffError {
    #[error("Employee not found")]
    NotFound,

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("You cannot delete your own account")]
    SelfDelete,

    #[error("Employee is referenced by stock movements and cannot be deleted")]
    InUse,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl From<StaffError> for AppError {
    fn from(err: StaffError) -> Self {
        match err {
            StaffError::NotFound => AppError::NotFound(err.to_string()),
            StaffError::Validation(fields) => AppError::Validation(fields),
            StaffError::SelfDelete | StaffError::InUse => AppError::Conflict(err.to_string()),
            StaffError::Password(e) => AppError::field("password", e.to_string()),
            StaffError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn form() -> EmployerForm {
        EmployerForm {
            last_name: Some("Tazi".into()),
            first_name: Some("Youssef".into()),
            email: Some(" Y.Tazi@Cabinet.MA ".into()),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            role: Some("secretaire".into()),
            ..Default::default()
        }
    }

    #[test]
    fn complete_form_is_valid() {
        assert_matches!(form().validate(true), Ok(Role::Secretaire));
        assert_eq!(form().normalized_email(), "y.tazi@cabinet.ma");
    }

    #[test]
    fn password_rules_on_create() {
        let mut short = form();
        short.password = "abc".into();
        short.confirm_password = "abc".into();
        let errors = short.validate(true).unwrap_err();
        assert!(errors.contains("password"));

        let mut mismatch = form();
        mismatch.confirm_password = "secret2".into();
        let errors = mismatch.validate(true).unwrap_err();
        assert_eq!(errors.get("confirm_password").unwrap()[0], "Passwords do not match");
    }

    #[test]
    fn blank_password_is_fine_on_edit() {
        let mut edit = form();
        edit.password.clear();
        edit.confirm_password.clear();

        assert!(edit.validate(false).is_ok());
        assert!(edit.validate(true).unwrap_err().contains("password"));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let mut bad = form();
        bad.role = Some("Infirmier".into());
        assert_eq!(bad.validate(true).unwrap_err().get("role").unwrap()[0], "Select a valid role");
    }

    #[test]
    fn password_hash_is_never_serialised() {
        let employer = Employer {
            id: 1,
            last_name: "Tazi".into(),
            first_name: "Youssef".into(),
            email: "y@cabinet.ma".into(),
            password_hash: "PBKDF2$1$a$b".into(),
            role: "Admin".into(),
            job_title: None,
            phone: None,
            address: None,
        };
        let json = serde_json::to_value(&employer).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
