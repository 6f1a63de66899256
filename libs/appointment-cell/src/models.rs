use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use catalog_cell::{CatalogError, ServiceOption};
use shared_models::error::AppError;
use shared_models::validation::FieldErrors;
use shared_utils::form::{optional_date, optional_datetime, trimmed_string, truncate_to_minute};

/// Moroccan mobile and landline numbers: `05`, `06` or `07` followed by eight digits.
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0[5-7]\d{8}$").expect("phone pattern compiles"));

pub const NAME_MAX: usize = 25;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rendezvous {
    pub id: i64,
    pub last_name: String,
    pub first_name: String,
    pub scheduled_at: NaiveDateTime,
    pub service: String,
    pub sex: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RendezvousForm {
    #[serde(default, deserialize_with = "trimmed_string")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "optional_datetime")]
    pub scheduled_at: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub service: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub sex: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub phone: Option<String>,
}

/// A form that passed field validation, with the time truncated to the minute.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRendezvous {
    pub last_name: String,
    pub first_name: String,
    pub scheduled_at: NaiveDateTime,
    pub service: String,
    pub sex: Option<String>,
    pub phone: Option<String>,
}

impl RendezvousForm {
    pub fn validate(&self) -> Result<ValidRendezvous, FieldErrors> {
        let mut errors = FieldErrors::new();

        errors.require("last_name", self.last_name.as_deref(), "Last name is required");
        errors.max_len("last_name", self.last_name.as_deref(), NAME_MAX);
        errors.require("first_name", self.first_name.as_deref(), "First name is required");
        errors.max_len("first_name", self.first_name.as_deref(), NAME_MAX);
        errors.require("service", self.service.as_deref(), "Service is required");
        errors.max_len("service", self.service.as_deref(), NAME_MAX);
        if self.scheduled_at.is_none() {
            errors.add("scheduled_at", "Date and time are required");
        }
        errors.max_len("sex", self.sex.as_deref(), 10);
        if let Some(phone) = self.phone.as_deref() {
            if !PHONE_PATTERN.is_match(phone) {
                errors.add("phone", "Invalid phone format (e.g. 0612345678)");
            }
        }

        match (
            &self.last_name,
            &self.first_name,
            self.scheduled_at,
            &self.service,
        ) {
            (Some(last), Some(first), Some(at), Some(service)) if errors.is_empty() => {
                Ok(ValidRendezvous {
                    last_name: last.clone(),
                    first_name: first.clone(),
                    scheduled_at: truncate_to_minute(at),
                    service: service.clone(),
                    sex: self.sex.clone(),
                    phone: self.phone.clone(),
                })
            }
            _ => Err(errors),
        }
    }
}

impl ValidRendezvous {
    pub fn to_row(&self) -> Value {
        json!({
            "last_name": self.last_name,
            "first_name": self.first_name,
            "scheduled_at": self.scheduled_at,
            "service": self.service,
            "sex": self.sex,
            "phone": self.phone,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RendezvousQuery {
    #[serde(default, deserialize_with = "trimmed_string")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "optional_date")]
    pub date: Option<NaiveDate>,
}

/// Blank booking form shown by `GET /rendezvous/new`.
#[derive(Debug, Clone, Serialize)]
pub struct RendezvousDraft {
    pub last_name: String,
    pub first_name: String,
    pub scheduled_at: NaiveDateTime,
    pub service: String,
}

impl RendezvousDraft {
    pub fn starting_at(now: NaiveDateTime) -> Self {
        Self {
            last_name: String::new(),
            first_name: String::new(),
            scheduled_at: truncate_to_minute(now),
            service: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RendezvousEditor<T: Serialize> {
    pub rendezvous: T,
    pub services: Vec<ServiceOption>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::Validation(fields) => AppError::Validation(fields),
            AppointmentError::Catalog(e) => e.into(),
            AppointmentError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
