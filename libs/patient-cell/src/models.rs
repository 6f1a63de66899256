use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_models::validation::FieldErrors;
use shared_utils::form::{empty_string_as_none, optional_date, trimmed_string};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub cin: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub sex: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// "Last First", the way patients are listed at the desk.
    pub fn full_name(&self) -> String {
        full_name(self.last_name.as_deref(), self.first_name.as_deref())
    }

    /// Difference in calendar years, without the birthday adjustment.
    pub fn age_in_years(&self, today: NaiveDate) -> Option<i32> {
        self.birth_date.map(|birth| today.year() - birth.year())
    }
}

pub fn full_name(last_name: Option<&str>, first_name: Option<&str>) -> String {
    [last_name, first_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientForm {
    #[serde(default, deserialize_with = "trimmed_string")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub cin: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "optional_date")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub sex: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub address: Option<String>,
}

impl PatientForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.max_len("last_name", self.last_name.as_deref(), 255);
        errors.max_len("first_name", self.first_name.as_deref(), 255);
        errors.max_len("cin", self.cin.as_deref(), 50);
        errors.max_len("email", self.email.as_deref(), 100);
        errors.email("email", self.email.as_deref());
        errors.max_len("phone", self.phone.as_deref(), 20);
        errors.max_len("sex", self.sex.as_deref(), 10);
        errors.max_len("address", self.address.as_deref(), 255);
        errors.into_result()
    }

    pub fn to_row(&self) -> Value {
        json!({
            "last_name": self.last_name,
            "first_name": self.first_name,
            "cin": self.cin,
            "email": self.email,
            "phone": self.phone,
            "birth_date": self.birth_date,
            "sex": self.sex,
            "address": self.address,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientSearchQuery {
    #[serde(default, deserialize_with = "trimmed_string")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<i64>,
}

/// One line of a patient's consultation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationSummary {
    pub id: i64,
    pub consultation_date: Option<NaiveDateTime>,
    pub service_name: Option<String>,
    pub state: Option<String>,
    pub price: Option<f64>,
    pub discount: Option<f64>,
    pub diagnosis: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescribedMedicament {
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub dosage_unit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionLine {
    pub medicament_id: i64,
    pub posology: Option<String>,
    pub medicament: Option<PrescribedMedicament>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: i64,
    pub prescribed_at: NaiveDateTime,
    #[serde(default)]
    pub lines: Vec<PrescriptionLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientDetail {
    pub patient: Patient,
    pub consultations: Vec<ConsultationSummary>,
    pub prescriptions: Vec<Prescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientOption {
    pub id: i64,
    pub label: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("This patient has consultations or prescriptions and cannot be deleted")]
    HasHistory,

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppError::NotFound(err.to_string()),
            PatientError::HasHistory => AppError::Conflict(err.to_string()),
            PatientError::Validation(fields) => AppError::Validation(fields),
            PatientError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_skips_blank_parts() {
        assert_eq!(full_name(Some("Alaoui"), Some("Nadia")), "Alaoui Nadia");
        assert_eq!(full_name(None, Some("Nadia")), "Nadia");
        assert_eq!(full_name(Some(" "), None), "");
    }

    #[test]
    fn lengths_and_email_are_checked() {
        let form = PatientForm {
            cin: Some("X".repeat(51)),
            email: Some("nadia@".into()),
            ..Default::default()
        };
        let errors = form.validate().unwrap_err();

        assert_eq!(errors.get("cin").unwrap()[0], "Must be at most 50 characters");
        assert_eq!(errors.get("email").unwrap()[0], "Invalid email format");
    }

    #[test]
    fn empty_form_is_accepted() {
        assert!(PatientForm::default().validate().is_ok());
    }

    #[test]
    fn age_is_a_year_difference() {
        let patient: Patient = serde_json::from_value(json!({
            "id": 1,
            "last_name": "Alaoui",
            "first_name": "Nadia",
            "cin": null,
            "email": null,
            "phone": null,
            "birth_date": "1990-12-31",
            "sex": "F",
            "address": null,
            "created_at": "2026-01-05T09:00:00+00:00",
            "updated_at": "2026-01-05T09:00:00+00:00"
        }))
        .unwrap();

        let today = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        assert_eq!(patient.age_in_years(today), Some(36));
    }
}
