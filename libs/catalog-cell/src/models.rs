use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_models::validation::FieldErrors;
use shared_utils::form::{empty_string_as_none, trimmed_string};

// ==============================================================================
// MEDICAL SERVICES (BILLABLE ACTS)
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceForm {
    #[serde(default, deserialize_with = "trimmed_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub notes: Option<String>,
}

impl ServiceForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.max_len("name", self.name.as_deref(), 100);
        errors.max_len("notes", self.notes.as_deref(), 250);
        if self.price.is_some_and(|price| price < 0.0 || !price.is_finite()) {
            errors.add("price", "Price cannot be negative");
        }
        errors.into_result()
    }

    pub fn to_row(&self) -> Value {
        json!({
            "name": self.name,
            "price": self.price.map(round_cents),
            "notes": self.notes,
        })
    }
}

/// Entry of a service drop-down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOption {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub label: String,
}

impl ServiceOption {
    pub fn new(id: i64, name: Option<String>, price: Option<f64>) -> Self {
        let name = name.unwrap_or_default();
        let price = price.unwrap_or_default();
        Self {
            id,
            label: format!("{} ({:.2} DH)", name, price),
            name,
            price,
        }
    }
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

// ==============================================================================
// MEDICATION CATALOGUE
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medicament {
    pub id: i64,
    pub code: Option<String>,
    pub name: Option<String>,
    pub dci: Option<String>,
    pub dosage: Option<String>,
    pub dosage_unit: Option<String>,
    pub form: Option<String>,
    pub presentation: Option<String>,
    pub ppv: Option<f64>,
    pub ph: Option<f64>,
    pub price_br: Option<f64>,
    pub princeps_generic: Option<String>,
    pub reimbursement_rate: Option<String>,
}

impl Medicament {
    /// `"<name> <dosage><unit>"`, as printed on prescriptions.
    pub fn display_name(&self) -> String {
        display_name(
            self.name.as_deref(),
            self.dosage.as_deref(),
            self.dosage_unit.as_deref(),
        )
    }
}

pub fn display_name(name: Option<&str>, dosage: Option<&str>, unit: Option<&str>) -> String {
    format!(
        "{} {}{}",
        name.unwrap_or_default(),
        dosage.unwrap_or_default(),
        unit.unwrap_or_default()
    )
    .trim()
    .to_string()
}

pub const MEDICAMENT_LIST_LIMIT: i64 = 50;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicamentForm {
    /// Only read on create; the catalogue id is assigned by hand.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub dci: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub dosage: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub dosage_unit: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub form: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub presentation: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub ppv: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub ph: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub price_br: Option<f64>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub princeps_generic: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub reimbursement_rate: Option<String>,
}

impl MedicamentForm {
    pub fn validate(&self, id_required: bool) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if id_required && self.id.is_none() {
            errors.add("id", "Id is required");
        }
        for (field, value) in [
            ("code", &self.code),
            ("name", &self.name),
            ("dci", &self.dci),
            ("dosage", &self.dosage),
            ("dosage_unit", &self.dosage_unit),
            ("form", &self.form),
            ("presentation", &self.presentation),
            ("princeps_generic", &self.princeps_generic),
            ("reimbursement_rate", &self.reimbursement_rate),
        ] {
            errors.max_len(field, value.as_deref(), 255);
        }
        errors.into_result()
    }

    pub fn to_row(&self) -> Value {
        json!({
            "code": self.code,
            "name": self.name,
            "dci": self.dci,
            "dosage": self.dosage,
            "dosage_unit": self.dosage_unit,
            "form": self.form,
            "presentation": self.presentation,
            "ppv": self.ppv,
            "ph": self.ph,
            "price_br": self.price_br,
            "princeps_generic": self.princeps_generic,
            "reimbursement_rate": self.reimbursement_rate,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicamentQuery {
    #[serde(default, deserialize_with = "trimmed_string")]
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicamentOption {
    pub id: i64,
    pub label: String,
}

// ==============================================================================
// CABINET LETTERHEAD
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CabinetInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub doctor_name: Option<String>,
    pub speciality: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl CabinetInfo {
    /// Letterhead used on printed documents before the cabinet is configured.
    pub fn placeholder() -> Self {
        Self {
            id: None,
            doctor_name: Some("Dr. [Nom]".to_string()),
            speciality: Some("[Spécialité]".to_string()),
            address: Some("[Adresse]".to_string()),
            phone: Some("[Téléphone]".to_string()),
            email: None,
        }
    }

    pub fn or_placeholder(info: Option<CabinetInfo>) -> Self {
        info.unwrap_or_else(Self::placeholder)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CabinetInfoForm {
    #[serde(default, deserialize_with = "trimmed_string")]
    pub doctor_name: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub speciality: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub email: Option<String>,
}

impl CabinetInfoForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.email("email", self.email.as_deref());
        errors.into_result()
    }

    pub fn to_row(&self) -> Value {
        json!({
            "doctor_name": self.doctor_name,
            "speciality": self.speciality,
            "address": self.address,
            "phone": self.phone,
            "email": self.email,
        })
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Service not found")]
    ServiceNotFound,

    #[error("Medicament not found")]
    MedicamentNotFound,

    #[error("{0}")]
    InUse(String),

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::ServiceNotFound | CatalogError::MedicamentNotFound => {
                AppError::NotFound(err.to_string())
            }
            CatalogError::InUse(msg) => AppError::Conflict(msg),
            CatalogError::Validation(fields) => AppError::Validation(fields),
            CatalogError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_option_label_shows_price_in_dirhams() {
        let option = ServiceOption::new(3, Some("Echographie".into()), Some(350.0));
        assert_eq!(option.label, "Echographie (350.00 DH)");

        let unnamed = ServiceOption::new(4, None, None);
        assert_eq!(unnamed.label, " (0.00 DH)");
    }

    #[test]
    fn negative_price_is_rejected() {
        let form = ServiceForm {
            name: Some("Consultation".into()),
            price: Some(-1.0),
            notes: None,
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.contains("price"));
    }

    #[test]
    fn service_row_rounds_to_cents() {
        let form = ServiceForm {
            name: Some("ECG".into()),
            price: Some(149.999),
            notes: None,
        };
        assert_eq!(form.to_row()["price"], 150.0);
    }

    #[test]
    fn display_name_joins_dosage_and_unit() {
        assert_eq!(display_name(Some("Doliprane"), Some("500"), Some("mg")), "Doliprane 500mg");
        assert_eq!(display_name(Some("Sérum"), None, None), "Sérum");
    }

    #[test]
    fn medicament_id_required_on_create_only() {
        let form = MedicamentForm {
            name: Some("Amoxil".into()),
            ..Default::default()
        };
        assert!(form.validate(true).unwrap_err().contains("id"));
        assert!(form.validate(false).is_ok());
    }

    #[test]
    fn placeholder_used_when_unconfigured() {
        let info = CabinetInfo::or_placeholder(None);
        assert_eq!(info.doctor_name.as_deref(), Some("Dr. [Nom]"));

        let configured = CabinetInfo {
            doctor_name: Some("Dr. Alami".into()),
            ..Default::default()
        };
        assert_eq!(CabinetInfo::or_placeholder(Some(configured.clone())), configured);
    }
}
