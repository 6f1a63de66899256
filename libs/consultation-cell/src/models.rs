use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use catalog_cell::{CabinetInfo, CatalogError, MedicamentOption, ServiceOption};
use patient_cell::{Patient, PatientError, PatientOption};
use shared_models::error::AppError;
use shared_models::pagination::DEFAULT_PAGE_SIZE;
use shared_models::validation::FieldErrors;
use shared_utils::form::{checkbox, empty_string_as_none, optional_date, optional_datetime, trimmed_string};

/// Rows per page when "show all" is ticked.
pub const SHOW_ALL_PAGE_SIZE: i64 = 200;

// ==============================================================================
// WORKFLOW STATE
// ==============================================================================

/// Reception -> Visite -> Terminer. Declaration order is workflow order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConsultationState {
    #[default]
    Reception,
    Visite,
    Terminer,
}

impl ConsultationState {
    pub const ALL: [ConsultationState; 3] = [Self::Reception, Self::Visite, Self::Terminer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reception => "Reception",
            Self::Visite => "Visite",
            Self::Terminer => "Terminer",
        }
    }

    /// Staying put or moving forward is allowed; going back is not.
    pub fn can_move_to(&self, next: ConsultationState) -> bool {
        next >= *self
    }

    /// Still in the waiting room or with the doctor.
    pub fn is_waiting(&self) -> bool {
        matches!(self, Self::Reception | Self::Visite)
    }
}

impl fmt::Display for ConsultationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsultationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown state: {}", s))
    }
}

// ==============================================================================
// CONSULTATION ROWS
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub glycemia: Option<String>,
    pub blood_pressure: Option<String>,
    pub weight: Option<String>,
    pub height: Option<String>,
    pub spo2: Option<String>,
    pub bmi: Option<String>,
    pub temperature: Option<String>,
    pub fvc: Option<String>,
    pub fev: Option<String>,
    pub ldl: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    pub id: i64,
    pub patient_id: Option<i64>,
    pub service_id: Option<i64>,
    pub service_name: Option<String>,
    pub price: Option<f64>,
    pub discount: Option<f64>,
    pub signs: Option<String>,
    pub diagnosis: Option<String>,
    pub plan: Option<String>,
    #[serde(flatten)]
    pub vitals: Vitals,
    pub consultation_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub state: ConsultationState,
    #[serde(default)]
    pub insurance_form_filled: bool,
    pub sick_leave_start: Option<NaiveDate>,
    pub sick_leave_end: Option<NaiveDate>,
    pub sick_leave_days: Option<i32>,
    pub sick_leave_reason: Option<String>,
    pub fit_for_work: Option<bool>,
    pub certificate_observation: Option<String>,
    pub payment_method: Option<String>,
    pub payment_date: Option<NaiveDateTime>,
    pub receipt_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Consultation {
    /// Price minus discount; missing amounts count as zero.
    pub fn net_amount(&self) -> f64 {
        net_amount(self.price, self.discount)
    }

    pub fn consultation_day(&self) -> Option<NaiveDate> {
        self.consultation_date.map(|at| at.date())
    }
}

pub fn net_amount(price: Option<f64>, discount: Option<f64>) -> f64 {
    price.unwrap_or_default() - discount.unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRef {
    pub id: i64,
    pub last_name: Option<String>,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRef {
    pub id: i64,
    pub name: Option<String>,
}

/// Listing row with the embedded patient and service names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationListItem {
    #[serde(flatten)]
    pub consultation: Consultation,
    pub patient: Option<PatientRef>,
    pub service: Option<ServiceRef>,
}

pub const LIST_SELECT: &str =
    "*,patient:patients(id,last_name,first_name),service:services(id,name)";

// ==============================================================================
// LISTING FILTERS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsultationFilter {
    #[serde(default, deserialize_with = "trimmed_string")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub service_id: Option<i64>,
    #[serde(default, deserialize_with = "checkbox")]
    pub show_all: bool,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<i64>,
}

impl ConsultationFilter {
    pub fn page_size(&self) -> i64 {
        if self.show_all {
            SHOW_ALL_PAGE_SIZE
        } else {
            DEFAULT_PAGE_SIZE
        }
    }

    /// The day the listing is restricted to: the requested one, or today when
    /// nothing else narrows the listing.
    pub fn effective_day(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self.date {
            Some(day) => Some(day),
            None if !self.show_all && self.search.is_none() && self.service_id.is_none() => {
                Some(today)
            }
            None => None,
        }
    }
}

// ==============================================================================
// CREATE
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewConsultationForm {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub patient_id: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub service_id: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub discount: Option<f64>,
    #[serde(default, deserialize_with = "optional_datetime")]
    pub consultation_date: Option<NaiveDateTime>,
}

impl NewConsultationForm {
    pub fn validate(&self) -> Result<(i64, i64), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.patient_id.is_none() {
            errors.add("patient_id", "Select a patient");
        }
        if self.service_id.is_none() {
            errors.add("service_id", "Select a service");
        }
        if self.price.is_some_and(|p| p < 0.0) {
            errors.add("price", "Price cannot be negative");
        }
        if self.discount.is_some_and(|d| d < 0.0) {
            errors.add("discount", "Discount cannot be negative");
        }

        match (self.patient_id, self.service_id) {
            (Some(patient_id), Some(service_id)) if errors.is_empty() => Ok((patient_id, service_id)),
            _ => Err(errors),
        }
    }
}

/// Non-negative amounts and a discount no larger than the price.
pub fn check_amounts(errors: &mut FieldErrors, price: Option<f64>, discount: Option<f64>) {
    if price.is_some_and(|p| p < 0.0) {
        errors.add("price", "Price cannot be negative");
    }
    if discount.is_some_and(|d| d < 0.0) {
        errors.add("discount", "Discount cannot be negative");
    }
    if discount.unwrap_or_default() > price.unwrap_or_default() {
        errors.add("discount", "Discount cannot exceed the price");
    }
}

/// Defaults for `GET /consultations/new`.
#[derive(Debug, Clone, Serialize)]
pub struct NewConsultationView {
    pub consultation_date: NaiveDateTime,
    pub patients: Vec<PatientOption>,
    pub services: Vec<ServiceOption>,
}

// ==============================================================================
// UPDATE
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsultationUpdateForm {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub service_id: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub discount: Option<f64>,
    #[serde(default, deserialize_with = "optional_datetime")]
    pub consultation_date: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub state: Option<String>,

    #[serde(default, deserialize_with = "trimmed_string")]
    pub signs: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub diagnosis: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub plan: Option<String>,

    #[serde(default, deserialize_with = "trimmed_string")]
    pub glycemia: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub blood_pressure: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub weight: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub height: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub spo2: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub bmi: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub temperature: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub fvc: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub fev: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub ldl: Option<String>,

    #[serde(default, deserialize_with = "checkbox")]
    pub insurance_form_filled: bool,
    #[serde(default, deserialize_with = "optional_date")]
    pub sick_leave_start: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_date")]
    pub sick_leave_end: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub sick_leave_days: Option<i32>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub sick_leave_reason: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub fit_for_work: Option<bool>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub certificate_observation: Option<String>,

    #[serde(default, deserialize_with = "trimmed_string")]
    pub payment_method: Option<String>,
    #[serde(default, deserialize_with = "optional_datetime")]
    pub payment_date: Option<NaiveDateTime>,

    #[serde(default, rename = "med_ids[]")]
    pub med_ids: Vec<String>,
    #[serde(default, rename = "posologies[]")]
    pub posologies: Vec<String>,
}

/// A prescription line as posted with the consultation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrescriptionLineInput {
    pub medicament_id: i64,
    pub posology: Option<String>,
}

/// Update values derived from the form and the stored consultation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedUpdate {
    pub state: ConsultationState,
    pub price: Option<f64>,
    pub discount: Option<f64>,
    pub consultation_date: Option<NaiveDateTime>,
    pub sick_leave_days: Option<i32>,
    pub lines: Vec<PrescriptionLineInput>,
}

impl ConsultationUpdateForm {
    pub fn resolve(&self, current: &Consultation) -> Result<ResolvedUpdate, FieldErrors> {
        let mut errors = FieldErrors::new();

        let state = match self.state.as_deref() {
            None => current.state,
            Some(raw) => match raw.parse::<ConsultationState>() {
                Ok(next) if current.state.can_move_to(next) => next,
                Ok(next) => {
                    errors.add(
                        "state",
                        format!("State cannot move back from {} to {}", current.state, next),
                    );
                    current.state
                }
                Err(_) => {
                    errors.add("state", "Select a valid state");
                    current.state
                }
            },
        };

        let price = self.price.or(current.price);
        let discount = self.discount;
        check_amounts(&mut errors, price, discount);

        errors.max_len("signs", self.signs.as_deref(), 250);
        errors.max_len("diagnosis", self.diagnosis.as_deref(), 250);
        errors.max_len("plan", self.plan.as_deref(), 250);
        errors.max_len("sick_leave_reason", self.sick_leave_reason.as_deref(), 500);
        errors.max_len("certificate_observation", self.certificate_observation.as_deref(), 500);
        errors.max_len("payment_method", self.payment_method.as_deref(), 50);

        let sick_leave_days = match (self.sick_leave_start, self.sick_leave_end) {
            (Some(start), Some(end)) if end < start => {
                errors.add("sick_leave_end", "End date must be on or after the start date");
                None
            }
            (Some(start), Some(end)) => Some(inclusive_days(start, end)),
            _ => self.sick_leave_days,
        };
        if sick_leave_days.is_some_and(|days| days < 0) {
            errors.add("sick_leave_days", "Days cannot be negative");
        }

        let consultation_date = self.consultation_date.or(current.consultation_date);
        let lines = self.prescription_lines(&mut errors);
        if !lines.is_empty() && (current.patient_id.is_none() || consultation_date.is_none()) {
            errors.add(
                "med_ids[]",
                "A prescription needs a patient and a consultation date",
            );
        }

        errors.into_result()?;
        Ok(ResolvedUpdate {
            state,
            price,
            discount,
            consultation_date,
            sick_leave_days,
            lines,
        })
    }

    /// Posted medicament ids zipped with their posologies; blank ids are skipped.
    fn prescription_lines(&self, errors: &mut FieldErrors) -> Vec<PrescriptionLineInput> {
        let mut seen = HashSet::new();
        let mut lines = Vec::new();

        for (raw_id, posology) in self.med_ids.iter().zip(self.posologies.iter()) {
            let raw_id = raw_id.trim();
            if raw_id.is_empty() {
                continue;
            }
            let Ok(medicament_id) = raw_id.parse::<i64>() else {
                errors.add("med_ids[]", format!("Invalid medicament: {}", raw_id));
                continue;
            };
            if !seen.insert(medicament_id) {
                errors.add("med_ids[]", "Each medicament can only be prescribed once");
                continue;
            }

            let posology = posology.trim();
            errors.max_len("posologies[]", Some(posology), 255);
            lines.push(PrescriptionLineInput {
                medicament_id,
                posology: (!posology.is_empty()).then(|| posology.to_string()),
            });
        }

        lines
    }

    pub fn to_row(&self, resolved: &ResolvedUpdate) -> Value {
        json!({
            "price": resolved.price,
            "discount": resolved.discount,
            "consultation_date": resolved.consultation_date,
            "state": resolved.state,
            "signs": self.signs,
            "diagnosis": self.diagnosis,
            "plan": self.plan,
            "glycemia": self.glycemia,
            "blood_pressure": self.blood_pressure,
            "weight": self.weight,
            "height": self.height,
            "spo2": self.spo2,
            "bmi": self.bmi,
            "temperature": self.temperature,
            "fvc": self.fvc,
            "fev": self.fev,
            "ldl": self.ldl,
            "insurance_form_filled": self.insurance_form_filled,
            "sick_leave_start": self.sick_leave_start,
            "sick_leave_end": self.sick_leave_end,
            "sick_leave_days": resolved.sick_leave_days,
            "sick_leave_reason": self.sick_leave_reason,
            "fit_for_work": self.fit_for_work,
            "certificate_observation": self.certificate_observation,
            "payment_method": self.payment_method,
            "payment_date": self.payment_date,
        })
    }
}

/// Both ends count: Monday to Wednesday is three days.
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i32 {
    i32::try_from((end - start).num_days() + 1).unwrap_or(i32::MAX)
}

// ==============================================================================
// PRESCRIPTIONS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ordonnance {
    pub id: i64,
    pub patient_id: i64,
    pub prescribed_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicamentRef {
    pub code: Option<String>,
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub dosage_unit: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrescriptionLineRow {
    pub medicament_id: i64,
    pub posology: Option<String>,
    pub medicament: Option<MedicamentRef>,
}

pub const LINE_SELECT: &str =
    "medicament_id,posology,medicament:medicaments(code,name,dosage,dosage_unit)";

/// Prescription line with the medicament details printed on the ordonnance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrescriptionItem {
    pub medicament_id: i64,
    pub code: Option<String>,
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub dosage_unit: Option<String>,
    pub posology: Option<String>,
}

impl From<PrescriptionLineRow> for PrescriptionItem {
    fn from(row: PrescriptionLineRow) -> Self {
        let medicament = row.medicament.unwrap_or_default();
        Self {
            medicament_id: row.medicament_id,
            code: medicament.code,
            name: medicament.name,
            dosage: medicament.dosage,
            dosage_unit: medicament.dosage_unit,
            posology: row.posology,
        }
    }
}

// ==============================================================================
// VIEW MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ConsultationEditView {
    pub consultation: Consultation,
    pub patient: Option<Patient>,
    pub history: Vec<Consultation>,
    pub medicaments: Vec<MedicamentOption>,
    pub services: Vec<ServiceOption>,
    pub states: Vec<&'static str>,
    pub prescriptions: Vec<PrescriptionItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsultationHistoryView {
    pub consultation: Consultation,
    pub prescriptions: Vec<PrescriptionItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrintView {
    pub cabinet: CabinetInfo,
    pub consultation: Consultation,
    pub patient: Option<Patient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescriptions: Option<Vec<PrescriptionItem>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptView {
    pub cabinet: CabinetInfo,
    pub consultation: Consultation,
    pub patient: Option<Patient>,
    pub receipt_number: String,
    pub net_amount: f64,
}

/// `YYYYMM-` of the month of issue followed by the zero-padded consultation id.
pub fn receipt_number(issued_at: NaiveDateTime, consultation_id: i64) -> String {
    format!("{}-{:06}", issued_at.format("%Y%m"), consultation_id)
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConsultationError {
    #[error("Consultation not found")]
    NotFound,

    #[error("{0}")]
    Duplicate(String),

    #[error("This consultation has a prescription and cannot be deleted")]
    HasPrescription,

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Patient(#[from] PatientError),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl ConsultationError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }
}

impl From<ConsultationError> for AppError {
    fn from(err: ConsultationError) -> Self {
        match err {
            ConsultationError::NotFound => AppError::NotFound(err.to_string()),
            ConsultationError::Duplicate(msg) => AppError::Conflict(msg),
            ConsultationError::HasPrescription => AppError::Conflict(err.to_string()),
            ConsultationError::Validation(fields) => AppError::Validation(fields),
            ConsultationError::Catalog(e) => e.into(),
            ConsultationError::Patient(e) => e.into(),
            ConsultationError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
