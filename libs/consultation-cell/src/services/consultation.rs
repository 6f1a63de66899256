use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use catalog_cell::{MedicamentService, ServiceCatalog};
use patient_cell::services::PatientService;
use patient_cell::{Patient, PatientError};
use shared_config::AppConfig;
use shared_database::query::ilike_clause;
use shared_database::tables::{CONSULTATIONS, PATIENTS};
use shared_database::{Query, SupabaseClient};
use shared_models::pagination::{Page, Pagination};
use shared_models::validation::FieldErrors;

use crate::models::{
    check_amounts, Consultation, ConsultationEditView, ConsultationError, ConsultationFilter,
    ConsultationHistoryView, ConsultationListItem, ConsultationState, ConsultationUpdateForm,
    NewConsultationForm, NewConsultationView, LIST_SELECT,
};
use crate::services::PrescriptionService;

pub struct ConsultationService {
    supabase: SupabaseClient,
    patients: PatientService,
    catalog: ServiceCatalog,
    medicaments: MedicamentService,
    prescriptions: PrescriptionService,
}

impl ConsultationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            patients: PatientService::new(config),
            catalog: ServiceCatalog::new(config),
            medicaments: MedicamentService::new(config),
            prescriptions: PrescriptionService::new(config),
        }
    }

    pub async fn list(
        &self,
        filter: &ConsultationFilter,
        today: NaiveDate,
    ) -> Result<Page<ConsultationListItem>, ConsultationError> {
        debug!("Listing consultations with {:?}", filter);

        let mut query = Query::table(&CONSULTATIONS);
        if let Some(term) = filter.search.as_deref() {
            query = query.or(self.search_clauses(term).await?);
        }
        if let Some(day) = filter.effective_day(today) {
            query = query.on_day("consultation_date", day);
        }
        if let Some(service_id) = filter.service_id {
            query = query.eq("service_id", service_id);
        }

        let total = self.supabase.count(&query).await?;
        let pagination = Pagination::new(filter.page, filter.page_size(), total);

        let rows: Vec<ConsultationListItem> = self
            .supabase
            .select(
                &query
                    .select(LIST_SELECT)
                    .order("consultation_date.desc.nullslast,id.desc")
                    .limit(pagination.page_size)
                    .offset(pagination.offset()),
            )
            .await?;

        Ok(Page::new(rows, pagination))
    }

    /// Matches on the patient's names go through the patient ids, the
    /// workflow state is matched on the consultation itself.
    async fn search_clauses(&self, term: &str) -> Result<Vec<String>, ConsultationError> {
        #[derive(Deserialize)]
        struct IdRow {
            id: i64,
        }

        let matching: Vec<IdRow> = self
            .supabase
            .select_all(
                &Query::table(&PATIENTS)
                    .select("id")
                    .search(&["last_name", "first_name"], term)
                    .order("id.asc"),
            )
            .await?;

        let mut clauses = vec![ilike_clause("state", term)];
        if !matching.is_empty() {
            let ids: Vec<String> = matching.iter().map(|row| row.id.to_string()).collect();
            clauses.push(format!("patient_id.in.({})", ids.join(",")));
        }
        Ok(clauses)
    }

    pub async fn get(&self, id: i64) -> Result<Consultation, ConsultationError> {
        self.supabase
            .select_one(&Query::table(&CONSULTATIONS).select("*").eq("id", id))
            .await?
            .ok_or(ConsultationError::NotFound)
    }

    /// The consultation's patient; `None` when unset or since deleted.
    pub async fn patient_of(&self, consultation: &Consultation) -> Result<Option<Patient>, ConsultationError> {
        let Some(patient_id) = consultation.patient_id else {
            return Ok(None);
        };
        match self.patients.get_patient(patient_id).await {
            Ok(patient) => Ok(Some(patient)),
            Err(PatientError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn new_view(&self, now: NaiveDateTime) -> Result<NewConsultationView, ConsultationError> {
        Ok(NewConsultationView {
            consultation_date: shared_utils::form::truncate_to_minute(now),
            patients: self.patients.patient_options().await?,
            services: self.catalog.options().await?,
        })
    }

    #[instrument(skip(self, form), fields(patient_id = ?form.patient_id, service_id = ?form.service_id))]
    pub async fn create(
        &self,
        form: &NewConsultationForm,
        now: NaiveDateTime,
    ) -> Result<Consultation, ConsultationError> {
        let (patient_id, service_id) = form.validate().map_err(ConsultationError::Validation)?;

        match self.patients.get_patient(patient_id).await {
            Ok(_) => {}
            Err(PatientError::NotFound) => {
                return Err(ConsultationError::field("patient_id", "Patient not found"))
            }
            Err(e) => return Err(e.into()),
        }

        let service = self
            .catalog
            .find(service_id)
            .await?
            .ok_or_else(|| ConsultationError::field("service_id", "Service not found"))?;

        let price = form.price.or(service.price);
        let mut errors = FieldErrors::new();
        check_amounts(&mut errors, price, form.discount);
        errors.into_result().map_err(ConsultationError::Validation)?;

        let at = form.consultation_date.unwrap_or(now);
        let duplicate = self
            .supabase
            .exists(
                &Query::table(&CONSULTATIONS)
                    .eq("patient_id", patient_id)
                    .eq("service_id", service_id)
                    .on_day("consultation_date", at.date()),
            )
            .await?;
        if duplicate {
            warn!("Duplicate consultation for patient {} on {}", patient_id, at.date());
            return Err(ConsultationError::Duplicate(format!(
                "This patient already has a consultation for this service on {}",
                at.format("%d/%m/%Y")
            )));
        }

        let row = json!({
            "patient_id": patient_id,
            "service_id": service_id,
            "service_name": service.name,
            "price": price,
            "discount": form.discount,
            "consultation_date": at,
            "state": ConsultationState::Reception,
            "insurance_form_filled": false,
        });

        let consultation: Consultation = self.supabase.insert_one(&CONSULTATIONS, row).await?;
        info!("Consultation {} opened for patient {}", consultation.id, patient_id);
        Ok(consultation)
    }

    pub async fn edit_view(&self, id: i64) -> Result<ConsultationEditView, ConsultationError> {
        let consultation = self.get(id).await?;
        let patient = self.patient_of(&consultation).await?;

        let history = match consultation.patient_id {
            Some(patient_id) => {
                self.supabase
                    .select(
                        &Query::table(&CONSULTATIONS)
                            .select("*")
                            .eq("patient_id", patient_id)
                            .order("consultation_date.desc.nullslast,id.desc"),
                    )
                    .await?
            }
            None => Vec::new(),
        };

        let prescriptions = self
            .prescriptions
            .lines_for_day(consultation.patient_id, consultation.consultation_date)
            .await?;

        Ok(ConsultationEditView {
            patient,
            history,
            medicaments: self.medicaments.options().await?,
            services: self.catalog.options().await?,
            states: ConsultationState::ALL.iter().map(ConsultationState::as_str).collect(),
            prescriptions,
            consultation,
        })
    }

    #[instrument(skip(self, form))]
    pub async fn update(
        &self,
        id: i64,
        form: &ConsultationUpdateForm,
    ) -> Result<Consultation, ConsultationError> {
        let current = self.get(id).await?;

        let changed_service = match form.service_id.filter(|sid| Some(*sid) != current.service_id) {
            Some(service_id) => Some(
                self.catalog
                    .find(service_id)
                    .await?
                    .ok_or_else(|| ConsultationError::field("service_id", "Service not found"))?,
            ),
            None => None,
        };

        // A new service brings its own price unless one was typed in.
        let mut baseline = current.clone();
        if let Some(service) = &changed_service {
            baseline.price = service.price;
        }

        let resolved = form.resolve(&baseline).map_err(ConsultationError::Validation)?;

        let mut row = form.to_row(&resolved);
        if let Some(service) = &changed_service {
            row["service_id"] = Value::from(service.id);
            row["service_name"] = json!(service.name);
        }

        let updated: Vec<Consultation> = self
            .supabase
            .update(&Query::table(&CONSULTATIONS).eq("id", id), row)
            .await?;
        let consultation = updated.into_iter().next().ok_or(ConsultationError::NotFound)?;

        if !resolved.lines.is_empty() {
            if let (Some(patient_id), Some(at)) = (consultation.patient_id, resolved.consultation_date) {
                self.prescriptions
                    .replace_lines(patient_id, at, &resolved.lines)
                    .await?;
            }
        }

        info!(
            "Consultation {} updated (state {}, {} prescription line(s))",
            id,
            consultation.state,
            resolved.lines.len()
        );
        Ok(consultation)
    }

    pub async fn history(&self, id: i64) -> Result<ConsultationHistoryView, ConsultationError> {
        let consultation = self.get(id).await?;
        let prescriptions = self
            .prescriptions
            .lines_for_day(consultation.patient_id, consultation.consultation_date)
            .await?;

        Ok(ConsultationHistoryView {
            consultation,
            prescriptions,
        })
    }

    pub async fn delete(&self, id: i64) -> Result<(), ConsultationError> {
        let consultation = self.get(id).await?;

        if let (Some(patient_id), Some(day)) = (consultation.patient_id, consultation.consultation_day()) {
            if self.prescriptions.exists_for_day(patient_id, day).await? {
                warn!("Refusing to delete consultation {} with a prescription", id);
                return Err(ConsultationError::HasPrescription);
            }
        }

        self.supabase
            .delete(&Query::table(&CONSULTATIONS).eq("id", id))
            .await?;
        info!("Consultation {} deleted", id);
        Ok(())
    }
}
