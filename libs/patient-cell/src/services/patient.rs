use serde::Deserialize;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::tables::{CONSULTATIONS, ORDONNANCES, PATIENTS};
use shared_database::{Query, SupabaseClient};
use shared_models::pagination::{Page, Pagination, DEFAULT_PAGE_SIZE};

use crate::models::{
    full_name, ConsultationSummary, Patient, PatientDetail, PatientError, PatientForm,
    PatientOption, PatientSearchQuery, Prescription,
};

const SEARCH_COLUMNS: [&str; 3] = ["last_name", "first_name", "cin"];

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn search_patients(
        &self,
        query: &PatientSearchQuery,
    ) -> Result<Page<Patient>, PatientError> {
        debug!("Searching patients with query: {:?}", query);

        let mut filter = Query::table(&PATIENTS);
        if let Some(term) = query.search.as_deref() {
            filter = filter.search(&SEARCH_COLUMNS, term);
        }

        let total = self.supabase.count(&filter).await?;
        let pagination = Pagination::new(query.page, DEFAULT_PAGE_SIZE, total);

        let rows: Vec<Patient> = self
            .supabase
            .select(
                &filter
                    .select("*")
                    .order("id.desc")
                    .limit(pagination.page_size)
                    .offset(pagination.offset()),
            )
            .await?;

        Ok(Page::new(rows, pagination))
    }

    pub async fn get_patient(&self, id: i64) -> Result<Patient, PatientError> {
        debug!("Fetching patient {}", id);

        self.supabase
            .select_one(&Query::table(&PATIENTS).select("*").eq("id", id))
            .await?
            .ok_or(PatientError::NotFound)
    }

    pub async fn patient_detail(&self, id: i64) -> Result<PatientDetail, PatientError> {
        let patient = self.get_patient(id).await?;

        let consultations: Vec<ConsultationSummary> = self
            .supabase
            .select(
                &Query::table(&CONSULTATIONS)
                    .select("id,consultation_date,service_name,state,price,discount,diagnosis")
                    .eq("patient_id", id)
                    .order("consultation_date.desc.nullslast,id.desc"),
            )
            .await?;

        let prescriptions: Vec<Prescription> = self
            .supabase
            .select(
                &Query::table(&ORDONNANCES)
                    .select(
                        "id,prescribed_at,lines:ordonnance_medicaments(medicament_id,posology,\
                         medicament:medicaments(name,dosage,dosage_unit))",
                    )
                    .eq("patient_id", id)
                    .order("prescribed_at.desc"),
            )
            .await?;

        Ok(PatientDetail {
            patient,
            consultations,
            prescriptions,
        })
    }

    pub async fn create_patient(&self, form: &PatientForm) -> Result<Patient, PatientError> {
        form.validate().map_err(PatientError::Validation)?;

        let patient: Patient = self.supabase.insert_one(&PATIENTS, form.to_row()).await?;
        info!("Patient {} created", patient.id);
        Ok(patient)
    }

    pub async fn update_patient(&self, id: i64, form: &PatientForm) -> Result<Patient, PatientError> {
        form.validate().map_err(PatientError::Validation)?;

        let updated: Vec<Patient> = self
            .supabase
            .update(&Query::table(&PATIENTS).eq("id", id), form.to_row())
            .await?;

        let patient = updated.into_iter().next().ok_or(PatientError::NotFound)?;
        info!("Patient {} updated", id);
        Ok(patient)
    }

    pub async fn delete_patient(&self, id: i64) -> Result<(), PatientError> {
        self.get_patient(id).await?;

        let has_consultations = self
            .supabase
            .exists(&Query::table(&CONSULTATIONS).eq("patient_id", id))
            .await?;
        let has_prescriptions = self
            .supabase
            .exists(&Query::table(&ORDONNANCES).eq("patient_id", id))
            .await?;

        if has_consultations || has_prescriptions {
            warn!("Refusing to delete patient {} with history", id);
            return Err(PatientError::HasHistory);
        }

        self.supabase
            .delete(&Query::table(&PATIENTS).eq("id", id))
            .await?;

        info!("Patient {} deleted", id);
        Ok(())
    }

    pub async fn patient_options(&self) -> Result<Vec<PatientOption>, PatientError> {
        #[derive(Deserialize)]
        struct Row {
            id: i64,
            last_name: Option<String>,
            first_name: Option<String>,
        }

        let rows: Vec<Row> = self
            .supabase
            .select_all(
                &Query::table(&PATIENTS)
                    .select("id,last_name,first_name")
                    .order("last_name.asc,first_name.asc,id.asc"),
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| PatientOption {
                id: row.id,
                label: full_name(row.last_name.as_deref(), row.first_name.as_deref()),
            })
            .collect())
    }
}
