use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::tables::{ORDONNANCES, ORDONNANCE_MEDICAMENTS};
use shared_database::{Query, SupabaseClient};

use crate::models::{
    ConsultationError, Ordonnance, PrescriptionItem, PrescriptionLineInput, PrescriptionLineRow,
    LINE_SELECT,
};

/// Ordonnances are keyed by patient and calendar day: one per visit day.
pub struct PrescriptionService {
    supabase: SupabaseClient,
}

impl PrescriptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn find_for_day(
        &self,
        patient_id: i64,
        day: NaiveDate,
    ) -> Result<Option<Ordonnance>, ConsultationError> {
        let query = Query::table(&ORDONNANCES)
            .select("id,patient_id,prescribed_at")
            .eq("patient_id", patient_id)
            .on_day("prescribed_at", day)
            .order("id.asc");
        Ok(self.supabase.select_one(&query).await?)
    }

    pub async fn exists_for_day(&self, patient_id: i64, day: NaiveDate) -> Result<bool, ConsultationError> {
        let query = Query::table(&ORDONNANCES)
            .eq("patient_id", patient_id)
            .on_day("prescribed_at", day);
        Ok(self.supabase.exists(&query).await?)
    }

    pub async fn lines(&self, ordonnance_id: i64) -> Result<Vec<PrescriptionItem>, ConsultationError> {
        let query = Query::table(&ORDONNANCE_MEDICAMENTS)
            .select(LINE_SELECT)
            .eq("ordonnance_id", ordonnance_id);
        let rows: Vec<PrescriptionLineRow> = self.supabase.select(&query).await?;
        Ok(rows.into_iter().map(PrescriptionItem::from).collect())
    }

    /// Lines of the patient's ordonnance for that day; empty when there is none.
    pub async fn lines_for_day(
        &self,
        patient_id: Option<i64>,
        at: Option<NaiveDateTime>,
    ) -> Result<Vec<PrescriptionItem>, ConsultationError> {
        let (Some(patient_id), Some(at)) = (patient_id, at) else {
            return Ok(Vec::new());
        };

        match self.find_for_day(patient_id, at.date()).await? {
            Some(ordonnance) => self.lines(ordonnance.id).await,
            None => Ok(Vec::new()),
        }
    }

    /// Creates the day's ordonnance when needed, then swaps its lines for `lines`.
    pub async fn replace_lines(
        &self,
        patient_id: i64,
        at: NaiveDateTime,
        lines: &[PrescriptionLineInput],
    ) -> Result<Ordonnance, ConsultationError> {
        let ordonnance = match self.find_for_day(patient_id, at.date()).await? {
            Some(existing) => {
                debug!("Replacing lines of ordonnance {}", existing.id);
                self.supabase
                    .delete(&Query::table(&ORDONNANCE_MEDICAMENTS).eq("ordonnance_id", existing.id))
                    .await?;
                existing
            }
            None => {
                let created: Ordonnance = self
                    .supabase
                    .insert_one(
                        &ORDONNANCES,
                        json!({ "patient_id": patient_id, "prescribed_at": at }),
                    )
                    .await?;
                info!("Ordonnance {} opened for patient {}", created.id, patient_id);
                created
            }
        };

        if !lines.is_empty() {
            let rows: Vec<Value> = lines
                .iter()
                .map(|line| {
                    json!({
                        "ordonnance_id": ordonnance.id,
                        "medicament_id": line.medicament_id,
                        "posology": line.posology,
                    })
                })
                .collect();
            let _: Vec<Value> = self
                .supabase
                .insert(&ORDONNANCE_MEDICAMENTS, Value::Array(rows))
                .await?;
        }

        info!("Ordonnance {} now has {} line(s)", ordonnance.id, lines.len());
        Ok(ordonnance)
    }
}
