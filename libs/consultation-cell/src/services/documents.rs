use chrono::NaiveDateTime;
use serde_json::json;
use tracing::{debug, info};

use catalog_cell::CabinetService;
use shared_config::AppConfig;
use shared_database::tables::CONSULTATIONS;
use shared_database::{Query, SupabaseClient};

use crate::models::{receipt_number, Consultation, ConsultationError, PrintView, ReceiptView};
use crate::services::{ConsultationService, PrescriptionService};

/// Printable documents: ordonnance, sick-leave certificate and receipt.
pub struct DocumentService {
    supabase: SupabaseClient,
    consultations: ConsultationService,
    prescriptions: PrescriptionService,
    cabinet: CabinetService,
}

impl DocumentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            consultations: ConsultationService::new(config),
            prescriptions: PrescriptionService::new(config),
            cabinet: CabinetService::new(config),
        }
    }

    pub async fn ordonnance(&self, id: i64) -> Result<PrintView, ConsultationError> {
        let mut view = self.base_view(id).await?;
        let lines = self
            .prescriptions
            .lines_for_day(view.consultation.patient_id, view.consultation.consultation_date)
            .await?;
        view.prescriptions = Some(lines);
        Ok(view)
    }

    pub async fn sick_leave(&self, id: i64) -> Result<PrintView, ConsultationError> {
        self.base_view(id).await
    }

    /// The receipt number and payment date are written on first print and
    /// kept as-is afterwards.
    pub async fn receipt(&self, id: i64, now: NaiveDateTime) -> Result<ReceiptView, ConsultationError> {
        let PrintView {
            cabinet,
            consultation,
            patient,
            ..
        } = self.base_view(id).await?;

        let consultation = match &consultation.receipt_number {
            Some(_) => consultation,
            None => self.assign_receipt(consultation, now).await?,
        };

        Ok(ReceiptView {
            cabinet,
            receipt_number: consultation.receipt_number.clone().unwrap_or_default(),
            net_amount: consultation.net_amount(),
            patient,
            consultation,
        })
    }

    async fn assign_receipt(
        &self,
        consultation: Consultation,
        now: NaiveDateTime,
    ) -> Result<Consultation, ConsultationError> {
        let number = receipt_number(now, consultation.id);
        let payment_date = consultation.payment_date.unwrap_or(now);

        // Only the first print may write; a concurrent one finds the column set.
        let updated: Vec<Consultation> = self
            .supabase
            .update(
                &Query::table(&CONSULTATIONS)
                    .eq("id", consultation.id)
                    .is_null("receipt_number"),
                json!({ "receipt_number": number, "payment_date": payment_date }),
            )
            .await?;

        match updated.into_iter().next() {
            Some(consultation) => {
                info!("Receipt {} issued for consultation {}", number, consultation.id);
                Ok(consultation)
            }
            None => {
                debug!("Receipt for consultation {} already issued", consultation.id);
                self.consultations.get(consultation.id).await
            }
        }
    }

    async fn base_view(&self, id: i64) -> Result<PrintView, ConsultationError> {
        let consultation = self.consultations.get(id).await?;
        let patient = self.consultations.patient_of(&consultation).await?;

        Ok(PrintView {
            cabinet: self.cabinet.letterhead().await?,
            consultation,
            patient,
            prescriptions: None,
        })
    }
}
