use chrono::NaiveDate;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::tables::{CONSULTATIONS, PATIENTS};
use shared_database::{Query, SupabaseClient};
use stock_cell::ProductService;

use crate::models::{
    PatientFacts, ReportError, RevenueConsultation, Statistics, PATIENT_FACTS_SELECT, REVENUE_SELECT,
};

pub struct StatisticsService {
    supabase: SupabaseClient,
    products: ProductService,
}

impl StatisticsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            products: ProductService::new(config),
        }
    }

    pub async fn overview(&self, today: NaiveDate) -> Result<Statistics, ReportError> {
        let patients: Vec<PatientFacts> = self
            .supabase
            .select_all(&Query::table(&PATIENTS).select(PATIENT_FACTS_SELECT).order("id.asc"))
            .await?;

        let consultations: Vec<RevenueConsultation> = self
            .supabase
            .select_all(&Query::table(&CONSULTATIONS).select(REVENUE_SELECT).order("id.asc"))
            .await?;

        let stock = self.products.levels().await?;

        debug!(
            "Statistics over {} patients, {} consultations, {} products",
            patients.len(),
            consultations.len(),
            stock.len()
        );
        Ok(Statistics::build(today, &patients, &consultations, &stock))
    }
}
