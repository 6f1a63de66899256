use chrono::NaiveDate;
use tracing::debug;

use appointment_cell::Rendezvous;
use consultation_cell::models::{ConsultationListItem, ConsultationState, LIST_SELECT};
use shared_config::AppConfig;
use shared_database::tables::{CONSULTATIONS, PATIENTS, RENDEZVOUS};
use shared_database::{Query, SupabaseClient};
use stock_cell::ProductService;

use crate::models::{net_total, Amounts, Dashboard, ReportError, DASHBOARD_STOCK_ALERTS};

pub struct DashboardService {
    supabase: SupabaseClient,
    products: ProductService,
}

impl DashboardService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            products: ProductService::new(config),
        }
    }

    pub async fn today(&self, today: NaiveDate) -> Result<Dashboard, ReportError> {
        let total_patients = self.supabase.count(&Query::table(&PATIENTS)).await?;

        let agenda_query = Query::table(&RENDEZVOUS).on_day("scheduled_at", today);
        let rendezvous_today = self.supabase.count(&agenda_query).await?;
        let agenda: Vec<Rendezvous> = self
            .supabase
            .select_all(&agenda_query.select("*").order("scheduled_at.asc,id.asc"))
            .await?;

        let amounts: Vec<Amounts> = self
            .supabase
            .select_all(
                &Query::table(&CONSULTATIONS)
                    .select("price,discount")
                    .on_day("consultation_date", today)
                    .order("id.asc"),
            )
            .await?;

        let waiting = self.waiting_list().await?;
        let low_stock = self.products.low_stock(DASHBOARD_STOCK_ALERTS).await?;

        debug!("Dashboard: {} waiting, {} booked today", waiting.len(), rendezvous_today);
        Ok(Dashboard {
            total_patients,
            rendezvous_today,
            revenue_today: net_total(&amounts),
            waiting,
            agenda,
            low_stock,
        })
    }

    /// Patients received or in visit, oldest arrival first.
    async fn waiting_list(&self) -> Result<Vec<ConsultationListItem>, ReportError> {
        let waiting_states = ConsultationState::ALL
            .iter()
            .filter(|state| state.is_waiting())
            .map(|state| state.as_str());

        let query = Query::table(&CONSULTATIONS)
            .select(LIST_SELECT)
            .in_list("state", waiting_states)
            .order("consultation_date.asc,id.asc");
        Ok(self.supabase.select_all(&query).await?)
    }
}
