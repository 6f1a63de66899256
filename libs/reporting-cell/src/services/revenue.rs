use chrono::NaiveDate;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::tables::CONSULTATIONS;
use shared_database::{Query, SupabaseClient};

use crate::models::{
    Period, ReportError, RevenueConsultation, RevenueQuery, RevenueReport, REVENUE_SELECT,
};

pub struct RevenueService {
    supabase: SupabaseClient,
}

impl RevenueService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn report(&self, filter: &RevenueQuery, today: NaiveDate) -> Result<RevenueReport, ReportError> {
        let (period, start, end) = filter.range(today);
        self.report_for(period, start, end).await
    }

    pub async fn report_for(
        &self,
        period: Period,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RevenueReport, ReportError> {
        debug!("Revenue report from {} to {}", start, end);

        let query = Query::table(&CONSULTATIONS)
            .select(REVENUE_SELECT)
            .between_days("consultation_date", start, end)
            .order("consultation_date.desc,id.desc");
        let rows: Vec<RevenueConsultation> = self.supabase.select_all(&query).await?;

        let report = RevenueReport::build(period, start, end, &rows);
        info!(
            "Revenue {} to {}: {} consultations, net {:.2}",
            start, end, report.consultation_count, report.net_revenue
        );
        Ok(report)
    }
}
