use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use appointment_cell::Rendezvous;
use catalog_cell::models::round_cents;
use consultation_cell::models::{net_amount, ConsultationListItem};
use shared_models::error::AppError;
use shared_utils::form::{optional_date, trimmed_string};
use stock_cell::models::StockLevel;

pub const UNSPECIFIED_PAYMENT: &str = "Non spécifié";
pub const UNKNOWN_SERVICE: &str = "Inconnu";
pub const AGE_GROUPS: [&str; 5] = ["0-17", "18-34", "35-49", "50-64", "65+"];

pub const TOP_SERVICES: usize = 10;
pub const STOCK_ALERTS: usize = 10;
pub const DASHBOARD_STOCK_ALERTS: usize = 5;

// ==============================================================================
// PERIODS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Today,
    Week,
    Month,
    Year,
    Custom,
}

impl Period {
    /// Unknown or missing values fall back to `Today`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("week") => Period::Week,
            Some("month") => Period::Month,
            Some("year") => Period::Year,
            Some("custom") => Period::Custom,
            _ => Period::Today,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RevenueQuery {
    #[serde(default, deserialize_with = "trimmed_string")]
    pub period: Option<String>,
    #[serde(default, deserialize_with = "optional_date")]
    pub start: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_date")]
    pub end: Option<NaiveDate>,
}

impl RevenueQuery {
    pub fn period(&self) -> Period {
        Period::parse(self.period.as_deref())
    }

    /// Inclusive day range the report covers.
    pub fn range(&self, today: NaiveDate) -> (Period, NaiveDate, NaiveDate) {
        let period = self.period();
        let (start, end) = date_range(period, self.start, self.end, today);
        (period, start, end)
    }
}

pub fn first_of_month(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

pub fn first_of_year(day: NaiveDate) -> NaiveDate {
    day.with_ordinal(1).unwrap_or(day)
}

/// Weeks start on the most recent Sunday. A custom range needs both ends;
/// anything incomplete collapses to today.
pub fn date_range(
    period: Period,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    match period {
        Period::Today => (today, today),
        Period::Week => {
            let since_sunday = u64::from(today.weekday().num_days_from_sunday());
            (today.checked_sub_days(Days::new(since_sunday)).unwrap_or(today), today)
        }
        Period::Month => (first_of_month(today), today),
        Period::Year => (first_of_year(today), today),
        Period::Custom => match (start, end) {
            (Some(start), Some(end)) => (start, end),
            _ => (today, today),
        },
    }
}

// ==============================================================================
// REVENUE REPORT
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameRef {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogueName {
    pub name: Option<String>,
}

/// Consultation amounts with the names a report prints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueConsultation {
    pub id: i64,
    pub price: Option<f64>,
    pub discount: Option<f64>,
    pub payment_method: Option<String>,
    pub consultation_date: Option<NaiveDateTime>,
    pub service_id: Option<i64>,
    pub service_name: Option<String>,
    pub patient: Option<NameRef>,
    pub service: Option<CatalogueName>,
}

pub const REVENUE_SELECT: &str = "id,price,discount,payment_method,consultation_date,service_id,\
service_name,patient:patients(last_name,first_name),service:services(name)";

impl RevenueConsultation {
    pub fn net(&self) -> f64 {
        net_amount(self.price, self.discount)
    }

    /// Catalogue name first, then the name stored on the consultation.
    pub fn display_service(&self) -> Option<&str> {
        match &self.service {
            Some(service) => service.name.as_deref(),
            None => self.service_name.as_deref().filter(|n| !n.is_empty()),
        }
    }

    fn has_service(&self) -> bool {
        self.service_id.is_some() || self.service_name.as_deref().is_some_and(|n| !n.is_empty())
    }

    pub fn patient_name(&self) -> String {
        self.patient
            .as_ref()
            .map(|p| {
                format!(
                    "{} {}",
                    p.last_name.as_deref().unwrap_or_default(),
                    p.first_name.as_deref().unwrap_or_default()
                )
                .trim()
                .to_string()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountByLabel {
    pub label: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRevenue {
    pub service_id: Option<i64>,
    pub name: String,
    pub count: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRevenue {
    pub day: NaiveDate,
    pub revenue: f64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueRow {
    pub consultation_date: Option<NaiveDateTime>,
    pub patient: String,
    pub service: String,
    pub price: f64,
    pub discount: f64,
    pub net: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueReport {
    pub period: Period,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_revenue: f64,
    pub total_discounts: f64,
    pub net_revenue: f64,
    pub consultation_count: i64,
    pub average_per_consultation: f64,
    pub payment_methods: Vec<AmountByLabel>,
    pub services: Vec<ServiceRevenue>,
    pub daily: Vec<DailyRevenue>,
    pub consultations: Vec<RevenueRow>,
}

impl RevenueReport {
    /// `rows` are the consultations of the range, newest first.
    pub fn build(
        period: Period,
        start: NaiveDate,
        end: NaiveDate,
        rows: &[RevenueConsultation],
    ) -> Self {
        let total_revenue: f64 = rows.iter().map(|c| c.price.unwrap_or_default()).sum();
        let total_discounts: f64 = rows.iter().map(|c| c.discount.unwrap_or_default()).sum();
        let net_revenue = total_revenue - total_discounts;
        let consultation_count = rows.len() as i64;
        let average = if rows.is_empty() {
            0.0
        } else {
            net_revenue / consultation_count as f64
        };

        Self {
            period,
            start,
            end,
            total_revenue: round_cents(total_revenue),
            total_discounts: round_cents(total_discounts),
            net_revenue: round_cents(net_revenue),
            consultation_count,
            average_per_consultation: round_cents(average),
            payment_methods: payment_breakdown(rows),
            services: service_breakdown(rows),
            daily: daily_series(rows),
            consultations: rows.iter().map(revenue_row).collect(),
        }
    }
}

fn payment_breakdown(rows: &[RevenueConsultation]) -> Vec<AmountByLabel> {
    let mut by_method: BTreeMap<&str, f64> = BTreeMap::new();
    let mut unspecified = 0.0;

    for row in rows {
        match row.payment_method.as_deref().filter(|m| !m.is_empty()) {
            Some(method) => *by_method.entry(method).or_default() += row.net(),
            None => unspecified += row.net(),
        }
    }

    let mut breakdown: Vec<AmountByLabel> = by_method
        .into_iter()
        .map(|(label, amount)| AmountByLabel {
            label: label.to_string(),
            amount: round_cents(amount),
        })
        .collect();

    if unspecified > 0.0 {
        breakdown.push(AmountByLabel {
            label: UNSPECIFIED_PAYMENT.to_string(),
            amount: round_cents(unspecified),
        });
    }
    // Largest first; ties stay alphabetical.
    breakdown.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    breakdown
}

/// Groups by service id and display name, in first-seen order before sorting.
fn group_services(rows: &[RevenueConsultation]) -> Vec<ServiceRevenue> {
    let mut groups: Vec<ServiceRevenue> = Vec::new();

    for row in rows.iter().filter(|r| r.has_service()) {
        let name = row.display_service().unwrap_or(UNKNOWN_SERVICE);
        match groups
            .iter_mut()
            .find(|g| g.service_id == row.service_id && g.name == name)
        {
            Some(group) => {
                group.count += 1;
                group.revenue += row.net();
            }
            None => groups.push(ServiceRevenue {
                service_id: row.service_id,
                name: name.to_string(),
                count: 1,
                revenue: row.net(),
            }),
        }
    }

    for group in &mut groups {
        group.revenue = round_cents(group.revenue);
    }
    groups
}

fn service_breakdown(rows: &[RevenueConsultation]) -> Vec<ServiceRevenue> {
    let mut services = group_services(rows);
    services.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    services
}

fn daily_series(rows: &[RevenueConsultation]) -> Vec<DailyRevenue> {
    let mut days: BTreeMap<NaiveDate, (f64, i64)> = BTreeMap::new();
    for row in rows {
        if let Some(at) = row.consultation_date {
            let entry = days.entry(at.date()).or_default();
            entry.0 += row.net();
            entry.1 += 1;
        }
    }

    days.into_iter()
        .map(|(day, (revenue, count))| DailyRevenue {
            day,
            revenue: round_cents(revenue),
            count,
        })
        .collect()
}

fn revenue_row(row: &RevenueConsultation) -> RevenueRow {
    RevenueRow {
        consultation_date: row.consultation_date,
        patient: row.patient_name(),
        service: row.display_service().unwrap_or_default().to_string(),
        price: row.price.unwrap_or_default(),
        discount: row.discount.unwrap_or_default(),
        net: round_cents(row.net()),
    }
}

// ==============================================================================
// STATISTICS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientFacts {
    pub id: i64,
    pub sex: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

pub const PATIENT_FACTS_SELECT: &str = "id,sex,birth_date,created_at";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyActivity {
    pub label: String,
    pub count: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total_patients: i64,
    pub new_patients_this_month: i64,
    pub new_patients_this_year: i64,
    pub patients_by_sex: Vec<LabelCount>,
    pub patients_by_age: Vec<LabelCount>,

    pub consultations_today: i64,
    pub consultations_this_month: i64,
    pub consultations_this_year: i64,
    pub monthly: Vec<MonthlyActivity>,
    pub top_services: Vec<ServiceRevenue>,

    pub revenue_today: f64,
    pub revenue_this_month: f64,
    pub revenue_this_year: f64,
    pub average_consultation_price: f64,

    pub total_products: i64,
    pub low_stock_products: i64,
    pub out_of_stock_products: i64,
    pub low_stock_items: Vec<StockLevel>,
}

pub fn age_group(birth: NaiveDate, today: NaiveDate) -> &'static str {
    let age = today.year() - birth.year();
    match age {
        a if a < 18 => AGE_GROUPS[0],
        a if a < 35 => AGE_GROUPS[1],
        a if a < 50 => AGE_GROUPS[2],
        a if a < 65 => AGE_GROUPS[3],
        _ => AGE_GROUPS[4],
    }
}

/// The twelve months ending with the current one, oldest first.
pub fn last_twelve_months(today: NaiveDate) -> Vec<NaiveDate> {
    let current = first_of_month(today);
    (0..12u32)
        .rev()
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .collect()
}

impl Statistics {
    pub fn build(
        today: NaiveDate,
        patients: &[PatientFacts],
        consultations: &[RevenueConsultation],
        stock: &[StockLevel],
    ) -> Self {
        let month_start = first_of_month(today);
        let year_start = first_of_year(today);

        let created_since = |since: NaiveDate| {
            patients
                .iter()
                .filter(|p| p.created_at.date_naive() >= since)
                .count() as i64
        };

        let mut by_sex: BTreeMap<&str, i64> = BTreeMap::new();
        for sex in patients.iter().filter_map(|p| p.sex.as_deref()).filter(|s| !s.is_empty()) {
            *by_sex.entry(sex).or_default() += 1;
        }

        let mut by_age = [0i64; AGE_GROUPS.len()];
        for birth in patients.iter().filter_map(|p| p.birth_date) {
            let group = age_group(birth, today);
            if let Some(slot) = AGE_GROUPS.iter().position(|g| *g == group) {
                by_age[slot] += 1;
            }
        }

        let dated = |since: NaiveDate| {
            consultations
                .iter()
                .filter(move |c| c.consultation_date.is_some_and(|at| at.date() >= since))
        };
        let on_today = || {
            consultations
                .iter()
                .filter(|c| c.consultation_date.is_some_and(|at| at.date() == today))
        };

        let priced: Vec<f64> = consultations
            .iter()
            .filter(|c| c.price.is_some())
            .map(RevenueConsultation::net)
            .collect();
        let average = if priced.is_empty() {
            0.0
        } else {
            priced.iter().sum::<f64>() / priced.len() as f64
        };

        let mut top_services = group_services(consultations);
        top_services.sort_by(|a, b| b.count.cmp(&a.count));
        top_services.truncate(TOP_SERVICES);

        let mut low_stock_items: Vec<StockLevel> =
            stock.iter().filter(|s| s.is_low()).cloned().collect();
        low_stock_items.sort_by_key(|s| s.quantity);
        low_stock_items.truncate(STOCK_ALERTS);

        Self {
            total_patients: patients.len() as i64,
            new_patients_this_month: created_since(month_start),
            new_patients_this_year: created_since(year_start),
            patients_by_sex: by_sex
                .into_iter()
                .map(|(label, count)| LabelCount { label: label.to_string(), count })
                .collect(),
            patients_by_age: AGE_GROUPS
                .iter()
                .zip(by_age)
                .map(|(label, count)| LabelCount { label: label.to_string(), count })
                .collect(),

            consultations_today: on_today().count() as i64,
            consultations_this_month: dated(month_start).count() as i64,
            consultations_this_year: dated(year_start).count() as i64,
            monthly: monthly_activity(today, consultations),
            top_services,

            revenue_today: net_of(on_today()),
            revenue_this_month: net_of(dated(month_start)),
            revenue_this_year: net_of(dated(year_start)),
            average_consultation_price: round_cents(average),

            total_products: stock.len() as i64,
            low_stock_products: stock.iter().filter(|s| s.is_low() && !s.is_out()).count() as i64,
            out_of_stock_products: stock.iter().filter(|s| s.is_out()).count() as i64,
            low_stock_items,
        }
    }
}

fn net_of<'a>(rows: impl Iterator<Item = &'a RevenueConsultation>) -> f64 {
    round_cents(rows.map(RevenueConsultation::net).sum())
}

fn monthly_activity(today: NaiveDate, consultations: &[RevenueConsultation]) -> Vec<MonthlyActivity> {
    last_twelve_months(today)
        .into_iter()
        .map(|month| {
            let rows: Vec<&RevenueConsultation> = consultations
                .iter()
                .filter(|c| {
                    c.consultation_date
                        .is_some_and(|at| at.year() == month.year() && at.month() == month.month())
                })
                .collect();
            MonthlyActivity {
                label: month.format("%b %Y").to_string(),
                count: rows.len() as i64,
                revenue: round_cents(rows.iter().map(|c| c.net()).sum()),
            }
        })
        .collect()
}

// ==============================================================================
// DASHBOARD
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Amounts {
    pub price: Option<f64>,
    pub discount: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub total_patients: i64,
    pub rendezvous_today: i64,
    pub revenue_today: f64,
    pub waiting: Vec<ConsultationListItem>,
    pub agenda: Vec<Rendezvous>,
    pub low_stock: Vec<StockLevel>,
}

pub fn net_total(rows: &[Amounts]) -> f64 {
    round_cents(rows.iter().map(|r| net_amount(r.price, r.discount)).sum())
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Stock(#[from] stock_cell::StockError),

    #[error("Spreadsheet export failed: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Stock(e) => e.into(),
            ReportError::Export(e) => AppError::Internal(format!("Spreadsheet export failed: {}", e)),
            ReportError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        day(y, m, d).and_hms_opt(h, 0, 0).unwrap()
    }

    fn consultation(
        id: i64,
        when: NaiveDateTime,
        price: Option<f64>,
        discount: Option<f64>,
        method: Option<&str>,
        service: (Option<i64>, Option<&str>),
    ) -> RevenueConsultation {
        RevenueConsultation {
            id,
            price,
            discount,
            payment_method: method.map(str::to_string),
            consultation_date: Some(when),
            service_id: service.0,
            service_name: service.1.map(str::to_string),
            patient: Some(NameRef {
                last_name: Some("Bennani".into()),
                first_name: Some("Salma".into()),
            }),
            service: service.0.map(|_| CatalogueName { name: service.1.map(str::to_string) }),
        }
    }

    fn level(id: i64, quantity: i32, alarm: i32) -> StockLevel {
        StockLevel { id, name: format!("P{}", id), quantity, alarm }
    }

    #[test]
    fn period_parsing_defaults_to_today() {
        assert_eq!(Period::parse(Some("week")), Period::Week);
        assert_eq!(Period::parse(Some(" YEAR ")), Period::Year);
        assert_eq!(Period::parse(Some("fortnight")), Period::Today);
        assert_eq!(Period::parse(None), Period::Today);
    }

    #[test]
    fn ranges_follow_the_period() {
        // 2026-10-15 is a Thursday.
        let today = day(2026, 10, 15);

        assert_eq!(date_range(Period::Today, None, None, today), (today, today));
        assert_eq!(date_range(Period::Week, None, None, today), (day(2026, 10, 11), today));
        assert_eq!(date_range(Period::Month, None, None, today), (day(2026, 10, 1), today));
        assert_eq!(date_range(Period::Year, None, None, today), (day(2026, 1, 1), today));
        assert_eq!(
            date_range(Period::Custom, Some(day(2026, 3, 1)), Some(day(2026, 3, 31)), today),
            (day(2026, 3, 1), day(2026, 3, 31))
        );
        assert_eq!(
            date_range(Period::Custom, Some(day(2026, 3, 1)), None, today),
            (today, today)
        );
    }

    #[test]
    fn week_starting_on_sunday_covers_just_today() {
        let sunday = day(2026, 10, 18);
        assert_eq!(date_range(Period::Week, None, None, sunday), (sunday, sunday));
    }

    #[test]
    fn revenue_report_totals_and_breakdowns() {
        let rows = vec![
            consultation(3, at(2026, 10, 14, 11), Some(300.0), Some(50.0), Some("Espèces"), (Some(2), Some("Echographie"))),
            consultation(2, at(2026, 10, 14, 9), Some(200.0), None, None, (Some(1), Some("Consultation"))),
            consultation(1, at(2026, 10, 13, 10), Some(200.0), Some(20.0), Some("Carte"), (Some(1), Some("Consultation"))),
        ];

        let report = RevenueReport::build(Period::Week, day(2026, 10, 11), day(2026, 10, 15), &rows);

        assert_eq!(report.total_revenue, 700.0);
        assert_eq!(report.total_discounts, 70.0);
        assert_eq!(report.net_revenue, 630.0);
        assert_eq!(report.consultation_count, 3);
        assert_eq!(report.average_per_consultation, 210.0);

        assert_eq!(
            report.payment_methods,
            vec![
                AmountByLabel { label: "Espèces".into(), amount: 250.0 },
                AmountByLabel { label: UNSPECIFIED_PAYMENT.into(), amount: 200.0 },
                AmountByLabel { label: "Carte".into(), amount: 180.0 },
            ]
        );

        assert_eq!(report.services[0].name, "Consultation");
        assert_eq!(report.services[0].count, 2);
        assert_eq!(report.services[0].revenue, 380.0);
        assert_eq!(report.services[1].name, "Echographie");

        assert_eq!(report.daily.len(), 2);
        assert_eq!(report.daily[0].day, day(2026, 10, 13));
        assert_eq!(report.daily[1].revenue, 450.0);
        assert_eq!(report.daily[1].count, 2);

        assert_eq!(report.consultations[0].net, 250.0);
        assert_eq!(report.consultations[0].patient, "Bennani Salma");
    }

    #[test]
    fn payment_methods_are_ranked_by_amount() {
        let rows = vec![
            consultation(1, at(2026, 10, 14, 9), Some(100.0), None, Some("Carte"), (Some(1), Some("Consultation"))),
            consultation(2, at(2026, 10, 14, 10), Some(400.0), None, Some("Virement"), (Some(1), Some("Consultation"))),
            consultation(3, at(2026, 10, 14, 11), Some(900.0), None, None, (Some(1), Some("Consultation"))),
            consultation(4, at(2026, 10, 14, 12), Some(100.0), None, Some("Chèque"), (Some(1), Some("Consultation"))),
        ];

        let report = RevenueReport::build(Period::Today, day(2026, 10, 14), day(2026, 10, 14), &rows);
        let labels: Vec<&str> = report.payment_methods.iter().map(|m| m.label.as_str()).collect();

        assert_eq!(labels, vec![UNSPECIFIED_PAYMENT, "Virement", "Carte", "Chèque"]);
    }

    #[test]
    fn empty_range_averages_to_zero() {
        let report = RevenueReport::build(Period::Today, day(2026, 10, 15), day(2026, 10, 15), &[]);
        assert_eq!(report.average_per_consultation, 0.0);
        assert!(report.payment_methods.is_empty());
        assert!(report.services.is_empty());
    }

    #[test]
    fn stored_service_name_used_when_catalogue_row_is_gone() {
        let mut orphan = consultation(1, at(2026, 10, 15, 9), Some(150.0), None, None, (None, Some("Ancien soin")));
        orphan.service = None;
        let mut unnamed = consultation(2, at(2026, 10, 15, 10), Some(100.0), None, None, (Some(9), None));
        unnamed.service = Some(CatalogueName { name: None });
        let bare = consultation(3, at(2026, 10, 15, 11), Some(90.0), None, None, (None, None));

        let report = RevenueReport::build(Period::Today, day(2026, 10, 15), day(2026, 10, 15), &[orphan, unnamed, bare]);

        let names: Vec<&str> = report.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Ancien soin", UNKNOWN_SERVICE]);
        assert_eq!(report.consultation_count, 3);
    }

    #[test]
    fn age_groups_use_the_year_difference() {
        let today = day(2026, 10, 15);
        assert_eq!(age_group(day(2009, 12, 31), today), "0-17");
        assert_eq!(age_group(day(2008, 12, 31), today), "18-34");
        assert_eq!(age_group(day(1977, 1, 1), today), "35-49");
        assert_eq!(age_group(day(1962, 6, 1), today), "65+");
    }

    #[test]
    fn twelve_months_end_with_the_current_one() {
        let months = last_twelve_months(day(2026, 3, 31));
        assert_eq!(months.len(), 12);
        assert_eq!(months[0], day(2025, 4, 1));
        assert_eq!(months[11], day(2026, 3, 1));
    }

    #[test]
    fn statistics_aggregate_patients_activity_and_stock() {
        let today = day(2026, 10, 15);
        let patients = vec![
            PatientFacts {
                id: 1,
                sex: Some("F".into()),
                birth_date: Some(day(1990, 5, 1)),
                created_at: Utc.with_ymd_and_hms(2026, 10, 2, 8, 0, 0).unwrap(),
            },
            PatientFacts {
                id: 2,
                sex: Some("M".into()),
                birth_date: Some(day(1950, 5, 1)),
                created_at: Utc.with_ymd_and_hms(2026, 2, 2, 8, 0, 0).unwrap(),
            },
            PatientFacts {
                id: 3,
                sex: Some(String::new()),
                birth_date: None,
                created_at: Utc.with_ymd_and_hms(2024, 2, 2, 8, 0, 0).unwrap(),
            },
        ];
        let consultations = vec![
            consultation(1, at(2026, 10, 15, 9), Some(200.0), Some(20.0), None, (Some(1), Some("Consultation"))),
            consultation(2, at(2026, 10, 3, 9), Some(200.0), None, None, (Some(1), Some("Consultation"))),
            consultation(3, at(2026, 4, 3, 9), None, None, None, (Some(2), Some("Echographie"))),
            consultation(4, at(2025, 1, 3, 9), Some(100.0), None, None, (Some(2), Some("Echographie"))),
        ];
        let stock = vec![level(1, 0, 2), level(2, 2, 5), level(3, 40, 5)];

        let stats = Statistics::build(today, &patients, &consultations, &stock);

        assert_eq!(stats.total_patients, 3);
        assert_eq!(stats.new_patients_this_month, 1);
        assert_eq!(stats.new_patients_this_year, 2);
        assert_eq!(stats.patients_by_sex.len(), 2);
        assert_eq!(stats.patients_by_age[1], LabelCount { label: "18-34".into(), count: 0 });
        assert_eq!(stats.patients_by_age[2], LabelCount { label: "35-49".into(), count: 1 });
        assert_eq!(stats.patients_by_age[4], LabelCount { label: "65+".into(), count: 1 });

        assert_eq!(stats.consultations_today, 1);
        assert_eq!(stats.consultations_this_month, 2);
        assert_eq!(stats.consultations_this_year, 3);
        assert_eq!(stats.revenue_today, 180.0);
        assert_eq!(stats.revenue_this_month, 380.0);
        assert_eq!(stats.average_consultation_price, 160.0);

        assert_eq!(stats.monthly.len(), 12);
        assert_eq!(stats.monthly[11].label, "Oct 2026");
        assert_eq!(stats.monthly[11].count, 2);
        assert_eq!(stats.monthly[5].label, "Apr 2026");
        assert_eq!(stats.monthly[5].count, 1);

        assert_eq!(stats.top_services[0].name, "Consultation");
        assert_eq!(stats.top_services[0].count, 2);

        assert_eq!(stats.total_products, 3);
        assert_eq!(stats.low_stock_products, 1);
        assert_eq!(stats.out_of_stock_products, 1);
        assert_eq!(stats.low_stock_items.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn dashboard_revenue_nets_discounts() {
        let rows = vec![
            Amounts { price: Some(200.0), discount: Some(25.5) },
            Amounts { price: None, discount: None },
            Amounts { price: Some(100.0), discount: None },
        ];
        assert_eq!(net_total(&rows), 274.5);
    }
}
