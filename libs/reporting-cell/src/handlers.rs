use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::clock::clinic_today;

use crate::export::{
    revenue_file_name, revenue_workbook, statistics_file_name, statistics_workbook,
    XLSX_CONTENT_TYPE,
};
use crate::models::{ReportError, RevenueQuery};
use crate::services::{DashboardService, RevenueService, StatisticsService};

pub async fn liveness() -> &'static str {
    "Cabinet API is running!"
}

fn spreadsheet(file_name: String, bytes: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
}

#[axum::debug_handler]
pub async fn dashboard(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let dashboard = DashboardService::new(&config).today(clinic_today()).await?;
    Ok(Json(json!({ "dashboard": dashboard })))
}

#[axum::debug_handler]
pub async fn revenue_report(
    State(config): State<Arc<AppConfig>>,
    Query(filter): Query<RevenueQuery>,
) -> Result<Json<Value>, AppError> {
    let report = RevenueService::new(&config).report(&filter, clinic_today()).await?;
    Ok(Json(json!({ "report": report })))
}

#[axum::debug_handler]
pub async fn export_revenue(
    State(config): State<Arc<AppConfig>>,
    Query(filter): Query<RevenueQuery>,
) -> Result<impl IntoResponse, AppError> {
    let report = RevenueService::new(&config).report(&filter, clinic_today()).await?;
    let bytes = revenue_workbook(&report).map_err(ReportError::from)?;
    Ok(spreadsheet(revenue_file_name(report.start, report.end), bytes))
}

#[axum::debug_handler]
pub async fn statistics(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let statistics = StatisticsService::new(&config).overview(clinic_today()).await?;
    Ok(Json(json!({ "statistics": statistics })))
}

#[axum::debug_handler]
pub async fn export_statistics(
    State(config): State<Arc<AppConfig>>,
) -> Result<impl IntoResponse, AppError> {
    let today = clinic_today();
    let statistics = StatisticsService::new(&config).overview(today).await?;
    let bytes = statistics_workbook(&statistics).map_err(ReportError::from)?;
    Ok(spreadsheet(statistics_file_name(today), bytes))
}
