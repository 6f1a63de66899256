use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    Form, Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::clock::{clinic_now, clinic_today};

use crate::models::{ConsultationFilter, ConsultationUpdateForm, NewConsultationForm};
use crate::services::{ConsultationService, DocumentService};

#[axum::debug_handler]
pub async fn list_consultations(
    State(config): State<Arc<AppConfig>>,
    Query(filter): Query<ConsultationFilter>,
) -> Result<Json<Value>, AppError> {
    let service = ConsultationService::new(&config);
    let today = clinic_today();
    let page = service.list(&filter, today).await?;
    let services = catalog_cell::ServiceCatalog::new(&config).options().await?;

    Ok(Json(json!({
        "search": filter.search,
        "date": filter.effective_day(today),
        "service_id": filter.service_id,
        "show_all": filter.show_all,
        "services": services,
        "consultations": page,
    })))
}

#[axum::debug_handler]
pub async fn new_consultation(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let view = ConsultationService::new(&config).new_view(clinic_now()).await?;
    Ok(Json(json!(view)))
}

#[axum::debug_handler]
pub async fn create_consultation(
    State(config): State<Arc<AppConfig>>,
    Form(form): Form<NewConsultationForm>,
) -> Result<Redirect, AppError> {
    ConsultationService::new(&config).create(&form, clinic_now()).await?;
    Ok(Redirect::to("/consultations"))
}

#[axum::debug_handler]
pub async fn edit_consultation(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let view = ConsultationService::new(&config).edit_view(id).await?;
    Ok(Json(json!(view)))
}

/// Repeated `med_ids[]` / `posologies[]` keys need the multi-value form extractor.
#[axum::debug_handler]
pub async fn update_consultation(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
    axum_extra::extract::Form(form): axum_extra::extract::Form<ConsultationUpdateForm>,
) -> Result<Redirect, AppError> {
    ConsultationService::new(&config).update(id, &form).await?;
    Ok(Redirect::to(&format!("/consultations/{}", id)))
}

#[axum::debug_handler]
pub async fn consultation_history(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let view = ConsultationService::new(&config).history(id).await?;
    Ok(Json(json!(view)))
}

#[axum::debug_handler]
pub async fn delete_consultation(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    ConsultationService::new(&config).delete(id).await?;
    Ok(Redirect::to("/consultations"))
}

// ==============================================================================
// PRINTABLE DOCUMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn print_ordonnance(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let view = DocumentService::new(&config).ordonnance(id).await?;
    Ok(Json(json!(view)))
}

#[axum::debug_handler]
pub async fn print_sick_leave(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let view = DocumentService::new(&config).sick_leave(id).await?;
    Ok(Json(json!(view)))
}

#[axum::debug_handler]
pub async fn print_receipt(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let view = DocumentService::new(&config).receipt(id, clinic_now()).await?;
    Ok(Json(json!(view)))
}
