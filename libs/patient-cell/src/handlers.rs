use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    Form, Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{PatientForm, PatientSearchQuery};
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn search_patients(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let page = service.search_patients(&query).await?;

    Ok(Json(json!({
        "search": query.search,
        "patients": page
    })))
}

#[axum::debug_handler]
pub async fn create_patient(
    State(config): State<Arc<AppConfig>>,
    Form(form): Form<PatientForm>,
) -> Result<Redirect, AppError> {
    let service = PatientService::new(&config);
    service.create_patient(&form).await?;
    Ok(Redirect::to("/patients"))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let detail = service.patient_detail(patient_id).await?;
    Ok(Json(json!(detail)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<i64>,
    Form(form): Form<PatientForm>,
) -> Result<Redirect, AppError> {
    let service = PatientService::new(&config);
    service.update_patient(patient_id, &form).await?;
    Ok(Redirect::to(&format!("/patients/{}", patient_id)))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<i64>,
) -> Result<Redirect, AppError> {
    let service = PatientService::new(&config);
    service.delete_patient(patient_id).await?;
    Ok(Redirect::to("/patients"))
}

#[axum::debug_handler]
pub async fn patient_options(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let options = service.patient_options().await?;
    Ok(Json(json!({ "patients": options })))
}
