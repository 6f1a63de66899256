use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    Form, Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{CabinetInfoForm, MedicamentForm, MedicamentQuery, ServiceForm};
use crate::services::{CabinetService, MedicamentService, ServiceCatalog};

// ==============================================================================
// SERVICES
// ==============================================================================

#[axum::debug_handler]
pub async fn list_services(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let services = ServiceCatalog::new(&config).list().await?;
    Ok(Json(json!({ "services": services })))
}

#[axum::debug_handler]
pub async fn create_service(
    State(config): State<Arc<AppConfig>>,
    Form(form): Form<ServiceForm>,
) -> Result<Redirect, AppError> {
    ServiceCatalog::new(&config).create(&form).await?;
    Ok(Redirect::to("/services"))
}

#[axum::debug_handler]
pub async fn edit_service(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = ServiceCatalog::new(&config).get(id).await?;
    Ok(Json(json!({ "service": service })))
}

#[axum::debug_handler]
pub async fn update_service(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
    Form(form): Form<ServiceForm>,
) -> Result<Redirect, AppError> {
    ServiceCatalog::new(&config).update(id, &form).await?;
    Ok(Redirect::to("/services"))
}

#[axum::debug_handler]
pub async fn delete_service(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    ServiceCatalog::new(&config).delete(id).await?;
    Ok(Redirect::to("/services"))
}

// ==============================================================================
// MEDICAMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_medicaments(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<MedicamentQuery>,
) -> Result<Json<Value>, AppError> {
    let medicaments = MedicamentService::new(&config)
        .search(query.search.as_deref())
        .await?;

    Ok(Json(json!({
        "search": query.search,
        "medicaments": medicaments
    })))
}

#[axum::debug_handler]
pub async fn create_medicament(
    State(config): State<Arc<AppConfig>>,
    Form(form): Form<MedicamentForm>,
) -> Result<Redirect, AppError> {
    MedicamentService::new(&config).create(&form).await?;
    Ok(Redirect::to("/medicaments"))
}

#[axum::debug_handler]
pub async fn edit_medicament(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let medicament = MedicamentService::new(&config).get(id).await?;
    Ok(Json(json!({
        "display_name": medicament.display_name(),
        "medicament": medicament
    })))
}

#[axum::debug_handler]
pub async fn update_medicament(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
    Form(form): Form<MedicamentForm>,
) -> Result<Redirect, AppError> {
    MedicamentService::new(&config).update(id, &form).await?;
    Ok(Redirect::to("/medicaments"))
}

#[axum::debug_handler]
pub async fn delete_medicament(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    MedicamentService::new(&config).delete(id).await?;
    Ok(Redirect::to("/medicaments"))
}

// ==============================================================================
// CABINET SETTINGS
// ==============================================================================

#[axum::debug_handler]
pub async fn cabinet_settings(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let info = CabinetService::new(&config).get().await?.unwrap_or_default();
    Ok(Json(json!({ "cabinet": info })))
}

#[axum::debug_handler]
pub async fn save_cabinet_settings(
    State(config): State<Arc<AppConfig>>,
    Form(form): Form<CabinetInfoForm>,
) -> Result<Redirect, AppError> {
    CabinetService::new(&config).save(&form).await?;
    Ok(Redirect::to("/settings/cabinet"))
}
