use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    Form, Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::clock::clinic_now;

use crate::models::{RendezvousDraft, RendezvousEditor, RendezvousForm, RendezvousQuery};
use crate::services::RendezvousService;

const INDEX: &str = "/rendezvous";

#[axum::debug_handler]
pub async fn list_rendezvous(
    State(config): State<Arc<AppConfig>>,
    Query(filter): Query<RendezvousQuery>,
) -> Result<Json<Value>, AppError> {
    let service = RendezvousService::new(&config);
    let rendezvous = service.list(&filter).await?;

    Ok(Json(json!({
        "search": filter.search,
        "date": filter.date,
        "total": rendezvous.len(),
        "rendezvous": rendezvous
    })))
}

#[axum::debug_handler]
pub async fn new_rendezvous(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = RendezvousService::new(&config);
    let editor = RendezvousEditor {
        rendezvous: RendezvousDraft::starting_at(clinic_now()),
        services: service.service_options().await?,
    };
    Ok(Json(json!(editor)))
}

#[axum::debug_handler]
pub async fn create_rendezvous(
    State(config): State<Arc<AppConfig>>,
    Form(form): Form<RendezvousForm>,
) -> Result<Redirect, AppError> {
    let service = RendezvousService::new(&config);
    service.create(&form).await?;
    Ok(Redirect::to(INDEX))
}

#[axum::debug_handler]
pub async fn edit_rendezvous(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = RendezvousService::new(&config);
    let editor = RendezvousEditor {
        rendezvous: service.get(id).await?,
        services: service.service_options().await?,
    };
    Ok(Json(json!(editor)))
}

#[axum::debug_handler]
pub async fn update_rendezvous(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
    Form(form): Form<RendezvousForm>,
) -> Result<Redirect, AppError> {
    let service = RendezvousService::new(&config);
    service.update(id, &form).await?;
    Ok(Redirect::to(INDEX))
}

#[axum::debug_handler]
pub async fn delete_rendezvous(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    let service = RendezvousService::new(&config);
    service.delete(id).await?;
    Ok(Redirect::to(INDEX))
}
