use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Redirect,
    Extension, Form, Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::{CurrentUser, Role};
use shared_models::error::AppError;

use crate::models::EmployerForm;
use crate::services::EmployerService;

const INDEX: &str = "/employers";

fn role_options() -> Vec<&'static str> {
    Role::ALL.iter().map(Role::as_str).collect()
}

#[axum::debug_handler]
pub async fn list_employers(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = EmployerService::new(&config);
    let employers = service.list().await?;

    Ok(Json(json!({
        "employers": employers,
        "total": employers.len()
    })))
}

#[axum::debug_handler]
pub async fn new_employer() -> Json<Value> {
    Json(json!({ "roles": role_options() }))
}

#[axum::debug_handler]
pub async fn create_employer(
    State(config): State<Arc<AppConfig>>,
    Form(form): Form<EmployerForm>,
) -> Result<Redirect, AppError> {
    let service = EmployerService::new(&config);
    service.create(&form).await?;
    Ok(Redirect::to(INDEX))
}

#[axum::debug_handler]
pub async fn edit_employer(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = EmployerService::new(&config);
    let employer = service.get(id).await?;

    Ok(Json(json!({
        "employer": employer,
        "roles": role_options()
    })))
}

#[axum::debug_handler]
pub async fn update_employer(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
    Form(form): Form<EmployerForm>,
) -> Result<Redirect, AppError> {
    let service = EmployerService::new(&config);
    service.update(id, &form).await?;
    Ok(Redirect::to(INDEX))
}

#[axum::debug_handler]
pub async fn delete_employer(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    let service = EmployerService::new(&config);
    service.delete(id, user.id).await?;
    Ok(Redirect::to(INDEX))
}
