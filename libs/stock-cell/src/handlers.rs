use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    Extension, Form, Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::CurrentUser;
use shared_models::error::AppError;
use shared_utils::clock::clinic_now;
use staff_cell::services::EmployerService;

use crate::models::{AdjustForm, CategoryForm, HistoryQuery, MovementForm, StockForm, StockQuery};
use crate::services::{CategoryService, ProductService, StockLedger};

const INDEX: &str = "/stock";

#[axum::debug_handler]
pub async fn stock_index(
    State(config): State<Arc<AppConfig>>,
    Query(filter): Query<StockQuery>,
) -> Result<Json<Value>, AppError> {
    let products = ProductService::new(&config).list(&filter).await?;
    let categories = CategoryService::new(&config).list().await?;
    let employees = EmployerService::new(&config).options().await?;

    Ok(Json(json!({
        "search": filter.search,
        "category_id": filter.category_id,
        "categories": categories,
        "employees": employees,
        "products": products,
    })))
}

#[axum::debug_handler]
pub async fn new_product(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let categories = CategoryService::new(&config).list().await?;
    Ok(Json(json!({ "categories": categories })))
}

#[axum::debug_handler]
pub async fn create_product(
    State(config): State<Arc<AppConfig>>,
    Form(form): Form<StockForm>,
) -> Result<Redirect, AppError> {
    ProductService::new(&config).create(&form).await?;
    Ok(Redirect::to(INDEX))
}

#[axum::debug_handler]
pub async fn delete_product(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    ProductService::new(&config).delete(id).await?;
    Ok(Redirect::to(INDEX))
}

#[axum::debug_handler]
pub async fn adjust_product(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Form(form): Form<AdjustForm>,
) -> Result<Redirect, AppError> {
    StockLedger::new(&config)
        .adjust(id, &form, user.id, clinic_now())
        .await?;
    Ok(Redirect::to(INDEX))
}

#[axum::debug_handler]
pub async fn create_category(
    State(config): State<Arc<AppConfig>>,
    Form(form): Form<CategoryForm>,
) -> Result<Redirect, AppError> {
    CategoryService::new(&config).create(&form).await?;
    Ok(Redirect::to(INDEX))
}

#[axum::debug_handler]
pub async fn delete_category(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    CategoryService::new(&config).delete(id).await?;
    Ok(Redirect::to(INDEX))
}

#[axum::debug_handler]
pub async fn record_movement(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<MovementForm>,
) -> Result<Redirect, AppError> {
    let movement = form.validate().map_err(AppError::Validation)?;
    StockLedger::new(&config)
        .record(&movement, user.id, clinic_now())
        .await?;
    Ok(Redirect::to(INDEX))
}

#[axum::debug_handler]
pub async fn movement_history(
    State(config): State<Arc<AppConfig>>,
    Query(filter): Query<HistoryQuery>,
) -> Result<Json<Value>, AppError> {
    let movements = StockLedger::new(&config).history(&filter).await?;
    let products = ProductService::new(&config).options().await?;

    Ok(Json(json!({
        "stock_id": filter.stock_id,
        "kind": filter.kind,
        "products": products,
        "movements": movements,
    })))
}

#[axum::debug_handler]
pub async fn low_stock_count(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let count = ProductService::new(&config).low_count().await?;
    Ok(Json(json!({ "count": count })))
}
