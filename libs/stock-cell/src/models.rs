use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_models::validation::FieldErrors;
use shared_utils::form::{empty_string_as_none, optional_datetime, trimmed_string};

pub const PRODUCT_NAME_MAX: usize = 30;
pub const PRODUCT_NOTES_MAX: usize = 50;
pub const QUICK_ADJUST_REASON: &str = "Quick adjustment";

// ==============================================================================
// CATEGORIES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStock {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryForm {
    #[serde(default, deserialize_with = "trimmed_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub icon: Option<String>,
}

impl CategoryForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("name", self.name.as_deref(), "Category name cannot be empty");
        errors.max_len("name", self.name.as_deref(), 100);
        errors.into_result()
    }

    pub fn to_row(&self) -> Value {
        json!({ "name": self.name, "icon": self.icon })
    }
}

// ==============================================================================
// PRODUCTS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub id: i64,
    pub name: String,
    pub notes: Option<String>,
    pub quantity: i32,
    pub alarm: i32,
    pub category_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stock {
    /// At or below the alarm threshold, out-of-stock included.
    pub fn is_low(&self) -> bool {
        self.quantity <= self.alarm
    }

    pub fn is_out(&self) -> bool {
        self.quantity == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: i64,
    pub name: String,
}

/// Listing row: the product, its category, and the alert flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockListItem {
    #[serde(flatten)]
    pub stock: Stock,
    pub category: Option<CategoryRef>,
    #[serde(default)]
    pub is_low: bool,
    #[serde(default)]
    pub is_out: bool,
}

impl StockListItem {
    pub fn flagged(mut self) -> Self {
        self.is_low = self.stock.is_low();
        self.is_out = self.stock.is_out();
        self
    }
}

pub const PRODUCT_SELECT: &str = "*,category:category_stock(id,name)";

/// Minimal product row used for alerts and pickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLevel {
    pub id: i64,
    pub name: String,
    pub quantity: i32,
    pub alarm: i32,
}

impl StockLevel {
    pub fn is_low(&self) -> bool {
        self.quantity <= self.alarm
    }

    pub fn is_out(&self) -> bool {
        self.quantity == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductOption {
    pub id: i64,
    pub label: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockForm {
    #[serde(default, deserialize_with = "trimmed_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub quantity: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub alarm: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub category_id: Option<i64>,
}

impl StockForm {
    pub fn validate(&self) -> Result<i64, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("name", self.name.as_deref(), "Product name is required");
        errors.max_len("name", self.name.as_deref(), PRODUCT_NAME_MAX);
        errors.max_len("notes", self.notes.as_deref(), PRODUCT_NOTES_MAX);
        if self.quantity.is_some_and(|q| q < 0) {
            errors.add("quantity", "Quantity cannot be negative");
        }
        if self.alarm.is_some_and(|a| a < 0) {
            errors.add("alarm", "Alarm threshold cannot be negative");
        }
        if self.category_id.is_none() {
            errors.add("category_id", "Select a category");
        }

        match self.category_id {
            Some(category_id) if errors.is_empty() => Ok(category_id),
            _ => Err(errors),
        }
    }

    pub fn to_row(&self) -> Value {
        json!({
            "name": self.name,
            "notes": self.notes,
            "quantity": self.quantity.unwrap_or_default(),
            "alarm": self.alarm.unwrap_or_default(),
            "category_id": self.category_id,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockQuery {
    #[serde(default, deserialize_with = "trimmed_string")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub category_id: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<i64>,
}

// ==============================================================================
// MOVEMENT LEDGER
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementKind {
    #[serde(rename = "Entrée")]
    Entree,
    #[serde(rename = "Sortie")]
    Sortie,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entree => "Entrée",
            Self::Sortie => "Sortie",
        }
    }

    /// The amount as it applies to the running quantity.
    pub fn signed(&self, quantity: i32) -> i32 {
        match self {
            Self::Entree => quantity,
            Self::Sortie => -quantity,
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Entrée" | "Entree" => Ok(Self::Entree),
            "Sortie" => Ok(Self::Sortie),
            other => Err(format!("Unknown movement type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: i64,
    pub stock_id: i64,
    /// Signed: positive for entries, negative for exits.
    pub quantity: i32,
    pub kind: MovementKind,
    pub reason: String,
    pub moved_at: NaiveDateTime,
    pub employer_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployerRef {
    pub id: i64,
    pub last_name: String,
    pub first_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementListItem {
    #[serde(flatten)]
    pub movement: StockMovement,
    pub stock: Option<ProductRef>,
    pub employer: Option<EmployerRef>,
}

pub const MOVEMENT_SELECT: &str =
    "*,stock:stock(id,name),employer:employers(id,last_name,first_name)";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementForm {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub stock_id: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub quantity: Option<i32>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "trimmed_string")]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "optional_datetime")]
    pub moved_at: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub employer_id: Option<i64>,
}

/// A movement ready for the ledger; the date and employee fall back to
/// "now" and the current user.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidMovement {
    pub stock_id: i64,
    pub quantity: i32,
    pub kind: MovementKind,
    pub reason: String,
    pub moved_at: Option<NaiveDateTime>,
    pub employer_id: Option<i64>,
}

impl MovementForm {
    pub fn validate(&self) -> Result<ValidMovement, FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.stock_id.is_none() {
            errors.add("stock_id", "Select a product");
        }
        if !self.quantity.is_some_and(|q| q > 0) {
            errors.add("quantity", "Quantity must be greater than 0");
        }
        let kind = match self.kind.as_deref().map(str::parse::<MovementKind>) {
            Some(Ok(kind)) => Some(kind),
            _ => {
                errors.add("kind", "Select a movement type");
                None
            }
        };
        errors.require("reason", self.reason.as_deref(), "Reason is required");
        errors.max_len("reason", self.reason.as_deref(), 255);

        errors.into_result()?;
        match (self.stock_id, self.quantity, kind, &self.reason) {
            (Some(stock_id), Some(quantity), Some(kind), Some(reason)) => Ok(ValidMovement {
                stock_id,
                quantity,
                kind,
                reason: reason.clone(),
                moved_at: self.moved_at,
                employer_id: self.employer_id,
            }),
            _ => Err(FieldErrors::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustForm {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub amount: Option<i32>,
    pub direction: AdjustDirection,
}

impl AdjustForm {
    pub fn validate(&self) -> Result<i32, FieldErrors> {
        match self.amount {
            Some(amount) if amount > 0 => Ok(amount),
            _ => {
                let mut errors = FieldErrors::new();
                errors.add("amount", "Amount must be greater than 0");
                Err(errors)
            }
        }
    }
}

/// Ledger entry for a quick adjustment: exits are clamped to what is on
/// hand, so `None` means there is nothing to move.
pub fn quick_adjustment(direction: AdjustDirection, amount: i32, on_hand: i32) -> Option<(MovementKind, i32)> {
    let (kind, quantity) = match direction {
        AdjustDirection::In => (MovementKind::Entree, amount),
        AdjustDirection::Out => (MovementKind::Sortie, amount.min(on_hand.max(0))),
    };
    (quantity > 0).then_some((kind, quantity))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub stock_id: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub kind: Option<MovementKind>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<i64>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StockError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Category not found")]
    CategoryNotFound,

    #[error("trying to remove {requested} units but only {available} remain")]
    InsufficientStock { requested: i32, available: i32 },

    #[error("adding {added} units to the {available} on hand exceeds the stock limit")]
    QuantityLimit { added: i32, available: i32 },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InUse(String),

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    Staff(#[from] staff_cell::StaffError),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::ProductNotFound | StockError::CategoryNotFound => {
                AppError::NotFound(err.to_string())
            }
            StockError::InsufficientStock { .. } | StockError::QuantityLimit { .. } => {
                AppError::field("quantity", err.to_string())
            }
            StockError::Conflict(msg) | StockError::InUse(msg) => AppError::Conflict(msg),
            StockError::Validation(fields) => AppError::Validation(fields),
            StockError::Staff(e) => e.into(),
            StockError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
