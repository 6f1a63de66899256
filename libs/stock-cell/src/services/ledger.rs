use chrono::NaiveDateTime;
use serde_json::json;
use tracing::{error, info, instrument, warn};

use shared_config::AppConfig;
use shared_database::tables::{STOCK, STOCK_MOVEMENTS};
use shared_database::{Query, SupabaseClient};
use shared_models::pagination::{Page, Pagination, DEFAULT_PAGE_SIZE};

use crate::models::{
    quick_adjustment, AdjustForm, HistoryQuery, MovementKind, MovementListItem, Stock, StockError,
    StockMovement, ValidMovement, MOVEMENT_SELECT, QUICK_ADJUST_REASON,
};
use crate::services::ProductService;

/// Entry/exit ledger against each product's running quantity.
///
/// The quantity is written with a compare-and-set on the value that was
/// read, so two concurrent movements cannot both apply to the same stock
/// level. A failed ledger insert puts the quantity back.
pub struct StockLedger {
    supabase: SupabaseClient,
    products: ProductService,
}

impl StockLedger {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            products: ProductService::new(config),
        }
    }

    #[instrument(skip(self, movement), fields(stock_id = movement.stock_id, kind = %movement.kind))]
    pub async fn record(
        &self,
        movement: &ValidMovement,
        current_user_id: i64,
        now: NaiveDateTime,
    ) -> Result<StockMovement, StockError> {
        let product = self.products.get(movement.stock_id).await?;

        if movement.kind == MovementKind::Sortie && movement.quantity > product.quantity {
            warn!(
                "Exit of {} refused for product {} ({} on hand)",
                movement.quantity, product.id, product.quantity
            );
            return Err(StockError::InsufficientStock {
                requested: movement.quantity,
                available: product.quantity,
            });
        }

        let delta = movement.kind.signed(movement.quantity);
        let Some(new_quantity) = product.quantity.checked_add(delta) else {
            warn!(
                "Entry of {} refused for product {} ({} on hand)",
                movement.quantity, product.id, product.quantity
            );
            return Err(StockError::QuantityLimit {
                added: movement.quantity,
                available: product.quantity,
            });
        };
        self.swap_quantity(&product, product.quantity, new_quantity).await?;

        let entry = json!({
            "stock_id": product.id,
            "quantity": delta,
            "kind": movement.kind,
            "reason": movement.reason,
            "moved_at": movement.moved_at.unwrap_or(now),
            "employer_id": movement.employer_id.unwrap_or(current_user_id),
        });

        match self
            .supabase
            .insert_one::<StockMovement>(&STOCK_MOVEMENTS, entry)
            .await
        {
            Ok(recorded) => {
                info!(
                    "{} of {} on product {}: {} -> {}",
                    recorded.kind, movement.quantity, product.id, product.quantity, new_quantity
                );
                Ok(recorded)
            }
            Err(e) => {
                error!("Ledger insert failed for product {}: {}", product.id, e);
                if let Err(undo) = self.swap_quantity(&product, new_quantity, product.quantity).await {
                    error!(
                        "Could not restore quantity {} on product {}: {}",
                        product.quantity, product.id, undo
                    );
                }
                Err(StockError::Database(e))
            }
        }
    }

    /// `None` when an exit finds nothing left to remove.
    pub async fn adjust(
        &self,
        stock_id: i64,
        form: &AdjustForm,
        current_user_id: i64,
        now: NaiveDateTime,
    ) -> Result<Option<StockMovement>, StockError> {
        let amount = form.validate().map_err(StockError::Validation)?;
        let product = self.products.get(stock_id).await?;

        let Some((kind, quantity)) = quick_adjustment(form.direction, amount, product.quantity) else {
            info!("Nothing to remove from product {}", stock_id);
            return Ok(None);
        };

        let movement = ValidMovement {
            stock_id,
            quantity,
            kind,
            reason: QUICK_ADJUST_REASON.to_string(),
            moved_at: Some(now),
            employer_id: Some(current_user_id),
        };
        self.record(&movement, current_user_id, now).await.map(Some)
    }

    pub async fn history(&self, filter: &HistoryQuery) -> Result<Page<MovementListItem>, StockError> {
        let mut query = Query::table(&STOCK_MOVEMENTS);
        if let Some(stock_id) = filter.stock_id {
            query = query.eq("stock_id", stock_id);
        }
        if let Some(kind) = filter.kind {
            query = query.eq("kind", kind);
        }

        let total = self.supabase.count(&query).await?;
        let pagination = Pagination::new(filter.page, DEFAULT_PAGE_SIZE, total);

        let rows = self
            .supabase
            .select(
                &query
                    .select(MOVEMENT_SELECT)
                    .order("moved_at.desc,id.desc")
                    .limit(pagination.page_size)
                    .offset(pagination.offset()),
            )
            .await?;

        Ok(Page::new(rows, pagination))
    }

    async fn swap_quantity(&self, product: &Stock, expected: i32, next: i32) -> Result<(), StockError> {
        let query = Query::table(&STOCK)
            .eq("id", product.id)
            .eq("quantity", expected);

        let updated: Vec<Stock> = self
            .supabase
            .update(&query, json!({ "quantity": next }))
            .await?;

        if updated.is_empty() {
            warn!("Quantity of product {} changed concurrently", product.id);
            return Err(StockError::Conflict(format!(
                "The quantity of {} changed in the meantime, please try again",
                product.name
            )));
        }
        Ok(())
    }
}
