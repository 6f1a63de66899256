use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::tables::{STOCK, STOCK_MOVEMENTS};
use shared_database::{Query, SupabaseClient};
use shared_models::pagination::{Page, Pagination, DEFAULT_PAGE_SIZE};
use shared_models::validation::FieldErrors;

use crate::models::{
    ProductOption, Stock, StockError, StockForm, StockLevel, StockListItem, StockQuery,
    PRODUCT_SELECT,
};
use crate::services::CategoryService;

pub struct ProductService {
    supabase: SupabaseClient,
    categories: CategoryService,
}

impl ProductService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            categories: CategoryService::new(config),
        }
    }

    pub async fn list(&self, filter: &StockQuery) -> Result<Page<StockListItem>, StockError> {
        debug!("Listing stock with {:?}", filter);

        let mut query = Query::table(&STOCK);
        if let Some(term) = filter.search.as_deref() {
            query = query.ilike("name", term);
        }
        if let Some(category_id) = filter.category_id {
            query = query.eq("category_id", category_id);
        }

        let total = self.supabase.count(&query).await?;
        let pagination = Pagination::new(filter.page, DEFAULT_PAGE_SIZE, total);

        let rows: Vec<StockListItem> = self
            .supabase
            .select(
                &query
                    .select(PRODUCT_SELECT)
                    .order("name.asc")
                    .limit(pagination.page_size)
                    .offset(pagination.offset()),
            )
            .await?;

        let items = rows.into_iter().map(StockListItem::flagged).collect();
        Ok(Page::new(items, pagination))
    }

    pub async fn get(&self, id: i64) -> Result<Stock, StockError> {
        self.supabase
            .select_one(&Query::table(&STOCK).select("*").eq("id", id))
            .await?
            .ok_or(StockError::ProductNotFound)
    }

    pub async fn options(&self) -> Result<Vec<ProductOption>, StockError> {
        let levels = self.levels().await?;
        Ok(levels
            .into_iter()
            .map(|level| ProductOption {
                id: level.id,
                label: level.name,
            })
            .collect())
    }

    /// Every product's quantity and alarm, ordered by name. PostgREST cannot
    /// compare two columns, so alarm checks run on these rows.
    pub async fn levels(&self) -> Result<Vec<StockLevel>, StockError> {
        let query = Query::table(&STOCK)
            .select("id,name,quantity,alarm")
            .order("name.asc,id.asc");
        Ok(self.supabase.select_all(&query).await?)
    }

    /// Products at or below their alarm, lowest quantity first.
    pub async fn low_stock(&self, limit: usize) -> Result<Vec<StockLevel>, StockError> {
        let mut low: Vec<StockLevel> = self
            .levels()
            .await?
            .into_iter()
            .filter(StockLevel::is_low)
            .collect();
        low.sort_by_key(|level| level.quantity);
        low.truncate(limit);
        Ok(low)
    }

    pub async fn low_count(&self) -> Result<usize, StockError> {
        Ok(self.levels().await?.iter().filter(|l| l.is_low()).count())
    }

    pub async fn create(&self, form: &StockForm) -> Result<Stock, StockError> {
        let category_id = form.validate().map_err(StockError::Validation)?;

        if !self.categories.exists(category_id).await? {
            let mut errors = FieldErrors::new();
            errors.add("category_id", "Category not found");
            return Err(StockError::Validation(errors));
        }

        let stock: Stock = self.supabase.insert_one(&STOCK, form.to_row()).await?;
        info!("Product {} created with quantity {}", stock.id, stock.quantity);
        Ok(stock)
    }

    pub async fn delete(&self, id: i64) -> Result<(), StockError> {
        if self
            .supabase
            .exists(&Query::table(&STOCK_MOVEMENTS).eq("stock_id", id))
            .await?
        {
            warn!("Product {} has ledger entries", id);
            return Err(StockError::InUse(
                "This product has stock movements and cannot be deleted".to_string(),
            ));
        }

        self.supabase
            .delete(&Query::table(&STOCK).eq("id", id))
            .await?;
        info!("Product {} deleted", id);
        Ok(())
    }
}
