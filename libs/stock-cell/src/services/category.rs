use tracing::{info, warn};

use shared_config::AppConfig;
use shared_database::tables::{STOCK, STOCK_CATEGORIES};
use shared_database::{Query, SupabaseClient};

use crate::models::{CategoryForm, CategoryStock, StockError};

pub struct CategoryService {
    supabase: SupabaseClient,
}

impl CategoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list(&self) -> Result<Vec<CategoryStock>, StockError> {
        let query = Query::table(&STOCK_CATEGORIES).select("*").order("name.asc,id.asc");
        Ok(self.supabase.select_all(&query).await?)
    }

    pub async fn exists(&self, id: i64) -> Result<bool, StockError> {
        Ok(self
            .supabase
            .exists(&Query::table(&STOCK_CATEGORIES).eq("id", id))
            .await?)
    }

    pub async fn create(&self, form: &CategoryForm) -> Result<CategoryStock, StockError> {
        form.validate().map_err(StockError::Validation)?;

        let category: CategoryStock = self
            .supabase
            .insert_one(&STOCK_CATEGORIES, form.to_row())
            .await?;
        info!("Stock category {} created", category.id);
        Ok(category)
    }

    pub async fn delete(&self, id: i64) -> Result<(), StockError> {
        if self
            .supabase
            .exists(&Query::table(&STOCK).eq("category_id", id))
            .await?
        {
            warn!("Category {} still has products", id);
            return Err(StockError::InUse(
                "This category still contains products and cannot be deleted".to_string(),
            ));
        }

        self.supabase
            .delete(&Query::table(&STOCK_CATEGORIES).eq("id", id))
            .await?;
        info!("Stock category {} deleted", id);
        Ok(())
    }
}
