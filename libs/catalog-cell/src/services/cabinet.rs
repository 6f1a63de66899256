use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::tables::CABINET_INFO;
use shared_database::{Query, SupabaseClient};

use crate::models::{CabinetInfo, CabinetInfoForm, CatalogError};

/// The single-row cabinet letterhead.
pub struct CabinetService {
    supabase: SupabaseClient,
}

impl CabinetService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get(&self) -> Result<Option<CabinetInfo>, CatalogError> {
        debug!("Loading cabinet info");
        let query = Query::table(&CABINET_INFO).select("*").order("id.asc");
        Ok(self.supabase.select_one(&query).await?)
    }

    /// Letterhead for printed documents.
    pub async fn letterhead(&self) -> Result<CabinetInfo, CatalogError> {
        Ok(CabinetInfo::or_placeholder(self.get().await?))
    }

    pub async fn save(&self, form: &CabinetInfoForm) -> Result<CabinetInfo, CatalogError> {
        form.validate().map_err(CatalogError::Validation)?;

        let saved = match self.get().await?.and_then(|info| info.id) {
            Some(id) => {
                let updated: Vec<CabinetInfo> = self
                    .supabase
                    .update(&Query::table(&CABINET_INFO).eq("id", id), form.to_row())
                    .await?;
                updated.into_iter().next().unwrap_or_default()
            }
            None => self.supabase.insert_one(&CABINET_INFO, form.to_row()).await?,
        };

        info!("Cabinet info saved");
        Ok(saved)
    }
}
