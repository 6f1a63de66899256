use serde::Deserialize;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::tables::{CONSULTATIONS, SERVICES};
use shared_database::{Query, SupabaseClient};

use crate::models::{CatalogError, Service, ServiceForm, ServiceOption};

/// Billable medical services.
pub struct ServiceCatalog {
    supabase: SupabaseClient,
}

#[derive(Deserialize)]
struct OptionRow {
    id: i64,
    name: Option<String>,
    price: Option<f64>,
}

impl ServiceCatalog {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list(&self) -> Result<Vec<Service>, CatalogError> {
        debug!("Listing services");
        let query = Query::table(&SERVICES).select("*").order("name.asc,id.asc");
        Ok(self.supabase.select_all(&query).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Service, CatalogError> {
        self.find(id).await?.ok_or(CatalogError::ServiceNotFound)
    }

    pub async fn find(&self, id: i64) -> Result<Option<Service>, CatalogError> {
        let query = Query::table(&SERVICES).select("*").eq("id", id);
        Ok(self.supabase.select_one(&query).await?)
    }

    /// Appointments reference services by name.
    pub async fn name_exists(&self, name: &str) -> Result<bool, CatalogError> {
        let query = Query::table(&SERVICES).eq("name", name);
        Ok(self.supabase.exists(&query).await?)
    }

    pub async fn options(&self) -> Result<Vec<ServiceOption>, CatalogError> {
        let query = Query::table(&SERVICES)
            .select("id,name,price")
            .order("name.asc,id.asc");
        let rows: Vec<OptionRow> = self.supabase.select_all(&query).await?;

        Ok(rows
            .into_iter()
            .map(|row| ServiceOption::new(row.id, row.name, row.price))
            .collect())
    }

    pub async fn create(&self, form: &ServiceForm) -> Result<Service, CatalogError> {
        form.validate().map_err(CatalogError::Validation)?;

        let service: Service = self.supabase.insert_one(&SERVICES, form.to_row()).await?;
        info!("Service {} created", service.id);
        Ok(service)
    }

    pub async fn update(&self, id: i64, form: &ServiceForm) -> Result<Service, CatalogError> {
        form.validate().map_err(CatalogError::Validation)?;

        let updated: Vec<Service> = self
            .supabase
            .update(&Query::table(&SERVICES).eq("id", id), form.to_row())
            .await?;

        let service = updated.into_iter().next().ok_or(CatalogError::ServiceNotFound)?;
        info!("Service {} updated", id);
        Ok(service)
    }

    pub async fn delete(&self, id: i64) -> Result<(), CatalogError> {
        self.get(id).await?;

        let referenced = self
            .supabase
            .exists(&Query::table(&CONSULTATIONS).eq("service_id", id))
            .await?;
        if referenced {
            warn!("Refusing to delete service {} used by consultations", id);
            return Err(CatalogError::InUse(
                "This service is used by consultations and cannot be deleted".to_string(),
            ));
        }

        self.supabase
            .delete(&Query::table(&SERVICES).eq("id", id))
            .await?;
        info!("Service {} deleted", id);
        Ok(())
    }
}
