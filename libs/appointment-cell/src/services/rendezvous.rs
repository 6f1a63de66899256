use tracing::{debug, info, warn};

use catalog_cell::{ServiceCatalog, ServiceOption};
use shared_config::AppConfig;
use shared_database::tables::RENDEZVOUS;
use shared_database::{Query, SupabaseClient};
use shared_models::validation::FieldErrors;

use crate::models::{AppointmentError, Rendezvous, RendezvousForm, RendezvousQuery, ValidRendezvous};

const SEARCH_COLUMNS: [&str; 3] = ["last_name", "first_name", "phone"];

pub struct RendezvousService {
    supabase: SupabaseClient,
    catalog: ServiceCatalog,
}

impl RendezvousService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            catalog: ServiceCatalog::new(config),
        }
    }

    pub async fn list(&self, filter: &RendezvousQuery) -> Result<Vec<Rendezvous>, AppointmentError> {
        debug!("Listing appointments with {:?}", filter);

        let mut query = Query::table(&RENDEZVOUS).select("*");
        if let Some(term) = filter.search.as_deref() {
            query = query.search(&SEARCH_COLUMNS, term);
        }
        if let Some(day) = filter.date {
            query = query.on_day("scheduled_at", day);
        }

        Ok(self
            .supabase
            .select_all(&query.order("scheduled_at.desc,id.desc"))
            .await?)
    }

    pub async fn get(&self, id: i64) -> Result<Rendezvous, AppointmentError> {
        self.supabase
            .select_one(&Query::table(&RENDEZVOUS).select("*").eq("id", id))
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn service_options(&self) -> Result<Vec<ServiceOption>, AppointmentError> {
        Ok(self.catalog.options().await?)
    }

    pub async fn create(&self, form: &RendezvousForm) -> Result<Rendezvous, AppointmentError> {
        let valid = self.validate(form).await?;

        let rendezvous: Rendezvous = self.supabase.insert_one(&RENDEZVOUS, valid.to_row()).await?;
        info!(
            "Appointment {} booked for {} ({})",
            rendezvous.id, rendezvous.scheduled_at, rendezvous.service
        );
        Ok(rendezvous)
    }

    pub async fn update(&self, id: i64, form: &RendezvousForm) -> Result<Rendezvous, AppointmentError> {
        let valid = self.validate(form).await?;

        let updated: Vec<Rendezvous> = self
            .supabase
            .update(&Query::table(&RENDEZVOUS).eq("id", id), valid.to_row())
            .await?;

        let rendezvous = updated.into_iter().next().ok_or_else(|| {
            warn!("Appointment {} not found during update", id);
            AppointmentError::NotFound
        })?;
        info!("Appointment {} updated", id);
        Ok(rendezvous)
    }

    /// Deleting an unknown appointment is a no-op.
    pub async fn delete(&self, id: i64) -> Result<(), AppointmentError> {
        self.supabase
            .delete(&Query::table(&RENDEZVOUS).eq("id", id))
            .await?;
        info!("Appointment {} deleted", id);
        Ok(())
    }

    async fn validate(&self, form: &RendezvousForm) -> Result<ValidRendezvous, AppointmentError> {
        let valid = form.validate().map_err(|errors| {
            warn!("Appointment form rejected: {}", errors);
            AppointmentError::Validation(errors)
        })?;

        if !self.catalog.name_exists(&valid.service).await? {
            warn!("Service not found: {}", valid.service);
            let mut errors = FieldErrors::new();
            errors.add("service", "The selected service does not exist");
            return Err(AppointmentError::Validation(errors));
        }

        Ok(valid)
    }
}
