use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use auth_cell::PasswordSecurity;
use shared_config::AppConfig;
use shared_database::tables::{EMPLOYERS, STOCK_MOVEMENTS};
use shared_database::{is_conflict, Query, SupabaseClient};
use shared_models::validation::FieldErrors;

use crate::models::{Employer, EmployerForm, EmployerOption, StaffError};

const DUPLICATE_EMAIL: &str = "This email is already in use";

pub struct EmployerService {
    supabase: SupabaseClient,
}

impl EmployerService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list(&self) -> Result<Vec<Employer>, StaffError> {
        debug!("Listing employers");
        let query = Query::table(&EMPLOYERS)
            .select("*")
            .order("last_name.asc,first_name.asc,id.asc");
        Ok(self.supabase.select_all(&query).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Employer, StaffError> {
        let query = Query::table(&EMPLOYERS).select("*").eq("id", id);
        self.supabase
            .select_one(&query)
            .await?
            .ok_or(StaffError::NotFound)
    }

    pub async fn options(&self) -> Result<Vec<EmployerOption>, StaffError> {
        let query = Query::table(&EMPLOYERS)
            .select("id,last_name,first_name,email,role")
            .order("last_name.asc,first_name.asc,id.asc");
        let employers: Vec<Employer> = self.supabase.select_all(&query).await?;

        Ok(employers
            .iter()
            .map(|e| EmployerOption {
                id: e.id,
                label: e.full_name(),
            })
            .collect())
    }

    #[instrument(skip(self, form), fields(email = %form.normalized_email()))]
    pub async fn create(&self, form: &EmployerForm) -> Result<Employer, StaffError> {
        let role = form.validate(true).map_err(StaffError::Validation)?;
        let email = form.normalized_email();

        if self.email_taken(&email, None).await? {
            return Err(duplicate_email());
        }

        let mut row = form.to_row(role);
        row["password_hash"] = Value::String(PasswordSecurity::hash_password(&form.password)?);

        let employer: Employer = self
            .supabase
            .insert_one(&EMPLOYERS, row)
            .await
            .map_err(unique_violation_as_field_error)?;

        info!("Employer {} created with role {}", employer.id, employer.role);
        Ok(employer)
    }

    #[instrument(skip(self, form), fields(email = %form.normalized_email()))]
    pub async fn update(&self, id: i64, form: &EmployerForm) -> Result<Employer, StaffError> {
        let role = form.validate(false).map_err(StaffError::Validation)?;

        self.get(id).await?;

        let email = form.normalized_email();
        if self.email_taken(&email, Some(id)).await? {
            return Err(duplicate_email());
        }

        let mut row = form.to_row(role);
        if form.changes_password() {
            row["password_hash"] = Value::String(PasswordSecurity::hash_password(&form.password)?);
        }

        let query = Query::table(&EMPLOYERS).eq("id", id);
        let updated: Vec<Employer> = self
            .supabase
            .update(&query, row)
            .await
            .map_err(unique_violation_as_field_error)?;

        let employer = updated.into_iter().next().ok_or(StaffError::NotFound)?;
        info!("Employer {} updated", id);
        Ok(employer)
    }

    pub async fn delete(&self, id: i64, current_user_id: i64) -> Result<(), StaffError> {
        if id == current_user_id {
            warn!("Employer {} tried to delete their own account", id);
            return Err(StaffError::SelfDelete);
        }

        self.get(id).await?;

        let movements = Query::table(&STOCK_MOVEMENTS).eq("employer_id", id);
        if self.supabase.exists(&movements).await? {
            return Err(StaffError::InUse);
        }

        self.supabase
            .delete(&Query::table(&EMPLOYERS).eq("id", id))
            .await?;

        info!("Employer {} deleted", id);
        Ok(())
    }

    async fn email_taken(&self, email: &str, exclude: Option<i64>) -> Result<bool, StaffError> {
        let mut query = Query::table(&EMPLOYERS).ieq("email", email);
        if let Some(id) = exclude {
            query = query.neq("id", id);
        }
        Ok(self.supabase.exists(&query).await?)
    }
}

fn duplicate_email() -> StaffError {
    let mut errors = FieldErrors::new();
    errors.add("email", DUPLICATE_EMAIL);
    StaffError::Validation(errors)
}

/// The unique index on `lower(email)` catches races the pre-check misses.
fn unique_violation_as_field_error(err: anyhow::Error) -> StaffError {
    if is_conflict(&err) {
        duplicate_email()
    } else {
        StaffError::Database(err)
    }
}
