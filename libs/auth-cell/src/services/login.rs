use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use shared_config::AppConfig;
use shared_database::{tables::EMPLOYERS, Query, SupabaseClient};
use shared_models::auth::{CurrentUser, Role};
use shared_models::validation::FieldErrors;

use crate::models::{AuthError, EmployerCredentials, LoginForm};
use crate::services::password::PasswordSecurity;
use crate::services::throttle::{minutes_ceil, LoginThrottle};

pub struct AuthService {
    supabase: SupabaseClient,
    throttle: LoginThrottle,
}

impl AuthService {
    pub fn new(config: &AppConfig, throttle: LoginThrottle) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            throttle,
        }
    }

    #[instrument(skip(self, form), fields(email = ?form.email))]
    pub async fn login(&self, form: &LoginForm, now: DateTime<Utc>) -> Result<CurrentUser, AuthError> {
        let mut errors = FieldErrors::new();
        errors.require("email", form.email.as_deref(), "Email is required");
        errors.email("email", form.email.as_deref());
        errors.require("password", Some(form.password.as_str()), "Password is required");
        errors.into_result().map_err(AuthError::Validation)?;

        let key = LoginThrottle::normalize_key(form.email.as_deref().unwrap_or_default());

        if let Some(remaining) = self.throttle.lockout_remaining(&key, now).await {
            warn!("Login attempt for locked account {}", key);
            return Err(AuthError::LockedOut {
                minutes: minutes_ceil(remaining),
            });
        }

        let query = Query::table(&EMPLOYERS)
            .select("id,last_name,first_name,email,password_hash,role")
            .ieq("email", &key);
        let employer: Option<EmployerCredentials> = self.supabase.select_one(&query).await?;

        let Some(employer) = employer else {
            debug!("No employer with email {}", key);
            self.throttle.record_failure(&key, now).await;
            return Err(AuthError::InvalidCredentials);
        };

        let check = PasswordSecurity::verify_password(&employer.password_hash, &form.password);
        if !check.valid {
            self.throttle.record_failure(&key, now).await;
            return Err(AuthError::InvalidCredentials);
        }

        self.throttle.clear(&key).await;

        let role: Role = employer.role.parse().map_err(|e| {
            warn!("Employer {} has an unusable role: {}", employer.id, e);
            AuthError::InvalidRole
        })?;

        if check.needs_rehash {
            self.upgrade_password(employer.id, &form.password).await;
        }

        info!("Employer {} signed in", employer.id);

        Ok(CurrentUser {
            id: employer.id,
            email: employer.email.clone(),
            full_name: employer.full_name(),
            role,
        })
    }

    /// Replaces a legacy plaintext password with its PBKDF2 form. Failure
    /// here does not block the login.
    async fn upgrade_password(&self, employer_id: i64, password: &str) {
        let hash = match PasswordSecurity::hash_password(password) {
            Ok(hash) => hash,
            Err(e) => {
                warn!("Could not rehash password for employer {}: {}", employer_id, e);
                return;
            }
        };

        let query = Query::table(&EMPLOYERS).eq("id", employer_id);
        match self
            .supabase
            .update::<serde_json::Value>(&query, json!({ "password_hash": hash }))
            .await
        {
            Ok(_) => info!("Upgraded legacy password for employer {}", employer_id),
            Err(e) => warn!("Could not store rehashed password for employer {}: {}", employer_id, e),
        }
    }
}
