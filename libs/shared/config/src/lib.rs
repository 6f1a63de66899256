use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub session_secret: String,
    pub session_ttl_minutes: i64,
    pub login_max_attempts: u32,
    pub login_lockout_minutes: i64,
    pub cookie_secure: bool,
    pub bind_address: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            session_secret: env::var("SESSION_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SESSION_SECRET not set, using empty value");
                    String::new()
                }),
            session_ttl_minutes: parse_or("SESSION_TTL_MINUTES", 30),
            login_max_attempts: parse_or("LOGIN_MAX_ATTEMPTS", 5),
            login_lockout_minutes: parse_or("LOGIN_LOCKOUT_MINUTES", 15),
            cookie_secure: parse_or("COOKIE_SECURE", true),
            bind_address: env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_key.is_empty()
            && !self.session_secret.is_empty()
    }
}

fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value ({}), using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_on_garbage() {
        env::set_var("CABINET_TEST_BAD_NUMBER", "thirty");
        assert_eq!(parse_or("CABINET_TEST_BAD_NUMBER", 30i64), 30);

        env::set_var("CABINET_TEST_GOOD_NUMBER", " 45 ");
        assert_eq!(parse_or("CABINET_TEST_GOOD_NUMBER", 30i64), 45);

        assert!(parse_or("CABINET_TEST_UNSET_FLAG", true));
    }

    #[test]
    fn is_configured_needs_url_key_and_secret() {
        let mut config = AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "key".to_string(),
            session_secret: String::new(),
            session_ttl_minutes: 30,
            login_max_attempts: 5,
            login_lockout_minutes: 15,
            cookie_secure: false,
            bind_address: "127.0.0.1:3000".to_string(),
        };
        assert!(!config.is_configured());

        config.session_secret = "secret".to_string();
        assert!(config.is_configured());
    }
}
