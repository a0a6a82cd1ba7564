use std::{env, fmt::Display, path::PathBuf, str::FromStr, sync::Arc};

use chrono::Duration;
use potion::HtmlError;

use crate::constants::{DEFAULT_JWT_LIFETIME_HOURS, MAX_JWT_LIFETIME_HOURS};

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: Arc<str>,
    pub jwt_lifetime: Duration,
    pub media_root: PathBuf,
    pub media_url: String,
    pub site_url: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, potion::Error> {
        let database_url = var("DATABASE_URL").ok_or_else(|| {
            log::error!("DATABASE_URL is not set");
            HtmlError::InternalServerError.new("DATABASE_URL is not set")
        })?;

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            log::warn!("JWT_SECRET not set, using an insecure default");
            String::from("secret")
        });

        Ok(Self {
            database_url,
            jwt_secret: Arc::from(jwt_secret),
            jwt_lifetime: jwt_lifetime(try_load("JWT_LIFETIME_HOURS", DEFAULT_JWT_LIFETIME_HOURS)),
            media_root: PathBuf::from(try_load("MEDIA_ROOT", String::from("media"))),
            media_url: try_load("MEDIA_URL", String::from("/media/")),
            site_url: try_load("SITE_URL", String::from("http://localhost:8000")),
        })
    }
}

/// Lifetimes outside `1..=MAX_JWT_LIFETIME_HOURS` fall back to the default.
fn jwt_lifetime(hours: i64) -> Duration {
    Some(hours)
        .filter(|hours| (1..=MAX_JWT_LIFETIME_HOURS).contains(hours))
        .and_then(Duration::try_hours)
        .unwrap_or_else(|| {
            log::warn!(
                "JWT_LIFETIME_HOURS={hours} is out of range, using default: {}",
                DEFAULT_JWT_LIFETIME_HOURS
            );
            Duration::hours(DEFAULT_JWT_LIFETIME_HOURS)
        })
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Some(value) => value.parse().unwrap_or_else(|e| {
            log::warn!("Invalid {key} value: {e}, using default: {default}");
            default
        }),
        None => {
            log::info!("{key} not set, using default: {default}");
            default
        }
    }
}
