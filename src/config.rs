use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

use crate::error::{CrmError, Result};

pub const PORT_VAR: &str = "CRM_PORT";
pub const DATABASE_VAR: &str = "CRM_DATABASE";
pub const JWT_SECRET_VAR: &str = "CRM_JWT_SECRET";
pub const TOKEN_TTL_VAR: &str = "CRM_TOKEN_TTL_HOURS";
pub const CORS_ORIGIN_VAR: &str = "CRM_CORS_ORIGIN";

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DATABASE: &str = "crm.db";
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Runtime settings, read from the environment.
#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database: PathBuf,
    pub jwt_secret: Option<String>,
    pub token_ttl_hours: i64,
    /// Allowed browser origin; any origin when unset.
    pub cors_origin: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("database", &self.database)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("cors_origin", &self.cors_origin)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database: PathBuf::from(DEFAULT_DATABASE),
            jwt_secret: None,
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            cors_origin: None,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Unparseable values fall back to
    /// their default with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let token_ttl_hours = try_load(&lookup, TOKEN_TTL_VAR, defaults.token_ttl_hours);

        Self {
            port: try_load(&lookup, PORT_VAR, defaults.port),
            database: non_empty(&lookup, DATABASE_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.database),
            jwt_secret: non_empty(&lookup, JWT_SECRET_VAR),
            token_ttl_hours: if token_ttl_hours > 0 {
                token_ttl_hours
            } else {
                warn!("{TOKEN_TTL_VAR} must be positive, using default: {DEFAULT_TOKEN_TTL_HOURS}");
                DEFAULT_TOKEN_TTL_HOURS
            },
            cors_origin: non_empty(&lookup, CORS_ORIGIN_VAR),
        }
    }

    /// The signing secret; serving or minting tokens without one is an error.
    pub fn require_jwt_secret(&self) -> Result<&str> {
        self.jwt_secret.as_deref().ok_or_else(|| {
            CrmError::Config(format!(
                "{JWT_SECRET_VAR} is not set; it is required to sign and verify tokens"
            ))
        })
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.token_ttl_hours)
            .unwrap_or_else(|| chrono::Duration::hours(DEFAULT_TOKEN_TTL_HOURS))
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn try_load<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match non_empty(lookup, key) {
        None => {
            info!("{key} not set, using default: {default}");
            default
        }
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value '{raw}': {e}, using default: {default}");
            default
        }),
    }
}
