use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr};

use tracing::{info, warn};

use crate::error::{QuestError, Result};

const SECRETS_DIR: &str = "/run/secrets";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: PathBuf,
    /// Bearer token required by the cron route; `None` leaves it open.
    pub cron_secret: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self {
            port: try_load("QUESTS_PORT", "8080")?,
            database_path: try_load("QUESTS_DATABASE", "./db/quests.db")?,
            cron_secret: optional_secret("CRON_SECRET_TOKEN"),
        })
    }

    pub fn address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        QuestError::Config(format!("invalid {key} value {raw:?}: {e}"))
    })
}

/// Environment first, then the mounted secret file. Empty values count as unset.
fn optional_secret(secret_name: &str) -> Option<String> {
    if let Some(value) = var(secret_name) {
        return Some(value.trim().to_string());
    }

    let path = PathBuf::from(SECRETS_DIR).join(secret_name);
    match read_to_string(&path) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        Ok(_) => None,
        Err(_) => {
            info!("{secret_name} not configured, route left unprotected");
            None
        }
    }
}
