use sqlx::postgres::PgConnectOptions;

use crate::error::{DssError, DssResult};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_LOG_FILTER: &str = "guidance_dss=info";

const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_USER: &str = "postgres";
const DEFAULT_DB_NAME: &str = "ICTCOORdb";
const DB_PART_KEYS: [&str; 5] = ["DB_HOST", "DB_PORT", "DB_USER", "DB_PASSWORD", "DB_NAME"];

/// Where the report database lives: a full URL, or the discrete `DB_*`
/// settings the school portal deploys with.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseSettings {
    Url(String),
    Parts {
        host: String,
        port: u16,
        user: String,
        password: Option<String>,
        name: String,
    },
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> DssResult<PgConnectOptions> {
        match self {
            DatabaseSettings::Url(url) => Ok(url.parse::<PgConnectOptions>()?),
            DatabaseSettings::Parts {
                host,
                port,
                user,
                password,
                name,
            } => {
                let options = PgConnectOptions::new()
                    .host(host)
                    .port(*port)
                    .username(user)
                    .database(name);
                Ok(match password {
                    Some(password) => options.password(password),
                    None => options,
                })
            }
        }
    }
}

/// Database settings read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database: Option<DatabaseSettings>,
    pub max_connections: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// Load a `.env` file from the working directory if there is one.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Tracing filter from `DSS_LOG`, independent of database settings.
pub fn log_filter_from_env() -> String {
    log_filter_from_lookup(|key| std::env::var(key).ok())
}

pub fn log_filter_from_lookup<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("DSS_LOG")
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

impl Config {
    pub fn from_env() -> DssResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    ///
    /// `DATABASE_URL` wins. Otherwise any `DB_*` key switches to discrete
    /// settings, with the portal's defaults for the keys left out.
    pub fn from_lookup<F>(lookup: F) -> DssResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let max_connections = match get("DSS_DB_MAX_CONNECTIONS") {
            Some(raw) => raw.trim().parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                DssError::Config {
                    message: format!("DSS_DB_MAX_CONNECTIONS must be a positive integer, got {raw:?}"),
                }
            })?,
            None => defaults.max_connections,
        };

        let database = if let Some(url) = get("DATABASE_URL") {
            Some(DatabaseSettings::Url(url))
        } else if DB_PART_KEYS.iter().any(|key| get(*key).is_some()) {
            let port = match get("DB_PORT") {
                Some(raw) => raw.trim().parse::<u16>().map_err(|_| DssError::Config {
                    message: format!("DB_PORT must be a port number, got {raw:?}"),
                })?,
                None => DEFAULT_DB_PORT,
            };
            Some(DatabaseSettings::Parts {
                host: get("DB_HOST").unwrap_or_else(|| DEFAULT_DB_HOST.to_string()),
                port,
                user: get("DB_USER").unwrap_or_else(|| DEFAULT_DB_USER.to_string()),
                password: get("DB_PASSWORD"),
                name: get("DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
            })
        } else {
            None
        };

        Ok(Self {
            database,
            max_connections,
        })
    }

    pub fn require_database(&self) -> DssResult<&DatabaseSettings> {
        self.database.as_ref().ok_or(DssError::MissingDatabaseUrl)
    }
}
