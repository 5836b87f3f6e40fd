//! Database context: the validated (driver, DSN, log level) triple.
//!
//! A context is built once at startup from plain strings and handed to
//! [`DatabaseManager::new`](crate::db::DatabaseManager::new), which keeps it for
//! its whole lifetime.

use crate::db::pool::Dialector;
use crate::error::{DbError, DbResult};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use url::Url;

/// Supported driver aliases, as listed in error messages.
pub const SUPPORTED_DRIVERS: &str = "'mariadb', 'mysql', 'postgres', 'sqlite'";

/// Supported SQL drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Postgres,
    /// Includes MariaDB
    MySql,
    Sqlite,
}

impl Driver {
    /// Resolve a driver alias. Matching is case-sensitive.
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias {
            "postgres" => Some(Self::Postgres),
            "mysql" | "mariadb" => Some(Self::MySql),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Canonical alias for this driver.
    pub fn alias(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }

    /// Get the display name for this driver.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Postgres => "PostgreSQL",
            Self::MySql => "MySQL",
            Self::Sqlite => "SQLite",
        }
    }

    /// Quote an identifier for this dialect, doubling embedded quote characters.
    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            Self::MySql => format!("`{}`", ident.replace('`', "``")),
            Self::Postgres | Self::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Bind placeholder for the `n`-th parameter (1-based).
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Self::Postgres => format!("${}", n),
            Self::MySql | Self::Sqlite => "?".to_string(),
        }
    }
}

impl std::fmt::Display for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Statement logging level for the SQL driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Silent,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Resolve a log level alias; unknown or empty values fall back to `Info`.
    pub fn from_alias(alias: &str) -> Self {
        match alias {
            "silent" => Self::Silent,
            "info" => Self::Info,
            "warning" | "warn" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Silent => "silent",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Level at which the driver logs executed statements.
    pub fn level_filter(&self) -> LevelFilter {
        match self {
            Self::Silent => LevelFilter::Off,
            Self::Info => LevelFilter::Info,
            Self::Warn => LevelFilter::Warn,
            Self::Error => LevelFilter::Error,
        }
    }
}

/// Validated connection settings. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseContext {
    driver: Driver,
    /// Contains sensitive data - log `masked_dsn()` instead
    dsn: String,
    log_level: LogLevel,
}

impl DatabaseContext {
    /// Create a new database context.
    ///
    /// Fails with `InvalidConfig` when `dsn` or `driver` is empty and with
    /// `UnsupportedDriver` when `driver` is not a known alias. An unknown
    /// `log_level` silently resolves to `info`.
    pub fn new(dsn: &str, driver: &str, log_level: &str) -> DbResult<Self> {
        if dsn.is_empty() || driver.is_empty() {
            return Err(DbError::invalid_config(
                "database driver and DSN must not be empty",
            ));
        }

        let driver = Driver::from_alias(driver)
            .ok_or_else(|| DbError::unsupported_driver(driver, SUPPORTED_DRIVERS))?;

        Ok(Self {
            driver,
            dsn: dsn.to_string(),
            log_level: LogLevel::from_alias(log_level),
        })
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    pub fn driver(&self) -> Driver {
        self.driver
    }

    /// Canonical alias of the resolved driver (`mariadb` reports `mysql`).
    pub fn driver_alias(&self) -> &'static str {
        self.driver.alias()
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Statement log level in the driver's own type.
    pub fn logger_level(&self) -> LevelFilter {
        self.log_level.level_filter()
    }

    /// Connection opener for the resolved driver, bound to this DSN.
    pub fn dialector(&self) -> Dialector {
        Dialector::new(self.driver, self.dsn.clone(), self.logger_level())
    }

    /// Get a display-safe version of the DSN (password masked).
    pub fn masked_dsn(&self) -> String {
        match Url::parse(&self.dsn) {
            Ok(mut url) if url.password().is_some() => {
                // set_password only fails for cannot-be-a-base URLs, which have no password
                let _ = url.set_password(Some("****"));
                url.to_string()
            }
            _ => self.dsn.clone(),
        }
    }
}
