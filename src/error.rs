//! Error types for dbfront.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Construction-time variants name the resource that failed (driver alias, file path)
//! so a caller can act on them without re-reading its configuration.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid database configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Unsupported SQL driver '{driver}', supported drivers: {supported}")]
    UnsupportedDriver { driver: String, supported: String },

    #[error("Failed to initialize {driver} connection: {message}")]
    Init {
        driver: String,
        message: String,
        suggestion: String,
    },

    #[error("Failed to cache SQL query from '{path}': {source}")]
    QueryLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Seed failed for '{path}': {message}")]
    Seed { path: String, message: String },

    #[error("SQL query '{name}' not found")]
    QueryNotFound { name: String },

    #[error("Record not found in '{table}'")]
    NotFound { table: String },

    #[error("Constraint violation: {message}")]
    ConstraintViolation {
        message: String,
        constraint: Option<String>,
    },

    #[error("Execution error: {message}")]
    Execution {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
    },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Timeout: {operation} exceeded {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Cancelled: {operation}")]
    Cancelled { operation: String },

    #[error("Transaction error: {message}")]
    Transaction { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an unsupported driver error listing the supported aliases.
    pub fn unsupported_driver(driver: impl Into<String>, supported: impl Into<String>) -> Self {
        Self::UnsupportedDriver {
            driver: driver.into(),
            supported: supported.into(),
        }
    }

    /// Create an initialization error with a helpful suggestion.
    pub fn init(
        driver: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Init {
            driver: driver.into(),
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a query load error for the file at `path`.
    pub fn query_load(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::QueryLoad {
            path: path.into(),
            source,
        }
    }

    /// Create a seed error for the file at `path`.
    pub fn seed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Seed {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn query_not_found(name: impl Into<String>) -> Self {
        Self::QueryNotFound { name: name.into() }
    }

    pub fn not_found(table: impl Into<String>) -> Self {
        Self::NotFound {
            table: table.into(),
        }
    }

    /// Create a constraint violation error.
    pub fn constraint_violation(message: impl Into<String>, constraint: Option<String>) -> Self {
        Self::ConstraintViolation {
            message: message.into(),
            constraint,
        }
    }

    /// Create an execution error with optional SQL state.
    pub fn execution(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Execution {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a transaction error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Init { suggestion, .. } => Some(suggestion),
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }

    /// Check if this error reports a zero-row terminal read.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                match db_err.kind() {
                    sqlx::error::ErrorKind::UniqueViolation
                    | sqlx::error::ErrorKind::ForeignKeyViolation
                    | sqlx::error::ErrorKind::NotNullViolation
                    | sqlx::error::ErrorKind::CheckViolation => DbError::constraint_violation(
                        db_err.message(),
                        db_err.constraint().map(String::from),
                    ),
                    _ => DbError::execution(db_err.message(), code),
                }
            }
            sqlx::Error::RowNotFound => DbError::not_found("<query>"),
            sqlx::Error::PoolTimedOut => DbError::timeout("connection pool acquire", 0),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => {
                DbError::execution(format!("Type not found: {}", type_name), None)
            }
            sqlx::Error::ColumnNotFound(col) => {
                DbError::execution(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::execution(format!("Unknown database error: {}", err), None),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
