//! Error taxonomy for schema declaration and convergence

use std::fmt;

/// Errors raised while declaring or converging the schema
#[derive(Debug)]
pub enum StructureError {
    /// Invalid builder usage, detected at declaration time
    Declaration(String),
    /// A statement failed at the driver level
    Query {
        /// The statement that failed
        sql: String,
        /// Driver message
        message: String,
    },
    /// A mapper or table was requested but never registered
    Lookup(String),
    /// The memoization store failed
    Cache(String),
    /// Seed data could not be parsed
    Seed(String),
    /// Seed file could not be read
    Io(std::io::Error),
}

impl StructureError {
    /// Shorthand for a failed statement
    pub fn query(sql: impl Into<String>, message: impl fmt::Display) -> Self {
        StructureError::Query {
            sql: sql.into(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureError::Declaration(msg) => write!(f, "Invalid declaration: {msg}"),
            StructureError::Query { sql, message } => {
                write!(f, "Query failed: {message}\nStatement: {sql}")
            }
            StructureError::Lookup(msg) => write!(f, "Lookup error: {msg}"),
            StructureError::Cache(msg) => write!(f, "Cache error: {msg}"),
            StructureError::Seed(msg) => write!(f, "Seed data error: {msg}"),
            StructureError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for StructureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StructureError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StructureError {
    fn from(err: std::io::Error) -> Self {
        StructureError::Io(err)
    }
}

impl From<redis::RedisError> for StructureError {
    fn from(err: redis::RedisError) -> Self {
        StructureError::Cache(err.to_string())
    }
}

impl From<csv::Error> for StructureError {
    fn from(err: csv::Error) -> Self {
        StructureError::Seed(err.to_string())
    }
}

impl From<serde_json::Error> for StructureError {
    fn from(err: serde_json::Error) -> Self {
        StructureError::Seed(err.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, StructureError>;
