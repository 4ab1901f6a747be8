use thiserror::Error;

/// Custom error type for schema building and loading operations.
#[derive(Error, Debug)]
pub enum DbError {
    /// Error that occurs during database interactions (e.g., SQL query failure).
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    /// Insert rejected because a referenced parent row does not exist (SQLSTATE 23503).
    #[error("Foreign key violation: {0}")]
    ForeignKey(String),
    /// Any other integrity-class rejection (SQLSTATE 23xxx).
    #[error("Integrity violation: {0}")]
    Integrity(String),
    /// A value exceeded a bounded column length (SQLSTATE 22001).
    #[error("String truncation: {0}")]
    Truncation(String),
    /// Filesystem error while reading codebooks or data files.
    #[error("I/O error: {0}")]
    Io(String),
    /// Malformed codebook source.
    #[error("Codebook error: {0}")]
    Codebook(String),
    /// Configuration error (e.g., invalid database URL or missing parameters).
    #[error("Configuration error: {0}")]
    Config(String),
    /// Connection error (e.g., issues with network or database connection).
    #[error("Connection error: {0}")]
    Connection(String),
}
