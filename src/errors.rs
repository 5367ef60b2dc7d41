use sea_orm::error::DbErr;
use serde::Serialize;
use uuid::Uuid;

/// Error type shared by every core service.
///
/// The taxonomy is what callers (and tests) branch on; messages are advisory
/// strings only. Validation, conflict and integrity errors are always raised
/// before any write; `PartialFailure` is the one variant that reports writes
/// already committed.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Rejected before any write because it would break a quantity bound
    /// (negative on-hand, remaining above initial, and the like).
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    /// A multi-item operation failed mid-sequence. The writes listed in
    /// `applied` are committed and will not be rolled back; the aggregate
    /// repair operation is the documented recovery path.
    #[error("Partial failure after {applied:?} of {total} items: {message}")]
    PartialFailure {
        /// Zero-based indexes of the items whose writes fully committed.
        applied: Vec<usize>,
        total: usize,
        message: String,
    },

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(Uuid),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// True when no state changed before the error was returned.
    pub fn is_clean(&self) -> bool {
        !matches!(self, ServiceError::PartialFailure { .. })
    }
}
