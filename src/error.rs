use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Opaque failure reported by the hosted backend.
    #[error("{0}")]
    Backend(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Request already in progress")]
    InProgress,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
            || matches!(self, AppError::Database(sqlx::Error::RowNotFound))
    }

    /// Client-side validation failures never reached the backend.
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::InvalidInput(_) | AppError::InProgress)
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(AppError::NotFound("item".into()).is_not_found());
        assert!(AppError::Database(sqlx::Error::RowNotFound).is_not_found());
        assert!(!AppError::Backend("permission denied".into()).is_not_found());
    }

    #[test]
    fn test_backend_message_is_passed_through() {
        let err = AppError::Backend("duplicate key value".into());
        assert_eq!(err.to_string(), "duplicate key value");
        assert!(!err.is_validation());
        assert!(AppError::InvalidInput("name is required".into()).is_validation());
    }
}
