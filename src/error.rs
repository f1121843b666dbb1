use crate::store::StoreError;
use std::fmt;

/// The four outcomes a caller of the event service can observe besides success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Conflict,
    DatabaseError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::DatabaseError => "DATABASE_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    /// Raised by the name check, or by the store's unique constraint when a
    /// concurrent writer got there first.
    #[error("{message}")]
    Conflict {
        message: String,
        #[source]
        source: Option<StoreError>,
    },

    #[error("{message}")]
    Database {
        message: String,
        #[source]
        source: StoreError,
    },
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Conflict { .. } => ErrorKind::Conflict,
            ServiceError::Database { .. } => ErrorKind::DatabaseError,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict {
            message: message.into(),
            source: None,
        }
    }

    pub fn database(message: impl Into<String>, source: StoreError) -> Self {
        ServiceError::Database {
            message: message.into(),
            source,
        }
    }
}
