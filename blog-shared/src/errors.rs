use serde::{Deserialize, Serialize};

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E5xxx: Notification errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    NotFound,

    // Notification (E5xxx)
    NotificationNotFound,
    InvalidPreference,
    SweepInProgress,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::NotFound => "E0003",

            // Notification
            Self::NotificationNotFound => "E5001",
            Self::InvalidPreference => "E5002",
            Self::SweepInProgress => "E5003",
        }
    }

    /// HTTP-equivalent status for callers that surface the error to an end user.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InternalError => 500,
            Self::InvalidPreference => 400,
            Self::NotFound | Self::NotificationNotFound => 404,
            Self::SweepInProgress => 409,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The error code this error maps to when surfaced to a caller.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Internal(_) => ErrorCode::InternalError,
            AppError::Database(diesel::result::Error::NotFound) => ErrorCode::NotFound,
            AppError::Database(_) => ErrorCode::InternalError,
        }
    }

    /// True when the failure was caused by caller input rather than the service.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.error_code().status_code())
    }
}

pub type AppResult<T> = Result<T, AppError>;
