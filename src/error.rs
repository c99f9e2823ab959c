use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use tokio_util::sync::CancellationToken;

use crate::result::{NotificationBody, messages};

/// PersistenceError
///
/// Failures raised below the repository traits. None of them is an expected
/// business outcome.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
    /// A unique index rejected the write. Carries the index name.
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("operation cancelled before it started")]
    Cancelled,
    // Used by the in-memory database to simulate an unreachable store.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// AppError
///
/// Everything a handler cannot express as an `ApiResult`. Caught exactly once,
/// at the HTTP boundary, by the `IntoResponse` impl below.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Persistence(PersistenceError),
    #[error("request cancelled")]
    Cancelled,
    /// The request could not be turned into a typed command (malformed JSON,
    /// bad path segment, bad query string).
    #[error("malformed request: {0}")]
    Rejected(String),
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err
            && db.is_unique_violation()
        {
            let index = db.constraint().unwrap_or("unique index").to_string();
            return PersistenceError::Conflict(index);
        }
        PersistenceError::Database(err)
    }
}

impl From<PersistenceError> for AppError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Cancelled => AppError::Cancelled,
            other => AppError::Persistence(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Rejected(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Rejected(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Rejected(rejection.body_text())
    }
}

/// ensure_active
///
/// Called by handlers right before their first write.
pub fn ensure_active(cancel: &CancellationToken) -> Result<(), AppError> {
    if cancel.is_cancelled() {
        return Err(AppError::Cancelled);
    }
    Ok(())
}

impl IntoResponse for AppError {
    /// into_response
    ///
    /// Malformed requests become a 400 carrying the extractor message.
    /// Infrastructure failures are logged in full and rendered as the generic
    /// internal error so no detail leaks to the caller.
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Rejected(message) => {
                tracing::debug!(%message, "rejected malformed request");
                (StatusCode::BAD_REQUEST, NotificationBody::single(message))
            }
            AppError::Cancelled => {
                tracing::warn!("request cancelled before completing its writes");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    NotificationBody::single(messages::REQUEST_CANCELLED),
                )
            }
            AppError::Persistence(err) => {
                tracing::error!(error = %err, "an unexpected exception was thrown");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    NotificationBody::single(messages::INTERNAL_ERROR),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// panic_response
///
/// Response used by the `CatchPanicLayer` boundary: same shape and message as
/// any other unexpected failure.
pub fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(NotificationBody::single(messages::INTERNAL_ERROR)),
    )
        .into_response()
}
