use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::validation::ValidationFailure;

/// Fixed user-facing messages shared by handlers and the error boundary.
pub mod messages {
    pub const SUCCESSFUL_OPERATION: &str = "Operation completed successfully";
    pub const INTERNAL_ERROR: &str = "An internal error has occurred, please try again later";
    pub const REQUEST_CANCELLED: &str = "The request was cancelled";
}

/// ApiResult
///
/// The envelope returned by every business handler.
///
/// A success always carries data and never notifications; a failure always
/// carries at least one notification and never data.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult<T> {
    Success {
        data: T,
        message: String,
        status: StatusCode,
    },
    Failure {
        notifications: Vec<String>,
        status: StatusCode,
    },
}

impl<T> ApiResult<T> {
    /// Success with the default message and 200.
    pub fn successful(data: T) -> Self {
        Self::successful_with(data, messages::SUCCESSFUL_OPERATION, StatusCode::OK)
    }

    pub fn successful_with(data: T, message: impl Into<String>, status: StatusCode) -> Self {
        Self::Success {
            data,
            message: message.into(),
            status,
        }
    }

    /// Failure with a single notification and 400.
    pub fn fail(notification: impl Into<String>) -> Self {
        Self::fail_with(notification, StatusCode::BAD_REQUEST)
    }

    pub fn fail_with(notification: impl Into<String>, status: StatusCode) -> Self {
        Self::Failure {
            notifications: vec![notification.into()],
            status,
        }
    }

    /// Failure carrying several notifications, in the given order.
    ///
    /// An empty list would break the envelope invariant, so it degrades to the
    /// generic internal error message.
    pub fn fail_many(notifications: Vec<String>, status: StatusCode) -> Self {
        if notifications.is_empty() {
            return Self::fail_with(messages::INTERNAL_ERROR, status);
        }
        Self::Failure {
            notifications,
            status,
        }
    }

    /// Failure built from rule violations; one notification per failure.
    pub fn from_failures(failures: Vec<ValidationFailure>) -> Self {
        let notifications = failures.into_iter().map(|f| f.message).collect();
        Self::fail_many(notifications, StatusCode::BAD_REQUEST)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Success { status, .. } | Self::Failure { status, .. } => *status,
        }
    }

    /// The success message; empty for failures.
    pub fn message(&self) -> &str {
        match self {
            Self::Success { message, .. } => message,
            Self::Failure { .. } => "",
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data, .. } => Some(data),
            Self::Failure { .. } => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Success { data, .. } => Some(data),
            Self::Failure { .. } => None,
        }
    }

    pub fn notifications(&self) -> &[String] {
        match self {
            Self::Success { .. } => &[],
            Self::Failure { notifications, .. } => notifications,
        }
    }

    /// Re-types a failure for a different payload. Successes map their data.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResult<U> {
        match self {
            Self::Success {
                data,
                message,
                status,
            } => ApiResult::Success {
                data: f(data),
                message,
                status,
            },
            Self::Failure {
                notifications,
                status,
            } => ApiResult::Failure {
                notifications,
                status,
            },
        }
    }
}

/// NotificationBody
///
/// The wire shape of every failed response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct NotificationBody {
    pub notifications: Vec<String>,
}

impl NotificationBody {
    pub fn single(message: impl Into<String>) -> Self {
        Self {
            notifications: vec![message.into()],
        }
    }
}

/// into_response
///
/// The result-to-response mapper: success renders the data under its status,
/// failure renders `{ "notifications": [...] }` under its status. Nothing else
/// about the envelope (success flag, message) reaches the wire.
impl<T: Serialize> IntoResponse for ApiResult<T> {
    fn into_response(self) -> Response {
        match self {
            Self::Success { data, status, .. } => (status, Json(data)).into_response(),
            Self::Failure {
                notifications,
                status,
            } => (status, Json(NotificationBody { notifications })).into_response(),
        }
    }
}
