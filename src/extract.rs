use axum::extract::{FromRequest, FromRequestParts, Path, Query};
use axum::Json;

use crate::error::AppError;

/// ApiJson
///
/// `Json` whose rejection is rendered as a notification body (400) instead of
/// axum's plain-text default.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// ApiPath
///
/// `Path` with the same rejection handling as `ApiJson`; a path id that is not
/// a UUID becomes a 400.
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
