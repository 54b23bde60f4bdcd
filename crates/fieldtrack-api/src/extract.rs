//! Request body extractor whose failures render as [`ApiError`].

use axum::{Json, extract::FromRequest};

use crate::error::ApiError;

/// [`Json`] with rejections (missing content type, malformed JSON, wrong
/// field types) answered as 400 `{"message"}` instead of axum's plain-text
/// 415/422.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
