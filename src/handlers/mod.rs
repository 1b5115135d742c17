// handlers/mod.rs - Two security tiers
//
// Public handlers run behind the default gate, protected handlers behind the
// auth gate and see the verified claims.
pub mod protected;
pub mod public;

use axum::http::Method;
use serde::{de::DeserializeOwned, Serialize};

use crate::api::AppState;
use crate::error::ApiError;
use crate::middleware::{AuthGuard, Guard, HandlerFuture};

/// Handler behind the default gate
pub type PublicHandler = for<'a> fn(AppState, &'a mut Guard) -> HandlerFuture<'a>;

/// Handler behind the auth gate
pub type ProtectedHandler = for<'a> fn(AppState, &'a mut AuthGuard) -> HandlerFuture<'a>;

pub fn ensure_method<I>(g: &Guard<I>, method: Method) -> Result<(), ApiError> {
    if g.is_method(method) {
        Ok(())
    } else {
        Err(ApiError::method_not_allowed())
    }
}

pub async fn parse_body<I, T: DeserializeOwned>(g: &mut Guard<I>) -> Result<T, ApiError> {
    g.body_parser().await.map_err(ApiError::from)
}

/// Write `result` as a success envelope, or as its error envelope
pub async fn reply<I, T: Serialize>(g: &mut Guard<I>, result: Result<T, ApiError>) -> anyhow::Result<()> {
    match result {
        Ok(data) => g.return_success(&data).await?,
        Err(err) => g.return_api_error(&err).await?,
    }
    Ok(())
}

/// Like `reply`, with the created envelope on success
pub async fn reply_created<I, T: Serialize>(g: &mut Guard<I>, result: Result<T, ApiError>) -> anyhow::Result<()> {
    match result {
        Ok(data) => g.return_created(&data).await?,
        Err(err) => g.return_api_error(&err).await?,
    }
    Ok(())
}
