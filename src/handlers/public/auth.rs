// handlers/public/auth.rs - POST /auth/register, POST /auth/login
use axum::http::Method;

use crate::api::AppState;
use crate::handlers::{ensure_method, parse_body, reply, reply_created};
use crate::middleware::{Guard, HandlerFuture};

/// Create a tenant account and return it with a bearer token
pub fn register(state: AppState, g: &mut Guard) -> HandlerFuture<'_> {
    Box::pin(async move {
        let result = async {
            ensure_method(g, Method::POST)?;
            let req = parse_body(g).await?;
            state.auth.register(req).await
        }
        .await;
        reply_created(g, result).await
    })
}

/// Exchange email and password for a bearer token
pub fn login(state: AppState, g: &mut Guard) -> HandlerFuture<'_> {
    Box::pin(async move {
        let result = async {
            ensure_method(g, Method::POST)?;
            let req = parse_body(g).await?;
            state.auth.login(req).await
        }
        .await;
        reply(g, result).await
    })
}
