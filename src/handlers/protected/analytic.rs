// handlers/protected/analytic.rs - GET /analytic/:id
use axum::http::Method;

use crate::api::AppState;
use crate::error::ApiError;
use crate::handlers::{ensure_method, reply};
use crate::middleware::{AuthGuard, HandlerFuture};

/// Latest analytics for one project as a normal envelope
pub fn snapshot(state: AppState, g: &mut AuthGuard) -> HandlerFuture<'_> {
    Box::pin(async move {
        let result = async {
            ensure_method(g, Method::GET)?;
            let project_id = g.param("id").unwrap_or_default().to_string();
            state.relay.snapshot(&project_id).await.map_err(ApiError::from)
        }
        .await;
        reply(g, result).await
    })
}
