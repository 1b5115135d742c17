// handlers/public/project.rs - DELETE /project/clear
use axum::http::Method;

use crate::api::AppState;
use crate::error::ApiError;
use crate::handlers::{ensure_method, reply};
use crate::middleware::{Guard, HandlerFuture};

/// Remove every project and restart deployments. Intended for test environments.
pub fn clear(state: AppState, g: &mut Guard) -> HandlerFuture<'_> {
    Box::pin(async move {
        let result = async {
            ensure_method(g, Method::DELETE)?;
            state.projects.clear().await?;
            Ok::<_, ApiError>("All projects cleared")
        }
        .await;
        reply(g, result).await
    })
}
