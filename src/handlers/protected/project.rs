// handlers/protected/project.rs - project management for the signed-in tenant
use axum::http::Method;

use crate::api::AppState;
use crate::error::ApiError;
use crate::handlers::{ensure_method, parse_body, reply, reply_created};
use crate::middleware::{AuthGuard, HandlerFuture};

/// POST /project
pub fn create(state: AppState, g: &mut AuthGuard) -> HandlerFuture<'_> {
    Box::pin(async move {
        let result = async {
            ensure_method(g, Method::POST)?;
            let req = parse_body(g).await?;
            let tenant_id = g.user_id().to_string();
            state.projects.create(req, &tenant_id).await
        }
        .await;
        reply_created(g, result).await
    })
}

/// GET /project/list
pub fn list(state: AppState, g: &mut AuthGuard) -> HandlerFuture<'_> {
    Box::pin(async move {
        let result = async {
            ensure_method(g, Method::GET)?;
            let tenant_id = g.user_id().to_string();
            state.projects.list(&tenant_id).await
        }
        .await;
        reply(g, result).await
    })
}

/// GET /project/detail/:id
pub fn detail(state: AppState, g: &mut AuthGuard) -> HandlerFuture<'_> {
    Box::pin(async move {
        let result = async {
            ensure_method(g, Method::GET)?;
            let project_id = g.param("id").unwrap_or_default().to_string();
            let tenant_id = g.user_id().to_string();
            state.projects.detail(&project_id, &tenant_id).await
        }
        .await;
        reply(g, result).await
    })
}

/// GET /project/health/:id
pub fn health(state: AppState, g: &mut AuthGuard) -> HandlerFuture<'_> {
    Box::pin(async move {
        let result = async {
            ensure_method(g, Method::GET)?;
            let project_id = g.param("id").unwrap_or_default().to_string();
            state.projects.health(&project_id).await
        }
        .await;
        reply(g, result).await
    })
}

/// PUT /project/config
pub fn update_config(state: AppState, g: &mut AuthGuard) -> HandlerFuture<'_> {
    Box::pin(async move {
        let result = async {
            ensure_method(g, Method::PUT)?;
            let req = parse_body(g).await?;
            state.configurations.update(req).await?;
            Ok::<_, ApiError>("Project configuration updated")
        }
        .await;
        reply(g, result).await
    })
}
