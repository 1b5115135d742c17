// handlers/public/analytic.rs - GET /analytic?project_id= (server-sent events)
use crate::api::AppState;
use crate::middleware::{Guard, HandlerFuture};

/// Relay live analytics for one project until the client leaves or upstream ends
pub fn stream(state: AppState, g: &mut Guard) -> HandlerFuture<'_> {
    Box::pin(async move {
        let project_id = g.query("project_id").unwrap_or_default();
        let outcome = state.relay.relay(g, &project_id).await?;
        tracing::debug!(project_id = %project_id, ?outcome, "analytic relay finished");
        Ok(())
    })
}
