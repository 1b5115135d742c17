use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;

use axum::{
    extract::{FromRequestParts, Path, Request},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
        StatusCode,
    },
    response::{IntoResponse, Response},
};
use futures::future::{BoxFuture, FutureExt};
use tracing::Instrument;

use super::guard::{Anonymous, AuthGuard, Guard};
use super::writer::{ResponseWriter, TransportOptions};
use crate::auth::TokenVerifier;
use crate::config::AppConfig;

/// Future returned by a gated handler. Borrowing the guard keeps it owned by the gate.
pub type HandlerFuture<'a> = BoxFuture<'a, anyhow::Result<()>>;

/// Future returned by a gate adapter to axum
pub type GateFuture = BoxFuture<'static, Response>;

/// Turns guard handlers into axum handlers.
///
/// `default_gate` runs any request; `auth_gate` first verifies the bearer
/// token and upgrades the guard identity to its claims.
#[derive(Clone)]
pub struct Gate {
    verifier: TokenVerifier,
    transport: TransportOptions,
    body_limit: usize,
}

impl Gate {
    pub fn new(verifier: TokenVerifier, transport: TransportOptions, body_limit: usize) -> Self {
        Self {
            verifier,
            transport,
            body_limit,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            TokenVerifier::new(&config.security.jwt_secret),
            TransportOptions::from(&config.streaming),
            config.server.max_request_size_bytes,
        )
    }

    pub fn default_gate<H>(&self, handler: H) -> impl Fn(Request) -> GateFuture + Clone + Send + Sync + 'static
    where
        H: for<'a> Fn(&'a mut Guard<Anonymous>) -> HandlerFuture<'a> + Clone + Send + Sync + 'static,
    {
        let gate = self.clone();
        move |request: Request| {
            let gate = gate.clone();
            let handler = handler.clone();
            Box::pin(async move { gate.dispatch(request, Anonymous, handler).await }) as GateFuture
        }
    }

    pub fn auth_gate<H>(&self, handler: H) -> impl Fn(Request) -> GateFuture + Clone + Send + Sync + 'static
    where
        H: for<'a> Fn(&'a mut AuthGuard) -> HandlerFuture<'a> + Clone + Send + Sync + 'static,
    {
        let gate = self.clone();
        move |request: Request| {
            let gate = gate.clone();
            let handler = handler.clone();
            Box::pin(async move {
                let verdict = gate.verifier.authenticate(request.headers().get(AUTHORIZATION));
                match verdict {
                    Ok(claims) => gate.dispatch(request, claims, handler).await,
                    Err(err) => {
                        tracing::warn!(
                            method = %request.method(),
                            path = %request.uri().path(),
                            "rejected request: {}",
                            err
                        );
                        unauthorized(err.response_text())
                    }
                }
            }) as GateFuture
        }
    }

    async fn dispatch<I, H>(&self, request: Request, identity: I, handler: H) -> Response
    where
        I: Send + 'static,
        H: for<'a> Fn(&'a mut Guard<I>) -> HandlerFuture<'a> + Send + 'static,
    {
        let span = tracing::info_span!("gate", method = %request.method(), path = %request.uri().path());
        let (mut parts, body) = request.into_parts();

        let params = match Path::<HashMap<String, String>>::from_request_parts(&mut parts, &()).await {
            Ok(Path(params)) => params,
            Err(_) => HashMap::new(),
        };

        let (writer, pending) = ResponseWriter::channel(self.transport);
        let mut guard = Guard::new(parts, body, params, self.body_limit, writer, identity);

        tokio::spawn(
            async move {
                let outcome = AssertUnwindSafe(handler(&mut guard)).catch_unwind().await;
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        tracing::error!("handler failed: {:#}", err);
                        guard.fallback_error(&err.to_string()).await;
                    }
                    Err(panic) => {
                        tracing::error!("handler panicked: {}", panic_message(panic.as_ref()));
                        guard.fallback_error("Internal Server Error").await;
                    }
                }
            }
            .instrument(span),
        );

        pending.into_response().await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn unauthorized(text: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8"),
            (X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        format!("{}\n", text),
    )
        .into_response()
}
