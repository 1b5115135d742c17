pub mod analytic;
pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod grpc;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod types;

#[cfg(test)]
pub mod testing;
