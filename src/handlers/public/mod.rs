// handlers/public/mod.rs - Endpoints behind the default gate (no token required)
pub mod analytic;
pub mod auth;
pub mod project;
