// handlers/protected/mod.rs - Endpoints behind the auth gate
//
// Every handler here runs with verified claims; `user_id` is the tenant id.
pub mod analytic;
pub mod project;
