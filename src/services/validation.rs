use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ApiError;
use crate::types::{CreateProjectRequest, CreateTenantRequest};

pub const MALFORMED_REQUEST: &str = "Request does not match the expected format";

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

static PROJECT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_-]{5,}$").expect("project id pattern compiles"));

/// `local@domain.tld` with a 2+ letter top-level label
pub fn is_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// At least 5 characters of lowercase letters, digits, `_` or `-`
pub fn is_project_id(id: &str) -> bool {
    PROJECT_ID.is_match(id)
}

pub fn validate_create_account(req: &CreateTenantRequest) -> Result<(), ApiError> {
    if req.email.is_empty() || req.name.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request(MALFORMED_REQUEST));
    }
    if !is_email(&req.email) {
        return Err(ApiError::bad_request("Invalid email"));
    }
    if req.password != req.retype_password {
        return Err(ApiError::bad_request("Passwords do not match"));
    }
    Ok(())
}

pub fn validate_create_project(req: &CreateProjectRequest) -> Result<(), ApiError> {
    if req.name.is_empty() {
        return Err(ApiError::bad_request(MALFORMED_REQUEST));
    }
    if !is_project_id(&req.id) {
        return Err(ApiError::bad_request(
            "Project id must be at least 5 characters of lowercase letters, digits, underscore (_) or dash (-)",
        ));
    }
    Ok(())
}
