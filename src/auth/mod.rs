use axum::http::HeaderValue;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Signing methods accepted by the verifier. Anything outside the HMAC family is
/// rejected before the signature is looked at.
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Verified identity carried by a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("no token provided")]
    MissingHeader,

    #[error("invalid token format")]
    InvalidFormat,

    #[error("unexpected signing method: {0:?}")]
    UnexpectedAlgorithm(Algorithm),

    #[error("invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),

    #[error("invalid claims: {0}")]
    InvalidClaims(String),

    #[error("token expiry is out of range")]
    ExpiryOutOfRange,

    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("JWT generation error: {0}")]
    Issue(jsonwebtoken::errors::Error),
}

impl TokenError {
    /// Plain-text body written by the auth gate for this rejection
    pub fn response_text(&self) -> &'static str {
        match self {
            TokenError::MissingHeader => "Unauthorized - No token provided",
            TokenError::InvalidFormat => "Unauthorized - Invalid token format",
            _ => "Unauthorized",
        }
    }
}

/// Signs tokens for freshly registered or logged-in tenants
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    issuer: String,
    /// `None` when the configured expiry does not fit a timestamp
    ttl: Option<Duration>,
    configured: bool,
}

impl TokenIssuer {
    pub fn new(secret: &str, issuer: impl Into<String>, expiry_hours: u64) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            ttl: i64::try_from(expiry_hours).ok().and_then(Duration::try_hours),
            configured: !secret.is_empty(),
        }
    }

    pub fn issue(&self, user_id: &str) -> Result<String, TokenError> {
        if !self.configured {
            return Err(TokenError::MissingSecret);
        }

        let now = Utc::now();
        let exp = self
            .ttl
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(TokenError::ExpiryOutOfRange)?;
        let claims = Claims {
            user_id: user_id.to_string(),
            iss: Some(self.issuer.clone()),
            sub: None,
            iat: Some(now.timestamp()),
            exp: Some(exp.timestamp()),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.key).map_err(TokenError::Issue)
    }
}

/// Checks bearer tokens against the shared secret
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
    configured: bool,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            configured: !secret.is_empty(),
        }
    }

    /// Run the whole header → claims sequence for one request
    pub fn authenticate(&self, authorization: Option<&HeaderValue>) -> Result<Claims, TokenError> {
        let token = extract_bearer_token(authorization)?;
        self.verify(token)
    }

    /// Verify signature, algorithm family and expiry, then decode typed claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if !self.configured {
            return Err(TokenError::MissingSecret);
        }

        let header = decode_header(token).map_err(TokenError::Invalid)?;
        if !HMAC_ALGORITHMS.contains(&header.alg) {
            return Err(TokenError::UnexpectedAlgorithm(header.alg));
        }

        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::Json(inner) => TokenError::InvalidClaims(inner.to_string()),
            _ => TokenError::Invalid(e),
        })?;

        Ok(data.claims)
    }
}

/// Extract the token from an `Authorization` header value.
///
/// A leading `Bearer` is stripped when present and surrounding whitespace is
/// trimmed; whatever remains must be non-empty.
pub fn extract_bearer_token(authorization: Option<&HeaderValue>) -> Result<&str, TokenError> {
    let value = authorization.ok_or(TokenError::MissingHeader)?;
    let raw = value.to_str().map_err(|_| TokenError::InvalidFormat)?;
    if raw.is_empty() {
        return Err(TokenError::MissingHeader);
    }

    let token = raw.strip_prefix("Bearer").unwrap_or(raw).trim();
    if token.is_empty() {
        return Err(TokenError::InvalidFormat);
    }

    Ok(token)
}
