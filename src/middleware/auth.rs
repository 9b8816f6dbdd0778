use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use regex::Regex;

use crate::auth::{validate_jwt, Claims};
use crate::config::SecurityConfig;
use crate::error::ApiError;

/// Authenticated role context extracted from the JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub role_id: String,
    pub account: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            role_id: claims.sub,
            account: claims.account,
        }
    }
}

/// Bearer-token authentication with a list of path patterns that skip it.
///
/// Built and populated while the server is composed, then shared read-only
/// with the middleware behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Authenticator {
    jwt_secret: String,
    bypass: Vec<Regex>,
}

impl Authenticator {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            bypass: Vec::new(),
        }
    }

    /// `None` when no signing secret is configured
    pub fn from_config(security: &SecurityConfig) -> Option<Self> {
        if security.jwt_secret.is_empty() {
            None
        } else {
            Some(Self::new(security.jwt_secret.clone()))
        }
    }

    /// Add a bypass pattern. Returns `false` when it was already registered.
    pub fn exempt(&mut self, pattern: &str) -> Result<bool, regex::Error> {
        if self.bypass.iter().any(|re| re.as_str() == pattern) {
            return Ok(false);
        }
        self.bypass.push(Regex::new(pattern)?);
        Ok(true)
    }

    pub fn bypass_patterns(&self) -> impl Iterator<Item = &str> {
        self.bypass.iter().map(Regex::as_str)
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.bypass.iter().any(|re| re.is_match(path))
    }

    fn authenticate_headers(&self, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
        let token = extract_jwt_from_headers(headers).map_err(ApiError::unauthorized)?;
        let claims = validate_jwt(&token, &self.jwt_secret)
            .map_err(|e| ApiError::unauthorized(e.to_string()))?;
        Ok(AuthUser::from(claims))
    }
}

/// JWT authentication middleware; requests matching a bypass pattern pass through untouched
pub async fn authenticate(
    State(authenticator): State<Arc<Authenticator>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if authenticator.is_exempt(request.uri().path()) {
        tracing::debug!("Authentication bypassed for {}", request.uri().path());
        return Ok(next.run(request).await);
    }

    let auth_user = authenticator
        .authenticate_headers(request.headers())
        .map_err(|e| {
            tracing::warn!("Rejected {}: {}", request.uri().path(), e);
            e
        })?;

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
