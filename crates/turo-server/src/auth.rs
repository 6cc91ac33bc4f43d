//! Caller identity extraction.

use std::collections::HashMap;

use axum::http::HeaderMap;

/// Resolves the authenticated user id from a bearer token, if the token is
/// present and provisioned.
pub fn authenticate(headers: &HeaderMap, tokens: &HashMap<String, String>) -> Option<String> {
    let token = bearer_token(headers)?;
    tokens.get(token).cloned()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// First hop of `x-forwarded-for`, or a shared "unknown" bucket for callers
/// with no attributable address. The shared bucket is an accepted
/// imprecision for the unauthenticated endpoint.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
