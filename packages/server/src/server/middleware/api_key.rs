use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::server::error::ApiError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Static API key check for write requests
///
/// Reads (GET, HEAD, OPTIONS) are public. Everything else must present
/// `X-API-Key: <key>` or `Authorization: Bearer <key>`. When no key is
/// configured every request passes.
pub async fn api_key_middleware(
    expected: Option<Arc<str>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(expected) = expected.as_deref().filter(|_| is_write(request.method())) {
        if !is_authorized(request.headers(), expected) {
            debug!(path = %request.uri().path(), "rejected request without valid API key");
            return ApiError::Unauthorized.into_response();
        }
    }

    next.run(request).await
}

fn is_write(method: &Method) -> bool {
    ![Method::GET, Method::HEAD, Method::OPTIONS].contains(method)
}

/// Extract the presented key, preferring `X-API-Key`.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(key) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(key);
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn is_authorized(headers: &HeaderMap, expected: &str) -> bool {
    presented_key(headers).is_some_and(|key| key.trim() == expected.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_x_api_key_header() {
        assert!(is_authorized(&headers(&[("x-api-key", "secret")]), "secret"));
        assert!(!is_authorized(&headers(&[("x-api-key", "wrong")]), "secret"));
    }

    #[test]
    fn test_bearer_token() {
        assert!(is_authorized(&headers(&[("authorization", "Bearer secret")]), "secret"));
        assert!(!is_authorized(&headers(&[("authorization", "secret")]), "secret"));
    }

    #[test]
    fn test_missing_key() {
        assert!(!is_authorized(&HeaderMap::new(), "secret"));
    }

    #[test]
    fn test_only_writes_need_a_key() {
        assert!(!is_write(&Method::GET));
        assert!(!is_write(&Method::OPTIONS));
        assert!(is_write(&Method::POST));
        assert!(is_write(&Method::DELETE));
    }

    #[test]
    fn test_x_api_key_takes_precedence() {
        let map = headers(&[("x-api-key", "wrong"), ("authorization", "Bearer secret")]);
        assert!(!is_authorized(&map, "secret"));
    }
}
