//! Réponses CORS préliminaires pour l'API
//!
//! Toute requête `OPTIONS` sous [`API_PREFIX`] reçoit la même réponse, que
//! le chemin corresponde à une route ou non. Les autres requêtes passent.

use crate::server::API_PREFIX;
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Méthodes annoncées aux appelants cross-origin
pub const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";

/// Durée de validité de la réponse préliminaire
pub const PREFLIGHT_MAX_AGE_SECS: u64 = 86_400;

/// `true` si le chemin est sous [`API_PREFIX`]
pub fn is_api_path(path: &str) -> bool {
    path == API_PREFIX
        || path
            .strip_prefix(API_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// En-têtes de la réponse préliminaire
pub fn preflight_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from(PREFLIGHT_MAX_AGE_SECS),
    );
    headers
}

/// Middleware : répond aux `OPTIONS` de l'API sans atteindre le routage
pub async fn api_preflight(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS && is_api_path(request.uri().path()) {
        return (StatusCode::NO_CONTENT, preflight_headers()).into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_api_path() {
        assert!(is_api_path("/api"));
        assert!(is_api_path("/api/"));
        assert!(is_api_path("/api/logs/log_setup"));
        assert!(!is_api_path("/apiary"));
        assert!(!is_api_path("/index.html"));
    }

    #[test]
    fn test_preflight_headers() {
        let headers = preflight_headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], ALLOWED_METHODS);
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "86400");
    }
}
