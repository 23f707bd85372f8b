use axum::http::{HeaderName, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

const ALLOWED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::OPTIONS,
];

fn allowed_headers() -> [HeaderName; 5] {
    [
        HeaderName::from_static("content-type"),
        HeaderName::from_static("authorization"),
        HeaderName::from_static("x-api-key"),
        HeaderName::from_static("x-user-id"),
        HeaderName::from_static("x-request-id"),
    ]
}

/// CORS for the configured origins. `*` or an empty list mirrors the request
/// origin so cookies still work in development.
pub fn create_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(allowed_headers());

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        tracing::debug!("CORS: mirroring request origin");
        return base
            .allow_origin(AllowOrigin::mirror_request())
            .allow_credentials(true);
    }

    let origins: Vec<_> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "CORS: invalid origin ignored");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        // Credentials cannot be combined with a wildcard origin
        tracing::warn!("CORS: no valid origins configured, allowing any origin without credentials");
        base.allow_origin(Any).allow_credentials(false)
    } else {
        base.allow_origin(origins).allow_credentials(true)
    }
}
