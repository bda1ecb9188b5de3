//! Access control middleware
//!
//! `require_auth` runs before every handler: protected paths need a bearer
//! credential that the identity service accepts. `cors_layer` answers
//! cross-origin requests from the configured allowlist only.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::response::ApiError;
use crate::access::OriginAllowlist;
use crate::AppState;

/// Reject unauthenticated requests to protected paths.
///
/// On success the verified [`Identity`](crate::identity::Identity) is
/// inserted into the request extensions for handlers to extract.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    if !state.config.access.classifier.is_protected(&path) {
        return next.run(request).await;
    }

    let Some(token) = bearer_token(&request) else {
        tracing::debug!(path = %path, "Missing bearer credential");
        return ApiError::unauthorized("Authentication required").into_response();
    };

    match state.verifier.verify(&token).await {
        Ok(Some(identity)) => {
            tracing::trace!(subject_id = %identity.subject_id, "Verified bearer credential");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Ok(None) => ApiError::unauthorized("Invalid or expired credential").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Credential verification failed");
            ApiError::unavailable("Authentication service unavailable").into_response()
        }
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
fn bearer_token(request: &Request<Body>) -> Option<String> {
    let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// CORS policy backed by the origin allowlist.
///
/// Credentials are allowed, so origins are always matched exactly against
/// the allowlist and never wildcarded.
pub fn cors_layer(origins: OriginAllowlist) -> CorsLayer {
    let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _parts| {
        origin.to_str().is_ok_and(|o| origins.allows(o))
    });

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("hx-request"),
            HeaderName::from_static("hx-target"),
            HeaderName::from_static("hx-current-url"),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 10))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/notes");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(
            bearer_token(&request_with(Some("Bearer abc123"))).as_deref(),
            Some("abc123")
        );
        assert_eq!(
            bearer_token(&request_with(Some("bearer   abc123 "))).as_deref(),
            Some("abc123")
        );
        assert!(bearer_token(&request_with(Some("Basic dXNlcjpwYXNz"))).is_none());
        assert!(bearer_token(&request_with(Some("Bearer "))).is_none());
        assert!(bearer_token(&request_with(Some("abc123"))).is_none());
        assert!(bearer_token(&request_with(None)).is_none());
    }
}
