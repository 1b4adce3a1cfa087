//! Authentication middleware
//!
//! Publishes the per-request carrier entries the request context reads:
//! the [`AuthState`] and the cancellation token. Neither stage rejects a
//! request; routes decide what they require.

use crate::request::AuthState;
use crate::state::SharedState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Verify an optional bearer token and record the outcome in the request
/// extensions.
///
/// A missing header yields an anonymous state. A malformed or failing token
/// is logged and also treated as anonymous.
pub async fn authenticate(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_state = match bearer_token(request.headers()) {
        None => AuthState::anonymous(),
        Some(token) => match state.services.jwt.verify(token) {
            Ok((token, claims)) => {
                debug!(sub = %claims.sub, role = %claims.role, "bearer token verified");
                AuthState::authenticated(token, claims)
            }
            Err(e) => {
                warn!(error = %e, "bearer token rejected, continuing unauthenticated");
                AuthState::anonymous()
            }
        },
    };

    request.extensions_mut().insert(auth_state);
    next.run(request).await
}

/// Attach a cancellation token that fires once the request is finished or
/// its future is dropped (client disconnect, timeout).
pub async fn processing_context(mut request: Request, next: Next) -> Response {
    let token = CancellationToken::new();
    request.extensions_mut().insert(token.clone());

    let _guard = token.drop_guard();
    next.run(request).await
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?;
    let Ok(value) = value.to_str() else {
        debug!("authorization header is not valid UTF-8");
        return None;
    };

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Some(token.trim()),
        _ => {
            debug!("authorization header is not a bearer credential");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def.ghi")), Some("abc.def.ghi"));
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_non_bearer_scheme() {
        assert_eq!(bearer_token(&headers_with("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers_with("Bearer   ")), None);
    }
}
