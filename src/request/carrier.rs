//! Authentication state carrier
//!
//! The request extensions an upstream stage must publish before a
//! [`RequestContext`](super::RequestContext) can be built:
//!
//! | entry | type | on absence |
//! |---|---|---|
//! | request id | [`RequestId`] | construction fails |
//! | auth state | [`AuthState`] | unauthenticated, logged |
//! | cancellation | [`CancellationToken`] | fresh token |

use crate::auth::{Claims, DecodedToken};
use crate::error::ContextError;
use axum::http::Extensions;
use tokio_util::sync::CancellationToken;
use tower_http::request_id::RequestId;
use tracing::error;
use uuid::Uuid;

/// Outcome of the authentication stage.
///
/// `token` and `claims` are only meaningful when `authenticated` is set.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub authenticated: bool,
    pub token: Option<DecodedToken>,
    pub claims: Option<Claims>,
}

impl AuthState {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(token: DecodedToken, claims: Claims) -> Self {
        Self {
            authenticated: true,
            token: Some(token),
            claims: Some(claims),
        }
    }
}

/// Read the request id assigned by the request-id layer.
pub fn request_id(extensions: &Extensions) -> Result<Uuid, ContextError> {
    let id = extensions
        .get::<RequestId>()
        .ok_or(ContextError::MissingRequestId)?;

    let raw = id
        .header_value()
        .to_str()
        .map_err(|_| ContextError::InvalidRequestId(format!("{:?}", id.header_value())))?;

    Uuid::parse_str(raw).map_err(|_| ContextError::InvalidRequestId(raw.to_string()))
}

/// Read the auth state, degrading to unauthenticated.
///
/// Every missing piece is logged at error level but never fails: public
/// routes must still be served when the authentication stage misbehaves.
pub fn auth_state(extensions: &Extensions) -> AuthState {
    let Some(state) = extensions.get::<AuthState>() else {
        error!("cannot extract authenticated flag from request extensions");
        return AuthState::anonymous();
    };

    if !state.authenticated {
        return AuthState::anonymous();
    }

    if state.token.is_none() {
        error!("cannot extract token from an authenticated request");
    }
    if state.claims.is_none() {
        error!("cannot extract claims from an authenticated request");
    }

    state.clone()
}

/// The request's cancellation signal, or a token nobody will cancel when the
/// processing-context stage is not installed.
pub fn processing_context(extensions: &Extensions) -> CancellationToken {
    extensions
        .get::<CancellationToken>()
        .cloned()
        .unwrap_or_else(CancellationToken::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{test_support, Role};
    use axum::http::HeaderValue;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` under a subscriber that records its output, and return the
    /// ERROR lines it logged.
    fn error_lines<R>(f: impl FnOnce() -> R) -> Vec<String> {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .finish();

        tracing::subscriber::with_default(subscriber, f);

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        output
            .lines()
            .filter(|line| line.contains("ERROR"))
            .map(str::to_string)
            .collect()
    }

    fn with_request_id(value: &'static str) -> Extensions {
        let mut extensions = Extensions::new();
        extensions.insert(RequestId::new(HeaderValue::from_static(value)));
        extensions
    }

    #[test]
    fn test_request_id_parsed() {
        let extensions = with_request_id("11111111-1111-1111-1111-111111111111");
        assert_eq!(
            request_id(&extensions).unwrap(),
            Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap()
        );
    }

    #[test]
    fn test_missing_request_id_is_fatal() {
        let err = request_id(&Extensions::new()).unwrap_err();
        assert!(matches!(err, ContextError::MissingRequestId));
    }

    #[test]
    fn test_non_uuid_request_id_is_invalid() {
        let err = request_id(&with_request_id("req-42")).unwrap_err();
        assert!(matches!(err, ContextError::InvalidRequestId(ref raw) if raw == "req-42"));
    }

    #[test]
    fn test_missing_auth_state_degrades_to_anonymous() {
        let state = auth_state(&Extensions::new());
        assert!(!state.authenticated);
        assert!(state.token.is_none());
        assert!(state.claims.is_none());
    }

    #[test]
    fn test_unauthenticated_state_drops_stray_claims() {
        let (_, claims) = test_support::verified(Role::Admin);
        let mut extensions = Extensions::new();
        extensions.insert(AuthState {
            authenticated: false,
            token: None,
            claims: Some(claims),
        });

        assert!(auth_state(&extensions).claims.is_none());
    }

    #[test]
    fn test_token_and_claims_extracted_independently() {
        let (token, _) = test_support::verified(Role::User);
        let mut extensions = Extensions::new();
        extensions.insert(AuthState {
            authenticated: true,
            token: Some(token),
            claims: None,
        });

        let state = auth_state(&extensions);
        assert!(state.authenticated);
        assert!(state.token.is_some());
        assert!(state.claims.is_none());
    }

    #[test]
    fn test_claims_survive_missing_token() {
        let (_, claims) = test_support::verified(Role::User);
        let mut extensions = Extensions::new();
        extensions.insert(AuthState {
            authenticated: true,
            token: None,
            claims: Some(claims.clone()),
        });

        let state = auth_state(&extensions);
        assert!(state.authenticated);
        assert!(state.token.is_none());
        assert_eq!(state.claims, Some(claims));
    }

    #[test]
    fn test_missing_auth_state_logs_one_error() {
        let lines = error_lines(|| auth_state(&Extensions::new()));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("cannot extract authenticated flag"));
    }

    #[test]
    fn test_missing_token_and_claims_each_log_an_error() {
        let mut extensions = Extensions::new();
        extensions.insert(AuthState {
            authenticated: true,
            token: None,
            claims: None,
        });

        let lines = error_lines(|| auth_state(&extensions));
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().any(|l| l.contains("cannot extract token")));
        assert!(lines.iter().any(|l| l.contains("cannot extract claims")));
    }

    #[test]
    fn test_missing_token_alone_logs_one_error() {
        let (_, claims) = test_support::verified(Role::User);
        let mut extensions = Extensions::new();
        extensions.insert(AuthState {
            authenticated: true,
            token: None,
            claims: Some(claims),
        });

        let lines = error_lines(|| auth_state(&extensions));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("cannot extract token"));
    }

    #[test]
    fn test_complete_or_anonymous_state_logs_nothing() {
        let (token, claims) = test_support::verified(Role::Admin);
        let mut extensions = Extensions::new();
        extensions.insert(AuthState::authenticated(token, claims));
        assert!(error_lines(|| auth_state(&extensions)).is_empty());

        let mut extensions = Extensions::new();
        extensions.insert(AuthState::anonymous());
        assert!(error_lines(|| auth_state(&extensions)).is_empty());
    }

    #[test]
    fn test_processing_context_defaults_to_live_token() {
        assert!(!processing_context(&Extensions::new()).is_cancelled());

        let token = CancellationToken::new();
        let mut extensions = Extensions::new();
        extensions.insert(token.clone());
        token.cancel();
        assert!(processing_context(&extensions).is_cancelled());
    }
}
