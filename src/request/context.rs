use crate::auth::{Claims, DecodedToken};
use crate::config::Settings;
use crate::error::{AppError, BodyError, ContextError};
use crate::request::body::decode_json;
use crate::request::carrier;
use crate::state::{AppState, Daos, Services, SharedState};
use axum::{
    body::Body,
    extract::{FromRequest, Request},
    http::{request::Parts, HeaderMap, Method, Uri},
};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument, Span};
use uuid::Uuid;
use validator::Validate;

/// Everything a handler needs to know about the request it is serving.
///
/// Built once per request, after the request-id and authentication stages
/// have run. All fields are fixed at construction; the body can be read
/// once.
pub struct RequestContext {
    id: Uuid,
    app: SharedState,
    span: Span,
    parts: Parts,
    body: Mutex<Option<Body>>,
    authenticated: bool,
    token: Option<DecodedToken>,
    claims: Option<Claims>,
    cancel: CancellationToken,
}

impl RequestContext {
    /// Build the context for `request`.
    ///
    /// Fails only when the request id is missing or malformed. Missing
    /// authentication entries are logged and leave the context
    /// unauthenticated.
    pub fn new(app: SharedState, request: Request) -> Result<Self, ContextError> {
        let (parts, body) = request.into_parts();

        let id = carrier::request_id(&parts.extensions)?;
        let span = info_span!(
            "request",
            request_id = %id,
            method = %parts.method,
            path = %parts.uri.path(),
        );

        let auth = span.in_scope(|| carrier::auth_state(&parts.extensions));
        let cancel = carrier::processing_context(&parts.extensions);

        Ok(Self {
            id,
            app,
            span,
            body: Mutex::new(Some(body)),
            parts,
            authenticated: auth.authenticated,
            token: auth.token,
            claims: auth.claims,
            cancel,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn app(&self) -> &Arc<AppState> {
        &self.app
    }

    pub fn config(&self) -> &Settings {
        &self.app.settings
    }

    pub fn services(&self) -> &Services {
        &self.app.services
    }

    pub fn daos(&self) -> &Daos {
        &self.app.daos
    }

    /// Span carrying the request id; enter it or instrument futures with it
    /// to tag log lines.
    pub fn logger(&self) -> &Span {
        &self.span
    }

    /// The request head (method, URI, headers, extensions).
    pub fn request(&self) -> &Parts {
        &self.parts
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Cancelled when the request completes or is abandoned by the client.
    pub fn processing_context(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn token(&self) -> Option<&DecodedToken> {
        self.token.as_ref()
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    /// Authenticated with the `user` or `admin` role.
    pub fn is_user(&self) -> bool {
        grants_user(self.authenticated, self.claims.as_ref())
    }

    /// Authenticated with the `admin` role.
    pub fn is_admin(&self) -> bool {
        grants_admin(self.authenticated, self.claims.as_ref())
    }

    /// Claims of a caller that passes [`is_user`](Self::is_user).
    pub fn require_user(&self) -> Result<&Claims, AppError> {
        self.require(self.is_user(), "user")
    }

    /// Claims of a caller that passes [`is_admin`](Self::is_admin).
    pub fn require_admin(&self) -> Result<&Claims, AppError> {
        self.require(self.is_admin(), "admin")
    }

    fn require(&self, granted: bool, role: &str) -> Result<&Claims, AppError> {
        match &self.claims {
            Some(claims) if granted => Ok(claims),
            _ if !self.authenticated => {
                Err(AppError::Unauthorized("Authentication required".to_string()))
            }
            Some(claims) => Err(AppError::Forbidden(format!(
                "Requires {} role, you have {}",
                role, claims.role
            ))),
            None => Err(AppError::Forbidden(format!("Requires {} role", role))),
        }
    }

    /// Parse the JSON body into `dest`.
    ///
    /// `dest` is replaced as a whole, so a missing field without a
    /// `#[serde(default)]` is a decode error, not a validation error.
    ///
    /// The body is a one-shot stream: a second call on the same context
    /// returns [`BodyError::AlreadyConsumed`].
    pub async fn decode_body<T>(&self, dest: &mut T) -> Result<(), BodyError>
    where
        T: DeserializeOwned,
    {
        let body = self
            .body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(BodyError::AlreadyConsumed)?;

        let limit = self.app.settings.server.body_limit;
        match decode_json(body, limit).instrument(self.span.clone()).await {
            Ok(value) => {
                *dest = value;
                Ok(())
            }
            Err(e) => {
                self.span.in_scope(|| debug!(error = %e, "request body rejected"));
                Err(e)
            }
        }
    }

    /// [`decode_body`](Self::decode_body), then the validation rules declared
    /// on `T`.
    ///
    /// A decode failure is returned as is and skips validation. On a
    /// validation failure `dest` still holds the decoded value.
    pub async fn decode_and_validate_body<T>(&self, dest: &mut T) -> Result<(), BodyError>
    where
        T: DeserializeOwned + Validate,
    {
        self.decode_body(dest).await?;

        self.app.services.validator.validate(&*dest).map_err(|violations| {
            self.span.in_scope(|| debug!(%violations, "request body failed validation"));
            BodyError::Validation(violations)
        })
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("id", &self.id)
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("authenticated", &self.authenticated)
            .field("claims", &self.claims)
            .finish_non_exhaustive()
    }
}

impl FromRequest<SharedState> for RequestContext {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &SharedState) -> Result<Self, Self::Rejection> {
        Ok(RequestContext::new(Arc::clone(state), req)?)
    }
}

fn grants_user(authenticated: bool, claims: Option<&Claims>) -> bool {
    authenticated && claims.is_some_and(|c| c.role.grants_user())
}

fn grants_admin(authenticated: bool, claims: Option<&Claims>) -> bool {
    authenticated && claims.is_some_and(|c| c.role.grants_admin())
}
